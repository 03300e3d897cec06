use std::sync::LazyLock;

use regex::Regex;

use crate::{error::ErrorCode, MailError, Result};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("hardcoded email pattern must compile")
});

pub fn is_valid_email(address: &str) -> bool {
    EMAIL_RE.is_match(address)
}

pub(crate) fn email(field: &str, address: &str) -> Result<()> {
    if address.trim().is_empty() {
        return Err(missing(field));
    }
    if !is_valid_email(address) {
        return Err(MailError::validation(
            ErrorCode::InvalidEmail,
            format!("{field} is not a valid email address: '{address}'"),
        ));
    }
    Ok(())
}

pub(crate) fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(missing(field));
    }
    Ok(())
}

/// Non-blank identifier, percent-encoded for use as a path segment.
pub(crate) fn path_id(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MailError::validation(
            ErrorCode::InvalidArgument,
            format!("{field} must not be empty"),
        ));
    }
    Ok(urlencoding::encode(trimmed).into_owned())
}

fn missing(field: &str) -> MailError {
    MailError::validation(ErrorCode::MissingField, format!("{field} is required"))
}

#[cfg(test)]
mod tests {
    use super::{email, is_valid_email, path_id, required};
    use crate::error::ErrorCode;

    #[test]
    fn accepts_common_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for address in ["not-an-email", "a@b", "@x.com", "a b@x.com", "a@@x.com"] {
            assert!(!is_valid_email(address), "{address}");
        }
    }

    #[test]
    fn empty_email_is_missing_not_invalid() {
        let err = email("from", "  ").expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::MissingField);
        let err = email("from", "nope").expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::InvalidEmail);
    }

    #[test]
    fn surrounding_whitespace_is_rejected() {
        assert!(!is_valid_email(" a@x.com "));
        let err = email("recipient", "a@x.com\n").expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::InvalidEmail);
    }

    #[test]
    fn required_rejects_blank() {
        assert!(required("subject", "hi").is_ok());
        assert!(required("subject", "\t").is_err());
    }

    #[test]
    fn path_id_encodes_segment() {
        assert_eq!(path_id("id", " aud 1/x ").expect("valid"), "aud%201%2Fx");
        assert_eq!(
            path_id("id", "").expect_err("blank").code(),
            ErrorCode::InvalidArgument
        );
    }
}
