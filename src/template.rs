use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Placeholder values for [`render`].
pub type TemplateVars = BTreeMap<String, String>;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("hardcoded placeholder pattern must compile")
});

/// Replaces `{{name}}` placeholders. Unknown names are left untouched.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_owned(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::{render, TemplateVars};

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn substitutes_every_occurrence() {
        let out = render(
            "Hi {{name}}, {{ name }} owes {{amount}}",
            &vars(&[("name", "Kit"), ("amount", "$3")]),
        );
        assert_eq!(out, "Hi Kit, Kit owes $3");
    }

    #[test]
    fn unknown_placeholders_survive() {
        assert_eq!(render("Hello {{who}}", &TemplateVars::new()), "Hello {{who}}");
    }

    #[test]
    fn values_are_not_reinterpreted() {
        let out = render("{{a}}", &vars(&[("a", "{{b}} $1"), ("b", "x")]));
        assert_eq!(out, "{{b}} $1");
    }
}
