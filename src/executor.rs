use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::{
    transport::{Headers, Method, RequestBody, RequestDescriptor, Transport, TransportResult},
    RetryPolicy,
};

/// Header carrying the raw API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[cfg(not(target_arch = "wasm32"))]
pub type SharedTransport = Arc<dyn Transport + Send + Sync>;
#[cfg(target_arch = "wasm32")]
pub type SharedTransport = Arc<dyn Transport>;

/// Runs one logical operation with bounded retry.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: SharedTransport,
    api_key: String,
    authorization: String,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(transport: SharedTransport, api_key: impl AsRef<str>) -> Self {
        let authorization = normalize_bearer_authorization(api_key.as_ref());
        Self {
            transport,
            api_key: strip_bearer(api_key.as_ref()).to_owned(),
            authorization,
        }
    }

    /// Executes `descriptor`, retrying every failure until `policy` is exhausted.
    ///
    /// The last failure is returned as-is.
    pub async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        policy: &RetryPolicy,
    ) -> TransportResult {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            // Auth is re-applied on every attempt.
            let headers = self.headers_for(descriptor);
            let failure = match self.dispatch(descriptor, &headers).await {
                Ok(body) => return Ok(body),
                Err(failure) => failure,
            };

            if attempt + 1 >= attempts {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    method = %descriptor.method,
                    url = %descriptor.url,
                    attempts,
                    "request failed after final attempt: {failure}"
                );
                return Err(failure);
            }

            let jitter = rand::thread_rng().gen_range(0.0..0.5);
            let delay = backoff_delay(policy, attempt, jitter);

            #[cfg(feature = "tracing")]
            tracing::warn!(
                method = %descriptor.method,
                url = %descriptor.url,
                attempt,
                status = ?failure.status,
                transient = failure.is_transient(),
                delay_ms = delay.as_millis() as u64,
                "request attempt failed, retrying: {}",
                failure.message
            );

            sleep(delay).await;
            attempt += 1;
        }
    }

    async fn dispatch(&self, descriptor: &RequestDescriptor, headers: &Headers) -> TransportResult {
        let url = descriptor.url.as_str();
        let body = descriptor.body.as_ref();
        match descriptor.method {
            Method::Get => self.transport.get(url, headers).await,
            Method::Post => self.transport.post(url, body, headers).await,
            Method::Put => self.transport.put(url, body, headers).await,
            Method::Delete => self.transport.delete(url, headers).await,
        }
    }

    fn headers_for(&self, descriptor: &RequestDescriptor) -> Headers {
        let mut headers = descriptor.headers.clone();
        set_header(&mut headers, API_KEY_HEADER, &self.api_key);
        set_header(&mut headers, "authorization", &self.authorization);
        match &descriptor.body {
            Some(RequestBody::Json(_)) => set_header(&mut headers, "content-type", "application/json"),
            // The transport writes the multipart boundary itself.
            Some(RequestBody::Multipart(_)) => {
                headers.retain(|name, _| !name.eq_ignore_ascii_case("content-type"))
            }
            None => {}
        }
        headers
    }
}

/// Delay before the retry that follows `attempt`.
///
/// `base_delay_ms * 2^attempt * (0.5 + jitter)`, with `jitter` in `[0, 0.5)`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, jitter: f64) -> Duration {
    // Float to int casts saturate, so huge exponents end at `u64::MAX` nanoseconds.
    let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base_nanos = policy.base_delay_ms as f64 * 1_000_000.0 * 2f64.powi(exp);
    let factor = 0.5 + jitter.clamp(0.0, 0.5);
    Duration::from_nanos((base_nanos * factor) as u64)
}

fn set_header(headers: &mut Headers, name: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_owned(), value.to_owned());
}

/// The raw key, without any `Bearer ` prefix the caller supplied.
fn strip_bearer(token: &str) -> &str {
    let trimmed = token.trim();
    match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => trimmed[7..].trim_start(),
        _ => trimmed,
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Timer-backed sleep through the host's `setTimeout`.
#[cfg(target_arch = "wasm32")]
async fn sleep(delay: Duration) {
    use wasm_bindgen::{JsCast, JsValue};

    if delay.is_zero() {
        return;
    }
    let millis = delay.as_millis().min(i32::MAX as u128) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let global = js_sys::global();
        let set_timeout = js_sys::Reflect::get(&global, &JsValue::from_str("setTimeout"))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        match set_timeout {
            Some(set_timeout) => {
                let _ = set_timeout.call2(&global, &resolve, &JsValue::from(millis));
            }
            None => {
                let _ = resolve.call0(&JsValue::UNDEFINED);
            }
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}
