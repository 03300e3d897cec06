//! Runtime classification of the host environment.
//!
//! A host counts as a browser only when a page scope, a multipart form
//! builder and a native file handle are all available. Anything less takes
//! the server path.

/// Execution environment as seen by the payload strategies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Environment {
    Browser,
    Server,
}

impl Environment {
    /// Probes the current host. Side-effect free and cheap enough to call per operation.
    pub fn detect() -> Self {
        Capabilities::probe().classify()
    }

    pub fn is_browser(self) -> bool {
        self == Self::Browser
    }
}

/// Capabilities that decide the environment.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    /// A page/global-scope marker such as `window`.
    pub page_scope: bool,
    /// A native multipart form builder (`FormData`).
    pub form_data: bool,
    /// A native binary file handle (`File`).
    pub file_handle: bool,
}

impl Capabilities {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn probe() -> Self {
        Self::default()
    }

    #[cfg(target_arch = "wasm32")]
    pub fn probe() -> Self {
        let global = js_sys::global();
        let has = |name: &str| {
            js_sys::Reflect::has(&global, &wasm_bindgen::JsValue::from_str(name)).unwrap_or(false)
        };
        Self {
            page_scope: has("window") && has("document"),
            form_data: has("FormData"),
            file_handle: has("File"),
        }
    }

    pub fn classify(self) -> Environment {
        if self.page_scope && self.form_data && self.file_handle {
            Environment::Browser
        } else {
            Environment::Server
        }
    }
}
