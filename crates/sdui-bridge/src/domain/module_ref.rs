//! References to remotely hosted component modules.
//!
//! Server-driven documents can embed components whose implementation
//! lives outside the document itself.  The document names the module it
//! wants either by a bare specifier ("resolve this against wherever the
//! host serves its web modules") or by a full URL ("fetch exactly
//! this").

use sdui_core::resolve;

/// A request to load one external component module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleRef {
    /// A bare module specifier, resolved against the configured
    /// import-source base URL (e.g. `charting/plot.js`).
    ByName(String),
    /// A complete URL, used verbatim (e.g. `https://cdn.example.com/x.js`).
    ByUrl(String),
}

impl ModuleRef {
    /// Returns the raw specifier string, regardless of kind.
    pub fn specifier(&self) -> &str {
        match self {
            Self::ByName(s) | Self::ByUrl(s) => s,
        }
    }

    /// Computes the URL this reference should be fetched from.
    ///
    /// `ByName` requires a base URL; `None` means the deployment never
    /// established one, which the loader reports as a load error for
    /// this reference only.
    pub fn effective_url(&self, import_source_base_url: Option<&str>) -> Option<String> {
        match self {
            Self::ByName(name) => import_source_base_url.map(|base| resolve(base, name)),
            Self::ByUrl(url) => Some(url.clone()),
        }
    }
}
