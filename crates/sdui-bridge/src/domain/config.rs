//! Bridge configuration types and host-page base-URL discovery.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime
//! settings of one bridge instance.  Keeping configuration as a plain
//! struct (no global state, no environment reads inside the domain)
//! makes the bridge easy to embed in tests and in host processes that
//! construct it programmatically.
//!
//! # Where the import-source base URL comes from
//!
//! Component modules are fetched relative to a base URL that the host
//! page knows and the bridge does not.  Discovery tries, in priority
//! order:
//!
//! 1. An explicit per-instance override ([`BridgeConfig::base_url_override`]),
//!    used verbatim — the embedder already resolved it fully.
//! 2. A JSON configuration blob embedded in the page as the text of the
//!    element with id `sdui-config-data`, whose `baseUrl` field is
//!    joined with the web-modules suffix.
//! 3. A `data-base-url` attribute on the page root, likewise joined
//!    with the suffix.
//!
//! Absence of all three is a configuration error, not a crash: it is
//! reported once on the diagnostic log and degrades module loading only
//! (loads by name will fail; loads by absolute URL still work).

use std::sync::Once;

use tracing::{error, warn};

use crate::domain::dom::{MountTree, Selector};

/// Element id of the host-page JSON configuration blob.
pub const CONFIG_BLOB_ID: &str = "sdui-config-data";

/// Page-root attribute consulted when no configuration blob is present.
pub const BASE_URL_ATTRIBUTE: &str = "data-base-url";

/// Path suffix under the host base URL where component modules are served.
pub const WEB_MODULES_SUFFIX: &str = "sdui_web_modules";

/// How the module loader turns a resolved URL into an executable module.
///
/// Which strategy is right depends on how the bridge's own code was
/// loaded into the host, not on anything this crate can detect — so the
/// integrator chooses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// Hand the resolved URL straight to the runtime's importer.
    Direct,
    /// Fetch the module source as bytes first, then import from memory.
    ///
    /// Sandboxed deployments load the bridge code itself from an
    /// in-memory object URL; relative dynamic imports executed from
    /// such code hit path-resolution and cross-origin restrictions
    /// that a plain byte fetch does not.  The cost is an extra round
    /// trip and holding the module source in memory.
    FetchThenImport,
    /// Try [`LoadStrategy::Direct`]; on failure fall back to
    /// [`LoadStrategy::FetchThenImport`].
    #[default]
    Auto,
}

/// All runtime configuration for one bridge instance.
///
/// Build this struct once at startup and hand it to the bridge; the
/// defaults are suitable for tests and for embeddings where the host
/// page carries its own configuration blob.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Fully resolved import-source base URL, overriding page discovery.
    ///
    /// `None` (the default) means the base URL is discovered from the
    /// host page.
    pub base_url_override: Option<String>,

    /// Module loading strategy (see [`LoadStrategy`]).
    pub load_strategy: LoadStrategy,

    /// Capacity of each session's update queue to the rendering runtime.
    ///
    /// The inbound side of the host channel is sized where the channel
    /// is constructed; this bounds only the per-view backlog between
    /// the routing task and the runtime.
    pub update_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url_override: None,
            load_strategy: LoadStrategy::default(),
            update_capacity: 64,
        }
    }
}

/// One-shot guard so a missing base URL is reported a single time per
/// process, however many sessions are mounted after it.
static MISSING_BASE_URL_REPORTED: Once = Once::new();

/// Discovers the import-source base URL for a session.
///
/// Returns `None` when no source is available; the caller passes that
/// through to the module loader, which then fails loads *by name* while
/// loads by absolute URL keep working.
pub fn resolve_import_source(config: &BridgeConfig, page: &MountTree) -> Option<String> {
    // 1. Explicit override — already fully resolved by the embedder.
    if let Some(override_url) = &config.base_url_override {
        return Some(override_url.clone());
    }

    // 2. Page-embedded JSON configuration blob.
    let root = page.root();
    if let Some(blob) = root.query_all(&Selector::Id(CONFIG_BLOB_ID.to_string())).first() {
        match serde_json::from_str::<serde_json::Value>(&blob.text()) {
            Ok(parsed) => {
                if let Some(base) = parsed.get("baseUrl").and_then(|v| v.as_str()) {
                    return Some(sdui_core::resolve(base, WEB_MODULES_SUFFIX));
                }
                warn!("page config blob has no 'baseUrl' field");
            }
            Err(e) => warn!("page config blob is not valid JSON: {e}"),
        }
    }

    // 3. Attribute fallback on the page root.
    if let Some(base) = root.attribute(BASE_URL_ATTRIBUTE) {
        return Some(sdui_core::resolve(&base, WEB_MODULES_SUFFIX));
    }

    MISSING_BASE_URL_REPORTED.call_once(|| {
        error!(
            "no host base URL could be discovered and no import source base URL was configured; \
             modules referenced by name will fail to load"
        );
    });
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
