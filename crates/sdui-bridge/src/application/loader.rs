//! Module loading: resolve a reference, pick a strategy, return a module.
//!
//! The rendering runtime asks the bridge for externally hosted
//! component modules.  The loader's job is narrow: compute the absolute
//! URL for a [`ModuleRef`] and turn it into an executable module via
//! one of two strategies.
//!
//! # Why two strategies?
//!
//! Importers behave differently depending on how the bridge's own code
//! was loaded into the host.  When it arrived through an in-memory
//! object URL (as sandboxed host runtimes do), a direct import of a
//! freshly resolved URL trips over path resolution and cross-origin
//! rules that a plain byte fetch does not.  In that deployment the
//! loader fetches the module source itself and hands the bytes to the
//! importer; everywhere else the direct import is cheaper.
//!
//! Which case applies is the integrator's knowledge, not this crate's —
//! hence the [`LoadStrategy`](crate::domain::config::LoadStrategy)
//! config field, with an `Auto` mode that tries direct first and falls
//! back.
//!
//! No caching happens at this layer.  Callers that want reload
//! avoidance can cache by resolved URL.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::domain::config::LoadStrategy;
use crate::domain::module_ref::ModuleRef;

/// An executable module, opaque to the bridge.
///
/// The bridge never looks inside a loaded module; the rendering runtime
/// downcasts to whatever concrete module type its importer produces.
pub type DynModule = Box<dyn Any + Send + Sync>;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure to turn a URL or byte buffer into an executable module.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ImportError(pub String);

/// Failure to retrieve module source bytes.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Errors surfaced by [`ModuleLoader::load`].
///
/// A load failure is scoped to the one reference being loaded; it never
/// affects other sessions or the host channel.
#[derive(Debug, Error)]
pub enum ModuleLoadError {
    /// The reference is by name but the deployment never established an
    /// import-source base URL (reported once at discovery time).
    #[error("no import-source base URL is configured; cannot resolve module {0:?} by name")]
    MissingBaseUrl(String),

    /// Retrieving the module source failed.
    #[error("fetching module source from {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// The retrieved source could not be imported as a module.
    #[error("importing module at {url} failed: {reason}")]
    Import { url: String, reason: String },
}

// ── Seams ─────────────────────────────────────────────────────────────────────

/// The rendering runtime's import mechanism.
///
/// The runtime owns module execution; the bridge only decides *what* to
/// hand it — a URL, or pre-fetched bytes.
#[async_trait]
pub trait ModuleImporter: Send + Sync {
    /// Imports the module at `url` directly.
    async fn import_url(&self, url: &str) -> Result<DynModule, ImportError>;

    /// Imports a module from in-memory source bytes.
    ///
    /// `origin_url` is the URL the bytes came from, for diagnostics and
    /// for importers that key internal state by origin.
    async fn import_bytes(&self, source: Vec<u8>, origin_url: &str)
        -> Result<DynModule, ImportError>;
}

/// Retrieval of raw module source bytes.
///
/// The production implementation is the HTTP fetcher in the
/// infrastructure layer.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Resolves module references and loads them per the configured strategy.
pub struct ModuleLoader {
    import_source_base_url: Option<String>,
    strategy: LoadStrategy,
    importer: Arc<dyn ModuleImporter>,
    fetcher: Arc<dyn SourceFetcher>,
}

impl ModuleLoader {
    /// Creates a loader.
    ///
    /// `import_source_base_url` is the discovered (or overridden) base
    /// for by-name references; `None` means discovery failed and only
    /// by-URL references will load.
    pub fn new(
        import_source_base_url: Option<String>,
        strategy: LoadStrategy,
        importer: Arc<dyn ModuleImporter>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self {
            import_source_base_url,
            strategy,
            importer,
            fetcher,
        }
    }

    /// Returns the base URL by-name references resolve against, if any.
    pub fn import_source_base_url(&self) -> Option<&str> {
        self.import_source_base_url.as_deref()
    }

    /// Loads the module `module_ref` points at.
    ///
    /// # Errors
    ///
    /// Exactly one [`ModuleLoadError`] per failed load, whatever the
    /// strategy: under `Auto`, a direct-import failure is logged and the
    /// fetch fallback's outcome is what the caller sees.
    pub async fn load(&self, module_ref: &ModuleRef) -> Result<DynModule, ModuleLoadError> {
        let url = module_ref
            .effective_url(self.import_source_base_url.as_deref())
            .ok_or_else(|| ModuleLoadError::MissingBaseUrl(module_ref.specifier().to_string()))?;

        match self.strategy {
            LoadStrategy::Direct => self.import_direct(&url).await,
            LoadStrategy::FetchThenImport => self.fetch_then_import(&url).await,
            LoadStrategy::Auto => match self.import_direct(&url).await {
                Ok(module) => Ok(module),
                Err(direct_err) => {
                    debug!("direct import of {url} failed ({direct_err}); trying fetch fallback");
                    self.fetch_then_import(&url).await
                }
            },
        }
    }

    async fn import_direct(&self, url: &str) -> Result<DynModule, ModuleLoadError> {
        self.importer
            .import_url(url)
            .await
            .map_err(|e| ModuleLoadError::Import {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch_then_import(&self, url: &str) -> Result<DynModule, ModuleLoadError> {
        let source = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| ModuleLoadError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        self.importer
            .import_bytes(source, url)
            .await
            .map_err(|e| ModuleLoadError::Import {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
