//! The composition root: one mounted view, fully wired.
//!
//! [`Bridge`] owns everything that is process-scoped — the host
//! channel, the view-identity allocator, the configuration — and stamps
//! out one [`ViewSession`] per mount.  Each mount resolves its own
//! base-URL configuration, gets its own module loader, its own inbound
//! routing task, and a [`RuntimeHandle`] exposing the three
//! capabilities the rendering runtime needs: readiness signaling, event
//! emission, and module loading.
//!
//! # Sub-widget attachment
//!
//! Documents can declare nested sub-widgets by external identifier.
//! The host exposes the current identifier list as a watched value;
//! [`MountedView::watch_sub_widgets`] observes it and, for every newly
//! seen identifier, resolves the host-managed sub-component and splices
//! its rendered subtree into the placeholder element carrying the
//! matching `widget-model-id-…` class — waiting for the placeholder to
//! materialize first.  Attachment is idempotent: an identifier is
//! attached at most once, however often the list changes.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sdui_core::{ViewId, ViewIdAllocator};

use crate::application::loader::{
    DynModule, ModuleImporter, ModuleLoadError, ModuleLoader, SourceFetcher,
};
use crate::application::session::{SessionError, ViewSession};
use crate::application::transport::HostChannel;
use crate::application::waiter::wait_for_all;
use crate::domain::config::{resolve_import_source, BridgeConfig};
use crate::domain::dom::{Element, MountTree, Selector};
use crate::domain::module_ref::ModuleRef;

/// Prefix the host framework puts on sub-widget identifiers it exposes.
/// Stripped before resolution.
pub const SUB_WIDGET_ID_PREFIX: &str = "HOST_MODEL_";

/// Class prefix tagging the placeholder element for a sub-widget id.
pub const PLACEHOLDER_CLASS_PREFIX: &str = "widget-model-id-";

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Resolution of host-managed sub-components.
///
/// The host widget framework owns sub-component lifecycles; the bridge
/// only asks it, asynchronously, for the rendered subtree belonging to
/// an identifier.
#[async_trait]
pub trait SubWidgetResolver: Send + Sync {
    /// Returns the rendered subtree for `id`, or `None` when the host
    /// does not know the identifier.
    async fn resolve(&self, id: &str) -> Option<Element>;
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// Process-scoped bridge state: channel, allocator, configuration, and
/// the loader's importer/fetcher capabilities.
pub struct Bridge {
    channel: Arc<dyn HostChannel>,
    config: BridgeConfig,
    allocator: Arc<ViewIdAllocator>,
    importer: Arc<dyn ModuleImporter>,
    fetcher: Arc<dyn SourceFetcher>,
}

impl Bridge {
    /// Creates a bridge with its own identity allocator.
    pub fn new(
        channel: Arc<dyn HostChannel>,
        config: BridgeConfig,
        importer: Arc<dyn ModuleImporter>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self::with_allocator(channel, config, importer, fetcher, Arc::new(ViewIdAllocator::new()))
    }

    /// Creates a bridge sharing an existing allocator.
    ///
    /// Embeddings that construct several bridges in one process pass
    /// the same allocator to all of them, keeping identities unique
    /// process-wide.  Allocators reset only at process start.
    pub fn with_allocator(
        channel: Arc<dyn HostChannel>,
        config: BridgeConfig,
        importer: Arc<dyn ModuleImporter>,
        fetcher: Arc<dyn SourceFetcher>,
        allocator: Arc<ViewIdAllocator>,
    ) -> Self {
        Self {
            channel,
            config,
            allocator,
            importer,
            fetcher,
        }
    }

    /// Mounts one view: allocates its identity, resolves configuration,
    /// wires the session to the channel, and returns the handles the
    /// rendering runtime works with.
    ///
    /// `page` is the host page tree (consulted for base-URL discovery);
    /// `mount` is the element the runtime renders into, and the scope
    /// for sub-widget placeholder waits.
    pub fn mount(&self, page: &MountTree, mount: Element) -> MountedView {
        let id = self.allocator.next();

        // Base-URL discovery happens per session: the override can
        // differ between bridge instances, the page sources cannot.
        let import_source = resolve_import_source(&self.config, page);
        let loader = Arc::new(ModuleLoader::new(
            import_source,
            self.config.load_strategy,
            Arc::clone(&self.importer),
            Arc::clone(&self.fetcher),
        ));

        let session = ViewSession::new(id, Arc::clone(&self.channel));

        let (update_tx, update_rx) = mpsc::channel(self.config.update_capacity);
        session.spawn_routing(update_tx);

        // Host-initiated teardown removes the session exactly like an
        // explicit unmount would.
        let mut teardown = self.channel.teardown();
        let teardown_session = Arc::clone(&session);
        tokio::spawn(async move {
            if teardown.wait_for(|torn_down| *torn_down).await.is_ok() {
                if let Err(e) = teardown_session.remove().await {
                    warn!("{}: removal on host teardown failed: {e}", teardown_session.id());
                }
            }
        });

        info!("{id}: view mounted");
        MountedView {
            runtime: RuntimeHandle { session, loader },
            updates: update_rx,
            mount,
        }
    }
}

// ── Runtime-facing handles ────────────────────────────────────────────────────

/// The capability set the bridge supplies to the rendering runtime.
#[derive(Clone)]
pub struct RuntimeHandle {
    session: Arc<ViewSession>,
    loader: Arc<ModuleLoader>,
}

impl RuntimeHandle {
    /// Returns the identity of the view this handle belongs to.
    pub fn view_id(&self) -> ViewId {
        self.session.id()
    }

    /// Signals that the runtime completed initial setup (sends
    /// `client-ready`; see [`ViewSession::ready`]).
    pub async fn notify_ready(&self) -> Result<(), SessionError> {
        self.session.ready().await
    }

    /// Emits a DOM event raised in the rendered document (sends
    /// `dom-event`; see [`ViewSession::emit_event`]).
    pub async fn emit_event(&self, payload: Value) -> Result<(), SessionError> {
        self.session.emit_event(payload).await
    }

    /// Loads an external component module (see [`ModuleLoader::load`]).
    pub async fn load_module(&self, module_ref: &ModuleRef) -> Result<DynModule, ModuleLoadError> {
        self.loader.load(module_ref).await
    }
}

/// One mounted view: the runtime handle, the update queue, and the
/// mount element.
pub struct MountedView {
    /// Capabilities handed to the rendering runtime.
    pub runtime: RuntimeHandle,
    /// Update payloads addressed to this view, in host delivery order.
    pub updates: mpsc::Receiver<Value>,
    /// The element the runtime renders into.
    pub mount: Element,
}

impl MountedView {
    /// Returns this view's identity.
    pub fn view_id(&self) -> ViewId {
        self.runtime.session.id()
    }

    /// Tears the view down (sends `client-removed` exactly once; see
    /// [`ViewSession::remove`]).
    pub async fn teardown(&self) -> Result<(), SessionError> {
        self.runtime.session.remove().await
    }

    /// Watches the host-exposed sub-widget identifier list and attaches
    /// each newly seen identifier under this view's mount.
    ///
    /// Runs until the list's sender is dropped.  Identifiers already
    /// attached are never re-attached; identifiers the resolver does
    /// not know are logged and skipped.
    pub fn watch_sub_widgets(
        &self,
        mut list: watch::Receiver<Vec<String>>,
        resolver: Arc<dyn SubWidgetResolver>,
    ) -> JoinHandle<()> {
        let mount = self.mount.clone();
        let removed = self.runtime.session.removed_signal();
        let view_id = self.runtime.session.id();

        tokio::spawn(async move {
            let mut attached: HashSet<String> = HashSet::new();
            loop {
                let raw_ids = list.borrow_and_update().clone();
                for raw_id in raw_ids {
                    let id = raw_id
                        .strip_prefix(SUB_WIDGET_ID_PREFIX)
                        .unwrap_or(&raw_id)
                        .to_string();
                    if !attached.insert(id.clone()) {
                        continue;
                    }
                    // Each attachment waits independently: one missing
                    // placeholder must not stall the others.
                    tokio::spawn(attach_sub_widget(
                        mount.clone(),
                        Arc::clone(&resolver),
                        id,
                        removed.clone(),
                    ));
                }
                if list.changed().await.is_err() {
                    debug!("{view_id}: sub-widget list closed; attachment watch ends");
                    break;
                }
            }
        })
    }
}

/// Resolves one sub-widget and splices it into its placeholder(s).
async fn attach_sub_widget(
    mount: Element,
    resolver: Arc<dyn SubWidgetResolver>,
    id: String,
    removed: watch::Receiver<bool>,
) {
    let Some(widget) = resolver.resolve(&id).await else {
        warn!("sub-widget {id:?} could not be resolved; placeholder left empty");
        return;
    };

    let selector = Selector::Class(format!("{PLACEHOLDER_CLASS_PREFIX}{id}"));
    let placeholders = wait_for_all(&mount, &selector).await;

    // A wait that completes after teardown runs to completion, but its
    // result is not acted upon.
    if *removed.borrow() {
        debug!("sub-widget {id:?} resolved after removal; splice skipped");
        return;
    }

    debug!("attaching sub-widget {id:?} to {} placeholder(s)", placeholders.len());
    for placeholder in placeholders {
        // One resolution, one instance per placeholder: a subtree
        // cannot sit under two parents at once.
        placeholder.replace_children(vec![widget.deep_clone()]);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::loader::{FetchError, ImportError};
    use crate::infrastructure::loopback::LoopbackChannel;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::timeout;

    const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    struct NullImporter;

    #[async_trait]
    impl ModuleImporter for NullImporter {
        async fn import_url(&self, url: &str) -> Result<DynModule, ImportError> {
            Ok(Box::new(url.to_string()))
        }
        async fn import_bytes(
            &self,
            _source: Vec<u8>,
            origin_url: &str,
        ) -> Result<DynModule, ImportError> {
            Ok(Box::new(origin_url.to_string()))
        }
    }

    struct NullFetcher;

    #[async_trait]
    impl SourceFetcher for NullFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            Ok(Vec::new())
        }
    }

    /// Resolver serving a fixed element per known id, recording calls.
    struct FixedResolver {
        tree_element: Element,
        known_id: String,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SubWidgetResolver for FixedResolver {
        async fn resolve(&self, id: &str) -> Option<Element> {
            self.calls.lock().unwrap().push(id.to_string());
            (id == self.known_id).then(|| self.tree_element.clone())
        }
    }

    fn test_bridge(channel: Arc<LoopbackChannel>) -> Bridge {
        Bridge::new(
            channel as Arc<dyn HostChannel>,
            BridgeConfig {
                base_url_override: Some("http://host/mods".into()),
                ..Default::default()
            },
            Arc::new(NullImporter),
            Arc::new(NullFetcher),
        )
    }

    fn page_with_mount() -> (MountTree, Element) {
        let page = MountTree::new();
        let mount = page.create_element("div");
        page.root().append_child(mount.clone());
        (page, mount)
    }

    #[tokio::test]
    async fn test_each_mount_gets_a_distinct_increasing_identity() {
        let channel = LoopbackChannel::new();
        let bridge = test_bridge(channel);
        let (page, mount) = page_with_mount();

        let first = bridge.mount(&page, mount.clone());
        let second = bridge.mount(&page, mount);

        assert_eq!(first.view_id(), ViewId(0));
        assert_eq!(second.view_id(), ViewId(1));
    }

    #[tokio::test]
    async fn test_update_for_one_view_never_reaches_the_other() {
        // Arrange: two views on one shared channel
        let channel = LoopbackChannel::new();
        let bridge = test_bridge(Arc::clone(&channel));
        let (page, mount) = page_with_mount();
        let mut first = bridge.mount(&page, mount.clone());
        let mut second = bridge.mount(&page, mount);

        // Act: one update addressed to the second view
        channel.inject(json!({"viewID": 1, "data": {"to": "second"}}));

        // Assert
        let delivered = timeout(RECV_TIMEOUT, second.updates.recv()).await.unwrap().unwrap();
        assert_eq!(delivered["to"], "second");
        assert!(
            timeout(Duration::from_millis(50), first.updates.recv()).await.is_err(),
            "view 0 must never see view 1's update"
        );
    }

    #[tokio::test]
    async fn test_host_teardown_removes_the_session() {
        let channel = LoopbackChannel::new();
        let bridge = test_bridge(Arc::clone(&channel));
        let (page, mount) = page_with_mount();
        let view = bridge.mount(&page, mount);
        view.runtime.notify_ready().await.unwrap();

        // Act: the host tears the channel down
        channel.trigger_teardown();
        let mut removed = view.runtime.session.removed_signal();
        timeout(RECV_TIMEOUT, removed.wait_for(|r| *r)).await.unwrap().unwrap();

        // Assert: the removal envelope went out
        let removals = channel
            .sent()
            .iter()
            .filter(|e| e.kind_name() == "client-removed")
            .count();
        assert_eq!(removals, 1);
    }

    #[tokio::test]
    async fn test_runtime_handle_loads_modules_against_the_override() {
        let channel = LoopbackChannel::new();
        let bridge = test_bridge(channel);
        let (page, mount) = page_with_mount();
        let view = bridge.mount(&page, mount);

        let module = view
            .runtime
            .load_module(&ModuleRef::ByName("plot.js".into()))
            .await
            .unwrap();

        assert_eq!(*module.downcast::<String>().unwrap(), "http://host/mods/plot.js");
    }

    #[tokio::test]
    async fn test_sub_widget_attaches_when_placeholder_already_exists() {
        // Arrange
        let channel = LoopbackChannel::new();
        let bridge = test_bridge(channel);
        let (page, mount) = page_with_mount();

        let placeholder = page.create_element("div");
        placeholder.add_class(&format!("{PLACEHOLDER_CLASS_PREFIX}abc"));
        mount.append_child(placeholder.clone());

        let widget = page.create_element("section");
        widget.set_attribute("data-widget", "abc");
        let resolver = Arc::new(FixedResolver {
            tree_element: widget,
            known_id: "abc".into(),
            calls: Mutex::new(Vec::new()),
        });

        let view = bridge.mount(&page, mount);
        let (list_tx, list_rx) = watch::channel(vec!["HOST_MODEL_abc".to_string()]);
        view.watch_sub_widgets(list_rx, resolver.clone());

        // Assert: the placeholder's children become the widget subtree
        let spliced = timeout(RECV_TIMEOUT, async {
            loop {
                let children = placeholder.children();
                if children.len() == 1
                    && children[0].attribute("data-widget").as_deref() == Some("abc")
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(spliced.is_ok(), "sub-widget must be spliced into the placeholder");

        // The prefix was stripped before resolution
        assert_eq!(resolver.calls.lock().unwrap().as_slice(), ["abc"]);
        drop(list_tx);
    }

    #[tokio::test]
    async fn test_sub_widget_waits_for_late_placeholder_and_is_attached_once() {
        let channel = LoopbackChannel::new();
        let bridge = test_bridge(channel);
        let (page, mount) = page_with_mount();

        let widget = page.create_element("section");
        widget.set_attribute("data-widget", "late");
        let resolver = Arc::new(FixedResolver {
            tree_element: widget,
            known_id: "late".into(),
            calls: Mutex::new(Vec::new()),
        });

        let view = bridge.mount(&page, mount.clone());
        let (list_tx, list_rx) = watch::channel(vec!["HOST_MODEL_late".to_string()]);
        view.watch_sub_widgets(list_rx, resolver.clone());

        // The placeholder shows up only after the watch started.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let placeholder = page.create_element("div");
        placeholder.add_class(&format!("{PLACEHOLDER_CLASS_PREFIX}late"));
        mount.append_child(placeholder.clone());

        let spliced = timeout(RECV_TIMEOUT, async {
            loop {
                let attached = placeholder
                    .children()
                    .first()
                    .and_then(|c| c.attribute("data-widget"))
                    .is_some_and(|w| w == "late");
                if attached {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(spliced.is_ok());

        // A list change repeating the id must not re-resolve it.
        list_tx
            .send(vec!["HOST_MODEL_late".to_string(), "HOST_MODEL_other".to_string()])
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let calls = resolver.calls.lock().unwrap().clone();
        assert_eq!(
            calls.iter().filter(|c| c.as_str() == "late").count(),
            1,
            "already-attached identifiers are not re-attached"
        );
        assert!(calls.iter().any(|c| c == "other"), "new identifiers are resolved");
    }
}
