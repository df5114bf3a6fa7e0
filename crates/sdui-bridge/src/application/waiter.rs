//! Asynchronous wait for elements matching a selector.
//!
//! Sub-widget placeholders are rendered by the runtime at a time of its
//! choosing; the bridge cannot splice into a placeholder that does not
//! exist yet.  [`wait_for_all`] bridges that gap: it resolves as soon as
//! the selector matches anything under the container — immediately if
//! matches already exist, otherwise on the first mutation that makes
//! the match set non-empty.
//!
//! There is deliberately no timeout.  Host documents populate
//! asynchronously with no upper bound, and a placeholder that never
//! appears simply means the wait never resolves — the task is cheap and
//! teardown drops it with the rest of the view.

use tracing::trace;

use crate::domain::dom::{Element, Selector};

/// Resolves with all elements under `container` matching `selector`.
///
/// - Matches already present resolve the wait immediately.
/// - Otherwise the wait subscribes to the tree's mutation version and
///   re-queries on every change, resolving with the *full* matching set
///   the first time it is non-empty (not merely the newly inserted
///   node).
/// - The returned set is never empty, and the wait never fails.
///
/// The mutation subscription is dropped as soon as the wait resolves;
/// nothing keeps watching afterwards.
pub async fn wait_for_all(container: &Element, selector: &Selector) -> Vec<Element> {
    // Subscribe before the first query: a mutation landing between the
    // query and the await would otherwise be missed forever.
    let mut changes = container.changes();

    loop {
        let matches = container.query_all(selector);
        if !matches.is_empty() {
            return matches;
        }
        trace!("no match for {selector} yet; waiting for mutations");

        if changes.changed().await.is_err() {
            // Every handle into the tree is gone, so no mutation can
            // ever produce a match.  The contract is to wait, not fail.
            std::future::pending::<()>().await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dom::MountTree;
    use std::time::Duration;
    use tokio::time::timeout;

    const RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

    fn placeholder(tree: &MountTree, class: &str) -> Element {
        let el = tree.create_element("div");
        el.add_class(class);
        el
    }

    #[tokio::test]
    async fn test_existing_matches_resolve_immediately() {
        // Arrange: two matches already in the tree
        let tree = MountTree::new();
        let a = placeholder(&tree, "slot");
        let b = placeholder(&tree, "slot");
        tree.root().append_child(a.clone());
        tree.root().append_child(b.clone());

        // Act
        let found = wait_for_all(&tree.root(), &Selector::Class("slot".into())).await;

        // Assert: both pre-existing matches, no waiting involved
        assert_eq!(found.len(), 2);
        assert!(found[0].same(&a));
        assert!(found[1].same(&b));
    }

    #[tokio::test]
    async fn test_absent_match_keeps_waiting() {
        let tree = MountTree::new();
        let root = tree.root();

        // The wait must still be pending after unrelated mutations.
        root.append_child(tree.create_element("p"));
        let selector = Selector::Class("slot".into());
        let wait = wait_for_all(&root, &selector);

        let outcome = timeout(Duration::from_millis(50), wait).await;
        assert!(outcome.is_err(), "no match, no resolution");
    }

    #[tokio::test]
    async fn test_resolves_after_matching_insertion() {
        let tree = MountTree::new();
        let root = tree.root();
        let inserted = placeholder(&tree, "slot");

        // Act: insert the match while the wait is pending
        let insert_into = root.clone();
        let to_insert = inserted.clone();
        let inserter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            insert_into.append_child(to_insert);
        });

        let found = timeout(
            RESOLVE_TIMEOUT,
            wait_for_all(&root, &Selector::Class("slot".into())),
        )
        .await
        .expect("wait must resolve after the insertion");
        inserter.await.unwrap();

        // Assert
        assert_eq!(found.len(), 1);
        assert!(found[0].same(&inserted));
    }

    #[tokio::test]
    async fn test_resolves_with_the_full_matching_set() {
        // Arrange: a subtree containing two matches is attached at once
        let tree = MountTree::new();
        let root = tree.root();
        let wrapper = tree.create_element("section");
        let first = placeholder(&tree, "slot");
        let second = placeholder(&tree, "slot");
        wrapper.append_child(first.clone());
        wrapper.append_child(second.clone());

        let attach_to = root.clone();
        let inserter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            attach_to.append_child(wrapper);
        });

        // Act
        let found = timeout(
            RESOLVE_TIMEOUT,
            wait_for_all(&root, &Selector::Class("slot".into())),
        )
        .await
        .expect("wait must resolve");
        inserter.await.unwrap();

        // Assert: the whole matching set, not merely one inserted node
        assert_eq!(found.len(), 2);
        assert!(found[0].same(&first));
        assert!(found[1].same(&second));
    }

    #[tokio::test]
    async fn test_nested_match_is_found() {
        // A match deep in the subtree still resolves the wait.
        let tree = MountTree::new();
        let root = tree.root();

        let outer = tree.create_element("div");
        let inner = placeholder(&tree, "slot");
        outer.append_child(inner.clone());

        let attach_to = root.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            attach_to.append_child(outer);
        });

        let found = timeout(
            RESOLVE_TIMEOUT,
            wait_for_all(&root, &Selector::Class("slot".into())),
        )
        .await
        .expect("wait must resolve");

        assert_eq!(found.len(), 1);
        assert!(found[0].same(&inner));
    }
}
