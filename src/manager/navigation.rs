use super::ViewManager;
use crate::error::ViewError;
use crate::tree::{NodeId, PathSegment, TraceSource};
use crate::virtualized::ScrollAnchor;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Resolves `path` segment by segment. The first segment has to name the
/// root. Every later segment is looked up breadth-first below the previous
/// match only, loading that node's children first when needed.
pub async fn find_in_tree_by_path<T: TraceSource>(
    tree: &mut T,
    path: &[PathSegment],
) -> Option<NodeId> {
    let (first, rest) = path.split_first()?;
    let root = tree.root();
    if tree.node(root).map(|node| node.segment()).as_ref() != Some(first) {
        log::warn!("path root `{first}` does not match the trace");
        return None;
    }

    let mut current = root;
    for segment in rest {
        if tree.needs_zoom_in(current) {
            if let Err(err) = tree.zoom_in(current).await {
                log::warn!("could not resolve `{segment}`: {err}");
                return None;
            }
        }
        match find_below(tree, current, segment) {
            Some(found) => current = found,
            None => {
                log::warn!("no node `{segment}` below {current}");
                return None;
            }
        }
    }
    Some(current)
}

fn find_below<T: TraceSource>(tree: &T, parent: NodeId, segment: &PathSegment) -> Option<NodeId> {
    let mut queue: VecDeque<NodeId> = tree.children(parent).iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        let node = tree.node(id)?;
        if node.kind == segment.kind && node.id == segment.id {
            return Some(id);
        }
        queue.extend(node.children.iter().copied());
    }
    None
}

impl ViewManager {
    /// Reveals the node at `path`, centres its row and brings its
    /// indentation into view. Resolves to `None` when the path does not
    /// resolve.
    pub async fn scroll_to_path<T: TraceSource>(
        &mut self,
        tree: &mut T,
        path: &[PathSegment],
        now: Instant,
    ) -> Result<Option<NodeId>, ViewError> {
        let Some(node) = find_in_tree_by_path(tree, path).await else {
            return Ok(None);
        };
        tree.reveal(node)?;

        let rows = tree.rows();
        let index = rows
            .iter()
            .position(|&row| row == node)
            .ok_or(ViewError::RowNotFound(node))?;
        let depth = tree.node(node).map_or(0, |node| node.depth);

        self.scroll_to_row(index, rows.len(), ScrollAnchor::Center, now);
        self.scroll_row_into_view_horizontally(depth, Duration::ZERO, now);
        Ok(Some(node))
    }

    pub async fn scroll_to_event_id<T: TraceSource>(
        &mut self,
        tree: &mut T,
        event_id: &str,
        now: Instant,
    ) -> Result<Option<NodeId>, ViewError> {
        let Some(node) = tree.find_by_event_id(event_id) else {
            log::warn!("no node with event id `{event_id}`");
            return Ok(None);
        };
        let path = tree.path_to(node);
        self.scroll_to_path(tree, &path, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::find_in_tree_by_path;
    use crate::config::ViewConfig;
    use crate::error::TreeError;
    use crate::manager::{ResizeEntry, ViewManager};
    use crate::tree::{NodeId, NodeKind, NodeSpec, TraceNode, TraceSource, TraceTree, parse_path};
    use std::cell::Cell;
    use std::time::Instant;

    fn sample() -> TraceTree {
        let filler = (0..40)
            .map(|index| {
                NodeSpec::new(NodeKind::Span, format!("f{index}"), "filler", 0.0, 1.0)
            })
            .collect();
        TraceTree::new(
            NodeSpec::new(NodeKind::Trace, "root", "trace", 0.0, 100.0).with_children(vec![
                NodeSpec::new(NodeKind::Transaction, "other", "other", 0.0, 10.0).with_children(
                    vec![NodeSpec::new(NodeKind::Span, "def", "decoy", 0.0, 1.0)],
                ),
                NodeSpec::new(NodeKind::Transaction, "abc", "GET /", 0.0, 60.0)
                    .with_children(filler)
                    .with_deferred(vec![NodeSpec::new(NodeKind::Span, "def", "db", 10.0, 20.0)]),
            ]),
        )
    }

    /// Counts node lookups so tests can tell which subtrees were scanned.
    struct Counting {
        tree: TraceTree,
        visited: Cell<usize>,
        fail_zoom_in: bool,
    }

    impl TraceSource for Counting {
        fn root(&self) -> NodeId {
            self.tree.root()
        }

        fn rows(&self) -> &[NodeId] {
            self.tree.rows()
        }

        fn node(&self, id: NodeId) -> Option<&TraceNode> {
            self.visited.set(self.visited.get() + 1);
            self.tree.node(id)
        }

        fn revision(&self) -> u64 {
            self.tree.revision()
        }

        fn needs_zoom_in(&self, id: NodeId) -> bool {
            self.tree.needs_zoom_in(id)
        }

        async fn zoom_in(&mut self, id: NodeId) -> Result<(), TreeError> {
            if self.fail_zoom_in {
                return Err(TreeError::ZoomIn {
                    segment: id.to_string(),
                    reason: "offline".to_string(),
                });
            }
            self.tree.zoom_in(id).await
        }

        fn reveal(&mut self, id: NodeId) -> Result<(), TreeError> {
            self.tree.reveal(id)
        }

        fn toggle_expanded(&mut self, id: NodeId) -> Result<bool, TreeError> {
            self.tree.toggle_expanded(id)
        }
    }

    #[test]
    fn resolves_inside_the_matched_subtree_after_zoom_in() {
        let mut tree = sample();
        let path = parse_path(&["trace:root", "txn:abc", "span:def"]).unwrap();
        let found = pollster::block_on(find_in_tree_by_path(&mut tree, &path)).unwrap();
        let node = tree.node(found).unwrap();
        assert_eq!(node.label, "db");
        assert_eq!(tree.zoom_ins(), 1);
    }

    #[test]
    fn passed_subtrees_are_not_scanned_again() {
        let mut tree = Counting {
            tree: sample(),
            visited: Cell::new(0),
            fail_zoom_in: false,
        };
        let path = parse_path(&["trace:root", "txn:other", "span:def"]).unwrap();
        let found = pollster::block_on(find_in_tree_by_path(&mut tree, &path)).unwrap();
        assert_eq!(tree.tree.node(found).unwrap().label, "decoy");
        // Root, one transaction and the decoy. The 40 fillers are never read.
        assert!(tree.visited.get() < 10, "visited {}", tree.visited.get());
    }

    #[test]
    fn misses_resolve_to_none() {
        let mut tree = sample();
        for path in [
            vec!["trace:elsewhere", "txn:abc"],
            vec!["trace:root", "txn:missing"],
            vec!["trace:root", "txn:abc", "span:nothing"],
        ] {
            let path = parse_path(&path).unwrap();
            assert!(pollster::block_on(find_in_tree_by_path(&mut tree, &path)).is_none());
        }
        assert!(pollster::block_on(find_in_tree_by_path(&mut tree, &[])).is_none());
    }

    #[test]
    fn failed_zoom_in_is_a_soft_miss() {
        let mut tree = Counting {
            tree: sample(),
            visited: Cell::new(0),
            fail_zoom_in: true,
        };
        let path = parse_path(&["trace:root", "txn:abc", "span:def"]).unwrap();
        assert!(pollster::block_on(find_in_tree_by_path(&mut tree, &path)).is_none());

        let mut manager = ViewManager::new(ViewConfig::default());
        let result = pollster::block_on(manager.scroll_to_path(&mut tree, &path, Instant::now()));
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn scroll_to_event_id_reveals_and_centres_the_row() {
        let mut tree = sample();
        let mut manager = ViewManager::new(ViewConfig::default());
        manager.initialize_trace_space(0.0, 100.0, 1.0);
        manager
            .on_resize(&[ResizeEntry {
                width: 1_000.0,
                height: 240.0,
            }])
            .unwrap();
        let other = tree.find_by_event_id("other").unwrap();
        tree.toggle_expanded(other).unwrap();

        let filler = pollster::block_on(manager.scroll_to_event_id(&mut tree, "f30", Instant::now()))
            .unwrap()
            .unwrap();
        let index = tree.rows().iter().position(|&row| row == filler).unwrap();
        let expected = index as f64 * 24.0 - (240.0 - 24.0) / 2.0;
        assert_eq!(manager.list().scroll_top(), expected);
        assert_eq!(manager.columns().list.translate[0], 0.0);

        let missing =
            pollster::block_on(manager.scroll_to_event_id(&mut tree, "nope", Instant::now()));
        assert!(matches!(missing, Ok(None)));
    }
}
