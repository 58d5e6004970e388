//! The trace tree collaborator: nodes with timing intervals, a flattened row
//! order, and path segments of the form `<type>:<id>`.

use crate::error::TreeError;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Trace,
    Transaction,
    Span,
    Autogroup,
    MissingInstrumentation,
    Error,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Trace,
        NodeKind::Transaction,
        NodeKind::Span,
        NodeKind::Autogroup,
        NodeKind::MissingInstrumentation,
        NodeKind::Error,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            NodeKind::Trace => "trace",
            NodeKind::Transaction => "txn",
            NodeKind::Span => "span",
            NodeKind::Autogroup => "ag",
            NodeKind::MissingInstrumentation => "ms",
            NodeKind::Error => "error",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub kind: NodeKind,
    pub id: String,
}

impl PathSegment {
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl FromStr for PathSegment {
    type Err = TreeError;

    fn from_str(segment: &str) -> Result<Self, Self::Err> {
        let invalid = || TreeError::InvalidSegment(segment.to_string());
        let (prefix, id) = segment.split_once(':').ok_or_else(invalid)?;
        let kind = NodeKind::from_prefix(prefix).ok_or_else(invalid)?;
        if id.is_empty() {
            return Err(invalid());
        }
        Ok(PathSegment::new(kind, id))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.id)
    }
}

pub fn parse_path<S: AsRef<str>>(segments: &[S]) -> Result<Vec<PathSegment>, TreeError> {
    segments.iter().map(|segment| segment.as_ref().parse()).collect()
}

#[derive(Debug, Clone)]
pub struct TraceNode {
    pub kind: NodeKind,
    pub id: String,
    pub label: String,
    /// Absolute start timestamp.
    pub start: f64,
    pub duration: f64,
    pub depth: u32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub expanded: bool,
}

impl TraceNode {
    pub fn segment(&self) -> PathSegment {
        PathSegment::new(self.kind, self.id.clone())
    }

    /// `[start, duration]` in absolute trace units.
    pub fn space(&self) -> [f64; 2] {
        [self.start, self.duration]
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// The data source the engine reads rows, depths and intervals from.
pub trait TraceSource {
    fn root(&self) -> NodeId;

    /// Visible nodes in display order.
    fn rows(&self) -> &[NodeId];

    fn node(&self, id: NodeId) -> Option<&TraceNode>;

    /// Changes whenever `rows` changes.
    fn revision(&self) -> u64;

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[][..], |node| node.children.as_slice())
    }

    /// Whether `id` has children that still have to be loaded.
    fn needs_zoom_in(&self, id: NodeId) -> bool;

    fn zoom_in(&mut self, id: NodeId) -> impl Future<Output = Result<(), TreeError>>;

    /// Expands every ancestor of `id` so it appears in `rows`.
    fn reveal(&mut self, id: NodeId) -> Result<(), TreeError>;

    /// Returns the new expanded state.
    fn toggle_expanded(&mut self, id: NodeId) -> Result<bool, TreeError>;

    fn path_to(&self, id: NodeId) -> Vec<PathSegment> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.node(id)) {
            path.push(node.segment());
            current = node.parent;
        }
        path.reverse();
        path
    }

    fn find_by_event_id(&self, event_id: &str) -> Option<NodeId> {
        let mut queue = VecDeque::from([self.root()]);
        while let Some(id) = queue.pop_front() {
            let node = self.node(id)?;
            if node.kind != NodeKind::Trace && node.id == event_id {
                return Some(id);
            }
            queue.extend(node.children.iter().copied());
        }
        None
    }
}

/// Builder input for [`TraceTree`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub id: String,
    pub label: String,
    pub start: f64,
    pub duration: f64,
    pub children: Vec<NodeSpec>,
    /// Children only attached by `zoom_in`.
    pub deferred: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(
        kind: NodeKind,
        id: impl Into<String>,
        label: impl Into<String>,
        start: f64,
        duration: f64,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            label: label.into(),
            start,
            duration,
            children: Vec::new(),
            deferred: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children = children;
        self
    }

    pub fn with_deferred(mut self, deferred: Vec<NodeSpec>) -> Self {
        self.deferred = deferred;
        self
    }
}

/// An in-memory trace tree.
#[derive(Debug, Clone)]
pub struct TraceTree {
    nodes: Vec<TraceNode>,
    deferred: HashMap<NodeId, Vec<NodeSpec>>,
    rows: Vec<NodeId>,
    revision: u64,
    zoom_ins: usize,
}

impl TraceTree {
    pub fn new(root: NodeSpec) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            deferred: HashMap::new(),
            rows: Vec::new(),
            revision: 0,
            zoom_ins: 0,
        };
        tree.insert(None, 0, root);
        tree.flatten();
        tree
    }

    fn insert(&mut self, parent: Option<NodeId>, depth: u32, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TraceNode {
            kind: spec.kind,
            id: spec.id,
            label: spec.label,
            start: spec.start,
            duration: spec.duration,
            depth,
            parent,
            children: Vec::new(),
            expanded: true,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0 as usize].children.push(id);
        }
        if !spec.deferred.is_empty() {
            self.deferred.insert(id, spec.deferred);
        }
        for child in spec.children {
            self.insert(Some(id), depth + 1, child);
        }
        id
    }

    fn flatten(&mut self) {
        self.rows.clear();
        let mut stack = vec![NodeId(0)];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0 as usize];
            self.rows.push(id);
            if node.expanded {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        self.revision += 1;
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut TraceNode, TreeError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Absolute `(start, end)` of the root node.
    pub fn bounds(&self) -> (f64, f64) {
        self.nodes
            .first()
            .map_or((0.0, 0.0), |root| (root.start, root.end()))
    }

    /// How many zoom-ins actually loaded children.
    pub fn zoom_ins(&self) -> usize {
        self.zoom_ins
    }
}

impl TraceSource for TraceTree {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn rows(&self) -> &[NodeId] {
        &self.rows
    }

    fn node(&self, id: NodeId) -> Option<&TraceNode> {
        self.nodes.get(id.0 as usize)
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn needs_zoom_in(&self, id: NodeId) -> bool {
        self.deferred.contains_key(&id)
    }

    async fn zoom_in(&mut self, id: NodeId) -> Result<(), TreeError> {
        let depth = self.node_mut(id)?.depth;
        let Some(children) = self.deferred.remove(&id) else {
            return Ok(());
        };
        log::debug!("attaching {} deferred children to {id}", children.len());
        for child in children {
            self.insert(Some(id), depth + 1, child);
        }
        self.node_mut(id)?.expanded = true;
        self.zoom_ins += 1;
        self.flatten();
        Ok(())
    }

    fn reveal(&mut self, id: NodeId) -> Result<(), TreeError> {
        let mut current = self.node_mut(id)?.parent;
        let mut changed = false;
        while let Some(parent) = current {
            let node = self.node_mut(parent)?;
            changed |= !node.expanded;
            node.expanded = true;
            current = node.parent;
        }
        if changed {
            self.flatten();
        }
        Ok(())
    }

    fn toggle_expanded(&mut self, id: NodeId) -> Result<bool, TreeError> {
        let node = self.node_mut(id)?;
        node.expanded = !node.expanded;
        let expanded = node.expanded;
        self.flatten();
        Ok(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TraceTree {
        TraceTree::new(
            NodeSpec::new(NodeKind::Trace, "root", "trace", 0.0, 100.0).with_children(vec![
                NodeSpec::new(NodeKind::Transaction, "abc", "GET /", 0.0, 60.0).with_children(
                    vec![NodeSpec::new(NodeKind::Span, "s1", "db", 10.0, 20.0)],
                ),
                NodeSpec::new(NodeKind::Transaction, "xyz", "POST /", 50.0, 50.0)
                    .with_deferred(vec![NodeSpec::new(NodeKind::Span, "s2", "http", 55.0, 5.0)]),
            ]),
        )
    }

    #[test]
    fn parses_and_prints_segments() {
        let segment: PathSegment = "txn:abc".parse().unwrap();
        assert_eq!(segment, PathSegment::new(NodeKind::Transaction, "abc"));
        assert_eq!(segment.to_string(), "txn:abc");
        assert!("nope:abc".parse::<PathSegment>().is_err());
        assert!("span:".parse::<PathSegment>().is_err());
        assert!("span".parse::<PathSegment>().is_err());
        assert_eq!(
            "ms:1".parse::<PathSegment>().unwrap().kind,
            NodeKind::MissingInstrumentation
        );
    }

    #[test]
    fn flattens_in_display_order() {
        let tree = sample();
        let ids: Vec<&str> = tree
            .rows()
            .iter()
            .map(|&id| tree.node(id).unwrap().id.as_str())
            .collect();
        assert_eq!(ids, vec!["root", "abc", "s1", "xyz"]);
        assert_eq!(tree.bounds(), (0.0, 100.0));
    }

    #[test]
    fn collapse_hides_descendants() {
        let mut tree = sample();
        let abc = tree.find_by_event_id("abc").unwrap();
        let revision = tree.revision();
        assert!(!tree.toggle_expanded(abc).unwrap());
        assert_eq!(tree.rows().len(), 3);
        assert!(tree.revision() > revision);

        let s1 = tree.find_by_event_id("s1").unwrap();
        tree.reveal(s1).unwrap();
        assert!(tree.rows().contains(&s1));
    }

    #[test]
    fn zoom_in_attaches_deferred_children_once() {
        let mut tree = sample();
        let xyz = tree.find_by_event_id("xyz").unwrap();
        assert!(tree.needs_zoom_in(xyz));
        assert!(tree.find_by_event_id("s2").is_none());

        pollster::block_on(tree.zoom_in(xyz)).unwrap();
        pollster::block_on(tree.zoom_in(xyz)).unwrap();
        assert!(!tree.needs_zoom_in(xyz));
        assert_eq!(tree.zoom_ins(), 1);

        let s2 = tree.find_by_event_id("s2").unwrap();
        assert_eq!(tree.node(s2).unwrap().depth, 2);
        assert_eq!(
            tree.path_to(s2),
            parse_path(&["trace:root", "txn:xyz", "span:s2"]).unwrap()
        );
    }
}
