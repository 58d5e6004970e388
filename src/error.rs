use crate::tree::NodeId;
use std::path::PathBuf;

/// Contract violations between the engine and its host. These are not
/// recoverable locally.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("resize notification arrived without an observed entry")]
    MissingResizeEntry,
    #[error("node {0} is not part of the flattened row list")]
    RowNotFound(NodeId),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("invalid path segment `{0}`, expected `<type>:<id>`")]
    InvalidSegment(String),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("failed to load children of `{segment}`: {reason}")]
    ZoomIn { segment: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
