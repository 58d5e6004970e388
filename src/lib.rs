//! Virtualized trace view engine: coordinate spaces, gesture handling, row
//! windowing and the draw pass for a two-column span timeline.

pub mod animation;
pub mod arena;
pub mod config;
pub mod error;
pub mod intervals;
pub mod manager;
pub mod measure;
pub mod space;
pub mod surface;
pub mod tree;
pub mod virtualized;

pub use config::ViewConfig;
pub use error::{ConfigError, TreeError, ViewError};
pub use manager::ViewManager;
pub use space::{Mat3, View};
pub use tree::{NodeId, NodeKind, NodeSpec, PathSegment, TraceSource, TraceTree};
