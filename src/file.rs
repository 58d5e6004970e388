use crate::data::{LoadedTrace, TraceMeta};
use iced::Size;
use std::path::PathBuf;
use std::time::Instant;
use traceview::manager::ResizeEntry;
use traceview::surface::{ElementRef, Mount, RetainedSurface};
use traceview::{NodeId, TraceSource, TraceTree, ViewConfig, ViewManager};

/// An open trace: the tree, its view and the elements the view draws into.
pub struct TraceSession {
    pub tree: TraceTree,
    pub manager: ViewManager,
    pub surface: RetainedSurface,
    pub meta: TraceMeta,
    pub selected: Option<NodeId>,
    pub search: String,
    selection_markers: Option<[ElementRef; 2]>,
    size: Option<Size>,
}

impl TraceSession {
    pub fn new(loaded: LoadedTrace, config: ViewConfig) -> Self {
        let LoadedTrace { tree, meta } = loaded;
        let mut manager = ViewManager::new(config);
        let mut surface = RetainedSurface::new();
        let (start, end) = tree.bounds();
        manager.initialize_trace_space(start, end - start, 1.0);
        manager.mount(&mut surface);
        Self {
            tree,
            manager,
            surface,
            meta,
            selected: None,
            search: String::new(),
            selection_markers: None,
            size: None,
        }
    }

    /// Resizes the view unless it already has `size`.
    pub fn fit(&mut self, size: Size) {
        if self.size == Some(size) {
            return;
        }
        let entry = ResizeEntry {
            width: f64::from(size.width),
            height: f64::from(size.height),
        };
        match self.manager.on_resize(&[entry]) {
            Ok(()) => self.size = Some(size),
            Err(err) => log::error!("resize failed: {err}"),
        }
    }

    /// Runs one animation frame. Returns whether another one is wanted.
    pub fn frame(&mut self, now: Instant) -> bool {
        self.manager
            .on_animation_frame(now, &self.tree, &mut self.surface)
    }

    /// Selects `node` and marks its start and end on the timeline.
    pub fn select(&mut self, node: Option<NodeId>) {
        self.selected = node;
        let Some(space) = node.and_then(|node| self.tree.node(node)).map(|node| node.space())
        else {
            if let Some(markers) = self.selection_markers.take() {
                self.manager.register_interval_indicator(0, None);
                self.manager.register_interval_indicator(1, None);
                for marker in markers {
                    self.surface.unmount(marker);
                }
            }
            self.manager.request_draw();
            return;
        };
        let markers = *self
            .selection_markers
            .get_or_insert_with(|| [self.surface.mount(0.0), self.surface.mount(0.0)]);
        self.manager
            .register_interval_indicator(0, Some((markers[0], space[0])));
        self.manager
            .register_interval_indicator(1, Some((markers[1], space[0] + space[1])));
        self.manager.request_draw();
    }

    pub fn close(&mut self) {
        self.select(None);
        self.manager.teardown(&mut self.surface);
    }
}

pub enum FileLoadState {
    Loading,
    Ready(Box<TraceSession>),
    Error(String),
}

pub struct FileTab {
    pub id: u64,
    pub path: PathBuf,
    pub load_state: FileLoadState,
}

impl FileTab {
    pub fn title(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn session(&self) -> Option<&TraceSession> {
        match &self.load_state {
            FileLoadState::Ready(session) => Some(session.as_ref()),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut TraceSession> {
        match &mut self.load_state {
            FileLoadState::Ready(session) => Some(session.as_mut()),
            _ => None,
        }
    }
}
