//! The view manager owns every coordinate space of one trace view, the
//! gesture state mutating them, and the per-row element arenas the draw pass
//! writes through.

mod divider;
mod draw;
mod navigation;
mod rows;
mod scroll;

pub use draw::{TextPlacement, TextSide};
pub use navigation::find_in_tree_by_path;
pub use rows::RowElements;

use crate::animation::{Debounce, Step, Tween};
use crate::arena::{Slot, SlotArena};
use crate::config::ViewConfig;
use crate::error::ViewError;
use crate::intervals::{compute_timeline_intervals, target_interval};
use crate::measure::{RowMeasurer, TextMeasurer};
use crate::space::{Mat3, View};
use crate::surface::{ElementRef, Mount};
use crate::tree::{NodeId, TraceSource};
use crate::virtualized::VirtualizedList;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeEntry {
    pub width: f64,
    pub height: f64,
}

/// Requested trace view bounds. Missing fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraceViewUpdate {
    pub x: Option<f64>,
    pub width: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelEvent {
    pub delta_x: f64,
    pub delta_y: f64,
    /// Cursor x relative to the span column, in px.
    pub cursor_x: f64,
    /// Whether the zoom modifier is held.
    pub zoom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    List,
    SpanList,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnWidths {
    pub list: f64,
    pub span_list: f64,
}

#[derive(Debug)]
pub struct Column<T> {
    pub kind: ColumnKind,
    /// Fraction of the container width.
    pub width: f64,
    pub translate: [f64; 2],
    pub refs: SlotArena<T>,
}

impl<T> Column<T> {
    fn new(kind: ColumnKind, width: f64) -> Self {
        Self {
            kind,
            width,
            translate: [0.0, 0.0],
            refs: SlotArena::default(),
        }
    }
}

#[derive(Debug)]
pub struct Columns {
    pub list: Column<ListRow>,
    pub span_list: Column<NodeId>,
}

impl Columns {
    pub fn widths(&self) -> ColumnWidths {
        ColumnWidths {
            list: self.list.width,
            span_list: self.span_list.width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRow {
    /// Absolute row index, the key of the row's cached render.
    pub index: usize,
    pub node: NodeId,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpanText {
    pub text: String,
    /// `[start, duration]` in absolute trace units.
    pub space: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowPosition {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub space: [f64; 2],
    pub visible: bool,
    pub position: Option<ArrowPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DividerDrag {
    start_x: f64,
    prev_x: f64,
    fully_zoomed_out: bool,
    live: ColumnWidths,
}

pub struct ViewManager {
    config: ViewConfig,
    to_origin: f64,
    trace_space: View,
    trace_view: View,
    trace_physical_space: View,
    container_physical_space: View,
    span_to_px: Mat3,

    columns: Columns,
    span_bars: SlotArena<[f64; 2]>,
    invisible_bars: SlotArena<[f64; 2]>,
    span_text: SlotArena<SpanText>,
    arrows: SlotArena<Arrow>,
    timeline_indicators: SlotArena<()>,
    interval_indicators: SlotArena<f64>,
    divider: Option<ElementRef>,

    intervals: Vec<Option<f64>>,
    interval: f64,

    divider_drag: Option<DividerDrag>,
    zoom: Tween<(f64, f64)>,
    list_scroll: Tween<f64>,
    wheel_end: Debounce,
    out_of_bounds: Debounce,
    pointer_events: bool,

    row_measurer: RowMeasurer,
    text_measurer: TextMeasurer,

    list: VirtualizedList<RowElements>,
    renderer_revision: u64,
    retired: Vec<RowElements>,
    synced_revision: Option<u64>,
    rows_dirty: bool,
    draw_requested: bool,
}

impl ViewManager {
    pub fn new(config: ViewConfig) -> Self {
        let min_width = config.min_column_width.clamp(0.0, 0.5);
        let list_width = config.list_width.clamp(min_width, 1.0 - min_width);
        Self {
            to_origin: 0.0,
            trace_space: View::EMPTY,
            trace_view: View::EMPTY,
            trace_physical_space: View::EMPTY,
            container_physical_space: View::EMPTY,
            span_to_px: Mat3::IDENTITY,

            columns: Columns {
                list: Column::new(ColumnKind::List, list_width),
                span_list: Column::new(ColumnKind::SpanList, 1.0 - list_width),
            },
            span_bars: SlotArena::default(),
            invisible_bars: SlotArena::default(),
            span_text: SlotArena::default(),
            arrows: SlotArena::default(),
            timeline_indicators: SlotArena::with_capacity(config.max_timeline_intervals),
            interval_indicators: SlotArena::default(),
            divider: None,

            intervals: vec![None; config.max_timeline_intervals],
            interval: 0.0,

            divider_drag: None,
            zoom: Tween::new(),
            list_scroll: Tween::new(),
            wheel_end: Debounce::new(config.wheel_end()),
            out_of_bounds: Debounce::new(config.scroll_end()),
            pointer_events: true,

            row_measurer: RowMeasurer::new(config.measure_capacity()),
            text_measurer: TextMeasurer::new(config.text_capacity(), config.char_width),

            list: VirtualizedList::new(&config),
            renderer_revision: 0,
            retired: Vec::new(),
            synced_revision: None,
            rows_dirty: true,
            draw_requested: false,
            config,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn to_origin(&self) -> f64 {
        self.to_origin
    }

    pub fn trace_space(&self) -> View {
        self.trace_space
    }

    pub fn trace_view(&self) -> View {
        self.trace_view
    }

    pub fn trace_physical_space(&self) -> View {
        self.trace_physical_space
    }

    pub fn container_physical_space(&self) -> View {
        self.container_physical_space
    }

    pub fn span_to_px(&self) -> Mat3 {
        self.span_to_px
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// The column split, including an in-progress divider drag.
    pub fn live_widths(&self) -> ColumnWidths {
        self.divider_drag
            .map_or_else(|| self.columns.widths(), |drag| drag.live)
    }

    /// Tick positions relative to the trace origin. Unused slots are `None`.
    pub fn intervals(&self) -> &[Option<f64>] {
        &self.intervals
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Whether the span column should receive pointer input. Off while a
    /// wheel gesture is in progress.
    pub fn pointer_events(&self) -> bool {
        self.pointer_events && self.list.pointer_events()
    }

    pub fn list(&self) -> &VirtualizedList<RowElements> {
        &self.list
    }

    pub fn divider(&self) -> Option<ElementRef> {
        self.divider
    }

    pub fn timeline_indicators(&self) -> impl Iterator<Item = ElementRef> + '_ {
        self.timeline_indicators.iter().map(|(_, slot)| slot.element)
    }

    pub fn interval_indicators(&self) -> impl Iterator<Item = ElementRef> + '_ {
        self.interval_indicators.iter().map(|(_, slot)| slot.element)
    }

    pub fn max_row_width(&self) -> f64 {
        self.row_measurer.max()
    }

    pub fn is_fully_zoomed_out(&self) -> bool {
        self.trace_view.x <= 0.0 && self.trace_view.width >= self.trace_space.width
    }

    pub fn initialize_trace_space(&mut self, origin: f64, width: f64, height: f64) {
        self.to_origin = origin;
        self.trace_space = View::new(0.0, 0.0, width, height);
        self.trace_view = View::new(0.0, 0.0, width, height);
        self.zoom.cancel();
        self.recompute_timeline_intervals();
        self.recompute_span_to_px();
        self.request_draw();
    }

    pub fn initialize_physical_space(&mut self, width: f64, height: f64) {
        self.container_physical_space = View::new(0.0, 0.0, width, height);
        self.trace_physical_space =
            View::new(0.0, 0.0, width * self.columns.span_list.width, height);
        self.recompute_timeline_intervals();
        self.recompute_span_to_px();
    }

    pub fn on_resize(&mut self, entries: &[ResizeEntry]) -> Result<(), ViewError> {
        let entry = entries.last().ok_or(ViewError::MissingResizeEntry)?;
        self.initialize_physical_space(entry.width, entry.height);
        let evicted = self.list.set_viewport_height(entry.height);
        self.retire(evicted);
        self.request_draw();
        Ok(())
    }

    /// The only way `trace_view` changes. The result always lies inside
    /// `trace_space`, whatever was requested.
    pub fn set_trace_view(&mut self, update: TraceViewUpdate) {
        let space = self.trace_space.width.max(0.0);
        let requested_width = update
            .width
            .filter(|width| width.is_finite())
            .unwrap_or(self.trace_view.width);
        let requested_x = update
            .x
            .filter(|x| x.is_finite())
            .unwrap_or(self.trace_view.x);

        let width = requested_width.clamp(0.0, space);
        let x = requested_x.clamp(0.0, space - width);
        self.trace_view.x = x;
        self.trace_view.width = width.min(space - x);

        self.recompute_timeline_intervals();
        self.recompute_span_to_px();
        self.request_draw();
    }

    pub fn reset_zoom(&mut self) {
        self.zoom.cancel();
        self.set_trace_view(TraceViewUpdate {
            x: Some(0.0),
            width: Some(self.trace_space.width),
        });
    }

    /// The trace-space x under a cursor at `cursor_px` in the span column.
    pub fn config_space_cursor(&self, cursor_px: f64) -> f64 {
        if self.trace_physical_space.width <= 0.0 {
            return self.trace_view.x;
        }
        self.trace_view.x + cursor_px / self.trace_physical_space.width * self.trace_view.width
    }

    pub fn on_span_wheel(&mut self, event: WheelEvent, now: Instant) {
        self.pointer_events = false;
        self.wheel_end.arm(now);
        self.zoom.cancel();

        if event.zoom {
            let cursor = self.config_space_cursor(event.cursor_x);
            let scale = (1.0 - event.delta_y * self.config.zoom_speed * -1.0)
                .clamp(self.config.min_zoom_scale, self.config.max_zoom_scale);
            let zoom = Mat3::IDENTITY
                .translate(cursor, 0.0)
                .scale(scale, 1.0)
                .translate(-cursor, 0.0);
            let mut view = self.trace_view.transform(&zoom);

            let min_width = self.config.min_view_width.min(self.trace_space.width);
            if view.width < min_width && self.trace_view.width > 0.0 {
                let ratio = min_width / self.trace_view.width;
                view.x = cursor - (cursor - self.trace_view.x) * ratio;
                view.width = min_width;
            }
            self.set_trace_view(TraceViewUpdate {
                x: Some(view.x),
                width: Some(view.width),
            });
        } else if event.delta_x != 0.0 && self.trace_physical_space.width > 0.0 {
            let delta =
                event.delta_x / self.trace_physical_space.width * self.trace_view.width;
            self.set_trace_view(TraceViewUpdate {
                x: Some(self.trace_view.x + delta),
                width: None,
            });
        }
    }

    /// Animates the view to `[start, start + width]`, in absolute units.
    pub fn zoom_into_space(&mut self, start: f64, width: f64, now: Instant) {
        if width <= 0.0 {
            // Zooming into a zero-width interval is not supported.
            log::debug!("skipping zoom into zero-width interval at {start}");
            return;
        }
        let from = (self.trace_view.x, self.trace_view.width);
        let to = (start - self.to_origin, width);
        self.zoom.start(from, to, self.config.zoom_animation(), now);
        self.request_draw();
    }

    pub fn transform_x_from_timestamp(&self, timestamp: f64) -> f64 {
        self.span_to_px.apply(timestamp - self.to_origin, 0.0).0
    }

    /// Left edge and width of a span bar in px. The width is at least 1 px
    /// so very short spans stay visible.
    pub fn span_px_rect(&self, space: [f64; 2]) -> (f64, f64) {
        let x = self.transform_x_from_timestamp(space[0]);
        let width = (space[1] * self.span_to_px.scale_x()).max(1.0);
        (x, width)
    }

    fn recompute_span_to_px(&mut self) {
        if self.trace_view.width <= 0.0 || self.trace_view.height <= 0.0 {
            return;
        }
        self.span_to_px = self.trace_view.between(&self.trace_physical_space);
    }

    fn recompute_timeline_intervals(&mut self) {
        let target = target_interval(
            self.trace_view.width,
            self.trace_physical_space.width,
            self.config.tick_spacing_px,
            self.config.device_pixel_ratio,
        );
        self.interval = compute_timeline_intervals(&self.trace_view, target, &mut self.intervals);
    }

    pub fn register_divider(&mut self, element: Option<ElementRef>) {
        self.divider = element;
    }

    /// Registers a list cell. Its width is measured on a later frame unless
    /// the node was already measured.
    pub fn register_list_row(&mut self, index: usize, row: Option<(ElementRef, ListRow)>) {
        let slot = row.map(|(element, data)| {
            self.row_measurer.enqueue(data.node, element);
            Slot { element, data }
        });
        self.columns.list.refs.register(index, slot);
    }

    pub fn register_span_cell(&mut self, index: usize, cell: Option<(ElementRef, NodeId)>) {
        let slot = cell.map(|(element, data)| Slot { element, data });
        self.columns.span_list.refs.register(index, slot);
    }

    pub fn register_span_bar(&mut self, index: usize, bar: Option<(ElementRef, [f64; 2])>) {
        self.span_bars
            .register(index, bar.map(|(element, data)| Slot { element, data }));
    }

    pub fn register_invisible_bar(&mut self, index: usize, bar: Option<(ElementRef, [f64; 2])>) {
        self.invisible_bars
            .register(index, bar.map(|(element, data)| Slot { element, data }));
    }

    pub fn register_span_text(&mut self, index: usize, text: Option<(ElementRef, SpanText)>) {
        self.span_text
            .register(index, text.map(|(element, data)| Slot { element, data }));
    }

    pub fn register_arrow(&mut self, index: usize, arrow: Option<(ElementRef, [f64; 2])>) {
        let slot = arrow.map(|(element, space)| Slot {
            element,
            data: Arrow {
                space,
                visible: false,
                position: None,
            },
        });
        self.arrows.register(index, slot);
    }

    pub fn register_timeline_indicator(&mut self, index: usize, element: Option<ElementRef>) {
        self.timeline_indicators
            .register(index, element.map(|element| Slot { element, data: () }));
    }

    /// Registers a marker at an absolute timestamp, such as a selection edge.
    pub fn register_interval_indicator(&mut self, index: usize, indicator: Option<(ElementRef, f64)>) {
        if index >= self.interval_indicators.capacity() {
            let _ = self.interval_indicators.set_capacity(index + 1);
        }
        self.interval_indicators
            .register(index, indicator.map(|(element, data)| Slot { element, data }));
    }

    /// Changes the list indentation and label padding. Every mounted row is
    /// rendered again and every row width measured again.
    pub fn set_row_padding(&mut self, row_depth_padding: f64, text_padding: f64) {
        if row_depth_padding == self.config.row_depth_padding
            && text_padding == self.config.text_padding
        {
            return;
        }
        self.config.row_depth_padding = row_depth_padding.max(0.0);
        self.config.text_padding = text_padding.max(0.0);
        self.renderer_revision += 1;
        self.row_measurer.clear();
        self.rows_dirty = true;
        self.request_draw();
    }

    pub fn request_draw(&mut self) {
        self.draw_requested = true;
    }

    pub fn needs_frame(&self) -> bool {
        self.draw_requested
            || self.rows_dirty
            || self.zoom.is_active()
            || self.list_scroll.is_active()
            || self.wheel_end.is_pending()
            || self.out_of_bounds.is_pending()
            || self.list.needs_frame()
            || self.row_measurer.pending() > 0
    }

    /// Runs everything deferred to the next frame: animation steps, quiet
    /// period timers, row mounting, measurement and the draw pass. Returns
    /// whether another frame is wanted.
    pub fn on_animation_frame<T, S>(&mut self, now: Instant, tree: &T, surface: &mut S) -> bool
    where
        T: TraceSource,
        S: Mount,
    {
        self.step_zoom(now);
        self.step_list_scroll(now);
        if self.wheel_end.fire(now) {
            self.pointer_events = true;
        }
        if self.out_of_bounds.fire(now) {
            self.check_list_out_of_bounds(now);
        }

        let evicted = self.list.on_frame(now);
        self.retire(evicted);

        if self.rows_dirty || self.synced_revision != Some(tree.revision()) {
            if let Err(err) = self.sync_rows(tree, surface) {
                log::error!("failed to mount rows: {err}");
                self.rows_dirty = false;
            }
        }

        self.row_measurer
            .drain(surface, self.config.measure_budget_per_frame);

        if self.draw_requested {
            let widths = self.divider_drag.map(|drag| drag.live);
            self.draw(surface, widths);
        }
        self.needs_frame()
    }

    fn step_zoom(&mut self, now: Instant) {
        match self.zoom.step(now) {
            Some(Step::Frame((x, width)) | Step::Settled((x, width))) => {
                self.set_trace_view(TraceViewUpdate {
                    x: Some(x),
                    width: Some(width),
                });
            }
            None => {}
        }
    }

    fn retire(&mut self, evicted: Vec<RowElements>) {
        if !evicted.is_empty() {
            self.retired.extend(evicted);
            self.rows_dirty = true;
        }
    }
}
