use super::{ColumnWidths, DividerDrag, TraceViewUpdate, ViewManager};

impl ViewManager {
    pub fn is_dragging_divider(&self) -> bool {
        self.divider_drag.is_some()
    }

    /// Starts a divider drag at container x `x`.
    pub fn on_divider_mouse_down(&mut self, x: f64) {
        self.divider_drag = Some(DividerDrag {
            start_x: x,
            prev_x: x,
            fully_zoomed_out: self.is_fully_zoomed_out(),
            live: self.columns.widths(),
        });
    }

    /// Resizes the span column live and returns the split to draw with.
    pub fn on_divider_mouse_move(&mut self, x: f64) -> Option<ColumnWidths> {
        let mut drag = self.divider_drag?;
        let widths = self.dragged_widths(x - drag.start_x);
        self.trace_physical_space.width = widths.span_list * self.container_physical_space.width;

        if drag.fully_zoomed_out {
            self.set_trace_view(TraceViewUpdate {
                x: Some(0.0),
                width: Some(self.trace_space.width),
            });
        } else if self.trace_physical_space.width > 0.0 {
            let delta =
                (drag.prev_x - x) / self.trace_physical_space.width * self.trace_view.width;
            self.set_trace_view(TraceViewUpdate {
                x: Some(self.trace_view.x + delta),
                width: None,
            });
        }

        drag.prev_x = x;
        drag.live = widths;
        self.divider_drag = Some(drag);
        Some(widths)
    }

    /// Commits the new column split.
    pub fn on_divider_mouse_up(&mut self, x: f64) -> Option<ColumnWidths> {
        let drag = self.divider_drag.take()?;
        let widths = self.dragged_widths(x - drag.start_x);
        self.columns.list.width = widths.list;
        self.columns.span_list.width = widths.span_list;
        log::debug!(
            "column split is now {:.3}/{:.3}",
            widths.list,
            widths.span_list
        );

        let container = self.container_physical_space;
        self.initialize_physical_space(container.width, container.height);
        self.request_draw();
        Some(widths)
    }

    /// The committed split moved by `delta_px`, keeping both columns at least
    /// `min_column_width` wide.
    fn dragged_widths(&self, delta_px: f64) -> ColumnWidths {
        let container = self.container_physical_space.width;
        if container <= 0.0 {
            return self.columns.widths();
        }
        let min = self.config.min_column_width;
        let list = self.columns.list.width;
        let span_list = self.columns.span_list.width;
        let delta = (delta_px / container).clamp(
            (min - list).min(0.0),
            (span_list - min).max(0.0),
        );
        ColumnWidths {
            list: list + delta,
            span_list: span_list - delta,
        }
    }
}
