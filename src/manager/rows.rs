use super::{ListRow, SpanText, ViewManager};
use crate::error::{TreeError, ViewError};
use crate::surface::{ElementRef, Mount};
use crate::tree::TraceSource;
use crate::virtualized::max_visible_rows;

/// The surface elements making up one mounted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowElements {
    pub list: ElementRef,
    pub span_cell: ElementRef,
    pub bar: ElementRef,
    pub invisible_bar: ElementRef,
    pub text: ElementRef,
    pub arrow: ElementRef,
}

impl RowElements {
    fn mount(surface: &mut impl Mount, list_width: f64) -> Self {
        Self {
            list: surface.mount(list_width),
            span_cell: surface.mount(0.0),
            bar: surface.mount(0.0),
            invisible_bar: surface.mount(0.0),
            text: surface.mount(0.0),
            arrow: surface.mount(0.0),
        }
    }

    fn unmount(self, surface: &mut impl Mount) {
        for element in self.elements() {
            surface.unmount(element);
        }
    }

    pub fn elements(&self) -> [ElementRef; 6] {
        [
            self.list,
            self.span_cell,
            self.bar,
            self.invisible_bar,
            self.text,
            self.arrow,
        ]
    }
}

impl ViewManager {
    /// Creates the elements that live for the whole view: the divider and one
    /// label per timeline tick slot.
    pub fn mount(&mut self, surface: &mut impl Mount) {
        if self.divider.is_none() {
            self.register_divider(Some(surface.mount(0.0)));
        }
        for index in 0..self.intervals.len() {
            if self.timeline_indicators.get(index).is_none() {
                self.register_timeline_indicator(index, Some(surface.mount(0.0)));
            }
        }
        self.request_draw();
    }

    /// Mounts the rows in the visible window and unmounts everything that
    /// left it. Slot `i` of every arena holds the `i`-th row on screen.
    pub fn sync_rows<T: TraceSource>(
        &mut self,
        tree: &T,
        surface: &mut impl Mount,
    ) -> Result<(), ViewError> {
        let evicted = self.list.set_items(tree.rows().len(), tree.revision());
        self.retired.extend(evicted);
        let evicted = self.list.set_renderer_revision(self.renderer_revision);
        self.retired.extend(evicted);
        self.synced_revision = Some(tree.revision());
        self.rows_dirty = false;

        let rows = self.list.visible_rows(tree.rows());
        let range = self.list.range();
        let stale = self.list.retain(range);
        self.retired.extend(stale);
        for elements in self.retired.drain(..) {
            elements.unmount(surface);
        }

        let capacity = max_visible_rows(
            self.list.viewport_height(),
            self.config.overscroll_px(),
            self.config.row_height,
        )
        .max(rows.len());
        self.set_row_capacity(capacity);

        for (slot, row) in rows.iter().enumerate() {
            let node = tree
                .node(row.item)
                .ok_or(TreeError::UnknownNode(row.item))?;
            let indent = f64::from(node.depth) * self.config.row_depth_padding;
            let list_width =
                indent + self.text_measurer.measure(&node.label) + 2.0 * self.config.text_padding;
            let elements = *self
                .list
                .render(row, |_| RowElements::mount(surface, list_width));

            for element in [elements.list, elements.span_cell] {
                if let Some(style) = surface.style_mut(element) {
                    style.translate_y = row.style.top;
                }
            }
            if let Some(style) = surface.style_mut(elements.list) {
                style.text = Some(node.label.clone());
            }

            let space = node.space();
            self.register_list_row(
                slot,
                Some((
                    elements.list,
                    ListRow {
                        index: row.index,
                        node: row.item,
                        depth: node.depth,
                    },
                )),
            );
            self.register_span_cell(slot, Some((elements.span_cell, row.item)));
            self.register_span_bar(slot, Some((elements.bar, space)));
            self.register_invisible_bar(slot, Some((elements.invisible_bar, space)));
            self.register_span_text(
                slot,
                Some((
                    elements.text,
                    SpanText {
                        text: node.label.clone(),
                        space,
                    },
                )),
            );
            self.register_arrow(slot, Some((elements.arrow, space)));
        }
        for slot in rows.len()..capacity {
            self.unregister_row(slot);
        }

        self.request_draw();
        Ok(())
    }

    fn set_row_capacity(&mut self, capacity: usize) {
        let _ = self.columns.list.refs.set_capacity(capacity);
        let _ = self.columns.span_list.refs.set_capacity(capacity);
        let _ = self.span_bars.set_capacity(capacity);
        let _ = self.invisible_bars.set_capacity(capacity);
        let _ = self.span_text.set_capacity(capacity);
        let _ = self.arrows.set_capacity(capacity);
    }

    fn unregister_row(&mut self, slot: usize) {
        self.register_list_row(slot, None);
        self.register_span_cell(slot, None);
        self.register_span_bar(slot, None);
        self.register_invisible_bar(slot, None);
        self.register_span_text(slot, None);
        self.register_arrow(slot, None);
    }

    /// The rows currently holding elements, in on-screen order.
    pub fn mounted_rows(&self) -> impl Iterator<Item = (usize, &ListRow)> {
        self.columns
            .list
            .refs
            .iter()
            .map(|(index, slot)| (index, &slot.data))
    }

    /// Releases every element this view created and stops all animations.
    pub fn teardown(&mut self, surface: &mut impl Mount) {
        self.zoom.cancel();
        self.list_scroll.cancel();
        self.wheel_end.cancel();
        self.out_of_bounds.cancel();
        self.divider_drag = None;

        let evicted = self.list.flush();
        for elements in self.retired.drain(..).chain(evicted) {
            elements.unmount(surface);
        }
        self.set_row_capacity(0);
        for slot in self.timeline_indicators.clear() {
            surface.unmount(slot.element);
        }
        for slot in self.interval_indicators.clear() {
            surface.unmount(slot.element);
        }
        if let Some(divider) = self.divider.take() {
            surface.unmount(divider);
        }
        self.synced_revision = None;
        self.rows_dirty = true;
        self.draw_requested = false;
    }
}
