//! Windowing over the flattened row list. Only rows intersecting the
//! viewport, widened by the overscroll margin, are ever produced.

use crate::animation::Debounce;
use crate::config::ViewConfig;
use crate::tree::NodeId;
use std::collections::HashMap;
use std::ops::Range;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowStyle {
    /// Absolute offset from the top of the list, in px.
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualizedRow {
    pub index: usize,
    pub item: NodeId,
    pub key: u64,
    pub style: RowStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAnchor {
    Top,
    Center,
}

pub fn compute_viewport(
    scroll_top: f64,
    viewport_height: f64,
    overscroll_px: f64,
    row_height: f64,
    count: usize,
) -> Viewport {
    Viewport {
        top: (scroll_top - overscroll_px).max(0.0),
        bottom: (scroll_top + viewport_height + overscroll_px).min(count as f64 * row_height),
    }
}

/// Upper bound on rows intersecting the widened viewport. The extra slot
/// covers a partially visible row at each edge.
pub fn max_visible_rows(viewport_height: f64, overscroll_px: f64, row_height: f64) -> usize {
    if row_height <= 0.0 {
        return 0;
    }
    ((viewport_height + 2.0 * overscroll_px) / row_height).ceil().max(0.0) as usize + 1
}

/// The contiguous index range of rows to render.
pub fn visible_range(
    scroll_top: f64,
    viewport_height: f64,
    overscroll: usize,
    row_height: f64,
    count: usize,
) -> Range<usize> {
    if count == 0 || row_height <= 0.0 {
        return 0..0;
    }
    let overscroll_px = overscroll as f64 * row_height;
    let viewport = compute_viewport(scroll_top, viewport_height, overscroll_px, row_height, count);
    let budget = max_visible_rows(viewport_height, overscroll_px, row_height);

    let seed = ((scroll_top.max(0.0) / row_height).floor() as usize).saturating_sub(overscroll);
    let mut start = None;
    let mut end = seed;
    let mut index = seed;
    while index < count && end - start.unwrap_or(end) < budget {
        let top = index as f64 * row_height;
        if top >= viewport.bottom {
            break;
        }
        if top + row_height > viewport.top {
            start.get_or_insert(index);
            end = index + 1;
        }
        index += 1;
    }
    match start {
        Some(start) => start..end,
        None => 0..0,
    }
}

/// Scroll state plus the style and render caches for one list.
///
/// Renders are keyed by absolute index. Whenever entries are dropped they
/// are handed back to the caller, which owns whatever resources they hold.
pub struct VirtualizedList<R> {
    row_height: f64,
    overscroll: usize,
    scroll_top: f64,
    viewport_height: f64,
    count: usize,
    items_revision: u64,
    renderer_revision: u64,
    styles: HashMap<usize, RowStyle>,
    renders: HashMap<usize, R>,
    pointer_events: bool,
    settle: Debounce,
}

impl<R> VirtualizedList<R> {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            row_height: config.row_height,
            overscroll: config.overscroll,
            scroll_top: 0.0,
            viewport_height: 0.0,
            count: 0,
            items_revision: 0,
            renderer_revision: 0,
            styles: HashMap::new(),
            renders: HashMap::new(),
            pointer_events: true,
            settle: Debounce::new(config.pointer_events_restore()),
        }
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn content_height(&self) -> f64 {
        self.count as f64 * self.row_height
    }

    pub fn max_scroll_top(&self) -> f64 {
        (self.content_height() - self.viewport_height).max(0.0)
    }

    /// Whether rows should receive pointer input. Off while scrolling.
    pub fn pointer_events(&self) -> bool {
        self.pointer_events
    }

    pub fn needs_frame(&self) -> bool {
        self.settle.is_pending()
    }

    /// Updates the item list. A new revision invalidates every render.
    pub fn set_items(&mut self, count: usize, revision: u64) -> Vec<R> {
        self.count = count;
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
        if revision == self.items_revision {
            return Vec::new();
        }
        self.items_revision = revision;
        self.flush()
    }

    /// A new revision means the render function changed. Every render is
    /// handed back.
    pub fn set_renderer_revision(&mut self, revision: u64) -> Vec<R> {
        if revision == self.renderer_revision {
            return Vec::new();
        }
        self.renderer_revision = revision;
        self.flush()
    }

    pub fn set_viewport_height(&mut self, height: f64) -> Vec<R> {
        self.viewport_height = height.max(0.0);
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
        self.flush()
    }

    pub fn set_scroll_top(&mut self, scroll_top: f64, now: Instant) {
        self.scroll_top = scroll_top.clamp(0.0, self.max_scroll_top());
        self.pointer_events = false;
        self.settle.arm(now);
    }

    pub fn scroll_to_row(&mut self, index: usize, count: usize, anchor: ScrollAnchor, now: Instant) {
        self.count = count;
        let top = index.min(count.saturating_sub(1)) as f64 * self.row_height;
        let scroll_top = match anchor {
            ScrollAnchor::Top => top,
            ScrollAnchor::Center => top - (self.viewport_height - self.row_height) / 2.0,
        };
        self.set_scroll_top(scroll_top, now);
    }

    /// Restores pointer events and flushes the caches once scrolling has
    /// settled.
    pub fn on_frame(&mut self, now: Instant) -> Vec<R> {
        if !self.settle.fire(now) {
            return Vec::new();
        }
        self.pointer_events = true;
        self.flush()
    }

    pub fn range(&self) -> Range<usize> {
        visible_range(
            self.scroll_top,
            self.viewport_height,
            self.overscroll,
            self.row_height,
            self.count,
        )
    }

    pub fn visible_rows(&mut self, items: &[NodeId]) -> Vec<VirtualizedRow> {
        let range = self.range();
        let row_height = self.row_height;
        let mut rows = Vec::with_capacity(range.len());
        for index in range {
            let Some(&item) = items.get(index) else {
                break;
            };
            let style = *self.styles.entry(index).or_insert_with(|| RowStyle {
                top: index as f64 * row_height,
                height: row_height,
            });
            rows.push(VirtualizedRow {
                index,
                item,
                key: u64::from(item.0),
                style,
            });
        }
        rows
    }

    /// Returns the cached render for `row`, producing it on a miss.
    pub fn render(&mut self, row: &VirtualizedRow, render: impl FnOnce(&VirtualizedRow) -> R) -> &R {
        self.renders.entry(row.index).or_insert_with(|| render(row))
    }

    pub fn cached(&self, index: usize) -> Option<&R> {
        self.renders.get(&index)
    }

    pub fn cached_renders(&self) -> usize {
        self.renders.len()
    }

    /// Drops renders for indices outside `range`.
    pub fn retain(&mut self, range: Range<usize>) -> Vec<R> {
        let stale: Vec<usize> = self
            .renders
            .keys()
            .copied()
            .filter(|index| !range.contains(index))
            .collect();
        self.styles.retain(|index, _| range.contains(index));
        stale
            .into_iter()
            .filter_map(|index| self.renders.remove(&index))
            .collect()
    }

    pub fn flush(&mut self) -> Vec<R> {
        self.styles.clear();
        self.renders.drain().map(|(_, render)| render).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn ten_thousand_rows_example() {
        let range = visible_range(2400.0, 480.0, 10, 24.0, 10_000);
        assert_eq!(range, 90..130);
        assert!(range.len() <= max_visible_rows(480.0, 240.0, 24.0));
    }

    #[test]
    fn viewport_is_clamped_to_content() {
        let viewport = compute_viewport(0.0, 480.0, 240.0, 24.0, 10);
        assert_eq!(viewport, Viewport { top: 0.0, bottom: 240.0 });
        assert_eq!(visible_range(0.0, 480.0, 10, 24.0, 10), 0..10);
        assert_eq!(visible_range(0.0, 480.0, 10, 24.0, 0), 0..0);
    }

    #[test]
    fn rendered_rows_are_exactly_the_intersecting_band() {
        let (row_height, viewport_height, overscroll, count) = (24.0, 480.0, 3usize, 500usize);
        let overscroll_px = overscroll as f64 * row_height;
        let budget = max_visible_rows(viewport_height, overscroll_px, row_height);
        let mut scroll_top = 0.0;
        while scroll_top <= count as f64 * row_height {
            let range = visible_range(scroll_top, viewport_height, overscroll, row_height, count);
            let viewport =
                compute_viewport(scroll_top, viewport_height, overscroll_px, row_height, count);
            let expected: Vec<usize> = (0..count)
                .filter(|&index| {
                    let top = index as f64 * row_height;
                    top < viewport.bottom && top + row_height > viewport.top
                })
                .collect();
            assert_eq!(range.clone().collect::<Vec<_>>(), expected, "scroll_top {scroll_top}");
            assert!(range.len() <= budget);
            scroll_top += 7.0;
        }
    }

    #[test]
    fn count_is_independent_of_list_length() {
        let small = visible_range(1000.0, 480.0, 10, 24.0, 1_000);
        let large = visible_range(1000.0, 480.0, 10, 24.0, 1_000_000);
        assert_eq!(small, large);
    }

    #[test]
    fn scrolling_disables_pointer_events_until_settled() {
        let t0 = Instant::now();
        let mut list = VirtualizedList::<u32>::new(&ViewConfig::default());
        list.set_items(1_000, 1);
        list.set_viewport_height(480.0);
        let row = list.visible_rows(&[NodeId(0)])[0];
        list.render(&row, |_| 7);

        list.set_scroll_top(100.0, t0);
        assert!(!list.pointer_events());
        assert!(list.on_frame(t0 + Duration::from_millis(20)).is_empty());
        assert_eq!(list.on_frame(t0 + Duration::from_millis(60)), vec![7]);
        assert!(list.pointer_events());
        assert_eq!(list.cached_renders(), 0);
    }

    #[test]
    fn renders_are_cached_until_items_change() {
        let mut list = VirtualizedList::<usize>::new(&ViewConfig::default());
        list.set_items(3, 1);
        list.set_viewport_height(72.0);
        let items = [NodeId(0), NodeId(1), NodeId(2)];
        let mut calls = 0;
        for _ in 0..2 {
            for row in list.visible_rows(&items) {
                list.render(&row, |row| {
                    calls += 1;
                    row.index
                });
            }
        }
        assert_eq!(calls, 3);
        assert!(list.set_items(3, 1).is_empty());
        assert_eq!(list.set_items(3, 2).len(), 3);
    }

    #[test]
    fn a_new_renderer_revision_drops_every_render() {
        let mut list = VirtualizedList::<usize>::new(&ViewConfig::default());
        list.set_items(3, 1);
        list.set_viewport_height(72.0);
        for row in list.visible_rows(&[NodeId(0), NodeId(1), NodeId(2)]) {
            list.render(&row, |row| row.index);
        }
        assert!(list.set_renderer_revision(0).is_empty());
        let mut dropped = list.set_renderer_revision(1);
        dropped.sort();
        assert_eq!(dropped, vec![0, 1, 2]);
        assert_eq!(list.cached_renders(), 0);
    }

    #[test]
    fn scroll_to_row_centres_and_clamps() {
        let t0 = Instant::now();
        let mut list = VirtualizedList::<()>::new(&ViewConfig::default());
        list.set_items(100, 1);
        list.set_viewport_height(240.0);

        list.scroll_to_row(50, 100, ScrollAnchor::Center, t0);
        assert_eq!(list.scroll_top(), 50.0 * 24.0 - (240.0 - 24.0) / 2.0);
        list.scroll_to_row(0, 100, ScrollAnchor::Center, t0);
        assert_eq!(list.scroll_top(), 0.0);
        list.scroll_to_row(99, 100, ScrollAnchor::Top, t0);
        assert_eq!(list.scroll_top(), list.max_scroll_top());
    }
}
