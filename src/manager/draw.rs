use super::{ArrowPosition, ColumnWidths, ViewManager};
use crate::intervals::format_time_label;
use crate::surface::{ElementRef, ElementStyle, Surface, class};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSide {
    Inside,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    /// Left edge of the text in span column px.
    pub x: f64,
    pub side: TextSide,
}

/// Labels of spans starting in the last fifth of the trace go left of the bar.
const ANCHOR_LEFT_FRACTION: f64 = 0.8;

fn with_style(surface: &mut impl Surface, element: ElementRef, f: impl FnOnce(&mut ElementStyle)) {
    if let Some(style) = surface.style_mut(element) {
        f(style);
    }
}

impl ViewManager {
    /// Where a label `text` goes relative to the bar of a span.
    pub fn span_text_placement(&mut self, space: [f64; 2], text: &str) -> TextPlacement {
        let text_width = self.text_measurer.measure(text);
        self.place_text(space, text_width)
    }

    fn place_text(&self, space: [f64; 2], text_width: f64) -> TextPlacement {
        let padding = self.config.text_padding;
        let view_right = self.trace_physical_space.width;
        let (left, width) = self.span_px_rect(space);
        let right = left + width;

        let visible_left = left.max(0.0);
        let visible_right = right.min(view_right);
        let fits_inside = visible_right - visible_left >= text_width + 2.0 * padding;
        let left_outside = left - padding - text_width;
        let right_outside = right + padding;

        let anchor_left =
            space[0] > self.to_origin + self.trace_space.width * ANCHOR_LEFT_FRACTION;
        let (x, side) = if anchor_left {
            if left_outside >= 0.0 {
                (left_outside, TextSide::Outside)
            } else if fits_inside {
                (visible_left + padding, TextSide::Inside)
            } else if right_outside + text_width <= view_right {
                (right_outside, TextSide::Outside)
            } else {
                (padding, TextSide::Outside)
            }
        } else if right_outside + text_width <= view_right {
            (right_outside, TextSide::Outside)
        } else if fits_inside {
            (visible_right - padding - text_width, TextSide::Inside)
        } else if left_outside >= 0.0 {
            (left_outside, TextSide::Outside)
        } else {
            (view_right - padding - text_width, TextSide::Outside)
        };
        TextPlacement { x, side }
    }

    /// Writes the current state into `surface`. `widths` overrides the
    /// committed column split while the divider is being dragged.
    pub fn draw(&mut self, surface: &mut impl Surface, widths: Option<ColumnWidths>) {
        self.draw_requested = false;
        let widths = widths.unwrap_or_else(|| self.columns.widths());
        let container = self.container_physical_space.width;
        let list_px = widths.list * container;
        let span_list_px = widths.span_list * container;

        if let Some(divider) = self.divider {
            with_style(surface, divider, |style| {
                style.translate_x = list_px;
                style.set_class(class::DRAGGING, self.divider_drag.is_some());
            });
        }

        let translate = self.columns.list.translate[0];
        for (_, slot) in self.columns.list.refs.iter() {
            with_style(surface, slot.element, |style| {
                style.width = Some(list_px);
                style.translate_x = translate;
            });
        }
        for (_, slot) in self.columns.span_list.refs.iter() {
            with_style(surface, slot.element, |style| {
                style.width = Some(span_list_px);
                style.set_class(class::SCROLLING, !self.pointer_events);
            });
        }

        for (_, slot) in self.span_bars.iter().chain(self.invisible_bars.iter()) {
            let (x, width) = self.span_px_rect(slot.data);
            with_style(surface, slot.element, |style| {
                style.translate_x = x;
                style.width = Some(width);
            });
        }

        for (_, slot) in self.span_text.iter() {
            let text_width = self.text_measurer.measure(&slot.data.text);
            let placement = self.place_text(slot.data.space, text_width);
            with_style(surface, slot.element, |style| {
                style.translate_x = placement.x;
                style.set_class(class::TEXT_INSIDE, placement.side == TextSide::Inside);
                style.set_class(class::TEXT_OUTSIDE, placement.side == TextSide::Outside);
                if style.text.as_deref() != Some(slot.data.text.as_str()) {
                    style.text = Some(slot.data.text.clone());
                }
            });
        }

        let view_left = self.to_origin + self.trace_view.left();
        let view_right = self.to_origin + self.trace_view.right();
        for (_, slot) in self.arrows.iter_mut() {
            let [start, duration] = slot.data.space;
            let position = if start + duration < view_left {
                Some(ArrowPosition::Left)
            } else if start > view_right {
                Some(ArrowPosition::Right)
            } else {
                None
            };
            slot.data.position = position;
            slot.data.visible = position.is_some();
            with_style(surface, slot.element, |style| {
                style.opacity = if position.is_some() { 1.0 } else { 0.0 };
                style.set_class(class::ARROW_LEFT, position == Some(ArrowPosition::Left));
                style.set_class(class::ARROW_RIGHT, position == Some(ArrowPosition::Right));
            });
        }

        for (index, slot) in self.timeline_indicators.iter() {
            let tick = self.intervals.get(index).copied().flatten();
            with_style(surface, slot.element, |style| match tick {
                Some(tick) => {
                    style.translate_x = self.span_to_px.apply(tick, 0.0).0;
                    style.text = Some(format_time_label(tick, self.interval));
                    style.opacity = 1.0;
                }
                None => style.opacity = 0.0,
            });
        }

        let span_width = self.trace_physical_space.width;
        for (_, slot) in self.interval_indicators.iter() {
            let x = self.transform_x_from_timestamp(slot.data);
            with_style(surface, slot.element, |style| {
                style.translate_x = x;
                style.opacity = if (0.0..=span_width).contains(&x) { 1.0 } else { 0.0 };
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TextPlacement, TextSide};
    use crate::config::ViewConfig;
    use crate::manager::{TraceViewUpdate, ViewManager};
    use crate::surface::{RetainedSurface, Surface, class};

    fn manager() -> ViewManager {
        let mut manager = ViewManager::new(ViewConfig::default());
        manager.initialize_trace_space(1_000.0, 1_000.0, 1.0);
        manager.initialize_physical_space(1_000.0 / 0.7, 400.0);
        manager
    }

    #[test]
    fn short_span_label_goes_right_of_the_bar() {
        let mut manager = manager();
        // "abcd" is 26 px wide.
        let placement = manager.span_text_placement([1_100.0, 50.0], "abcd");
        assert!((placement.x - 152.0).abs() < 1e-6);
        assert_eq!(placement.side, TextSide::Outside);
    }

    #[test]
    fn late_span_label_goes_left_of_the_bar() {
        let mut manager = manager();
        let placement = manager.span_text_placement([1_900.0, 50.0], "abcd");
        assert!((placement.x - (900.0 - 2.0 - 26.0)).abs() < 1e-6);
        assert_eq!(placement.side, TextSide::Outside);
    }

    #[test]
    fn wide_span_label_is_pinned_inside_the_window() {
        let mut manager = manager();
        manager.set_trace_view(TraceViewUpdate {
            x: Some(200.0),
            width: Some(200.0),
        });
        // Covers the whole view, so the label hugs the right window edge.
        let span_px = manager.trace_physical_space().width;
        let placement = manager.span_text_placement([1_000.0, 1_000.0], "abcd");
        assert_eq!(
            placement,
            TextPlacement {
                x: span_px - 2.0 - 26.0,
                side: TextSide::Inside,
            }
        );
    }

    #[test]
    fn draw_positions_bars_arrows_and_ticks() {
        let mut manager = manager();
        let mut surface = RetainedSurface::new();
        manager.mount(&mut surface);
        let before = surface.create(0.0);
        let inside = surface.create(0.0);
        let after = surface.create(0.0);
        let bar = surface.create(0.0);
        let marker = surface.create(0.0);
        manager.span_bars.set_capacity(1);
        manager.arrows.set_capacity(3);
        manager.register_span_bar(0, Some((bar, [1_300.0, 100.0])));
        manager.register_arrow(0, Some((before, [1_000.0, 50.0])));
        manager.register_arrow(1, Some((inside, [1_300.0, 100.0])));
        manager.register_arrow(2, Some((after, [1_900.0, 50.0])));
        manager.register_interval_indicator(0, Some((marker, 1_950.0)));
        manager.set_trace_view(TraceViewUpdate {
            x: Some(200.0),
            width: Some(600.0),
        });
        manager.draw(&mut surface, None);

        let span_px = manager.trace_physical_space().width;
        let style = surface.style(bar).unwrap();
        assert!((style.translate_x - 100.0 / 600.0 * span_px).abs() < 1e-6);
        assert!((style.width.unwrap() - 100.0 / 600.0 * span_px).abs() < 1e-6);

        assert!(surface.style(before).unwrap().has_class(class::ARROW_LEFT));
        assert!(!surface.style(inside).unwrap().is_visible());
        assert!(surface.style(after).unwrap().has_class(class::ARROW_RIGHT));
        assert!(!surface.style(marker).unwrap().is_visible());

        let ticks: Vec<_> = manager
            .timeline_indicators
            .iter()
            .map(|(_, slot)| surface.style(slot.element).unwrap().clone())
            .collect();
        assert!(ticks[0].is_visible());
        assert_eq!(ticks[0].text.as_deref(), Some("100 ns"));
        assert!(!ticks.last().unwrap().is_visible());

        let divider = manager.divider.unwrap();
        assert!((surface.style(divider).unwrap().translate_x - 300.0 / 0.7).abs() < 1e-6);
    }
}
