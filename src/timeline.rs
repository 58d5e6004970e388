mod header;

use crate::Message;
use crate::file::TraceSession;
use crate::scrollbar::{Extent, rows_scrollbar, view_scrollbar};
use iced::keyboard;
use iced::mouse;
use iced::widget::canvas::{self, Action, Canvas, Geometry, Program};
use iced::widget::{Space, column, container, row, text};
use iced::{Color, Element, Event, Length, Point, Rectangle, Renderer, Size, Theme};
use std::time::{Duration, Instant};
use traceview::intervals::format_time_label;
use traceview::manager::{ColumnKind, RowElements, WheelEvent};
use traceview::surface::{ElementStyle, Surface, class};
use traceview::{NodeKind, TraceSource};

pub const HEADER_HEIGHT: f32 = 28.0;
/// Pixels scrolled per wheel line.
const LINE_PX: f32 = 30.0;
/// How close to the divider a press starts a column resize.
const DIVIDER_GRAB_PX: f32 = 4.0;
const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const FONT_SIZE: f32 = 11.0;

pub fn color_from_label(label: &str) -> Color {
    let mut hash = 0u64;
    for c in label.chars() {
        hash = hash.wrapping_add(c as u64);
        hash = hash.wrapping_mul(0x517cc1b727220a95);
    }

    let r = ((hash >> 16) & 0xFF) as f32 / 255.0;
    let g = ((hash >> 8) & 0xFF) as f32 / 255.0;
    let b = (hash & 0xFF) as f32 / 255.0;

    Color::from_rgb(0.3 + r * 0.4, 0.3 + g * 0.4, 0.3 + b * 0.4)
}

fn bar_color(kind: NodeKind, label: &str) -> Color {
    match kind {
        NodeKind::Trace => Color::from_rgb(0.35, 0.35, 0.4),
        NodeKind::Transaction => Color::from_rgb(0.25, 0.45, 0.75),
        NodeKind::Error => Color::from_rgb(0.85, 0.25, 0.25),
        _ => color_from_label(label),
    }
}

/// The divider position in px from the left edge of the view.
pub(crate) fn list_px(session: &TraceSession) -> f32 {
    let manager = &session.manager;
    manager
        .divider()
        .and_then(|divider| session.surface.style(divider))
        .map(|style| style.translate_x)
        .unwrap_or_else(|| manager.live_widths().list * manager.container_physical_space().width)
        as f32
}

pub fn view(session: &TraceSession) -> Element<'_, Message> {
    let manager = &session.manager;
    let list = manager.list();
    let space = manager.trace_space();
    let trace_view = manager.trace_view();

    let rows = Canvas::new(RowsProgram { session })
        .width(Length::Fill)
        .height(Length::Fill);
    let vertical = rows_scrollbar(
        Extent {
            offset: list.scroll_top(),
            viewport: list.viewport_height(),
            content: list.content_height(),
        },
        Message::ListScroll,
    );
    let horizontal = view_scrollbar(
        Extent {
            offset: trace_view.x,
            viewport: trace_view.width,
            content: space.width,
        },
        Message::PanTo,
    );

    column![
        row![
            header::view(session),
            Space::new().width(Length::Fixed(14.0))
        ],
        row![rows, vertical].height(Length::Fill),
        row![
            Space::new().width(Length::Fixed(list_px(session))),
            horizontal,
            Space::new().width(Length::Fixed(14.0))
        ],
        details(session),
    ]
    .into()
}

fn details(session: &TraceSession) -> Element<'_, Message> {
    let content: Element<'_, Message> = match session
        .selected
        .and_then(|selected| session.tree.node(selected))
    {
        Some(node) => {
            let start = node.start - session.manager.to_origin();
            row![
                text(node.label.as_str()).size(12).width(Length::Fill),
                text(format!("{}:{}", node.kind.prefix(), node.id)).size(12),
                text(format!("start {}", format_time_label(start, start))).size(12),
                text(format!(
                    "duration {}",
                    format_time_label(node.duration, node.duration)
                ))
                .size(12),
            ]
            .spacing(16)
            .into()
        }
        None => {
            let meta = &session.meta;
            let duration = meta.duration_ns as f64;
            text(format!(
                "pid {}: {} events on {} threads, {} total, loaded in {:.0} ms",
                meta.pid,
                meta.event_count,
                meta.thread_count,
                format_time_label(duration, duration),
                meta.load_duration_ns as f64 / 1_000_000.0
            ))
        }
        .size(12)
        .into(),
    };
    container(content)
        .padding(6)
        .width(Length::Fill)
        .style(|_theme: &iced::Theme| {
            container::Style::default().background(Color::from_rgb(0.96, 0.96, 0.96))
        })
        .into()
}

#[derive(Default)]
struct RowsState {
    size: Option<Size>,
    modifiers: keyboard::Modifiers,
    dragging_divider: bool,
    last_click: Option<(Instant, usize)>,
}

/// What a canvas event turned into. Everything but `Ignored` is captured.
enum Response {
    Ignored,
    Captured,
    Publish(Message),
}

struct RowsProgram<'a> {
    session: &'a TraceSession,
}

impl RowsProgram<'_> {
    fn row_at(&self, y: f32) -> Option<usize> {
        let list = self.session.manager.list();
        let index = ((f64::from(y) + list.scroll_top()) / list.row_height()).floor();
        (index >= 0.0 && (index as usize) < list.count()).then_some(index as usize)
    }

    fn wheel(&self, state: &RowsState, delta: &mouse::ScrollDelta, local: Point) -> Message {
        let (x, y) = match *delta {
            mouse::ScrollDelta::Lines { x, y } => (x * LINE_PX, y * LINE_PX),
            mouse::ScrollDelta::Pixels { x, y } => (x, y),
        };
        // Positive deltas scroll towards the end of the content.
        let (mut delta_x, mut delta_y) = (-f64::from(x), -f64::from(y));
        if state.modifiers.shift() && delta_x == 0.0 {
            (delta_x, delta_y) = (delta_y, 0.0);
        }

        let list_px = list_px(self.session);
        let scroll_top = self.session.manager.list().scroll_top();
        if local.x < list_px {
            return if delta_x != 0.0 {
                Message::ListWheel(delta_x)
            } else {
                Message::ListScroll(scroll_top + delta_y)
            };
        }
        if state.modifiers.command() || delta_x != 0.0 {
            Message::SpanWheel(WheelEvent {
                delta_x,
                delta_y,
                cursor_x: f64::from(local.x - list_px),
                zoom: state.modifiers.command(),
            })
        } else {
            Message::ListScroll(scroll_top + delta_y)
        }
    }

    fn near_divider(&self, x: f32) -> bool {
        (x - list_px(self.session)).abs() <= DIVIDER_GRAB_PX
    }

    fn respond(
        &self,
        state: &mut RowsState,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Response {
        match event {
            Event::Keyboard(keyboard::Event::ModifiersChanged(modifiers)) => {
                state.modifiers = *modifiers;
                Response::Ignored
            }
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                let Some(local) = cursor.position_in(bounds) else {
                    return Response::Ignored;
                };
                Response::Publish(self.wheel(state, delta, local))
            }
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let Some(local) = cursor.position_in(bounds) else {
                    return Response::Ignored;
                };
                if self.near_divider(local.x) {
                    state.dragging_divider = true;
                    return Response::Publish(Message::DividerPressed(f64::from(local.x)));
                }
                let in_list = local.x < list_px(self.session);
                if !in_list && !self.session.manager.pointer_events() {
                    return Response::Captured;
                }
                let Some(index) = self.row_at(local.y) else {
                    return Response::Ignored;
                };
                let now = Instant::now();
                let double = state.last_click.is_some_and(|(at, last)| {
                    last == index && now.duration_since(at) <= DOUBLE_CLICK
                });
                state.last_click = (!double).then_some((now, index));
                let column = if in_list {
                    ColumnKind::List
                } else {
                    ColumnKind::SpanList
                };
                Response::Publish(Message::RowClicked {
                    index,
                    column,
                    double,
                })
            }
            Event::Mouse(mouse::Event::CursorMoved { position }) if state.dragging_divider => {
                let x = f64::from(position.x - bounds.x);
                Response::Publish(Message::DividerMoved(x))
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left))
                if state.dragging_divider =>
            {
                state.dragging_divider = false;
                let x = cursor
                    .position()
                    .map_or(f64::from(list_px(self.session)), |position| {
                        f64::from(position.x - bounds.x)
                    });
                Response::Publish(Message::DividerReleased(x))
            }
            _ => Response::Ignored,
        }
    }
}

fn fill_text(frame: &mut canvas::Frame, content: &str, position: Point, color: Color) {
    frame.fill_text(canvas::Text {
        content: content.to_string(),
        position,
        color,
        size: FONT_SIZE.into(),
        ..Default::default()
    });
}

impl Program<Message> for RowsProgram<'_> {
    type State = RowsState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::WHITE);

        let session = self.session;
        let manager = &session.manager;
        let surface = &session.surface;
        let list = manager.list();
        let list_px = list_px(session);
        let span_width = (bounds.width - list_px).max(0.0);
        let scroll_top = list.scroll_top() as f32;
        let row_height = list.row_height() as f32;
        let visible = |element| surface.style(element).filter(|style| style.is_visible());

        for tick in manager.timeline_indicators().filter_map(visible) {
            let x = list_px + tick.translate_x as f32;
            frame.stroke(
                &canvas::Path::line(Point::new(x, 0.0), Point::new(x, bounds.height)),
                canvas::Stroke::default()
                    .with_color(Color::from_rgb(0.93, 0.93, 0.93))
                    .with_width(1.0),
            );
        }

        for (_, list_row) in manager.mounted_rows() {
            let node = session.tree.node(list_row.node);
            let (Some(elements), Some(node)) = (list.cached(list_row.index), node) else {
                continue;
            };
            let Some(cell) = surface.style(elements.list) else {
                continue;
            };
            let y = cell.translate_y as f32 - scroll_top;

            if session.selected == Some(list_row.node) {
                frame.fill_rectangle(
                    Point::new(0.0, y),
                    Size::new(bounds.width, row_height),
                    Color::from_rgb(0.88, 0.92, 1.0),
                );
            }

            frame.with_clip(
                Rectangle::new(Point::ORIGIN, Size::new(list_px, bounds.height)),
                |frame| {
                    let indent = f64::from(node.depth) * manager.config().row_depth_padding;
                    let x = (indent + cell.translate_x) as f32 + 4.0;
                    let text_y = y + (row_height - FONT_SIZE) * 0.5;
                    let has_children = !node.children.is_empty();
                    if has_children || session.tree.needs_zoom_in(list_row.node) {
                        let toggle = if node.expanded && has_children { "-" } else { "+" };
                        let color = Color::from_rgb(0.4, 0.4, 0.4);
                        fill_text(frame, toggle, Point::new(x - 10.0, text_y), color);
                    }
                    if let Some(label) = cell.text.as_deref() {
                        let color = Color::from_rgb(0.15, 0.15, 0.15);
                        fill_text(frame, label, Point::new(x, text_y), color);
                    }
                },
            );

            frame.with_clip(
                Rectangle::new(Point::new(list_px, 0.0), Size::new(span_width, bounds.height)),
                |frame| {
                    draw_span(
                        frame,
                        surface,
                        elements,
                        node.kind,
                        &node.label,
                        y,
                        row_height,
                        span_width,
                    )
                },
            );
        }

        for marker in manager.interval_indicators().filter_map(visible) {
            let x = list_px + marker.translate_x as f32;
            frame.stroke(
                &canvas::Path::line(Point::new(x, 0.0), Point::new(x, bounds.height)),
                canvas::Stroke::default()
                    .with_color(Color::from_rgba(0.2, 0.4, 0.9, 0.8))
                    .with_width(1.0),
            );
        }

        let dragging = manager
            .divider()
            .and_then(|divider| surface.style(divider))
            .is_some_and(|style| style.has_class(class::DRAGGING));
        frame.stroke(
            &canvas::Path::line(Point::new(list_px, 0.0), Point::new(list_px, bounds.height)),
            canvas::Stroke::default()
                .with_color(if dragging {
                    Color::from_rgb(0.25, 0.45, 0.75)
                } else {
                    Color::from_rgb(0.8, 0.8, 0.8)
                })
                .with_width(if dragging { 2.0 } else { 1.0 }),
        );

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<Message>> {
        let resized = (state.size != Some(bounds.size())).then(|| bounds.size());
        state.size = Some(bounds.size());

        let response = self.respond(state, event, bounds, cursor);
        let Some(size) = resized else {
            return match response {
                Response::Ignored => None,
                Response::Captured => Some(Action::capture()),
                Response::Publish(message) => Some(Action::publish(message).and_capture()),
            };
        };
        // The event is still handled, after the view has been resized.
        Some(match response {
            Response::Ignored => Action::publish(Message::Resized(size, None)),
            Response::Captured => Action::publish(Message::Resized(size, None)).and_capture(),
            Response::Publish(message) => {
                Action::publish(Message::Resized(size, Some(Box::new(message)))).and_capture()
            }
        })
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.dragging_divider {
            return mouse::Interaction::ResizingHorizontally;
        }
        match cursor.position_in(bounds) {
            Some(local) if self.near_divider(local.x) => mouse::Interaction::ResizingHorizontally,
            Some(local) if local.x >= list_px(self.session) && !self.session.manager.pointer_events() => {
                mouse::Interaction::default()
            }
            Some(local) if self.row_at(local.y).is_some() => mouse::Interaction::Pointer,
            _ => mouse::Interaction::default(),
        }
    }
}

/// Paints one row of the span column. Coordinates are relative to the column.
#[allow(clippy::too_many_arguments)]
fn draw_span(
    frame: &mut canvas::Frame,
    surface: &impl Surface,
    elements: &RowElements,
    kind: NodeKind,
    label: &str,
    y: f32,
    row_height: f32,
    span_width: f32,
) {
    let style = |element| surface.style(element);
    let text_y = y + (row_height - FONT_SIZE) * 0.5;

    if let Some(bar) = style(elements.bar) {
        let width = bar.width.unwrap_or(1.0) as f32;
        frame.fill_rectangle(
            Point::new(bar.translate_x as f32, y + 4.0),
            Size::new(width, row_height - 8.0),
            bar_color(kind, label),
        );
    }

    if let Some(span_text) = style(elements.text) {
        let color = if span_text.has_class(class::TEXT_INSIDE) {
            Color::WHITE
        } else {
            Color::from_rgb(0.25, 0.25, 0.25)
        };
        if let Some(content) = span_text.text.as_deref() {
            fill_text(frame, content, Point::new(span_text.translate_x as f32, text_y), color);
        }
    }

    if let Some(arrow) = style(elements.arrow).filter(|style: &&ElementStyle| style.is_visible()) {
        let (glyph, x) = if arrow.has_class(class::ARROW_LEFT) {
            ("<", 2.0)
        } else {
            (">", span_width - 10.0)
        };
        fill_text(frame, glyph, Point::new(x, text_y), Color::from_rgb(0.45, 0.45, 0.45));
    }
}
