use iced::mouse;
use iced::widget::canvas::{self, Action, Canvas, Geometry, Program};
use iced::{Color, Element, Event, Length, Point, Rectangle, Renderer, Theme, Vector};
use std::sync::Arc;

const THICKNESS: f32 = 14.0;
const TRACK_THICKNESS: f32 = 6.0;
const TRACK_PADDING: f32 = 4.0;
const MIN_THUMB_LENGTH: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A window of `viewport` units at `offset` into `content` units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub offset: f64,
    pub viewport: f64,
    pub content: f64,
}

impl Extent {
    fn max_offset(&self) -> f64 {
        (self.content - self.viewport).max(0.0)
    }

    fn thumb_fraction(&self) -> f64 {
        if self.content <= 0.0 {
            1.0
        } else {
            (self.viewport / self.content).clamp(0.02, 1.0)
        }
    }

    fn position(&self) -> f64 {
        let max = self.max_offset();
        if max == 0.0 {
            0.0
        } else {
            (self.offset / max).clamp(0.0, 1.0)
        }
    }
}

/// Scrolls the row list. Reports the new scroll top.
pub fn rows_scrollbar<'a, Message: 'a>(
    extent: Extent,
    on_scroll: impl Fn(f64) -> Message + 'a,
) -> Element<'a, Message> {
    track(Axis::Vertical, extent, on_scroll)
}

/// Pans the trace view. Reports the new view start.
pub fn view_scrollbar<'a, Message: 'a>(
    extent: Extent,
    on_scroll: impl Fn(f64) -> Message + 'a,
) -> Element<'a, Message> {
    track(Axis::Horizontal, extent, on_scroll)
}

fn track<'a, Message: 'a>(
    axis: Axis,
    extent: Extent,
    on_scroll: impl Fn(f64) -> Message + 'a,
) -> Element<'a, Message> {
    let program = ScrollTrack {
        axis,
        extent,
        on_scroll: Arc::new(on_scroll),
    };
    let canvas = Canvas::new(program);
    match axis {
        Axis::Horizontal => canvas.width(Length::Fill).height(Length::Fixed(THICKNESS)),
        Axis::Vertical => canvas.width(Length::Fixed(THICKNESS)).height(Length::Fill),
    }
    .into()
}

#[derive(Default)]
struct TrackState {
    /// Grab point inside the thumb while dragging.
    grab: Option<f32>,
}

struct ScrollTrack<'a, Message> {
    axis: Axis,
    extent: Extent,
    on_scroll: Arc<dyn Fn(f64) -> Message + 'a>,
}

impl<Message> ScrollTrack<'_, Message> {
    fn along(&self, point: Point) -> f32 {
        match self.axis {
            Axis::Horizontal => point.x,
            Axis::Vertical => point.y,
        }
    }

    fn track_length(&self, bounds: Rectangle) -> f32 {
        let length = match self.axis {
            Axis::Horizontal => bounds.width,
            Axis::Vertical => bounds.height,
        };
        (length - TRACK_PADDING * 2.0).max(1.0)
    }

    fn thumb_length(&self, bounds: Rectangle) -> f32 {
        let track = self.track_length(bounds);
        (track * self.extent.thumb_fraction() as f32)
            .max(MIN_THUMB_LENGTH)
            .min(track)
    }

    fn rect(&self, bounds: Rectangle, start: f32, length: f32) -> Rectangle {
        match self.axis {
            Axis::Horizontal => Rectangle {
                x: start,
                y: (bounds.height - TRACK_THICKNESS) * 0.5,
                width: length,
                height: TRACK_THICKNESS,
            },
            Axis::Vertical => Rectangle {
                x: (bounds.width - TRACK_THICKNESS) * 0.5,
                y: start,
                width: TRACK_THICKNESS,
                height: length,
            },
        }
    }

    fn thumb(&self, bounds: Rectangle) -> Rectangle {
        let free = self.track_length(bounds) - self.thumb_length(bounds);
        let start = TRACK_PADDING + free * self.extent.position() as f32;
        self.rect(bounds, start, self.thumb_length(bounds))
    }

    /// The offset that puts the thumb's leading edge at `thumb_start`.
    fn offset_at(&self, bounds: Rectangle, thumb_start: f32) -> f64 {
        let free = self.track_length(bounds) - self.thumb_length(bounds);
        if free <= 0.0 {
            return 0.0;
        }
        let fraction = ((thumb_start - TRACK_PADDING) / free).clamp(0.0, 1.0);
        f64::from(fraction) * self.extent.max_offset()
    }
}

impl<Message> Program<Message> for ScrollTrack<'_, Message> {
    type State = TrackState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let track = self.rect(bounds, TRACK_PADDING, self.track_length(bounds));
        frame.fill_rectangle(
            track.position(),
            track.size(),
            Color::from_rgb(0.92, 0.92, 0.92),
        );

        if self.extent.max_offset() > 0.0 {
            let thumb = self.thumb(bounds);
            frame.fill_rectangle(
                thumb.position(),
                thumb.size(),
                Color::from_rgb(0.75, 0.75, 0.78),
            );
            frame.stroke(
                &canvas::Path::rectangle(thumb.position(), thumb.size()),
                canvas::Stroke::default()
                    .with_color(Color::from_rgba(0.0, 0.0, 0.0, 0.2))
                    .with_width(1.0),
            );
        }
        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<Message>> {
        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let position = cursor.position_in(bounds)?;
                if self.extent.max_offset() == 0.0 {
                    return Some(Action::capture());
                }
                let thumb = self.thumb(bounds);
                let thumb_start = self.along(thumb.position());
                if thumb.contains(position) {
                    state.grab = Some(self.along(position) - thumb_start);
                    return Some(Action::capture());
                }
                // Clicking the track centres the thumb on the cursor.
                let grab = self.thumb_length(bounds) * 0.5;
                state.grab = Some(grab);
                let offset = self.offset_at(bounds, self.along(position) - grab);
                Some(Action::publish((self.on_scroll)(offset)).and_capture())
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                state.grab.take().map(|_| Action::capture())
            }
            Event::Mouse(mouse::Event::CursorMoved { position }) => {
                let grab = state.grab?;
                let local = *position - Vector::new(bounds.x, bounds.y);
                let offset = self.offset_at(bounds, self.along(local) - grab);
                Some(Action::publish((self.on_scroll)(offset)).and_capture())
            }
            _ => None,
        }
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if state.grab.is_some() {
            return mouse::Interaction::Grabbing;
        }
        match cursor.position_in(bounds) {
            Some(position) if self.thumb(bounds).contains(position) => mouse::Interaction::Grab,
            _ => mouse::Interaction::default(),
        }
    }
}
