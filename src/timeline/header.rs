use super::{HEADER_HEIGHT, list_px};
use crate::Message;
use crate::file::TraceSession;
use iced::mouse;
use iced::widget::canvas::{self, Canvas, Geometry, Program};
use iced::{Color, Element, Length, Point, Rectangle, Renderer, Size, Theme};
use traceview::surface::Surface;

pub(super) fn view(session: &TraceSession) -> Element<'_, Message> {
    Canvas::new(HeaderProgram { session })
        .width(Length::Fill)
        .height(Length::Fixed(HEADER_HEIGHT))
        .into()
}

struct HeaderProgram<'a> {
    session: &'a TraceSession,
}

impl Program<Message> for HeaderProgram<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.95, 0.95, 0.95),
        );

        let session = self.session;
        let list_px = list_px(session);
        frame.fill_text(canvas::Text {
            content: session.meta.cmd.clone(),
            position: Point::new(6.0, (bounds.height - 11.0) * 0.5),
            color: Color::from_rgb(0.2, 0.2, 0.2),
            size: 11.0.into(),
            ..Default::default()
        });

        let span_width = (bounds.width - list_px).max(0.0);
        frame.with_clip(
            Rectangle::new(Point::new(list_px, 0.0), Size::new(span_width, bounds.height)),
            |frame| {
                let ticks = session
                    .manager
                    .timeline_indicators()
                    .filter_map(|tick| session.surface.style(tick))
                    .filter(|style| style.is_visible());
                for tick in ticks {
                    let x = tick.translate_x as f32;
                    frame.stroke(
                        &canvas::Path::line(
                            Point::new(x, bounds.height * 0.5),
                            Point::new(x, bounds.height),
                        ),
                        canvas::Stroke::default()
                            .with_color(Color::from_rgb(0.55, 0.55, 0.55))
                            .with_width(1.0),
                    );
                    if let Some(label) = tick.text.as_deref() {
                        frame.fill_text(canvas::Text {
                            content: label.to_string(),
                            position: Point::new(x + 2.0, 3.0),
                            color: Color::from_rgb(0.3, 0.3, 0.3),
                            size: 11.0.into(),
                            ..Default::default()
                        });
                    }
                }
            },
        );

        frame.stroke(
            &canvas::Path::line(
                Point::new(0.0, bounds.height - 0.5),
                Point::new(bounds.width, bounds.height - 0.5),
            ),
            canvas::Stroke::default()
                .with_color(Color::from_rgb(0.85, 0.85, 0.85))
                .with_width(1.0),
        );
        frame.stroke(
            &canvas::Path::line(Point::new(list_px, 0.0), Point::new(list_px, bounds.height)),
            canvas::Stroke::default()
                .with_color(Color::from_rgb(0.8, 0.8, 0.8))
                .with_width(1.0),
        );

        vec![frame.into_geometry()]
    }
}
