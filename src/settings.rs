use crate::Message;
use iced::widget::{column, container, row, slider, text};
use iced::{Element, Length};
use traceview::ViewConfig;

fn hint<'a>(gesture: &'a str, effect: &'a str) -> Element<'a, Message> {
    row![
        text(gesture).width(Length::Fixed(200.0)).size(12),
        text(effect).size(12)
    ]
    .into()
}

fn value<'a>(name: &'a str, shown: String) -> Element<'a, Message> {
    row![
        text(name).width(Length::Fixed(200.0)).size(12),
        text(shown).size(12)
    ]
    .into()
}

fn quiet_periods(config: &ViewConfig) -> String {
    format!(
        "wheel {} ms, sideways scroll {} ms, pointer events {} ms",
        config.wheel_end_ms, config.scroll_end_ms, config.pointer_events_restore_ms
    )
}

pub fn view(config: &ViewConfig) -> Element<'_, Message> {
    let hints = column![
        text("Hints").size(16),
        hint("Left click (names):", "Expand or collapse the node"),
        hint("Left click (spans):", "Select the span and mark its start and end"),
        hint("Double click (spans):", "Zoom to the clicked span"),
        hint("Mouse wheel:", "Scroll the rows"),
        hint("Ctrl + mouse wheel:", "Zoom horizontally around the cursor"),
        hint("Shift + mouse wheel:", "Pan the spans, or scroll the names sideways"),
        hint("Drag the divider:", "Resize the name and span columns"),
        hint("Search:", "Jump to a span by id, loading its thread when needed"),
    ]
    .spacing(6)
    .padding(6);

    let values = column![
        text("View configuration").size(16),
        value("Row height", format!("{} px", config.row_height)),
        value("Overscroll", format!("{} rows", config.overscroll)),
        value(
            "Name column",
            format!("{:.0}%", config.list_width * 100.0)
        ),
        row![
            text("Indentation").width(Length::Fixed(200.0)).size(12),
            slider(
                8.0..=48.0,
                config.row_depth_padding as f32,
                Message::IndentChanged
            )
            .step(1.0)
            .width(Length::Fixed(160.0)),
            text(format!("{} px", config.row_depth_padding)).size(12),
        ]
        .spacing(8),
        value("Zoom speed", format!("{}", config.zoom_speed)),
        value(
            "Zoom step",
            format!("{}x to {}x", config.min_zoom_scale, config.max_zoom_scale)
        ),
        value(
            "Animations",
            format!(
                "zoom {} ms, scroll {} ms",
                config.zoom_animation_ms, config.scroll_animation_ms
            )
        ),
        value("Quiet periods", quiet_periods(config)),
    ]
    .spacing(6)
    .padding(6);

    let settings_col = column![
        text("Settings").size(20),
        container(hints).padding(6).style(|_theme: &iced::Theme| {
            container::Style::default().background(iced::Color::from_rgb(0.99, 0.99, 0.99))
        }),
        container(values).padding(6).style(|_theme: &iced::Theme| {
            container::Style::default().background(iced::Color::from_rgb(0.99, 0.99, 0.99))
        }),
    ]
    .spacing(8)
    .padding(10);

    container(settings_col)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .style(|theme: &iced::Theme| {
            let palette = theme.extended_palette();
            container::Style::default()
                .background(palette.background.base.color)
                .border(iced::Border {
                    color: palette.background.strong.color,
                    width: 1.0,
                    ..Default::default()
                })
        })
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_periods_name_each_timer() {
        let config = ViewConfig {
            wheel_end_ms: 120,
            scroll_end_ms: 300,
            pointer_events_restore_ms: 50,
            ..ViewConfig::default()
        };
        assert_eq!(
            quiet_periods(&config),
            "wheel 120 ms, sideways scroll 300 ms, pointer events 50 ms"
        );
    }
}
