mod data;
mod file;
mod scrollbar;
mod settings;
mod timeline;

use clap::Parser;
use data::{Handoff, format_panic_payload, load_trace};
use file::{FileLoadState, FileTab, TraceSession};
use iced::widget::{Space, button, column, container, row, text, text_input};
use iced::{Alignment, Element, Length, Size, Subscription, Task};
use iced_aw::{TabLabel, tab_bar};
use std::path::PathBuf;
use std::time::Instant;
use traceview::manager::{ColumnKind, TraceViewUpdate, WheelEvent};
use traceview::tree::parse_path;
use traceview::{TraceSource, ViewConfig};

/// Interactive span timeline for measureme profiles.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// Profile to open on startup.
    path: Option<PathBuf>,

    /// TOML file overriding the view configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ViewConfig::load(path).unwrap_or_else(|err| {
            log::error!("{err}, using the default view configuration");
            ViewConfig::default()
        }),
        None => ViewConfig::default(),
    };

    iced::application(
        move || Traceview::new(args.path.clone(), config.clone()),
        Traceview::update,
        Traceview::view,
    )
    .title(Traceview::title)
    .subscription(Traceview::subscription)
    .run()
}

#[derive(Debug, Clone)]
enum Message {
    TabSelected(usize),
    CloseTab(usize),
    OpenFile,
    FileSelected(PathBuf),
    FileLoaded(u64, Result<Handoff, String>),
    OpenSettings,
    Frame(Instant),
    /// The rows canvas changed size, with the event that revealed it.
    Resized(Size, Option<Box<Message>>),
    IndentChanged(f32),
    SpanWheel(WheelEvent),
    ListWheel(f64),
    ListScroll(f64),
    PanTo(f64),
    DividerPressed(f64),
    DividerMoved(f64),
    DividerReleased(f64),
    RowClicked {
        index: usize,
        column: ColumnKind,
        double: bool,
    },
    ResetZoom,
    SearchChanged(String),
    SearchSubmitted,
    None,
}

struct Traceview {
    config: ViewConfig,
    tabs: Vec<FileTab>,
    active_tab: usize,
    next_id: u64,
    show_settings: bool,
    canvas_size: Option<Size>,
}

impl Traceview {
    fn new(path: Option<PathBuf>, config: ViewConfig) -> (Self, Task<Message>) {
        let mut app = Traceview {
            config,
            tabs: Vec::new(),
            active_tab: 0,
            next_id: 0,
            show_settings: false,
            canvas_size: None,
        };
        let task = match path {
            Some(path) => app.open(path),
            None => Task::none(),
        };
        (app, task)
    }

    fn title(&self) -> String {
        if self.show_settings {
            return "traceview - Settings".to_string();
        }
        match self.tabs.get(self.active_tab) {
            Some(tab) => format!("traceview - {}", tab.title()),
            None => "traceview".to_string(),
        }
    }

    fn open(&mut self, path: PathBuf) -> Task<Message> {
        let id = self.next_id;
        self.next_id += 1;
        self.tabs.push(FileTab {
            id,
            path: path.clone(),
            load_state: FileLoadState::Loading,
        });
        self.active_tab = self.tabs.len() - 1;
        self.show_settings = false;

        Task::perform(
            async move {
                std::thread::spawn(move || load_trace(&path))
                    .join()
                    .map_err(format_panic_payload)
                    .and_then(|result| result.map_err(|err| format!("{err:#}")))
                    .map(Handoff::new)
            },
            move |result| Message::FileLoaded(id, result),
        )
    }

    fn session_mut(&mut self) -> Option<&mut TraceSession> {
        if self.show_settings {
            return None;
        }
        self.tabs.get_mut(self.active_tab)?.session_mut()
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        let now = Instant::now();
        match message {
            Message::TabSelected(index) => {
                self.active_tab = index;
                self.show_settings = false;
                let size = self.canvas_size;
                if let Some(session) = self.session_mut() {
                    if let Some(size) = size {
                        session.fit(size);
                    }
                    session.manager.request_draw();
                }
            }
            Message::CloseTab(index) => {
                if index < self.tabs.len() {
                    let mut tab = self.tabs.remove(index);
                    if let Some(session) = tab.session_mut() {
                        session.close();
                    }
                    if self.active_tab >= self.tabs.len() {
                        self.active_tab = self.tabs.len().saturating_sub(1);
                    }
                }
            }
            Message::OpenFile => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .add_filter("measureme profdata", &["mm_profdata"])
                            .pick_file()
                            .await
                    },
                    |file_handle| {
                        if let Some(handle) = file_handle {
                            Message::FileSelected(handle.path().to_path_buf())
                        } else {
                            Message::None
                        }
                    },
                );
            }
            Message::FileSelected(path) => return self.open(path),
            Message::FileLoaded(id, result) => {
                let config = self.config.clone();
                let Some(tab) = self.tabs.iter_mut().find(|tab| tab.id == id) else {
                    log::debug!("dropping trace for closed tab {id}");
                    return Task::none();
                };
                tab.load_state = match result {
                    Ok(handoff) => match handoff.take() {
                        Some(loaded) => {
                            let mut session = TraceSession::new(loaded, config);
                            if let Some(size) = self.canvas_size {
                                session.fit(size);
                            }
                            FileLoadState::Ready(Box::new(session))
                        }
                        None => FileLoadState::Error("trace was already taken".to_string()),
                    },
                    Err(err) => {
                        log::error!("failed to load {}: {err}", tab.path.display());
                        FileLoadState::Error(err)
                    }
                };
            }
            Message::OpenSettings => self.show_settings = true,
            Message::Frame(now) => {
                for session in self.tabs.iter_mut().filter_map(FileTab::session_mut) {
                    if session.manager.needs_frame() {
                        session.frame(now);
                    }
                }
            }
            Message::Resized(size, then) => {
                // Every tab shares the canvas size, visible or not.
                self.canvas_size = Some(size);
                for session in self.tabs.iter_mut().filter_map(FileTab::session_mut) {
                    session.fit(size);
                }
                if let Some(message) = then {
                    return self.update(*message);
                }
            }
            Message::IndentChanged(px) => {
                self.config.row_depth_padding = f64::from(px);
                let (indent, padding) = (self.config.row_depth_padding, self.config.text_padding);
                for session in self.tabs.iter_mut().filter_map(FileTab::session_mut) {
                    session.manager.set_row_padding(indent, padding);
                }
            }
            Message::SpanWheel(event) => {
                if let Some(session) = self.session_mut() {
                    session.manager.on_span_wheel(event, now);
                }
            }
            Message::ListWheel(delta_x) => {
                if let Some(session) = self.session_mut() {
                    session
                        .manager
                        .on_list_wheel(delta_x, now, &mut session.surface);
                }
            }
            Message::ListScroll(scroll_top) => {
                if let Some(session) = self.session_mut() {
                    session.manager.on_list_scroll(scroll_top, now);
                }
            }
            Message::PanTo(x) => {
                if let Some(session) = self.session_mut() {
                    session.manager.set_trace_view(TraceViewUpdate {
                        x: Some(x),
                        width: None,
                    });
                }
            }
            Message::DividerPressed(x) => {
                if let Some(session) = self.session_mut() {
                    session.manager.on_divider_mouse_down(x);
                }
            }
            Message::DividerMoved(x) => {
                if let Some(session) = self.session_mut() {
                    session.manager.on_divider_mouse_move(x);
                }
            }
            Message::DividerReleased(x) => {
                if let Some(session) = self.session_mut() {
                    if let Some(widths) = session.manager.on_divider_mouse_up(x) {
                        log::debug!("columns resized to {:.2}/{:.2}", widths.list, widths.span_list);
                    }
                }
            }
            Message::RowClicked {
                index,
                column,
                double,
            } => {
                if let Some(session) = self.session_mut() {
                    row_clicked(session, index, column, double, now);
                }
            }
            Message::ResetZoom => {
                if let Some(session) = self.session_mut() {
                    session.manager.reset_zoom();
                }
            }
            Message::SearchChanged(query) => {
                if let Some(session) = self.session_mut() {
                    session.search = query;
                }
            }
            Message::SearchSubmitted => {
                if let Some(session) = self.session_mut() {
                    search(session, now);
                }
            }
            Message::None => {}
        }
        Task::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        let animating = self
            .tabs
            .iter()
            .filter_map(FileTab::session)
            .any(|session| session.manager.needs_frame());
        if animating {
            iced::window::frames().map(Message::Frame)
        } else {
            Subscription::none()
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let mut bar = tab_bar::TabBar::new(Message::TabSelected).on_close(Message::CloseTab);
        for (i, tab) in self.tabs.iter().enumerate() {
            bar = bar.push(i, TabLabel::Text(tab.title()));
        }
        if !self.tabs.is_empty() && !self.show_settings {
            bar = bar.set_active_tab(&self.active_tab);
        }

        let mut header = row![bar, Space::new().width(Length::Fill)];
        if let Some(session) = self.tabs.get(self.active_tab).and_then(FileTab::session) {
            if !self.show_settings {
                header = header
                    .push(
                        text_input("Span id or path", &session.search)
                            .on_input(Message::SearchChanged)
                            .on_submit(Message::SearchSubmitted)
                            .width(Length::Fixed(240.0)),
                    )
                    .push(button("Reset zoom").on_press(Message::ResetZoom));
            }
        }
        let header = header
            .push(button("Settings").on_press(Message::OpenSettings))
            .push(button("Open").on_press(Message::OpenFile))
            .spacing(10)
            .padding(5)
            .align_y(Alignment::Center);

        let content: Element<'_, Message> = if self.show_settings {
            settings::view(&self.config)
        } else {
            match self.tabs.get(self.active_tab).map(|tab| &tab.load_state) {
                Some(FileLoadState::Ready(session)) => timeline::view(session),
                Some(FileLoadState::Loading) => centered(text("Loading...").size(20)),
                Some(FileLoadState::Error(err)) => centered(text(err.as_str()).size(14)),
                None => centered(text("Open a file to start").size(20)),
            }
        };

        column![header, content].into()
    }
}

fn centered<'a>(content: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

fn row_clicked(
    session: &mut TraceSession,
    index: usize,
    column: ColumnKind,
    double: bool,
    now: Instant,
) {
    let Some(&node) = session.tree.rows().get(index) else {
        return;
    };
    match column {
        ColumnKind::List => {
            let result = if session.tree.needs_zoom_in(node) {
                pollster::block_on(session.tree.zoom_in(node))
            } else {
                session.tree.toggle_expanded(node).map(|_| ())
            };
            if let Err(err) = result {
                log::warn!("could not toggle {node}: {err}");
            }
        }
        ColumnKind::SpanList => {
            session.select(Some(node));
            if double {
                if let Some(space) = session.tree.node(node).map(|node| node.space()) {
                    session.manager.zoom_into_space(space[0], space[1], now);
                }
            }
        }
    }
}

/// Accepts either an event id or a `/` separated path of `<type>:<id>` segments.
fn search(session: &mut TraceSession, now: Instant) {
    let query = session.search.trim().to_string();
    if query.is_empty() {
        return;
    }
    let result = if query.contains('/') {
        let segments: Vec<&str> = query.split('/').collect();
        match parse_path(&segments) {
            Ok(path) => pollster::block_on(session.manager.scroll_to_path(
                &mut session.tree,
                &path,
                now,
            )),
            Err(err) => {
                log::warn!("{err}");
                return;
            }
        }
    } else {
        pollster::block_on(
            session
                .manager
                .scroll_to_event_id(&mut session.tree, &query, now),
        )
    };
    match result {
        Ok(Some(node)) => session.select(Some(node)),
        Ok(None) => log::info!("nothing matches `{query}`"),
        Err(err) => log::error!("could not scroll to `{query}`: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::{LoadedTrace, TraceMeta};
    use traceview::{NodeKind, NodeSpec, TraceTree};

    fn loaded() -> LoadedTrace {
        let tree = TraceTree::new(NodeSpec::new(NodeKind::Trace, "root", "rustc", 0.0, 100.0));
        LoadedTrace {
            tree,
            meta: TraceMeta {
                cmd: "rustc".to_string(),
                pid: 1,
                event_count: 0,
                thread_count: 0,
                duration_ns: 100,
                load_duration_ns: 0,
            },
        }
    }

    fn ready_tab(id: u64, config: &ViewConfig) -> FileTab {
        FileTab {
            id,
            path: PathBuf::from(format!("trace-{id}.mm_profdata")),
            load_state: FileLoadState::Ready(Box::new(TraceSession::new(loaded(), config.clone()))),
        }
    }

    fn width(app: &Traceview, tab: usize) -> f64 {
        app.tabs[tab]
            .session()
            .unwrap()
            .manager
            .container_physical_space()
            .width
    }

    #[test]
    fn background_tabs_follow_the_canvas_size() {
        let (mut app, _) = Traceview::new(None, ViewConfig::default());
        app.tabs = vec![ready_tab(0, &app.config), ready_tab(1, &app.config)];

        let _ = app.update(Message::Resized(Size::new(800.0, 400.0), None));
        assert_eq!(width(&app, 0), 800.0);
        assert_eq!(width(&app, 1), 800.0);

        let _ = app.update(Message::TabSelected(1));
        assert_eq!(width(&app, 1), 800.0);
        assert_eq!(app.tabs[1].session().unwrap().manager.list().viewport_height(), 400.0);
    }

    #[test]
    fn the_event_that_reveals_a_resize_is_still_handled() {
        let (mut app, _) = Traceview::new(None, ViewConfig::default());
        app.tabs = vec![ready_tab(0, &app.config)];

        let then = Message::SearchChanged("0-1".to_string());
        let _ = app.update(Message::Resized(Size::new(640.0, 300.0), Some(Box::new(then))));
        assert_eq!(width(&app, 0), 640.0);
        assert_eq!(app.tabs[0].session().unwrap().search, "0-1");
    }

    #[test]
    fn tabs_loaded_later_start_at_the_canvas_size() {
        let (mut app, _) = Traceview::new(None, ViewConfig::default());
        let _ = app.update(Message::Resized(Size::new(900.0, 500.0), None));
        app.tabs.push(FileTab {
            id: 3,
            path: PathBuf::from("late.mm_profdata"),
            load_state: FileLoadState::Loading,
        });

        let _ = app.update(Message::FileLoaded(3, Ok(Handoff::new(loaded()))));
        assert_eq!(width(&app, 0), 900.0);
    }

    #[test]
    fn indentation_applies_to_open_tabs() {
        let (mut app, _) = Traceview::new(None, ViewConfig::default());
        app.tabs = vec![ready_tab(0, &app.config)];
        let _ = app.update(Message::IndentChanged(30.0));
        let session = app.tabs[0].session().unwrap();
        assert_eq!(session.manager.config().row_depth_padding, 30.0);
        assert!(session.manager.needs_frame());
    }
}
