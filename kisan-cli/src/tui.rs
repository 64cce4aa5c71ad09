//! Interactive terminal client

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use kisan_chat::{ChatEngine, ChatEvent, ChatSnapshot};
use kisan_core::prompts::{self, DEFAULT_SUGGESTION_COUNT};
use kisan_gateway::TranscriptionService;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::sync::mpsc;
use tracing::info;

use crate::render::message_lines;

const HELP: &str = "Enter send | Tab next session | /new /switch <n> /ask <n> /voice <file> /quit";
const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];

/// A slash command typed into the input box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    Switch(usize),
    Ask(usize),
    Voice(PathBuf),
    Quit,
    Invalid(String),
}

impl Command {
    /// Parse `input` as a command; `None` means it is a chat message
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let rest = input.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "new" => Command::New,
            "quit" | "exit" => Command::Quit,
            "switch" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => Command::Switch(n),
                _ => Command::Invalid("usage: /switch <session number>".to_string()),
            },
            "ask" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => Command::Ask(n),
                _ => Command::Invalid("usage: /ask <suggestion number>".to_string()),
            },
            "voice" if !arg.is_empty() => Command::Voice(PathBuf::from(arg)),
            "voice" => Command::Invalid("usage: /voice <audio file>".to_string()),
            other => Command::Invalid(format!("unknown command: /{}", other)),
        };
        Some(command)
    }
}

struct TuiApp {
    snapshot: ChatSnapshot,
    input: String,
    notice: Option<String>,
    suggestions: Vec<&'static str>,
    scroll_back: u16,
    tick: usize,
    should_quit: bool,
}

impl TuiApp {
    fn new(snapshot: ChatSnapshot) -> Self {
        Self {
            snapshot,
            input: String::new(),
            notice: None,
            suggestions: prompts::suggestions(DEFAULT_SUGGESTION_COUNT),
            scroll_back: 0,
            tick: 0,
            should_quit: false,
        }
    }

    fn apply_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::InputChanged { text } => self.input = text,
            ChatEvent::Notice { message } => self.notice = Some(message),
            ChatEvent::ViewReplaced { .. } | ChatEvent::MessageAppended { .. } => {
                self.scroll_back = 0;
            }
            _ => {}
        }
    }

    fn timeline(&self) -> Vec<Line<'static>> {
        let snapshot = &self.snapshot;
        let mut lines = Vec::new();

        if snapshot.loading_history {
            lines.push(dim_line("loading history..."));
        } else if snapshot.messages.is_empty() {
            lines.push(dim_line("Ask anything about your crops, or try one of these (/ask <n>):"));
            for (i, question) in self.suggestions.iter().enumerate() {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {}. ", i + 1), Style::default().fg(Color::Yellow)),
                    Span::raw(*question),
                ]));
            }
        }

        for (index, message) in snapshot.messages.iter().enumerate() {
            let text = snapshot.display_text(index).unwrap_or_default();
            lines.extend(message_lines(message.role, text));
        }

        if snapshot.loading {
            let frame = SPINNER[self.tick % SPINNER.len()];
            lines.push(Line::from(Span::styled(
                format!("{} kisan mitra is typing...", frame),
                Style::default().fg(Color::Green),
            )));
        }
        lines
    }
}

fn dim_line(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::DarkGray),
    ))
}

pub async fn run_tui(engine: ChatEngine, stt: Arc<TranscriptionService>) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ChatEvent>();
    let engine = engine.with_events(event_tx.clone());

    let init = engine.clone();
    tokio::spawn(async move {
        let sessions = init.init().await;
        info!("TUI ready with {} sessions", sessions.len());
    });

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = TuiApp::new(engine.snapshot());
    let result = event_loop(&mut terminal, &mut app, &engine, &stt, &event_tx, &mut event_rx);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut TuiApp,
    engine: &ChatEngine,
    stt: &Arc<TranscriptionService>,
    event_tx: &mpsc::UnboundedSender<ChatEvent>,
    event_rx: &mut mpsc::UnboundedReceiver<ChatEvent>,
) -> Result<()> {
    loop {
        while let Ok(evt) = event_rx.try_recv() {
            app.apply_event(evt);
        }
        app.snapshot = engine.snapshot();
        app.tick = app.tick.wrapping_add(1);

        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(Duration::from_millis(60))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.should_quit = true;
                    }
                    KeyCode::Esc => app.should_quit = true,
                    KeyCode::Tab => {
                        let engine = engine.clone();
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = engine.select_next().await {
                                let _ = tx.send(ChatEvent::notice(e.to_string()));
                            }
                        });
                    }
                    KeyCode::PageUp | KeyCode::Up => {
                        app.scroll_back = app.scroll_back.saturating_add(1);
                    }
                    KeyCode::PageDown | KeyCode::Down => {
                        app.scroll_back = app.scroll_back.saturating_sub(1);
                    }
                    KeyCode::Enter => submit(app, engine, stt, event_tx),
                    KeyCode::Backspace => {
                        app.input.pop();
                        engine.set_input(app.input.clone());
                    }
                    KeyCode::Char(ch) => {
                        app.input.push(ch);
                        engine.set_input(app.input.clone());
                    }
                    _ => {}
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn submit(
    app: &mut TuiApp,
    engine: &ChatEngine,
    stt: &Arc<TranscriptionService>,
    event_tx: &mpsc::UnboundedSender<ChatEvent>,
) {
    app.notice = None;
    let Some(command) = Command::parse(&app.input) else {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine.submit_input().await;
        });
        return;
    };

    app.input.clear();
    engine.set_input("");
    let tx = event_tx.clone();
    match command {
        Command::Quit => app.should_quit = true,
        Command::New => {
            engine.create_new();
            app.suggestions = prompts::suggestions(DEFAULT_SUGGESTION_COUNT);
        }
        Command::Switch(n) => {
            let engine = engine.clone();
            tokio::spawn(async move {
                if let Err(e) = engine.select_index(n - 1).await {
                    let _ = tx.send(ChatEvent::notice(e.to_string()));
                }
            });
        }
        Command::Ask(n) => match app.suggestions.get(n - 1) {
            Some(question) => {
                let engine = engine.clone();
                let question = question.to_string();
                tokio::spawn(async move {
                    engine.send(&question).await;
                });
            }
            None => app.notice = Some(format!("no suggestion #{}", n)),
        },
        Command::Voice(path) => {
            let engine = engine.clone();
            let stt = stt.clone();
            app.notice = Some(format!("transcribing {}...", path.display()));
            tokio::spawn(async move {
                if engine.dictate(stt.as_ref(), &path).await.is_some() {
                    let _ = tx.send(ChatEvent::notice("transcript ready, press Enter to send"));
                }
            });
        }
        Command::Invalid(message) => app.notice = Some(message),
    }
}

fn draw(frame: &mut Frame, app: &TuiApp) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(frame.area());
    draw_sidebar(frame, app, columns[0]);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(columns[1]);

    let snapshot = &app.snapshot;
    let title = snapshot
        .active()
        .map(|s| s.title.clone())
        .unwrap_or_else(|| "-".to_string());
    let status = if snapshot.loading {
        "waiting for reply"
    } else if snapshot.loading_history {
        "loading"
    } else {
        "idle"
    };
    let status_line = match &app.notice {
        Some(notice) => format!("{} | {} | {}", title, status, notice),
        None => format!("{} | {} | user: {}", title, status, snapshot.user_id),
    };
    frame.render_widget(
        Paragraph::new(status_line)
            .block(Block::default().borders(Borders::ALL).title("kisan mitra")),
        chunks[0],
    );

    let lines = app.timeline();
    let height = chunks[1].height.saturating_sub(2);
    let bottom = (lines.len() as u16).saturating_sub(height);
    let timeline = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("conversation"))
        .wrap(Wrap { trim: false })
        .scroll((bottom.saturating_sub(app.scroll_back), 0));
    frame.render_widget(timeline, chunks[1]);

    frame.render_widget(
        Paragraph::new(app.input.clone())
            .block(Block::default().borders(Borders::ALL).title(HELP))
            .wrap(Wrap { trim: false }),
        chunks[2],
    );
    let cursor_x = chunks[2].x + 1 + app.input.chars().count() as u16;
    frame.set_cursor_position((cursor_x, chunks[2].y + 1));
}

fn draw_sidebar(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let items: Vec<ListItem> = app
        .snapshot
        .sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let style = if session.is_active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if session.is_active { ">" } else { " " };
            ListItem::new(Line::from(Span::styled(
                format!("{} {}. {}", marker, i + 1, session.title),
                style,
            )))
        })
        .collect();

    frame.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title("sessions")),
        area,
    );
}
