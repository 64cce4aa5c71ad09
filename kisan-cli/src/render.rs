//! Message fragments as ratatui lines

use kisan_core::conversation::{render_content, Role};
use kisan_core::render::{strip_control_chars, Block, Inline};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Lines for one message: a role label followed by its rendered body
pub fn message_lines(role: Role, text: &str) -> Vec<Line<'static>> {
    let (label, color) = match role {
        Role::Human => ("you", Color::Cyan),
        Role::Bot => ("kisan mitra", Color::Green),
    };
    let mut lines = vec![Line::from(Span::styled(
        format!("[{}]", label),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))];
    lines.extend(body_lines(role, text, Style::default()));
    lines.push(Line::default());
    lines
}

/// Body of a message; bot text is markdown-styled, human text is verbatim
pub fn body_lines(role: Role, text: &str, base: Style) -> Vec<Line<'static>> {
    let document = render_content(role, text);
    let mut lines = Vec::new();

    for block in &document.blocks {
        match block {
            Block::Line(inlines) => lines.push(Line::from(spans(inlines, base))),
            Block::Heading(inlines) => {
                let style = base
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                lines.push(Line::from(spans(inlines, style)));
            }
            Block::List(items) => {
                for item in items {
                    let mut row = vec![Span::styled("  • ", base)];
                    row.extend(spans(item, base));
                    lines.push(Line::from(row));
                }
            }
        }
    }
    lines
}

fn spans(inlines: &[Inline], base: Style) -> Vec<Span<'static>> {
    inlines
        .iter()
        .filter(|inline| !inline.text().is_empty())
        .map(|inline| {
            let text = strip_control_chars(inline.text()).into_owned();
            match inline {
                Inline::Text(_) => Span::styled(text, base),
                Inline::Bold(_) => Span::styled(text, base.add_modifier(Modifier::BOLD)),
            }
        })
        .collect()
}
