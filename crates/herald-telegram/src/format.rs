//! Rendering notifications as Telegram messages.

use std::time::Duration;

use herald_core::{InstanceId, Notification};

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const CANCEL_PREFIX: &str = "cancel:";

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Formats a duration as `850ms`, `12s` or `3m 05s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs == 0 {
        format!("{}ms", elapsed.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Renders a notification as an HTML message.
///
/// Task output written under the rich-formatting flag is sent as-is; plain
/// messages and runtime detail are escaped. Only the body is shortened to
/// fit [`MAX_MESSAGE_CHARS`], and it is cut on tag and entity boundaries
/// with open tags closed again.
pub fn render(notification: &Notification) -> String {
    let header = format!(
        "<b>{} / {}</b>",
        escape_html(notification.task_id.as_str()),
        escape_html(notification.command_id.as_str())
    );
    let header = if notification.error_occurred {
        format!("❌ {}\n\n", header)
    } else {
        format!("{}\n\n", header)
    };

    let body = if notification.formatted {
        notification.message.clone()
    } else {
        escape_html(&notification.message)
    };

    let mut footer = String::new();
    if !notification.detail.is_empty() {
        footer.push_str("\n\n");
        footer.push_str(&escape_html(&notification.detail));
    }
    if notification.cancelable {
        footer.push_str(&format!(
            "\n\nSend <code>/cancel {}</code> to stop it.",
            escape_html(notification.instance_id.as_str())
        ));
    } else if !notification.error_occurred {
        footer.push_str(&format!(
            "\n\n<i>took {}</i>",
            format_elapsed(notification.elapsed)
        ));
    }

    let fixed = header.chars().count() + footer.chars().count();
    match MAX_MESSAGE_CHARS.checked_sub(fixed) {
        Some(budget) => format!("{}{}{}", header, truncate(&body, budget), footer),
        None => truncate(&format!("{}{}{}", header, body, footer), MAX_MESSAGE_CHARS),
    }
}

/// Cuts HTML to at most `max_chars` characters, marking the cut with `…`.
///
/// Tags and entities are never split, and tags left open by the cut are
/// closed in reverse order.
pub fn truncate(html: &str, max_chars: usize) -> String {
    if html.chars().count() <= max_chars {
        return html.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    let mut open: Vec<String> = Vec::new();
    // Characters needed after the cut: the marker and the closing tags.
    let reserve = |open: &[String]| 1 + open.iter().map(|t| t.chars().count() + 3).sum::<usize>();

    for token in html_tokens(html) {
        let mut next_open = open.clone();
        match token {
            Token::Open(name, _) => next_open.push(name.to_string()),
            Token::Close(name, _) => {
                if let Some(pos) = next_open.iter().rposition(|t| t == name) {
                    next_open.remove(pos);
                }
            }
            Token::Text(_) => {}
        }

        let len = token.text().chars().count();
        if used + len + reserve(&next_open) > max_chars {
            break;
        }
        out.push_str(token.text());
        used += len;
        open = next_open;
    }

    out.push('…');
    for name in open.iter().rev() {
        out.push_str(&format!("</{}>", name));
    }
    out
}

/// One indivisible piece of an HTML message.
#[derive(Debug)]
enum Token<'a> {
    /// Opening tag: name and full text.
    Open(&'a str, &'a str),
    /// Closing tag: name and full text.
    Close(&'a str, &'a str),
    /// A character or an entity such as `&amp;`.
    Text(&'a str),
}

impl<'a> Token<'a> {
    fn text(&self) -> &'a str {
        match self {
            Token::Open(_, text) | Token::Close(_, text) | Token::Text(text) => text,
        }
    }
}

fn html_tokens(html: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = html;
    while let Some(c) = rest.chars().next() {
        let token_len = match c {
            '<' => rest.find('>').map(|end| end + 1),
            '&' => rest
                .find(';')
                .filter(|&end| end > 1 && rest[1..end].chars().all(is_entity_char))
                .map(|end| end + 1),
            _ => None,
        }
        .unwrap_or(c.len_utf8());

        let text = &rest[..token_len];
        let token = if c == '<' && token_len > 1 {
            let inner = &text[1..text.len() - 1];
            match inner.strip_prefix('/') {
                Some(name) => Token::Close(tag_name(name), text),
                None => Token::Open(tag_name(inner), text),
            }
        } else {
            Token::Text(text)
        };
        tokens.push(token);
        rest = &rest[token_len..];
    }
    tokens
}

fn is_entity_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '#'
}

fn tag_name(inner: &str) -> &str {
    let inner = inner.trim_start();
    let end = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    &inner[..end]
}

/// Callback payload of the inline "Cancel" button.
pub fn cancel_callback_data(instance_id: &InstanceId) -> String {
    format!("{}{}", CANCEL_PREFIX, instance_id)
}

/// Extracts the instance from a "Cancel" button payload.
pub fn parse_cancel_callback(data: &str) -> Option<InstanceId> {
    data.strip_prefix(CANCEL_PREFIX)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(InstanceId::from)
}
