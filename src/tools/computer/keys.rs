//! Key-name and key-combo parsing.
//!
//! Combos are `+`-separated: every part but the last is held while the last
//! one is tapped, e.g. `ctrl+shift+s`.

use crate::error::ToolError;

/// A keyboard key the desktop backend knows how to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyName {
    Control,
    Shift,
    Alt,
    /// Windows / Command / Super key.
    Meta,
    Return,
    Tab,
    Escape,
    Backspace,
    Delete,
    Space,
    CapsLock,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Function(u8),
    Char(char),
}

impl KeyName {
    /// Parse one key name. Case-insensitive; single characters map to themselves.
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Self::Char(c.to_ascii_lowercase()));
        }
        if raw == " " {
            return Ok(Self::Space);
        }

        let lowered = trimmed.to_ascii_lowercase();
        let key = match lowered.as_str() {
            "ctrl" | "control" => Self::Control,
            "shift" => Self::Shift,
            "alt" | "option" | "opt" => Self::Alt,
            "win" | "windows" | "super" | "meta" | "cmd" | "command" => Self::Meta,
            "enter" | "return" => Self::Return,
            "tab" => Self::Tab,
            "esc" | "escape" => Self::Escape,
            "backspace" => Self::Backspace,
            "delete" | "del" => Self::Delete,
            "space" | "spacebar" => Self::Space,
            "capslock" | "caps_lock" => Self::CapsLock,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" | "page_up" | "pgup" | "prior" => Self::PageUp,
            "pagedown" | "page_down" | "pgdn" | "next" => Self::PageDown,
            "up" | "arrowup" | "arrow_up" => Self::Up,
            "down" | "arrowdown" | "arrow_down" => Self::Down,
            "left" | "arrowleft" | "arrow_left" => Self::Left,
            "right" | "arrowright" | "arrow_right" => Self::Right,
            other => match other.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                Some(n @ 1..=12) => Self::Function(n),
                _ => {
                    return Err(ToolError::InvalidArguments(format!(
                        "unsupported key name `{trimmed}`"
                    )))
                }
            },
        };
        Ok(key)
    }
}

/// Parse a `+`-separated combo into keys in press order.
pub fn parse_combo(combo: &str) -> Result<Vec<KeyName>, ToolError> {
    if combo.trim().is_empty() {
        return Err(ToolError::InvalidArguments("key combo must not be empty".into()));
    }
    // A literal "+" key ("ctrl++") leaves an empty segment behind.
    let mut keys = Vec::new();
    let mut parts = combo.split('+').peekable();
    while let Some(part) = parts.next() {
        if part.trim().is_empty() {
            if parts.peek().is_some_and(|next| next.trim().is_empty()) {
                parts.next();
                keys.push(KeyName::Char('+'));
                continue;
            }
            return Err(ToolError::InvalidArguments(format!(
                "malformed key combo `{combo}`"
            )));
        }
        keys.push(KeyName::parse(part)?);
    }
    Ok(keys)
}
