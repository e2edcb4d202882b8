//! Desktop input and capture backend.
//!
//! [`Desktop`] is the seam between the computer tool and the OS. Calls are
//! blocking; the tool runs them on tokio's blocking pool.

use std::time::Duration;

use image::RgbaImage;

use super::keys::KeyName;
use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Press, release, or press-then-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    Press,
    Release,
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAxis {
    Vertical,
    Horizontal,
}

/// One primitive input step, in screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum InputOp {
    MoveTo { x: i32, y: i32 },
    Button { button: MouseButton, stroke: Stroke },
    /// Positive amounts scroll down / right.
    Scroll { amount: i32, axis: ScrollAxis },
    Text(String),
    Key { key: KeyName, stroke: Stroke },
    Pause(Duration),
}

/// Host desktop: screen geometry, synthetic input and screen capture.
pub trait Desktop: Send + Sync + 'static {
    /// Size of the primary screen in the coordinate space input uses.
    fn screen_size(&self) -> Result<(u32, u32), ToolError>;

    /// Run `ops` in order.
    fn perform(&self, ops: &[InputOp]) -> Result<(), ToolError>;

    fn cursor_position(&self) -> Result<(i32, i32), ToolError>;

    /// Capture the primary screen.
    fn capture(&self) -> Result<RgbaImage, ToolError>;
}

/// The desktop of the machine we run on.
#[cfg(any(windows, target_os = "macos"))]
pub fn native_desktop() -> Result<std::sync::Arc<dyn Desktop>, ToolError> {
    Ok(std::sync::Arc::new(enigo_backend::EnigoDesktop::new()?))
}

/// The desktop of the machine we run on.
#[cfg(not(any(windows, target_os = "macos")))]
pub fn native_desktop() -> Result<std::sync::Arc<dyn Desktop>, ToolError> {
    Err(ToolError::ExecutionFailed(
        "screen automation is not supported on this platform".into(),
    ))
}

#[cfg(any(windows, target_os = "macos"))]
mod enigo_backend {
    use enigo::{
        Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings,
    };
    use image::RgbaImage;
    use xcap::Monitor;

    use super::{Desktop, InputOp, KeyName, MouseButton, ScrollAxis, Stroke};
    use crate::error::ToolError;

    /// `enigo` for input, `xcap` for capture.
    ///
    /// A fresh `Enigo` is created per call so the backend stays `Send + Sync`.
    pub struct EnigoDesktop {
        settings: Settings,
    }

    impl EnigoDesktop {
        pub fn new() -> Result<Self, ToolError> {
            let settings = Settings {
                // Held buttons/keys must survive between tool calls
                // (left_mouse_down, then left_mouse_up later).
                release_keys_when_dropped: false,
                ..Settings::default()
            };
            // Probe once so missing permissions surface at startup.
            Enigo::new(&settings).map_err(input_error)?;
            Ok(Self { settings })
        }

        fn enigo(&self) -> Result<Enigo, ToolError> {
            Enigo::new(&self.settings).map_err(input_error)
        }
    }

    impl Desktop for EnigoDesktop {
        fn screen_size(&self) -> Result<(u32, u32), ToolError> {
            let (w, h) = self.enigo()?.main_display().map_err(input_error)?;
            Ok((w.max(1) as u32, h.max(1) as u32))
        }

        fn perform(&self, ops: &[InputOp]) -> Result<(), ToolError> {
            let mut enigo = self.enigo()?;
            for op in ops {
                match op {
                    InputOp::MoveTo { x, y } => enigo
                        .move_mouse(*x, *y, Coordinate::Abs)
                        .map_err(input_error)?,
                    InputOp::Button { button, stroke } => enigo
                        .button(map_button(*button), map_stroke(*stroke))
                        .map_err(input_error)?,
                    InputOp::Scroll { amount, axis } => {
                        let axis = match axis {
                            ScrollAxis::Vertical => Axis::Vertical,
                            ScrollAxis::Horizontal => Axis::Horizontal,
                        };
                        enigo.scroll(*amount, axis).map_err(input_error)?
                    }
                    InputOp::Text(text) => enigo.text(text).map_err(input_error)?,
                    InputOp::Key { key, stroke } => enigo
                        .key(map_key(*key), map_stroke(*stroke))
                        .map_err(input_error)?,
                    InputOp::Pause(duration) => std::thread::sleep(*duration),
                }
            }
            Ok(())
        }

        fn cursor_position(&self) -> Result<(i32, i32), ToolError> {
            self.enigo()?.location().map_err(input_error)
        }

        fn capture(&self) -> Result<RgbaImage, ToolError> {
            let monitors = Monitor::all().map_err(capture_error)?;
            let primary = monitors
                .iter()
                .find(|m| m.is_primary())
                .or_else(|| monitors.first())
                .ok_or_else(|| ToolError::ExecutionFailed("no monitor found".into()))?;
            primary.capture_image().map_err(capture_error)
        }
    }

    fn map_button(button: MouseButton) -> Button {
        match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        }
    }

    fn map_stroke(stroke: Stroke) -> Direction {
        match stroke {
            Stroke::Press => Direction::Press,
            Stroke::Release => Direction::Release,
            Stroke::Click => Direction::Click,
        }
    }

    fn map_key(key: KeyName) -> Key {
        match key {
            KeyName::Control => Key::Control,
            KeyName::Shift => Key::Shift,
            KeyName::Alt => Key::Alt,
            KeyName::Meta => Key::Meta,
            KeyName::Return => Key::Return,
            KeyName::Tab => Key::Tab,
            KeyName::Escape => Key::Escape,
            KeyName::Backspace => Key::Backspace,
            KeyName::Delete => Key::Delete,
            KeyName::Space => Key::Space,
            KeyName::CapsLock => Key::CapsLock,
            KeyName::Home => Key::Home,
            KeyName::End => Key::End,
            KeyName::PageUp => Key::PageUp,
            KeyName::PageDown => Key::PageDown,
            KeyName::Up => Key::UpArrow,
            KeyName::Down => Key::DownArrow,
            KeyName::Left => Key::LeftArrow,
            KeyName::Right => Key::RightArrow,
            KeyName::Function(n) => match n {
                1 => Key::F1,
                2 => Key::F2,
                3 => Key::F3,
                4 => Key::F4,
                5 => Key::F5,
                6 => Key::F6,
                7 => Key::F7,
                8 => Key::F8,
                9 => Key::F9,
                10 => Key::F10,
                11 => Key::F11,
                _ => Key::F12,
            },
            KeyName::Char(c) => Key::Unicode(c),
        }
    }

    fn input_error(err: impl std::fmt::Display) -> ToolError {
        ToolError::ExecutionFailed(format!("input backend: {err}"))
    }

    fn capture_error(err: impl std::fmt::Display) -> ToolError {
        ToolError::ExecutionFailed(format!("screen capture: {err}"))
    }
}
