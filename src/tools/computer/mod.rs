//! Screen automation tool: mouse, keyboard and screenshots.
//!
//! The model addresses a fixed reference resolution. Coordinates are rescaled
//! to the real screen before input is sent, and screenshots are resized back
//! to the reference resolution before they are returned.

pub mod desktop;
pub mod keys;
pub mod scaling;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::Deserialize;
use serde_json::Value;

use self::desktop::{Desktop, InputOp, MouseButton, ScrollAxis, Stroke};
use self::keys::{parse_combo, KeyName};
use self::scaling::ScreenScaler;
use super::{parse_args, ImagePayload, Tool, ToolOutput};
use crate::config::ComputerConfig;
use crate::error::ToolError;
use crate::types::ToolDefinition;

pub use self::desktop::native_desktop;

const DEFAULT_SCROLL_AMOUNT: u32 = 3;
const MAX_DURATION_SECS: f64 = 10.0;
const MULTI_CLICK_INTERVAL: Duration = Duration::from_millis(100);

const ACTIONS: &[&str] = &[
    "screenshot",
    "cursor_position",
    "mouse_move",
    "left_click",
    "right_click",
    "middle_click",
    "double_click",
    "triple_click",
    "left_click_drag",
    "left_mouse_down",
    "left_mouse_up",
    "scroll",
    "type",
    "key",
    "hold_key",
    "wait",
];

/// The `computer` tool.
pub struct ComputerTool {
    desktop: Arc<dyn Desktop>,
    reference: (u32, u32),
    screenshot_delay: Duration,
    screenshot_dir: Option<PathBuf>,
}

impl ComputerTool {
    pub fn new(desktop: Arc<dyn Desktop>, config: &ComputerConfig) -> Self {
        Self {
            desktop,
            reference: (config.reference_width, config.reference_height),
            screenshot_delay: Duration::from_millis(config.screenshot_delay_ms),
            screenshot_dir: None,
        }
    }

    /// Also write every screenshot as a PNG file under `dir`.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, ToolError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Desktop) -> Result<T, ToolError> + Send + 'static,
    {
        let desktop = Arc::clone(&self.desktop);
        tokio::task::spawn_blocking(move || f(desktop.as_ref()))
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("desktop task failed: {e}")))?
    }

    async fn scaler(&self) -> Result<ScreenScaler, ToolError> {
        let actual = self.blocking(|d| d.screen_size()).await?;
        Ok(ScreenScaler::new(self.reference, actual))
    }

    async fn screenshot(&self) -> Result<ToolOutput, ToolError> {
        let reference = self.reference;
        let dir = self.screenshot_dir.clone();
        let image = self
            .blocking(move |d| capture_frame(d, reference, dir.as_deref()))
            .await?;
        Ok(ToolOutput::image(image))
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Args {
    action: String,
    coordinate: Option<Vec<f64>>,
    x: Option<f64>,
    y: Option<f64>,
    start_coordinate: Option<Vec<f64>>,
    text: Option<String>,
    key: Option<String>,
    scroll_direction: Option<String>,
    scroll_amount: Option<i64>,
    duration: Option<f64>,
}

type Point = (i64, i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// A validated action, still in reference coordinates.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Screenshot,
    CursorPosition,
    MouseMove(Point),
    Click {
        button: MouseButton,
        count: u8,
        at: Option<Point>,
        modifiers: Vec<KeyName>,
    },
    Drag {
        from: Option<Point>,
        to: Point,
    },
    MouseDown,
    MouseUp,
    Scroll {
        direction: ScrollDirection,
        amount: u32,
        at: Option<Point>,
    },
    Type(String),
    Key(Vec<KeyName>),
    HoldKey {
        keys: Vec<KeyName>,
        duration: Duration,
    },
    Wait(Duration),
}

impl Action {
    fn parse(args: Args) -> Result<Self, ToolError> {
        let click = |button, count| -> Result<Action, ToolError> {
            Ok(Action::Click {
                button,
                count,
                at: optional_point(&args, "coordinate")?,
                modifiers: match args.key.as_deref().map(str::trim) {
                    Some(combo) if !combo.is_empty() => parse_combo(combo)?,
                    _ => Vec::new(),
                },
            })
        };

        let action = match args.action.trim() {
            "screenshot" => Action::Screenshot,
            "cursor_position" => Action::CursorPosition,
            "mouse_move" | "move" => Action::MouseMove(required_point(&args)?),
            "left_click" | "click" => click(MouseButton::Left, 1)?,
            "right_click" => click(MouseButton::Right, 1)?,
            "middle_click" => click(MouseButton::Middle, 1)?,
            "double_click" => click(MouseButton::Left, 2)?,
            "triple_click" => click(MouseButton::Left, 3)?,
            "left_click_drag" => Action::Drag {
                from: optional_point(&args, "start_coordinate")?,
                to: required_point(&args)?,
            },
            "left_mouse_down" => Action::MouseDown,
            "left_mouse_up" => Action::MouseUp,
            "scroll" => Action::Scroll {
                direction: scroll_direction(args.scroll_direction.as_deref())?,
                amount: match args.scroll_amount {
                    None => DEFAULT_SCROLL_AMOUNT,
                    Some(n) => u32::try_from(n).map_err(|_| {
                        ToolError::InvalidArguments(
                            "scroll_amount must be a non-negative integer".into(),
                        )
                    })?,
                },
                at: optional_point(&args, "coordinate")?,
            },
            "type" => match args.text.as_deref() {
                Some(text) if !text.is_empty() => Action::Type(text.to_string()),
                _ => return Err(missing("text", "type")),
            },
            "key" | "hotkey" => {
                let combo = args.text.as_deref().ok_or_else(|| missing("text", "key"))?;
                Action::Key(parse_combo(combo)?)
            }
            "hold_key" => {
                let combo = args
                    .text
                    .as_deref()
                    .ok_or_else(|| missing("text", "hold_key"))?;
                Action::HoldKey {
                    keys: parse_combo(combo)?,
                    duration: bounded_duration(args.duration)?,
                }
            }
            "wait" => Action::Wait(bounded_duration(args.duration)?),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "unsupported action `{other}`; expected one of: {}",
                    ACTIONS.join(", ")
                )))
            }
        };
        Ok(action)
    }
}

fn missing(field: &str, action: &str) -> ToolError {
    ToolError::InvalidArguments(format!("`{field}` is required for action `{action}`"))
}

fn to_point(field: &str, values: &[f64]) -> Result<Point, ToolError> {
    match values {
        [x, y] if x.is_finite() && y.is_finite() => Ok((x.round() as i64, y.round() as i64)),
        _ => Err(ToolError::InvalidArguments(format!(
            "`{field}` must be an [x, y] pair of numbers"
        ))),
    }
}

/// `coordinate` / `start_coordinate`, falling back to `x`/`y` for `coordinate`.
fn optional_point(args: &Args, field: &str) -> Result<Option<Point>, ToolError> {
    let values = match field {
        "start_coordinate" => &args.start_coordinate,
        _ => &args.coordinate,
    };
    if let Some(values) = values {
        return to_point(field, values).map(Some);
    }
    if field != "coordinate" {
        return Ok(None);
    }
    match (args.x, args.y) {
        (Some(x), Some(y)) => to_point(field, &[x, y]).map(Some),
        (None, None) => Ok(None),
        _ => Err(ToolError::InvalidArguments(
            "both `x` and `y` are required when either is given".into(),
        )),
    }
}

fn required_point(args: &Args) -> Result<Point, ToolError> {
    optional_point(args, "coordinate")?
        .ok_or_else(|| missing("coordinate", args.action.trim()))
}

fn scroll_direction(raw: Option<&str>) -> Result<ScrollDirection, ToolError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("up") => Ok(ScrollDirection::Up),
        Some("down") => Ok(ScrollDirection::Down),
        Some("left") => Ok(ScrollDirection::Left),
        Some("right") => Ok(ScrollDirection::Right),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "invalid scroll_direction `{other}`; expected up, down, left or right"
        ))),
        None => Err(missing("scroll_direction", "scroll")),
    }
}

fn bounded_duration(raw: Option<f64>) -> Result<Duration, ToolError> {
    match raw {
        Some(secs) if secs.is_finite() && secs > 0.0 && secs <= MAX_DURATION_SECS => {
            Ok(Duration::from_secs_f64(secs))
        }
        Some(_) => Err(ToolError::InvalidArguments(format!(
            "duration must be greater than 0 and at most {MAX_DURATION_SECS} seconds"
        ))),
        None => Err(ToolError::InvalidArguments("`duration` is required".into())),
    }
}

// ---------------------------------------------------------------------------
// Input plans
// ---------------------------------------------------------------------------

fn move_op(scaler: &ScreenScaler, point: Point) -> Result<InputOp, ToolError> {
    let (x, y) = scaler.to_screen(point.0, point.1)?;
    Ok(InputOp::MoveTo { x, y })
}

fn press_all(keys: &[KeyName]) -> impl Iterator<Item = InputOp> + '_ {
    keys.iter().map(|&key| InputOp::Key {
        key,
        stroke: Stroke::Press,
    })
}

fn release_all(keys: &[KeyName]) -> impl Iterator<Item = InputOp> + '_ {
    keys.iter().rev().map(|&key| InputOp::Key {
        key,
        stroke: Stroke::Release,
    })
}

/// Translate a validated action into screen-space input ops.
///
/// Returns `None` for actions that send no input.
fn plan(action: &Action, scaler: &ScreenScaler) -> Result<Option<Vec<InputOp>>, ToolError> {
    let mut ops = Vec::new();
    match action {
        Action::Screenshot | Action::CursorPosition | Action::Wait(_) => return Ok(None),
        Action::MouseMove(point) => ops.push(move_op(scaler, *point)?),
        Action::Click {
            button,
            count,
            at,
            modifiers,
        } => {
            if let Some(point) = at {
                ops.push(move_op(scaler, *point)?);
            }
            ops.extend(press_all(modifiers));
            for i in 0..*count {
                if i > 0 {
                    ops.push(InputOp::Pause(MULTI_CLICK_INTERVAL));
                }
                ops.push(InputOp::Button {
                    button: *button,
                    stroke: Stroke::Click,
                });
            }
            ops.extend(release_all(modifiers));
        }
        Action::Drag { from, to } => {
            if let Some(point) = from {
                ops.push(move_op(scaler, *point)?);
            }
            let end = move_op(scaler, *to)?;
            ops.push(InputOp::Button {
                button: MouseButton::Left,
                stroke: Stroke::Press,
            });
            ops.push(end);
            ops.push(InputOp::Button {
                button: MouseButton::Left,
                stroke: Stroke::Release,
            });
        }
        Action::MouseDown => ops.push(InputOp::Button {
            button: MouseButton::Left,
            stroke: Stroke::Press,
        }),
        Action::MouseUp => ops.push(InputOp::Button {
            button: MouseButton::Left,
            stroke: Stroke::Release,
        }),
        Action::Scroll {
            direction,
            amount,
            at,
        } => {
            if let Some(point) = at {
                ops.push(move_op(scaler, *point)?);
            }
            let amount = i32::try_from(*amount).unwrap_or(i32::MAX);
            let (amount, axis) = match direction {
                ScrollDirection::Up => (-amount, ScrollAxis::Vertical),
                ScrollDirection::Down => (amount, ScrollAxis::Vertical),
                ScrollDirection::Left => (-amount, ScrollAxis::Horizontal),
                ScrollDirection::Right => (amount, ScrollAxis::Horizontal),
            };
            if amount != 0 {
                ops.push(InputOp::Scroll { amount, axis });
            }
        }
        Action::Type(text) => ops.push(InputOp::Text(text.clone())),
        Action::Key(keys) => {
            if let Some((last, held)) = keys.split_last() {
                ops.extend(press_all(held));
                ops.push(InputOp::Key {
                    key: *last,
                    stroke: Stroke::Click,
                });
                ops.extend(release_all(held));
            }
        }
        Action::HoldKey { keys, duration } => {
            ops.extend(press_all(keys));
            ops.push(InputOp::Pause(*duration));
            ops.extend(release_all(keys));
        }
    }
    Ok(Some(ops))
}

// ---------------------------------------------------------------------------
// Screenshots
// ---------------------------------------------------------------------------

/// Capture the screen, resize it to `reference`, encode as PNG and
/// optionally save it under `dir`.
fn capture_frame(
    desktop: &dyn Desktop,
    reference: (u32, u32),
    dir: Option<&Path>,
) -> Result<ImagePayload, ToolError> {
    let mut frame = desktop.capture()?;
    if frame.dimensions() != reference {
        frame = image::imageops::resize(&frame, reference.0, reference.1, FilterType::Triangle);
    }

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(frame)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ToolError::ExecutionFailed(format!("failed to encode screenshot: {e}")))?;

    let saved_path = match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                ToolError::ExecutionFailed(format!(
                    "failed to create screenshot dir {}: {e}",
                    dir.display()
                ))
            })?;
            let path = dir.join(format!("screenshot_{}.png", uuid::Uuid::new_v4().simple()));
            std::fs::write(&path, &png).map_err(|e| {
                ToolError::ExecutionFailed(format!(
                    "failed to save screenshot {}: {e}",
                    path.display()
                ))
            })?;
            Some(path)
        }
        None => None,
    };

    Ok(ImagePayload {
        png,
        width: reference.0,
        height: reference.1,
        saved_path,
    })
}

// ---------------------------------------------------------------------------
// Tool impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Tool for ComputerTool {
    fn name(&self) -> &'static str {
        "computer"
    }

    fn definition(&self) -> ToolDefinition {
        let (w, h) = self.reference;
        ToolDefinition {
            name: self.name().into(),
            description: format!(
                "Control the mouse and keyboard of the desktop and take screenshots. \
                 The screen is {w}x{h} pixels; coordinates are [x, y] with the origin at the \
                 top-left corner. Every action except cursor_position returns a fresh screenshot."
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ACTIONS,
                        "description": "The action to perform"
                    },
                    "coordinate": {
                        "type": "array",
                        "items": { "type": "integer" },
                        "minItems": 2,
                        "maxItems": 2,
                        "description": "[x, y] target for mouse actions"
                    },
                    "start_coordinate": {
                        "type": "array",
                        "items": { "type": "integer" },
                        "minItems": 2,
                        "maxItems": 2,
                        "description": "[x, y] drag start for left_click_drag; defaults to the cursor"
                    },
                    "text": {
                        "type": "string",
                        "description": "Text to type, or a key combo such as ctrl+shift+s for key and hold_key"
                    },
                    "key": {
                        "type": "string",
                        "description": "Modifier combo held during a click, e.g. shift or ctrl+alt"
                    },
                    "scroll_direction": {
                        "type": "string",
                        "enum": ["up", "down", "left", "right"]
                    },
                    "scroll_amount": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Number of scroll clicks (default 3)"
                    },
                    "duration": {
                        "type": "number",
                        "exclusiveMinimum": 0,
                        "maximum": MAX_DURATION_SECS,
                        "description": "Seconds for hold_key and wait"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let action = Action::parse(parse_args(input)?)?;
        tracing::debug!(?action, "computer action");

        match &action {
            Action::Screenshot => return self.screenshot().await,
            Action::CursorPosition => {
                let scaler = self.scaler().await?;
                let (x, y) = self.blocking(|d| d.cursor_position()).await?;
                let (x, y) = scaler.to_reference(x, y);
                return Ok(ToolOutput::text(format!("X={x},Y={y}")));
            }
            Action::Wait(duration) => tokio::time::sleep(*duration).await,
            _ => {
                let scaler = self.scaler().await?;
                if let Some(ops) = plan(&action, &scaler)? {
                    self.blocking(move |d| d.perform(&ops)).await?;
                }
            }
        }

        if !self.screenshot_delay.is_zero() {
            tokio::time::sleep(self.screenshot_delay).await;
        }
        self.screenshot().await
    }
}
