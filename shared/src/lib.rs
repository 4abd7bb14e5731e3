use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const WIDTH: f32 = 800.0;
pub const HEIGHT: f32 = 600.0;
/// Strip at the top of the window reserved for the scoreboard.
pub const HUD_HEIGHT: f32 = 60.0;
pub const FIELD_TOP: f32 = HUD_HEIGHT;
pub const FIELD_BOTTOM: f32 = HEIGHT;
pub const FIELD_HEIGHT: f32 = FIELD_BOTTOM - FIELD_TOP;
pub const FIELD_CENTER_X: f32 = WIDTH / 2.0;
pub const FIELD_CENTER_Y: f32 = FIELD_TOP + FIELD_HEIGHT / 2.0;

pub const PADDLE_WIDTH: f32 = 12.0;
pub const PADDLE_HEIGHT: f32 = 48.0;
/// Pixels per tick.
pub const PADDLE_SPEED: f32 = 5.0;
pub const BALL_SIZE: f32 = 14.0;
/// Pixels per tick.
pub const BALL_SPEED: f32 = 6.0;

/// Distance from a side wall to the vertical post of its goal.
pub const GOAL_INSET: f32 = 40.0;
pub const GOAL_BAR_LENGTH: f32 = 48.0;
pub const GOAL_THICKNESS: f32 = 18.0;
/// A third of the playable height, rounded down.
pub const GOAL_HEIGHT: f32 = 178.0;
pub const GOAL_Y: f32 = FIELD_TOP + (FIELD_HEIGHT - GOAL_HEIGHT) / 2.0;
pub const PADDLE_DISTANCE_FROM_GOAL: f32 = GOAL_INSET + 70.0;

pub const TIME_LIMIT_SECONDS: f32 = 180.0;
pub const TICK_RATE: u32 = 60;

/// Longest input line accepted from a client, newline excluded.
pub const MAX_LINE_BYTES: usize = 1024;

/// Vertical command sent by a player. Screen y grows downwards, so `Up`
/// moves the paddle towards the scoreboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    #[default]
    Still,
    Down,
}

impl Direction {
    pub fn from_wire(value: i64) -> Result<Self, DecodeError> {
        match value {
            -1 => Ok(Direction::Up),
            0 => Ok(Direction::Still),
            1 => Ok(Direction::Down),
            other => Err(DecodeError::OutOfRange(other)),
        }
    }

    pub fn as_wire(self) -> i8 {
        match self {
            Direction::Up => -1,
            Direction::Still => 0,
            Direction::Down => 1,
        }
    }

    /// Signed unit multiplier applied to the paddle speed.
    pub fn factor(self) -> f32 {
        f32::from(self.as_wire())
    }
}

/// Outcome of a finished match. Serialized as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Winner {
    #[default]
    None,
    Player1,
    Player2,
}

impl From<Winner> for u8 {
    fn from(winner: Winner) -> u8 {
        match winner {
            Winner::None => 0,
            Winner::Player1 => 1,
            Winner::Player2 => 2,
        }
    }
}

impl TryFrom<u8> for Winner {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Winner::None),
            1 => Ok(Winner::Player1),
            2 => Ok(Winner::Player2),
            other => Err(format!("unknown winner {}", other)),
        }
    }
}

/// Client to server: the latest direction for the sender's paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMessage {
    pub direction: i8,
}

/// Server to client: the full match state, sent once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    #[serde(rename = "paddle1Y")]
    pub paddle1_y: f32,
    #[serde(rename = "paddle2Y")]
    pub paddle2_y: f32,
    #[serde(rename = "ballX")]
    pub ball_x: f32,
    #[serde(rename = "ballY")]
    pub ball_y: f32,
    #[serde(rename = "ballVX")]
    pub ball_vx: f32,
    #[serde(rename = "ballVY")]
    pub ball_vy: f32,
    pub score1: u32,
    pub score2: u32,
    pub started: bool,
    #[serde(rename = "timeRemaining")]
    pub time_remaining: f32,
    pub over: bool,
    pub winner: Winner,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("input line is {0} bytes, limit is 1024")]
    TooLong(usize),
    #[error("input line is not valid UTF-8")]
    InvalidUtf8,
    #[error("malformed input message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("input message has no direction")]
    MissingDirection,
    #[error("direction {0} is outside -1..=1")]
    OutOfRange(i64),
}

#[derive(Deserialize)]
struct RawInput {
    direction: Option<i64>,
}

/// Decodes one input line (terminator already stripped).
///
/// Blank lines yield `Ok(None)`. Anything else must be a JSON object with an
/// integer `direction` in `-1..=1`; out-of-range values are rejected rather
/// than clamped.
pub fn decode_input(line: &[u8]) -> Result<Option<Direction>, DecodeError> {
    if line.len() > MAX_LINE_BYTES {
        return Err(DecodeError::TooLong(line.len()));
    }
    let text = std::str::from_utf8(line).map_err(|_| DecodeError::InvalidUtf8)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let raw: RawInput = serde_json::from_str(text)?;
    let value = raw.direction.ok_or(DecodeError::MissingDirection)?;
    Direction::from_wire(value).map(Some)
}

/// Newline-terminated input line for `direction`.
pub fn encode_input(direction: Direction) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&InputMessage {
        direction: direction.as_wire(),
    })?;
    line.push('\n');
    Ok(line)
}

/// Newline-terminated compact JSON record for one tick.
pub fn encode_state(state: &StateMessage) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(state)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_state(line: &str) -> serde_json::Result<StateMessage> {
    serde_json::from_str(line.trim())
}
