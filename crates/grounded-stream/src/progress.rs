//! Staged progress of one generation stream
//!
//! [`reduce`] is a pure `(state, frame) -> state` function: the whole
//! machine is the incoming frame sequence plus a [`ProgressState`] record.
//!
//! | event | effect |
//! |---|---|
//! | `status` | stage := payload `stage`, verbatim |
//! | `delta` | append payload `text`, refresh preview |
//! | `final` | stage := `done`, drop buffer, terminal result |
//! | `error` | drop buffer, terminal failure; stage frozen |
//! | other | ignored |

use crate::error::StreamError;
use crate::frame::SseFrame;
use crate::preview::extract_preview;
use grounded_message::GenerationResult;
use serde_json::Value;

/// Known stages in display order
pub const STAGES: [&str; 5] = ["retrieving", "generating", "verifying", "persisting", "done"];

/// Stage forced by a `final` event
pub const DONE: &str = "done";

/// Rank of a stage token; unknown stages rank `-1` and light nothing.
#[must_use]
pub fn stage_rank(stage: &str) -> i32 {
    STAGES
        .iter()
        .position(|known| *known == stage)
        .and_then(|index| i32::try_from(index).ok())
        .unwrap_or(-1)
}

/// Display state of one stage indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Complete,
    Active,
    Pending,
}

/// Indicator for each entry of [`STAGES`] given the current stage
#[must_use]
pub fn indicators(stage: &str) -> [Indicator; 5] {
    let rank = stage_rank(stage);
    let mut out = [Indicator::Pending; 5];
    for (index, slot) in (0_i32..).zip(out.iter_mut()) {
        *slot = if index < rank || (index == rank && stage == DONE) {
            Indicator::Complete
        } else if index == rank {
            Indicator::Active
        } else {
            Indicator::Pending
        };
    }
    out
}

/// How a stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// `final` payload, unchanged
    Completed(GenerationResult),
    /// `error` event detail
    ServerError { detail: String },
    /// A terminal event whose payload did not have the expected shape
    MalformedPayload { event: String, reason: String },
}

impl Terminal {
    /// Collapse into the single terminal outcome handed to the caller
    pub fn into_result(self) -> Result<GenerationResult, StreamError> {
        match self {
            Terminal::Completed(result) => Ok(result),
            Terminal::ServerError { detail } => Err(StreamError::ServerReported { detail }),
            Terminal::MalformedPayload { event, reason } => {
                Err(StreamError::Payload { event, reason })
            }
        }
    }
}

/// Explicit progress record for one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    stage: String,
    buffer: String,
    preview: String,
    terminal: Option<Terminal>,
    frames_seen: usize,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            stage: STAGES[0].to_string(),
            buffer: String::new(),
            preview: String::new(),
            terminal: None,
            frames_seen: 0,
        }
    }
}

impl ProgressState {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage token, possibly one this crate does not know
    #[inline]
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    #[inline]
    #[must_use]
    pub fn rank(&self) -> i32 {
        stage_rank(&self.stage)
    }

    #[inline]
    #[must_use]
    pub fn indicators(&self) -> [Indicator; 5] {
        indicators(&self.stage)
    }

    /// Live preview derived from the accumulated deltas
    #[inline]
    #[must_use]
    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Raw accumulated delta text
    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    #[inline]
    #[must_use]
    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    #[inline]
    #[must_use]
    pub fn terminal(&self) -> Option<&Terminal> {
        self.terminal.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    #[inline]
    #[must_use]
    pub fn into_terminal(self) -> Option<Terminal> {
        self.terminal
    }

    fn discard_progress(&mut self) {
        self.buffer.clear();
        self.preview.clear();
    }
}

/// Apply one frame. Frames after a terminal event leave the state unchanged.
#[must_use]
pub fn reduce(mut state: ProgressState, frame: &SseFrame) -> ProgressState {
    if state.is_terminal() {
        return state;
    }
    state.frames_seen += 1;

    match frame.event.as_str() {
        "status" => match frame.data.get("stage").and_then(Value::as_str) {
            Some(stage) => state.stage = stage.to_string(),
            None => tracing::warn!("status event without a stage; ignored"),
        },
        "delta" => match frame.data.get("text").and_then(Value::as_str) {
            Some(text) => {
                state.buffer.push_str(text);
                state.preview = extract_preview(&state.buffer);
            }
            None => tracing::warn!("delta event without text; ignored"),
        },
        "final" => {
            state.discard_progress();
            state.terminal = Some(
                match serde_json::from_value::<GenerationResult>(frame.data.clone()) {
                    Ok(result) => {
                        state.stage = DONE.to_string();
                        Terminal::Completed(result)
                    }
                    Err(e) => Terminal::MalformedPayload {
                        event: frame.event.clone(),
                        reason: e.to_string(),
                    },
                },
            );
        }
        "error" => {
            state.discard_progress();
            state.terminal = Some(Terminal::ServerError {
                detail: error_detail(&frame.data),
            });
        }
        other => tracing::debug!(event = other, "Ignoring unrecognized event"),
    }
    state
}

/// `detail`, falling back to `message`, then the raw payload
fn error_detail(data: &Value) -> String {
    data.get("detail")
        .or_else(|| data.get("message"))
        .and_then(Value::as_str)
        .map_or_else(|| data.to_string(), str::to_string)
}
