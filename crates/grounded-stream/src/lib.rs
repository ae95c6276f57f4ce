//! Streaming consumption of grounded generation
//!
//! A generation request answers with an event stream of `status`, `delta`,
//! `final` and `error` records. This crate turns the raw byte chunks into
//! [`SseFrame`]s, folds them into a [`ProgressState`] (stage plus live
//! preview) and resolves the stream to exactly one terminal outcome.
//!
//! ```text
//! bytes ──► FrameDecoder ──► EventCursor ──► reduce ──► consume ──► GenerationResult
//!                                              │
//!                                              └──► ProgressObserver (stage, preview)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use grounded_stream::{consume, EventCursor, ProgressState};
//!
//! let mut cursor = EventCursor::new(chunks);
//! let result = consume(&mut cursor, &mut |state: &ProgressState| {
//!     println!("[{}] {}", state.stage(), state.preview());
//! })
//! .await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod consumer;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod preview;
pub mod progress;

pub use consumer::{consume, consume_until, NoopObserver, ProgressObserver};
pub use cursor::EventCursor;
pub use error::StreamError;
pub use frame::{decode_all, FrameDecoder, SseFrame, DEFAULT_EVENT};
pub use preview::extract_preview;
pub use progress::{indicators, reduce, stage_rank, Indicator, ProgressState, Terminal, STAGES};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for stream consumers
    pub use crate::{
        consume, EventCursor, ProgressObserver, ProgressState, SseFrame, StreamError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
