//! Drive a cursor through the progress reducer to one terminal outcome

use crate::cursor::EventCursor;
use crate::error::StreamError;
use crate::progress::{reduce, ProgressState};
use futures::Stream;
use grounded_message::GenerationResult;
use std::future::Future;

/// Receives every intermediate progress state
pub trait ProgressObserver {
    fn on_progress(&mut self, state: &ProgressState);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&ProgressState),
{
    fn on_progress(&mut self, state: &ProgressState) {
        self(state);
    }
}

/// Observer that ignores progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&mut self, _state: &ProgressState) {}
}

/// Consume frames until `final` or `error`.
///
/// The observer sees the state after each frame. The cursor is closed as
/// soon as a terminal event arrives; frames after it are never read.
pub async fn consume<S, B, O>(
    cursor: &mut EventCursor<S>,
    observer: &mut O,
) -> Result<GenerationResult, StreamError>
where
    S: Stream<Item = Result<B, StreamError>> + Unpin,
    B: AsRef<[u8]>,
    O: ProgressObserver + ?Sized,
{
    let mut state = ProgressState::new();
    while let Some(frame) = cursor.next_frame().await {
        state = reduce(state, &frame?);
        observer.on_progress(&state);
        if state.is_terminal() {
            cursor.close();
            break;
        }
    }

    match state.into_terminal() {
        Some(terminal) => terminal.into_result(),
        None => {
            tracing::warn!("Event stream ended before a terminal event");
            Err(StreamError::Incomplete)
        }
    }
}

/// [`consume`], abandoned when `cancel` resolves first.
///
/// On cancellation the cursor is closed and nothing is committed.
pub async fn consume_until<S, B, O, C>(
    cursor: &mut EventCursor<S>,
    observer: &mut O,
    cancel: C,
) -> Result<GenerationResult, StreamError>
where
    S: Stream<Item = Result<B, StreamError>> + Unpin,
    B: AsRef<[u8]>,
    O: ProgressObserver + ?Sized,
    C: Future<Output = ()>,
{
    let outcome = tokio::select! {
        outcome = consume(cursor, observer) => Some(outcome),
        () = cancel => None,
    };
    outcome.unwrap_or_else(|| {
        cursor.close();
        tracing::info!("Generation stream cancelled by consumer");
        Err(StreamError::Cancelled)
    })
}
