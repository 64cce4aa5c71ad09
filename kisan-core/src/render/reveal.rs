//! Word-by-word progressive display of bot replies

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RevealConfig;

/// Default spacing between frames
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(75);

/// One step of a reveal: the text visible from `offset` onwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealFrame {
    pub index: usize,
    /// Time since the reveal started at which this frame is due
    pub offset: Duration,
    /// Cumulative text, every word followed by a single space
    pub text: String,
}

/// Timed frame stream; ends early when its token is cancelled
pub type RevealStream = Pin<Box<dyn Stream<Item = RevealFrame> + Send>>;

/// Splits a payload on single spaces and schedules one cumulative frame per
/// word. Frame `i` is due `i * base_delay` after the start. Newlines are
/// not separators and stay inside their word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealScheduler {
    base_delay: Duration,
}

impl Default for RevealScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY)
    }
}

impl RevealScheduler {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    pub fn from_config(config: &RevealConfig) -> Self {
        Self::new(Duration::from_millis(config.base_delay_ms))
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Number of frames `payload` produces
    pub fn frame_count(payload: &str) -> usize {
        if payload.is_empty() {
            0
        } else {
            payload.split(' ').count()
        }
    }

    /// Frames of `payload` without timing, computed lazily
    pub fn frames<'a>(&self, payload: &'a str) -> Frames<'a> {
        Frames {
            cursor: FrameCursor::new(payload.len()),
            payload,
            base_delay: self.base_delay,
        }
    }

    /// Emit each frame at its due time until the payload is exhausted or
    /// `cancel` fires. No frame is yielded once the token is cancelled.
    pub fn stream(&self, payload: String, cancel: CancellationToken) -> RevealStream {
        let state = StreamState {
            cursor: FrameCursor::new(payload.len()),
            payload,
            base_delay: self.base_delay,
            start: Instant::now(),
            cancel,
        };

        Box::pin(futures::stream::unfold(state, |mut state| async move {
            let frame = state
                .cursor
                .next_frame(&state.payload, state.base_delay)?;
            let deadline = state.start + frame.offset;
            let cancel = state.cancel.clone();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                _ = tokio::time::sleep_until(deadline) => Some((frame, state)),
            }
        }))
    }

    fn offset(&self, index: usize) -> Duration {
        self.base_delay
            .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

/// Lazy iterator over the frames of a borrowed payload
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    payload: &'a str,
    base_delay: Duration,
    cursor: FrameCursor,
}

impl Iterator for Frames<'_> {
    type Item = RevealFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_frame(self.payload, self.base_delay)
    }
}

struct StreamState {
    payload: String,
    base_delay: Duration,
    cursor: FrameCursor,
    start: Instant,
    cancel: CancellationToken,
}

/// Byte position of the next word
#[derive(Debug, Clone, Copy)]
struct FrameCursor {
    pos: usize,
    index: usize,
    done: bool,
}

impl FrameCursor {
    fn new(len: usize) -> Self {
        Self {
            pos: 0,
            index: 0,
            done: len == 0,
        }
    }

    fn next_frame(&mut self, payload: &str, base_delay: Duration) -> Option<RevealFrame> {
        if self.done {
            return None;
        }
        let end = match payload[self.pos..].find(' ') {
            Some(rel) => self.pos + rel,
            None => {
                self.done = true;
                payload.len()
            }
        };

        // The prefix up to a separator equals the words joined by spaces
        let mut text = String::with_capacity(end + 1);
        text.push_str(&payload[..end]);
        text.push(' ');

        let frame = RevealFrame {
            index: self.index,
            offset: RevealScheduler::new(base_delay).offset(self.index),
            text,
        };
        self.pos = end + 1;
        self.index += 1;
        Some(frame)
    }
}
