//! Playback bookkeeping for the assistant utterance currently being heard.

use std::collections::VecDeque;

/// Name attached to every mark sent after an outbound audio chunk.
pub const MARK_NAME: &str = "responsePart";

/// μ-law at 8 kHz: one byte per sample, eight samples per millisecond.
const MULAW_BYTES_PER_MS: u64 = 8;

/// The assistant item the caller is hearing and where its playback started
/// on the caller-side clock.
///
/// Stays open after the model finishes generating: the caller may still
/// have seconds of audio queued. It closes on interruption, or once
/// generation is done and every mark has been echoed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackWindow {
    pub item_id: String,
    /// Caller media timestamp when the first chunk was forwarded.
    pub start_ms: u64,
    /// Total audio forwarded for this item.
    pub sent_ms: u64,
    /// The model sent its last delta for this item.
    pub generation_done: bool,
}

impl PlaybackWindow {
    pub fn open(item_id: impl Into<String>, start_ms: u64) -> Self {
        Self {
            item_id: item_id.into(),
            start_ms,
            sent_ms: 0,
            generation_done: false,
        }
    }

    pub fn record_sent(&mut self, audio_ms: u64) {
        self.sent_ms = self.sent_ms.saturating_add(audio_ms);
    }

    /// How much of this item the caller has heard at caller time `now_ms`.
    ///
    /// Never negative and never more than what was actually sent.
    pub fn elapsed_at(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms).min(self.sent_ms)
    }
}

/// FIFO of marks sent but not yet echoed back.
#[derive(Debug, Default)]
pub struct MarkQueue {
    pending: VecDeque<String>,
}

impl MarkQueue {
    pub fn push(&mut self, name: impl Into<String>) {
        self.pending.push_back(name.into());
    }

    /// Removes the oldest outstanding mark.
    pub fn acknowledge(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Drops every outstanding mark, returning how many there were.
    pub fn drain(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Duration of a base64 μ-law payload, computed from its encoded length.
pub fn mulaw_duration_ms(payload_b64: &str) -> u64 {
    let data = payload_b64.trim().trim_end_matches('=');
    let decoded_bytes = (data.len() as u64 * 3) / 4;
    decoded_bytes / MULAW_BYTES_PER_MS
}
