//! Audio relay between the caller and the model.
//!
//! The pump is plain state driven by the session loop: every method maps
//! one inbound event to the frames that must go out, so ordering within a
//! channel is exactly arrival order and nothing is buffered here.

use crate::playback::{mulaw_duration_ms, MarkQueue, PlaybackWindow, MARK_NAME};
use crate::protocol::{MarkPayload, MediaPayload, ModelCommand, OutboundMedia, TelephonyCommand};

#[derive(Debug)]
pub struct AudioPump {
    pub(crate) stream_sid: String,
    /// Highest caller media timestamp seen so far.
    pub(crate) latest_media_timestamp: u64,
    pub(crate) window: Option<PlaybackWindow>,
    pub(crate) marks: MarkQueue,
    /// Item whose remaining audio is dropped after an interruption.
    pub(crate) suppressed_item: Option<String>,
}

impl AudioPump {
    pub fn new(stream_sid: impl Into<String>) -> Self {
        Self {
            stream_sid: stream_sid.into(),
            latest_media_timestamp: 0,
            window: None,
            marks: MarkQueue::default(),
            suppressed_item: None,
        }
    }

    pub fn stream_sid(&self) -> &str {
        &self.stream_sid
    }

    pub fn latest_media_timestamp(&self) -> u64 {
        self.latest_media_timestamp
    }

    pub fn window(&self) -> Option<&PlaybackWindow> {
        self.window.as_ref()
    }

    pub fn pending_marks(&self) -> usize {
        self.marks.len()
    }

    /// Caller audio frame in, model append out. The payload is not touched.
    pub fn on_caller_media(&mut self, media: MediaPayload) -> ModelCommand {
        if media.timestamp < self.latest_media_timestamp {
            tracing::warn!(
                stream_id = %self.stream_sid,
                timestamp = media.timestamp,
                latest = self.latest_media_timestamp,
                "caller media timestamp went backwards"
            );
        } else {
            self.latest_media_timestamp = media.timestamp;
        }
        tracing::trace!(stream_id = %self.stream_sid, timestamp = media.timestamp, "caller audio");
        ModelCommand::AppendAudio {
            audio: media.payload,
        }
    }

    /// Model audio delta in, media frame plus mark out.
    ///
    /// Returns `None` when the delta belongs to an item that was interrupted.
    pub fn on_model_audio(
        &mut self,
        item_id: String,
        delta: String,
    ) -> Option<(TelephonyCommand, TelephonyCommand)> {
        if self.suppressed_item.as_deref() == Some(item_id.as_str()) {
            tracing::trace!(stream_id = %self.stream_sid, item_id = %item_id, "dropping audio for interrupted item");
            return None;
        }

        let audio_ms = mulaw_duration_ms(&delta);
        let latest = self.latest_media_timestamp;
        let reopen = self
            .window
            .as_ref()
            .map_or(true, |w| w.item_id != item_id);
        if reopen {
            if let Some(previous) = &self.window {
                tracing::debug!(
                    stream_id = %self.stream_sid,
                    previous = %previous.item_id,
                    item_id = %item_id,
                    "new response item replaces open playback window"
                );
            }
            self.window = Some(PlaybackWindow::open(item_id, latest));
        }
        if let Some(window) = self.window.as_mut() {
            window.record_sent(audio_ms);
        }

        self.marks.push(MARK_NAME);
        Some((
            TelephonyCommand::Media {
                stream_sid: self.stream_sid.clone(),
                media: OutboundMedia { payload: delta },
            },
            TelephonyCommand::Mark {
                stream_sid: self.stream_sid.clone(),
                mark: MarkPayload {
                    name: MARK_NAME.to_string(),
                },
            },
        ))
    }

    /// The caller side finished playing one chunk.
    pub fn on_mark_echo(&mut self, name: &str) {
        match self.marks.acknowledge() {
            Some(expected) if expected != name => {
                tracing::debug!(stream_id = %self.stream_sid, expected = %expected, got = %name, "mark name mismatch");
            }
            Some(_) => {}
            None => {
                tracing::warn!(stream_id = %self.stream_sid, mark = %name, "mark echo with no outstanding marks");
            }
        }
        self.close_if_played_out();
    }

    /// The model finished generating the current utterance. The window
    /// stays open while the caller still has unplayed chunks queued.
    pub fn on_response_finished(&mut self) {
        if let Some(window) = self.window.as_mut() {
            window.generation_done = true;
            tracing::debug!(
                stream_id = %self.stream_sid,
                item_id = %window.item_id,
                sent_ms = window.sent_ms,
                pending_marks = self.marks.len(),
                "utterance generated"
            );
        }
        self.close_if_played_out();
    }

    fn close_if_played_out(&mut self) {
        let played_out = self.marks.is_empty()
            && self.window.as_ref().is_some_and(|w| w.generation_done);
        if played_out {
            if let Some(window) = self.window.take() {
                tracing::debug!(stream_id = %self.stream_sid, item_id = %window.item_id, "utterance played out");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(timestamp: u64, payload: &str) -> MediaPayload {
        MediaPayload {
            timestamp,
            payload: payload.to_string(),
            track: None,
        }
    }

    #[test]
    fn caller_frames_forward_unchanged_in_order() {
        let mut pump = AudioPump::new("MZ1");
        let out: Vec<_> = ["AAAA", "BBBB", "CCCC"]
            .iter()
            .enumerate()
            .map(|(i, p)| pump.on_caller_media(media(i as u64 * 20, p)))
            .collect();
        assert_eq!(
            out,
            vec![
                ModelCommand::AppendAudio { audio: "AAAA".into() },
                ModelCommand::AppendAudio { audio: "BBBB".into() },
                ModelCommand::AppendAudio { audio: "CCCC".into() },
            ]
        );
        assert_eq!(pump.latest_media_timestamp(), 40);
    }

    #[test]
    fn regressing_timestamp_keeps_latest() {
        let mut pump = AudioPump::new("MZ1");
        pump.on_caller_media(media(100, "AA"));
        pump.on_caller_media(media(60, "AA"));
        assert_eq!(pump.latest_media_timestamp(), 100);
    }

    #[test]
    fn first_delta_opens_window_at_latest_caller_time() {
        let mut pump = AudioPump::new("MZ1");
        pump.on_caller_media(media(500, "AA"));

        let (frame, mark) = pump.on_model_audio("item_1".into(), "//8=".into()).unwrap();
        assert_eq!(
            frame,
            TelephonyCommand::Media {
                stream_sid: "MZ1".into(),
                media: OutboundMedia { payload: "//8=".into() },
            }
        );
        assert!(matches!(mark, TelephonyCommand::Mark { .. }));

        pump.on_caller_media(media(520, "AA"));
        pump.on_model_audio("item_1".into(), "//8=".into()).unwrap();
        let window = pump.window().unwrap();
        assert_eq!(window.start_ms, 500);
        assert_eq!(pump.pending_marks(), 2);
    }

    #[test]
    fn mark_queue_tracks_forwarded_minus_echoed() {
        let mut pump = AudioPump::new("MZ1");
        for _ in 0..3 {
            pump.on_model_audio("item_1".into(), "AAAA".into());
        }
        pump.on_mark_echo(MARK_NAME);
        assert_eq!(pump.pending_marks(), 2);
        pump.on_mark_echo(MARK_NAME);
        pump.on_mark_echo(MARK_NAME);
        pump.on_mark_echo(MARK_NAME);
        assert_eq!(pump.pending_marks(), 0);
    }

    #[test]
    fn window_outlives_generation_until_marks_are_echoed() {
        let mut pump = AudioPump::new("MZ1");
        pump.on_model_audio("item_1".into(), "AAAA".into());
        pump.on_model_audio("item_1".into(), "AAAA".into());
        pump.on_response_finished();
        assert!(pump.window().unwrap().generation_done);
        assert_eq!(pump.pending_marks(), 2);

        pump.on_mark_echo(MARK_NAME);
        assert!(pump.window().is_some(), "one chunk still playing");
        pump.on_mark_echo(MARK_NAME);
        assert!(pump.window().is_none());
    }

    #[test]
    fn caller_catching_up_mid_generation_keeps_window() {
        let mut pump = AudioPump::new("MZ1");
        pump.on_caller_media(media(300, "AA"));
        pump.on_model_audio("item_1".into(), "AAAA".into());
        pump.on_mark_echo(MARK_NAME);
        pump.on_model_audio("item_1".into(), "AAAA".into());
        assert_eq!(pump.window().unwrap().start_ms, 300);
    }
}
