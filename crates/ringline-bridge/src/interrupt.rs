//! Barge-in: the caller started talking over the assistant.

use crate::protocol::{ModelCommand, TelephonyCommand};
use crate::pump::AudioPump;

/// Frames to emit when an in-flight utterance is cut off.
#[derive(Debug, Clone, PartialEq)]
pub struct Interruption {
    pub item_id: String,
    pub elapsed_ms: u64,
    /// Goes to the model.
    pub truncate: ModelCommand,
    /// Goes to the caller side.
    pub clear: TelephonyCommand,
}

impl AudioPump {
    /// Handles a speech-started signal from the model.
    ///
    /// Does nothing unless the assistant is audibly mid-utterance (open
    /// window and unacknowledged marks). Otherwise closes the window, drains
    /// the marks, and suppresses any further audio for the cut item, all
    /// before the caller gets to the next model event.
    pub fn interrupt(&mut self) -> Option<Interruption> {
        if self.marks.is_empty() {
            return None;
        }
        let window = self.window.take()?;

        let elapsed_ms = window.elapsed_at(self.latest_media_timestamp);
        let dropped = self.marks.drain();
        self.suppressed_item = Some(window.item_id.clone());

        tracing::info!(
            stream_id = %self.stream_sid,
            item_id = %window.item_id,
            elapsed_ms,
            sent_ms = window.sent_ms,
            dropped_marks = dropped,
            "caller interrupted assistant"
        );

        Some(Interruption {
            truncate: ModelCommand::Truncate {
                item_id: window.item_id.clone(),
                content_index: 0,
                audio_end_ms: elapsed_ms,
            },
            clear: TelephonyCommand::Clear {
                stream_sid: self.stream_sid.clone(),
            },
            item_id: window.item_id,
            elapsed_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::MARK_NAME;
    use crate::protocol::MediaPayload;
    use base64::Engine;

    fn caller_at(pump: &mut AudioPump, timestamp: u64) {
        pump.on_caller_media(MediaPayload {
            timestamp,
            payload: "AA==".into(),
            track: None,
        });
    }

    fn chunk(bytes: usize) -> String {
        base64::engine::general_purpose::STANDARD.encode(vec![0x7Fu8; bytes])
    }

    #[test]
    fn silent_assistant_is_not_interrupted() {
        let mut pump = AudioPump::new("MZ1");
        assert!(pump.interrupt().is_none());

        pump.on_model_audio("item_1".into(), chunk(160));
        pump.on_mark_echo("responsePart");
        assert!(pump.interrupt().is_none(), "all audio already played");
    }

    #[test]
    fn truncates_at_caller_clock_offset() {
        let mut pump = AudioPump::new("MZ1");
        caller_at(&mut pump, 1_000);
        for _ in 0..3 {
            pump.on_model_audio("item_1".into(), chunk(8_000));
        }
        caller_at(&mut pump, 1_240);

        let cut = pump.interrupt().unwrap();
        assert_eq!(cut.elapsed_ms, 240);
        assert_eq!(
            cut.truncate,
            ModelCommand::Truncate {
                item_id: "item_1".into(),
                content_index: 0,
                audio_end_ms: 240,
            }
        );
        assert_eq!(cut.clear, TelephonyCommand::Clear { stream_sid: "MZ1".into() });
        assert_eq!(pump.pending_marks(), 0);
        assert!(pump.window().is_none());
    }

    #[test]
    fn interrupts_after_generation_finished_while_audio_still_plays() {
        let mut pump = AudioPump::new("MZ1");
        caller_at(&mut pump, 1_000);
        for _ in 0..3 {
            pump.on_model_audio("item_1".into(), chunk(8_000));
        }
        pump.on_response_finished();
        pump.on_mark_echo(MARK_NAME);
        caller_at(&mut pump, 2_500);

        let cut = pump.interrupt().expect("caller is still hearing item_1");
        assert_eq!(cut.item_id, "item_1");
        assert_eq!(cut.elapsed_ms, 1_500);
        assert_eq!(cut.clear, TelephonyCommand::Clear { stream_sid: "MZ1".into() });
        assert_eq!(pump.pending_marks(), 0);
        assert!(pump.interrupt().is_none());
    }

    #[test]
    fn fully_played_utterance_is_not_interrupted() {
        let mut pump = AudioPump::new("MZ1");
        pump.on_model_audio("item_1".into(), chunk(800));
        pump.on_response_finished();
        pump.on_mark_echo(MARK_NAME);
        assert!(pump.window().is_none());
        assert!(pump.interrupt().is_none());
    }

    #[test]
    fn elapsed_never_exceeds_sent_audio() {
        let mut pump = AudioPump::new("MZ1");
        caller_at(&mut pump, 0);
        pump.on_model_audio("item_1".into(), chunk(800));
        caller_at(&mut pump, 60_000);
        assert_eq!(pump.interrupt().unwrap().elapsed_ms, 100);
    }

    #[test]
    fn repeated_speech_started_is_idempotent() {
        let mut pump = AudioPump::new("MZ1");
        pump.on_model_audio("item_1".into(), chunk(160));
        pump.on_model_audio("item_1".into(), chunk(160));

        assert!(pump.interrupt().is_some());
        let after_first = (pump.pending_marks(), pump.window().cloned());
        assert!(pump.interrupt().is_none());
        assert_eq!((pump.pending_marks(), pump.window().cloned()), after_first);
    }

    #[test]
    fn late_deltas_for_cut_item_are_dropped() {
        let mut pump = AudioPump::new("MZ1");
        pump.on_model_audio("item_1".into(), chunk(160));
        pump.interrupt().unwrap();

        assert!(pump.on_model_audio("item_1".into(), chunk(160)).is_none());
        assert!(pump.window().is_none());
        assert_eq!(pump.pending_marks(), 0);

        assert!(pump.on_model_audio("item_2".into(), chunk(160)).is_some());
        assert_eq!(pump.window().unwrap().item_id, "item_2");
    }
}
