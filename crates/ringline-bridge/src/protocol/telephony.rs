use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Event received from the telephony media stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    Connected {},
    Start {
        start: StartMetadata,
    },
    Media {
        media: MediaPayload,
    },
    /// Echo of a mark we sent, emitted once the audio before it was played.
    Mark {
        mark: MarkPayload,
    },
    Stop {},
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

impl StartMetadata {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.custom_parameters
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaPayload {
    /// Milliseconds since the stream started, on the caller-side clock.
    #[serde(deserialize_with = "u64_from_string_or_number")]
    pub timestamp: u64,
    /// Base64 μ-law audio.
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

/// Frame sent to the telephony media stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyCommand {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },
    /// Drops any audio buffered downstream that has not been played yet.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

// The media stream sends numeric fields as JSON strings.
fn u64_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_start_with_custom_parameters() {
        let frame = json!({
            "event": "start",
            "sequenceNumber": "1",
            "streamSid": "MZ1",
            "start": {
                "accountSid": "AC1",
                "streamSid": "MZ1",
                "callSid": "CA1",
                "tracks": ["inbound"],
                "customParameters": {"businessId": "biz-1", "callerPhone": ""}
            }
        });
        let TelephonyEvent::Start { start } = serde_json::from_value(frame).unwrap() else {
            panic!("expected start");
        };
        assert_eq!(start.stream_sid, "MZ1");
        assert_eq!(start.call_sid.as_deref(), Some("CA1"));
        assert_eq!(start.parameter("businessId"), Some("biz-1"));
        assert_eq!(start.parameter("callerPhone"), None);
    }

    #[test]
    fn media_timestamp_accepts_string_or_number() {
        let a: TelephonyEvent = serde_json::from_value(json!({
            "event": "media",
            "media": {"track": "inbound", "chunk": "2", "timestamp": "140", "payload": "AA=="}
        }))
        .unwrap();
        let b: TelephonyEvent = serde_json::from_value(json!({
            "event": "media",
            "media": {"timestamp": 140, "payload": "AA=="}
        }))
        .unwrap();
        match (a, b) {
            (TelephonyEvent::Media { media: x }, TelephonyEvent::Media { media: y }) => {
                assert_eq!(x.timestamp, 140);
                assert_eq!(y.timestamp, 140);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn unknown_events_and_extra_fields_are_tolerated() {
        let dtmf: TelephonyEvent =
            serde_json::from_value(json!({"event": "dtmf", "dtmf": {"digit": "1"}})).unwrap();
        assert_eq!(dtmf, TelephonyEvent::Other);

        let connected: TelephonyEvent =
            serde_json::from_value(json!({"event": "connected", "protocol": "Call", "version": "1.0.0"}))
                .unwrap();
        assert_eq!(connected, TelephonyEvent::Connected {});
    }

    #[test]
    fn commands_encode_stream_sid() {
        let clear = serde_json::to_value(TelephonyCommand::Clear {
            stream_sid: "MZ1".into(),
        })
        .unwrap();
        assert_eq!(clear, json!({"event": "clear", "streamSid": "MZ1"}));

        let mark = serde_json::to_value(TelephonyCommand::Mark {
            stream_sid: "MZ1".into(),
            mark: MarkPayload {
                name: "responsePart".into(),
            },
        })
        .unwrap();
        assert_eq!(
            mark,
            json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "responsePart"}})
        );
    }
}
