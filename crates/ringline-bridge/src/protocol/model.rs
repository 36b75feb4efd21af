use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event received from the speech model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ModelEvent {
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Value,
    },
    #[serde(rename = "response.audio.delta")]
    AudioDelta { item_id: String, delta: String },
    #[serde(rename = "response.audio.done")]
    AudioDone {
        #[serde(default)]
        item_id: Option<String>,
    },
    #[serde(rename = "response.done")]
    ResponseDone {},
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone { transcript: String },
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted { transcript: String },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        call_id: String,
        name: String,
        arguments: String,
    },
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        audio_start_ms: Option<u64>,
    },
    #[serde(rename = "error")]
    Error { error: ModelErrorDetail },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ModelErrorDetail {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Frame sent to the speech model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ModelCommand {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionSettings },
    #[serde(rename = "input_audio_buffer.append")]
    AppendAudio { audio: String },
    #[serde(rename = "conversation.item.create")]
    CreateItem { item: ConversationItem },
    #[serde(rename = "response.create")]
    CreateResponse,
    /// Cuts the assistant item's audio to what the caller actually heard.
    #[serde(rename = "conversation.item.truncate")]
    Truncate {
        item_id: String,
        content_index: u32,
        audio_end_ms: u64,
    },
}

impl ModelCommand {
    /// A user-role text item, used to steer the model (e.g. the opening greeting).
    pub fn user_text(text: impl Into<String>) -> Self {
        ModelCommand::CreateItem {
            item: ConversationItem::Message {
                role: "user".to_string(),
                content: vec![ContentPart::InputText { text: text.into() }],
            },
        }
    }

    pub fn function_output(call_id: impl Into<String>, output: &Value) -> Self {
        ModelCommand::CreateItem {
            item: ConversationItem::FunctionCallOutput {
                call_id: call_id.into(),
                output: output.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    Message {
        role: String,
        content: Vec<ContentPart>,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSettings {
    pub turn_detection: TurnDetection,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub voice: String,
    pub instructions: String,
    pub modalities: Vec<String>,
    pub temperature: f32,
    pub tools: Vec<Value>,
    pub tool_choice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionSettings>,
}

impl SessionSettings {
    /// μ-law in and out, server-side voice activity detection, caller
    /// transcription on.
    pub fn telephony(
        voice: impl Into<String>,
        instructions: impl Into<String>,
        temperature: f32,
        tools: Vec<Value>,
    ) -> Self {
        Self {
            turn_detection: TurnDetection {
                kind: "server_vad".to_string(),
            },
            input_audio_format: "g711_ulaw".to_string(),
            output_audio_format: "g711_ulaw".to_string(),
            voice: voice.into(),
            instructions: instructions.into(),
            modalities: vec!["text".to_string(), "audio".to_string()],
            temperature,
            tools,
            tool_choice: "auto".to_string(),
            input_audio_transcription: Some(TranscriptionSettings {
                model: "whisper-1".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionSettings {
    pub model: String,
}
