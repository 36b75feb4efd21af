//! Session Lifecycle: one bridged call from stream start to teardown.
//!
//! `run_session` owns every piece of per-call state. The telephony and
//! model connections each feed a channel, and a single loop selects over
//! both plus the tool-result channel, so the pump and interruption state
//! are only ever touched from one place.

use crate::config::BridgeConfig;
use crate::context::{load_caller_context, CallIdentity, LoadedCall};
use crate::error::BridgeError;
use crate::instructions::{build_instructions, greeting_prompt};
use crate::lifecycle::Lifecycle;
use crate::messaging::MessageSender;
use crate::model_client::{ModelConnector, ModelLink};
use crate::protocol::{ModelCommand, ModelEvent, SessionSettings, TelephonyCommand, TelephonyEvent};
use crate::pump::AudioPump;
use crate::tools::{ToolContext, ToolRegistry};
use chrono::{DateTime, Utc};
use ringline_db::DbPool;
use ringline_store::calls;
use ringline_store::conversations::{self, TranscriptLine};
use ringline_types::{SessionState, ToolCallRequest, ToolCallResult};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Process-wide collaborators shared by every session.
pub struct BridgeDeps {
    pub pool: DbPool,
    pub config: BridgeConfig,
    pub connector: Arc<dyn ModelConnector>,
    pub messenger: Arc<dyn MessageSender>,
    pub tools: Arc<ToolRegistry>,
}

/// Both directions of the telephony media stream.
///
/// The session drops `commands` when it is done; the transport should
/// close the connection when that channel closes.
#[derive(Debug)]
pub struct TelephonyLink {
    pub events: mpsc::Receiver<TelephonyEvent>,
    pub commands: mpsc::Sender<TelephonyCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session_id: String,
    pub final_state: SessionState,
}

/// Who is on the call and what the session negotiated.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub session_id: String,
    pub stream_sid: String,
    pub business_id: String,
    pub caller_phone: Option<String>,
    pub contact_id: Option<String>,
    pub voice: String,
    pub language: String,
    pub call_record_id: String,
    pub started_at: DateTime<Utc>,
}

/// Bridges one call until either side hangs up.
pub async fn run_session(deps: Arc<BridgeDeps>, telephony: TelephonyLink) -> SessionOutcome {
    let session_id = Uuid::new_v4().to_string();
    let mut lifecycle = Lifecycle::new(session_id.clone());
    let TelephonyLink {
        events: mut telephony_events,
        commands: telephony_commands,
    } = telephony;

    let Some(start) = wait_for_start(&session_id, &mut telephony_events).await else {
        tracing::info!(session_id = %session_id, "telephony closed before stream start");
        lifecycle.advance(SessionState::Closing);
        lifecycle.advance(SessionState::Closed);
        return outcome(session_id, &lifecycle);
    };
    let started_at = Utc::now();
    tracing::info!(
        session_id = %session_id,
        stream_id = %start.stream_sid,
        call_sid = ?start.call_sid,
        "media stream started"
    );

    let loaded = match load_caller_context(
        &deps.pool,
        CallIdentity::from_start(&start),
        deps.config.history_limit,
    )
    .await
    {
        Ok(loaded) => loaded,
        Err(e) => {
            lifecycle.fail(&e.to_string());
            return outcome(session_id, &lifecycle);
        }
    };

    let session = CallSession {
        session_id: session_id.clone(),
        stream_sid: start.stream_sid.clone(),
        business_id: loaded.business.id.clone(),
        caller_phone: loaded.caller_phone.clone(),
        contact_id: loaded.contact_id.clone(),
        voice: if loaded.business.voice.trim().is_empty() {
            deps.config.default_voice.clone()
        } else {
            loaded.business.voice.clone()
        },
        language: loaded.business.language.clone(),
        call_record_id: loaded.call_record_id.clone(),
        started_at,
    };

    let link = match open_model(&deps, &session, &loaded, &mut telephony_events).await {
        Ok(Some(link)) => link,
        Ok(None) => {
            tracing::info!(session_id = %session_id, "caller hung up during model handshake");
            lifecycle.advance(SessionState::Closing);
            finalize(&deps.pool, &session, Vec::new(), false).await;
            lifecycle.advance(SessionState::Closed);
            return outcome(session_id, &lifecycle);
        }
        Err(e) => {
            lifecycle.fail(&e.to_string());
            finalize(&deps.pool, &session, Vec::new(), false).await;
            return outcome(session_id, &lifecycle);
        }
    };
    lifecycle.advance(SessionState::Active);

    let tool_ctx = Arc::new(ToolContext {
        session_id: session_id.clone(),
        business: Some(Arc::new(loaded.business)),
        contact_id: loaded.contact_id,
        caller_phone: loaded.caller_phone,
        pool: deps.pool.clone(),
        messenger: deps.messenger.clone(),
    });

    let ModelLink {
        events: mut model_events,
        commands: model_commands,
    } = link;
    let (result_tx, mut result_rx) = mpsc::channel::<ToolCallResult>(32);
    let mut pump = AudioPump::new(session.stream_sid.clone());
    let mut seen_calls: HashSet<String> = HashSet::new();
    let mut transcript: Vec<TranscriptLine> = Vec::new();

    loop {
        tokio::select! {
            event = telephony_events.recv() => match event {
                Some(TelephonyEvent::Media { media }) => {
                    if model_commands.send(pump.on_caller_media(media)).await.is_err() {
                        tracing::warn!(session_id = %session_id, "model channel gone while relaying caller audio");
                        break;
                    }
                }
                Some(TelephonyEvent::Mark { mark }) => pump.on_mark_echo(&mark.name),
                Some(TelephonyEvent::Stop {}) | None => {
                    tracing::info!(session_id = %session_id, "telephony stream stopped");
                    break;
                }
                Some(TelephonyEvent::Start { .. }) => {
                    tracing::warn!(session_id = %session_id, "duplicate start event ignored");
                }
                Some(TelephonyEvent::Connected {}) | Some(TelephonyEvent::Other) => {}
            },
            event = model_events.recv() => match event {
                Some(ModelEvent::AudioDelta { item_id, delta }) => {
                    if let Some((media, mark)) = pump.on_model_audio(item_id, delta) {
                        if telephony_commands.send(media).await.is_err()
                            || telephony_commands.send(mark).await.is_err()
                        {
                            break;
                        }
                    }
                }
                Some(ModelEvent::SpeechStarted { .. }) => {
                    if let Some(cut) = pump.interrupt() {
                        if model_commands.send(cut.truncate).await.is_err()
                            || telephony_commands.send(cut.clear).await.is_err()
                        {
                            break;
                        }
                    }
                }
                Some(ModelEvent::AudioDone { .. }) | Some(ModelEvent::ResponseDone {}) => {
                    pump.on_response_finished();
                }
                Some(ModelEvent::AudioTranscriptDone { transcript: text }) => {
                    transcript.push(transcript_line("assistant", text));
                }
                Some(ModelEvent::InputTranscriptionCompleted { transcript: text }) => {
                    transcript.push(transcript_line("caller", text));
                }
                Some(ModelEvent::FunctionCallArgumentsDone { call_id, name, arguments }) => {
                    if !seen_calls.insert(call_id.clone()) {
                        tracing::warn!(session_id = %session_id, call_id = %call_id, tool = %name, "duplicate tool call ignored");
                        continue;
                    }
                    tracing::info!(session_id = %session_id, call_id = %call_id, tool = %name, "tool call requested");
                    let request = ToolCallRequest { call_id, name, arguments };
                    let tools = deps.tools.clone();
                    let ctx = tool_ctx.clone();
                    let tx = result_tx.clone();
                    tokio::spawn(async move {
                        let result = tools.dispatch(&ctx, &request).await;
                        let _ = tx.send(result).await;
                    });
                }
                Some(ModelEvent::Error { error }) => {
                    tracing::warn!(
                        session_id = %session_id,
                        kind = ?error.kind,
                        code = ?error.code,
                        message = %error.message,
                        "model reported an error"
                    );
                }
                Some(ModelEvent::SessionCreated { .. }) | Some(ModelEvent::Other) => {}
                None => {
                    tracing::info!(session_id = %session_id, "model channel closed");
                    break;
                }
            },
            Some(result) = result_rx.recv() => {
                if !lifecycle.is_active() {
                    continue;
                }
                tracing::debug!(
                    session_id = %session_id,
                    call_id = %result.call_id,
                    tool = %result.name,
                    success = result.is_success(),
                    "returning tool result"
                );
                if model_commands
                    .send(ModelCommand::function_output(result.call_id.clone(), &result.output))
                    .await
                    .is_err()
                    || model_commands.send(ModelCommand::CreateResponse).await.is_err()
                {
                    break;
                }
            }
        }
    }

    lifecycle.advance(SessionState::Closing);
    drop(model_commands);
    drop(model_events);
    drop(telephony_commands);
    drop(result_rx);

    finalize(&deps.pool, &session, transcript, true).await;
    lifecycle.advance(SessionState::Closed);
    outcome(session_id, &lifecycle)
}

async fn wait_for_start(
    session_id: &str,
    events: &mut mpsc::Receiver<TelephonyEvent>,
) -> Option<crate::protocol::StartMetadata> {
    while let Some(event) = events.recv().await {
        match event {
            TelephonyEvent::Start { start } => return Some(start),
            TelephonyEvent::Stop {} => return None,
            TelephonyEvent::Connected {} => {
                tracing::debug!(session_id, "telephony connected");
            }
            other => {
                tracing::debug!(session_id, event = ?other, "event before stream start ignored");
            }
        }
    }
    None
}

/// Connects to the model, waits for `session.created`, and sends the
/// session settings plus the opening greeting.
///
/// Returns `Ok(None)` if the caller hangs up first. Caller audio arriving
/// before the model is ready is dropped.
async fn open_model(
    deps: &BridgeDeps,
    session: &CallSession,
    loaded: &LoadedCall,
    telephony_events: &mut mpsc::Receiver<TelephonyEvent>,
) -> Result<Option<ModelLink>, BridgeError> {
    // One deadline covers the connect and the wait for session.created.
    let deadline = tokio::time::sleep(deps.config.session_timeout);
    tokio::pin!(deadline);

    let connect = deps.connector.connect(&deps.config);
    tokio::pin!(connect);
    let mut link = loop {
        tokio::select! {
            _ = &mut deadline => return Err(BridgeError::Timeout("model connection")),
            result = &mut connect => break result?,
            event = telephony_events.recv() => match event {
                Some(TelephonyEvent::Stop {}) | None => return Ok(None),
                Some(_) => {}
            },
        }
    };

    loop {
        tokio::select! {
            _ = &mut deadline => return Err(BridgeError::Timeout("model session creation")),
            event = link.events.recv() => match event {
                Some(ModelEvent::SessionCreated { .. }) => break,
                Some(ModelEvent::Error { error }) => {
                    tracing::warn!(session_id = %session.session_id, message = %error.message, "model error during handshake");
                }
                Some(_) => {}
                None => return Err(BridgeError::ChannelClosed("model")),
            },
            event = telephony_events.recv() => match event {
                Some(TelephonyEvent::Stop {}) | None => return Ok(None),
                Some(_) => {}
            },
        }
    }
    tracing::info!(session_id = %session.session_id, "model session created");

    let settings = SessionSettings::telephony(
        session.voice.clone(),
        build_instructions(&loaded.business, &loaded.context, Utc::now()),
        deps.config.temperature,
        deps.tools.schemas(),
    );
    let opening = [
        ModelCommand::SessionUpdate { session: settings },
        ModelCommand::user_text(greeting_prompt(&loaded.business, &loaded.context)),
        ModelCommand::CreateResponse,
    ];
    for command in opening {
        link.commands
            .send(command)
            .await
            .map_err(|_| BridgeError::ChannelClosed("model"))?;
    }
    Ok(Some(link))
}

fn transcript_line(role: &str, content: String) -> TranscriptLine {
    TranscriptLine {
        role: role.to_string(),
        content,
        at: Utc::now(),
    }
}

/// Persists the transcript and closes out the call record. Errors are
/// logged; the call is already over.
async fn finalize(pool: &DbPool, session: &CallSession, transcript: Vec<TranscriptLine>, answered: bool) {
    let pool = pool.clone();
    let session_id = session.session_id.clone();
    let business_id = session.business_id.clone();
    let contact_id = session.contact_id.clone();
    let call_id = session.call_record_id.clone();
    let started_at = session.started_at;

    let result = tokio::task::spawn_blocking(move || -> Result<(), BridgeError> {
        let conn = pool.get()?;
        let ended_at = Utc::now();
        let duration = (ended_at - started_at).num_seconds().max(0);
        conversations::record_transcript(&conn, &business_id, contact_id.as_deref(), &transcript)?;
        calls::finish_call(&conn, &call_id, answered, duration, ended_at)?;
        Ok(())
    })
    .await;

    match result {
        Ok(Ok(())) => tracing::debug!(session_id = %session_id, "call record finalised"),
        Ok(Err(e)) => tracing::error!(session_id = %session_id, error = %e, "failed to finalise call"),
        Err(e) => tracing::error!(session_id = %session_id, error = %e, "finalise task panicked"),
    }
}

fn outcome(session_id: String, lifecycle: &Lifecycle) -> SessionOutcome {
    SessionOutcome {
        session_id,
        final_state: lifecycle.state(),
    }
}
