#![allow(dead_code)]

use async_trait::async_trait;
use ringline_bridge::protocol::{
    MediaPayload, ModelCommand, ModelEvent, StartMetadata, TelephonyCommand, TelephonyEvent,
};
use ringline_bridge::{
    BridgeConfig, BridgeDeps, BridgeError, MessageSender, MessagingError, ModelConnector, ModelLink,
    TelephonyLink, ToolContext, ToolRegistry,
};
use ringline_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use ringline_store::businesses;
use ringline_types::{BusinessConfig, DayHours, ServiceInfo, WeeklyHours};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

pub const BUSINESS_ID: &str = "biz-1";
pub const BUSINESS_PHONE: &str = "+15550000000";
pub const CALLER_PHONE: &str = "+15557654321";

pub fn business() -> BusinessConfig {
    let mut hours = WeeklyHours::default();
    for day in ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday"] {
        hours.set(day, DayHours::open("09:00", "17:00"));
    }
    hours.set("sunday", DayHours::closed());
    BusinessConfig {
        id: BUSINESS_ID.into(),
        name: "Shear Delight".into(),
        phone_number: Some(BUSINESS_PHONE.into()),
        instructions: None,
        voice: "alloy".into(),
        language: "en".into(),
        timezone: "America/New_York".into(),
        hours,
        services: vec![ServiceInfo::named("Haircut"), ServiceInfo::named("Coloring")],
        knowledge_base: None,
    }
}

/// In-memory pool with the schema and one business.
pub fn seeded_pool() -> DbPool {
    let pool = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
    let conn = pool.get().unwrap();
    run_migrations(&conn).unwrap();
    businesses::upsert_business(&conn, &business()).unwrap();
    pool
}

/// Records every message; optionally fails every send.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub fail: bool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String, MessagingError> {
        if self.fail {
            return Err(MessagingError::Rejected {
                status: 503,
                message: "carrier unavailable".into(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((from.into(), to.into(), body.into()));
        Ok(format!("SM{}", sent.len()))
    }
}

/// Holds every send until `gate` is notified.
#[derive(Default)]
pub struct GatedSender {
    pub gate: Notify,
}

#[async_trait]
impl MessageSender for GatedSender {
    async fn send(&self, _from: &str, _to: &str, _body: &str) -> Result<String, MessagingError> {
        self.gate.notified().await;
        Ok("SM-gated".into())
    }
}

/// Model side of a scripted session.
pub struct FakeModel {
    pub events: mpsc::Sender<ModelEvent>,
    pub commands: mpsc::Receiver<ModelCommand>,
}

pub struct FakeConnector {
    link: Mutex<Option<ModelLink>>,
}

pub fn fake_model() -> (FakeConnector, FakeModel) {
    let (event_tx, event_rx) = mpsc::channel(256);
    let (command_tx, command_rx) = mpsc::channel(256);
    (
        FakeConnector {
            link: Mutex::new(Some(ModelLink {
                events: event_rx,
                commands: command_tx,
            })),
        },
        FakeModel {
            events: event_tx,
            commands: command_rx,
        },
    )
}

#[async_trait]
impl ModelConnector for FakeConnector {
    async fn connect(&self, _config: &BridgeConfig) -> Result<ModelLink, BridgeError> {
        self.link
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BridgeError::Connection("already connected".into()))
    }
}

pub struct RefusingConnector;

#[async_trait]
impl ModelConnector for RefusingConnector {
    async fn connect(&self, _config: &BridgeConfig) -> Result<ModelLink, BridgeError> {
        Err(BridgeError::Connection("connection refused".into()))
    }
}

/// Connector whose handshake never completes, like a blackholed endpoint.
pub struct HangingConnector;

#[async_trait]
impl ModelConnector for HangingConnector {
    async fn connect(&self, _config: &BridgeConfig) -> Result<ModelLink, BridgeError> {
        std::future::pending().await
    }
}

/// Telephony side of a scripted session.
pub struct FakeCall {
    pub events: mpsc::Sender<TelephonyEvent>,
    pub commands: mpsc::Receiver<TelephonyCommand>,
}

pub fn fake_call() -> (TelephonyLink, FakeCall) {
    let (event_tx, event_rx) = mpsc::channel(256);
    let (command_tx, command_rx) = mpsc::channel(256);
    (
        TelephonyLink {
            events: event_rx,
            commands: command_tx,
        },
        FakeCall {
            events: event_tx,
            commands: command_rx,
        },
    )
}

pub fn deps(
    pool: DbPool,
    connector: Arc<dyn ModelConnector>,
    messenger: Arc<dyn MessageSender>,
) -> Arc<BridgeDeps> {
    Arc::new(BridgeDeps {
        pool,
        config: BridgeConfig {
            session_timeout: Duration::from_secs(2),
            ..BridgeConfig::default()
        },
        connector,
        messenger,
        tools: Arc::new(ToolRegistry::standard()),
    })
}

pub fn tool_context(
    pool: DbPool,
    contact_id: Option<String>,
    caller_phone: Option<&str>,
    messenger: Arc<dyn MessageSender>,
) -> ToolContext {
    ToolContext {
        session_id: "test-session".into(),
        business: Some(Arc::new(business())),
        contact_id,
        caller_phone: caller_phone.map(str::to_string),
        pool,
        messenger,
    }
}

pub fn start_event(call_sid: &str) -> TelephonyEvent {
    let mut custom_parameters = HashMap::new();
    custom_parameters.insert("businessId".to_string(), BUSINESS_ID.to_string());
    custom_parameters.insert("callerPhone".to_string(), CALLER_PHONE.to_string());
    TelephonyEvent::Start {
        start: StartMetadata {
            stream_sid: "MZ1".into(),
            call_sid: Some(call_sid.into()),
            custom_parameters,
        },
    }
}

pub fn media_event(timestamp: u64, payload: &str) -> TelephonyEvent {
    TelephonyEvent::Media {
        media: MediaPayload {
            timestamp,
            payload: payload.into(),
            track: Some("inbound".into()),
        },
    }
}

/// Receives the next item or panics after two seconds.
pub async fn next<T>(rx: &mut mpsc::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("channel closed")
}

/// Drives a session through start and the model handshake, consuming the
/// three opening commands.
pub async fn establish(call: &mut FakeCall, model: &mut FakeModel, call_sid: &str) {
    call.events.send(start_event(call_sid)).await.unwrap();
    model
        .events
        .send(ModelEvent::SessionCreated {
            session: serde_json::Value::Null,
        })
        .await
        .unwrap();

    assert!(matches!(next(&mut model.commands).await, ModelCommand::SessionUpdate { .. }));
    assert!(matches!(next(&mut model.commands).await, ModelCommand::CreateItem { .. }));
    assert_eq!(next(&mut model.commands).await, ModelCommand::CreateResponse);
}
