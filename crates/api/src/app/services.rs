use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use stockledger_core::OwnerId;
use stockledger_events::{EventBus, EventEnvelope, InMemoryEventBus};
use stockledger_infra::{
    event_store::InMemoryEventStore,
    ledger_service::LedgerService,
    notifications::{NotificationDispatcher, NotificationRequest},
};

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub owner_id: OwnerId,
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Notifier that fans freshly opened alerts out to SSE subscribers.
///
/// Lossy by design: a slow or absent subscriber never backpressures the
/// ledger write path.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl NotificationDispatcher for BroadcastNotifier {
    fn dispatch(&self, request: NotificationRequest) {
        let _ = self.realtime_tx.send(RealtimeMessage {
            owner_id: request.owner_id,
            topic: "alert.opened".to_string(),
            payload: serde_json::json!({
                "kind": "alert_notification",
                "alert_id": request.alert_id.0.to_string(),
                "record_id": request.record_id.0.to_string(),
                "alert_type": request.alert_type.as_str(),
                "priority": request.priority,
                "message": request.message,
            }),
        });
    }
}

pub type AppLedger = LedgerService<
    Arc<InMemoryEventStore>,
    Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>,
    BroadcastNotifier,
>;

pub struct AppServices {
    ledger: AppLedger,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl AppServices {
    pub fn ledger(&self) -> &AppLedger {
        &self.ledger
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }
}

pub fn build_services() -> AppServices {
    // In-memory infra wiring: store + bus + ledger service.
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> =
        Arc::new(InMemoryEventBus::new());

    // Realtime channel (SSE): lossy broadcast, owner-filtered in handlers.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);
    let notifier = BroadcastNotifier {
        realtime_tx: realtime_tx.clone(),
    };

    let ledger = LedgerService::new(store, bus.clone(), notifier);

    // Background subscriber: bus -> realtime update notifications. The ledger
    // service applies its own committed events to the read models, so this
    // worker only surfaces the stream to SSE clients.
    {
        let sub = bus.subscribe();
        let realtime_tx = realtime_tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match sub.recv() {
                Ok(env) => {
                    let aggregate_type = env.aggregate_type().to_string();
                    let _ = realtime_tx.send(RealtimeMessage {
                        owner_id: env.owner_id(),
                        topic: format!("{aggregate_type}.updated"),
                        payload: serde_json::json!({
                            "kind": "stream_update",
                            "aggregate_type": aggregate_type,
                            "aggregate_id": env.aggregate_id().to_string(),
                            "sequence_number": env.sequence_number(),
                        }),
                    });
                }
                Err(_) => break,
            }
        });
    }

    AppServices {
        ledger,
        realtime_tx,
    }
}

/// Build an SSE stream for one owner (used by `/stream`).
pub fn owner_sse_stream(
    services: Arc<AppServices>,
    owner_id: OwnerId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.owner_id == owner_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
