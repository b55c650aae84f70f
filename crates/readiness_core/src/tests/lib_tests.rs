use super::*;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

struct RecordingOutbound {
    connected: AtomicBool,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingOutbound {
    fn new(connected: bool) -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(connected),
            sent: Mutex::new(Vec::new()),
        })
    }

    async fn sent_events(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|message| message.event)
            .collect()
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn emit(&self, message: OutboundMessage) -> Result<(), ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}

fn event(name: &str, payload: serde_json::Value) -> TransportEvent {
    TransportEvent::Event {
        name: name.to_string(),
        payload,
    }
}

fn start(
    outbound: &Arc<RecordingOutbound>,
) -> (
    Arc<ReadinessClient>,
    mpsc::Sender<TransportEvent>,
    JoinHandle<()>,
) {
    let (tx, rx) = mpsc::channel(16);
    let (client, task) = ReadinessClient::spawn(outbound.clone(), rx);
    (client, tx, task)
}

/// Feeds every event, then waits for the writer to drain them all.
async fn run_to_completion(tx: mpsc::Sender<TransportEvent>, task: JoinHandle<()>, events: Vec<TransportEvent>) {
    for event in events {
        tx.send(event).await.expect("writer alive");
    }
    drop(tx);
    task.await.expect("writer task");
}

fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn connect_and_first_snapshot_drive_the_request_cycle() {
    let outbound = RecordingOutbound::new(true);
    let (client, tx, task) = start(&outbound);

    run_to_completion(
        tx,
        task,
        vec![
            TransportEvent::Connected,
            event(
                "all_data",
                json!([{"id": 1, "checklist_id": "A", "normalised_index": 1, "text": "Fuel", "status": false}]),
            ),
        ],
    )
    .await;

    assert_eq!(
        outbound.sent_events().await,
        vec!["request_all_data", "get_current_checklist", "get_checklists"]
    );
    let model = client.model();
    assert!(!model.status_at_position(1));
    assert_eq!(model.text_at_position(1), "Fuel");
}

#[tokio::test]
async fn snapshot_then_partial_update_scenario() {
    let outbound = RecordingOutbound::new(true);
    let (client, tx, task) = start(&outbound);
    let model = client.model();

    run_to_completion(
        tx,
        task,
        vec![
            event(
                "all_data",
                json!([{"id": 1, "checklist_id": "A", "normalised_index": 1, "status": false, "text": "Fuel"}]),
            ),
            event(
                "partial_data",
                json!([{"id": 1, "checklist_id": "A", "normalised_index": 1, "status": true, "text": "Fuel"}]),
            ),
        ],
    )
    .await;

    assert!(model.status_at_position(1));
    assert!(model.overall_ready());
    assert_eq!(
        model.feedback(FeedbackKind::RaceReadyOverallState, 1),
        FeedbackValue::Bool(true)
    );
}

#[tokio::test]
async fn snapshots_already_handed_out_never_change() {
    let outbound = RecordingOutbound::new(true);
    let (client, tx, task) = start(&outbound);
    let mut model = client.model();

    tx.send(event(
        "all_data",
        json!([{"id": 1, "checklist_id": "A", "normalised_index": 1, "status": false, "text": "Fuel"}]),
    ))
    .await
    .expect("send");
    assert!(model.changed().await);
    let before = model.snapshot();

    run_to_completion(
        tx,
        task,
        vec![event(
            "partial_data",
            json!([{"id": 2, "checklist_id": "A", "normalised_index": 2, "status": true, "text": "Tyres"}]),
        )],
    )
    .await;

    assert_eq!(before.action_count(), 1);
    assert_eq!(model.snapshot().action_count(), 2);
}

#[tokio::test]
async fn presentation_signals_follow_each_event() {
    let outbound = RecordingOutbound::new(true);
    let (client, tx, task) = start(&outbound);
    let mut events = client.subscribe_events();

    run_to_completion(
        tx,
        task,
        vec![
            TransportEvent::Connected,
            event("checklists", json!([{"id": "A", "name": "Pre-Race"}, {"id": "B", "name": "Post-Race"}])),
            event("current_checklist", json!({"current_checklist_id": "B"})),
        ],
    )
    .await;

    let seen = drain(&mut events);
    assert_eq!(seen[0], ClientEvent::Connected);
    assert_eq!(
        seen[1],
        ClientEvent::FeedbacksChanged(vec![
            FeedbackKind::CurrentChecklistName,
            FeedbackKind::CurrentChecklistIndex
        ])
    );
    assert!(matches!(&seen[2], ClientEvent::VariableDefinitionsChanged(defs) if defs.len() == 3));
    let ClientEvent::VariablesChanged(values) = seen.last().expect("variables") else {
        panic!("expected variables last, got {seen:?}");
    };
    assert_eq!(values["current_checklist_name"], "Post-Race");
    assert_eq!(client.model().current_checklist_index(), "2/2");
    assert_eq!(
        outbound.sent_events().await,
        vec!["request_all_data", "get_current_checklist", "request_all_data"]
    );
}

#[tokio::test]
async fn legacy_events_publish_action_text_variables() {
    let outbound = RecordingOutbound::new(true);
    let (client, tx, task) = start(&outbound);
    let mut events = client.subscribe_events();

    run_to_completion(
        tx,
        task,
        vec![event(
            "state_update",
            json!({"1": {"id": 1, "status": "0", "text": "Fuel"}, "version": 3}),
        )],
    )
    .await;

    let seen = drain(&mut events);
    let Some(ClientEvent::VariablesChanged(values)) = seen.last() else {
        panic!("expected variables, got {seen:?}");
    };
    assert_eq!(values["actiontext1"], "Fuel");
    assert!(views::legacy_overall_ready(&client.model().snapshot()));
    assert!(outbound.sent_events().await.is_empty());
}

#[tokio::test]
async fn commands_are_dropped_while_disconnected() {
    let outbound = RecordingOutbound::new(false);
    let (client, _tx, _task) = start(&outbound);
    let mut events = client.subscribe_events();

    let result = client.toggle_position(3).await;

    assert!(matches!(result, Err(ConnectionError::NotConnected)));
    assert!(outbound.sent_events().await.is_empty());
    assert!(matches!(
        events.try_recv(),
        Ok(ClientEvent::Error(message)) if message.contains("toggle_state_by_normalised")
    ));
}

#[tokio::test]
async fn commands_carry_their_payloads() {
    let outbound = RecordingOutbound::new(true);
    let (client, _tx, _task) = start(&outbound);

    client.toggle_position(4).await.expect("toggle");
    client
        .toggle_action(ActionId::from("brakes"))
        .await
        .expect("toggle by id");
    client.reset_all().await.expect("reset");
    client.next_checklist().await.expect("next");
    client.previous_checklist().await.expect("previous");

    let sent = outbound.sent.lock().await;
    let events: Vec<&str> = sent.iter().map(|message| message.event).collect();
    assert_eq!(
        events,
        vec![
            "toggle_state_by_normalised",
            "toggle_state",
            "reset_all",
            "next_checklist",
            "previous_checklist"
        ]
    );
    assert_eq!(sent[0].payload, Some(json!({"normalised_index": 4})));
    assert_eq!(sent[1].payload, Some(json!({"id": "brakes"})));
    assert_eq!(sent[2].payload, None);
}

#[tokio::test]
async fn disconnect_keeps_the_last_model() {
    let outbound = RecordingOutbound::new(true);
    let (client, tx, task) = start(&outbound);
    let mut events = client.subscribe_events();

    run_to_completion(
        tx,
        task,
        vec![
            event(
                "all_data",
                json!([{"id": 1, "checklist_id": "A", "normalised_index": 1, "status": true, "text": "Fuel"}]),
            ),
            TransportEvent::Disconnected {
                reason: "server went away".into(),
            },
        ],
    )
    .await;

    assert!(client.model().overall_ready());
    assert_eq!(
        drain(&mut events).last(),
        Some(&ClientEvent::Disconnected {
            reason: "server went away".into()
        })
    );
}
