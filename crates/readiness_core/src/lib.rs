use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{ActionId, NormalisedIndex},
    protocol::{Command, InboundEvent, OutboundMessage},
};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info};

pub mod catalog;
pub mod error;
pub mod legacy;
pub mod model;
pub mod reconcile;
pub mod transport;
pub mod views;

pub use catalog::{FeedbackKind, FeedbackValue, VariableDefinition};
pub use error::{CommandError, ConnectionError};
pub use model::ReconciliationState;
pub use reconcile::{Effect, Reaction, Reconciler};
pub use transport::{Outbound, SocketIoTransport, TransportEvent};

const EVENT_BUFFER: usize = 1024;

/// Signals for the presentation layer. Values are read back through [`ModelReader`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected,
    Disconnected { reason: String },
    FeedbacksChanged(Vec<FeedbackKind>),
    VariableDefinitionsChanged(Vec<VariableDefinition>),
    VariablesChanged(BTreeMap<String, String>),
    Error(String),
}

/// Lock-free read access to the latest published model.
///
/// Each snapshot is immutable, so a reader never sees half of an event applied.
#[derive(Clone)]
pub struct ModelReader {
    rx: watch::Receiver<Arc<ReconciliationState>>,
}

impl ModelReader {
    pub fn snapshot(&self) -> Arc<ReconciliationState> {
        Arc::clone(&*self.rx.borrow())
    }

    /// Waits for the next published snapshot. `false` once the writer has gone away.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub fn feedback(&self, kind: FeedbackKind, position: NormalisedIndex) -> FeedbackValue {
        catalog::evaluate_feedback(&self.snapshot(), kind, position)
    }

    pub fn status_at_position(&self, position: NormalisedIndex) -> bool {
        views::status_at_position(&self.snapshot(), position)
    }

    pub fn text_at_position(&self, position: NormalisedIndex) -> String {
        views::text_at_position(&self.snapshot(), position)
    }

    pub fn overall_ready(&self) -> bool {
        views::overall_ready(&self.snapshot())
    }

    pub fn current_checklist_name(&self) -> String {
        views::current_checklist_name(&self.snapshot())
    }

    pub fn current_checklist_index(&self) -> String {
        views::current_checklist_index(&self.snapshot())
    }

    pub fn variables(&self) -> BTreeMap<String, String> {
        catalog::variable_values(&self.snapshot())
    }
}

#[async_trait]
pub trait ReadinessHandle: Send + Sync {
    async fn toggle_position(&self, position: NormalisedIndex) -> Result<(), ConnectionError>;
    async fn toggle_action(&self, id: ActionId) -> Result<(), ConnectionError>;
    async fn reset_all(&self) -> Result<(), ConnectionError>;
    async fn next_checklist(&self) -> Result<(), ConnectionError>;
    async fn previous_checklist(&self) -> Result<(), ConnectionError>;
    fn model(&self) -> ModelReader;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

pub struct ReadinessClient {
    outbound: Arc<dyn Outbound>,
    model: watch::Receiver<Arc<ReconciliationState>>,
    events: broadcast::Sender<ClientEvent>,
}

impl ReadinessClient {
    /// Starts the single writer. Transport notifications are applied strictly in arrival
    /// order; the task ends when `inbound` closes.
    pub fn spawn(
        outbound: Arc<dyn Outbound>,
        inbound: mpsc::Receiver<TransportEvent>,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (model_tx, model_rx) = watch::channel(Arc::new(ReconciliationState::default()));
        let client = Arc::new(Self {
            outbound: Arc::clone(&outbound),
            model: model_rx,
            events: events.clone(),
        });

        let writer = ModelWriter {
            reconciler: Reconciler::new(),
            model: model_tx,
            outbound,
            events,
        };
        let task = tokio::spawn(writer.run(inbound));
        (client, task)
    }

    /// Connects a socket.io transport and starts the writer on its event stream.
    pub async fn connect(host: &str, port: u16) -> Result<(Arc<Self>, JoinHandle<()>)> {
        let (transport, inbound) = SocketIoTransport::connect(host, port).await?;
        Ok(Self::spawn(transport, inbound))
    }

    pub async fn disconnect(&self) {
        self.outbound.close().await;
    }

    pub fn is_connected(&self) -> bool {
        self.outbound.is_connected()
    }

    /// Commands are dropped, not queued, while disconnected.
    pub async fn send_command(&self, command: Command) -> Result<(), ConnectionError> {
        let event = command.event_name();
        if !self.outbound.is_connected() {
            error!(command = event, "commands: websocket is not connected; dropping");
            let _ = self.events.send(ClientEvent::Error(format!(
                "websocket is not connected; dropped {event}"
            )));
            return Err(ConnectionError::NotConnected);
        }
        info!(command = event, "commands: sending");
        self.outbound
            .emit(OutboundMessage::from(command))
            .await
            .inspect_err(|err| {
                error!(command = event, %err, "commands: send failed");
                let _ = self
                    .events
                    .send(ClientEvent::Error(format!("failed to send {event}: {err}")));
            })
    }
}

#[async_trait]
impl ReadinessHandle for ReadinessClient {
    async fn toggle_position(&self, position: NormalisedIndex) -> Result<(), ConnectionError> {
        self.send_command(Command::ToggleByPosition {
            normalised_index: position,
        })
        .await
    }

    async fn toggle_action(&self, id: ActionId) -> Result<(), ConnectionError> {
        self.send_command(Command::ToggleById { id }).await
    }

    async fn reset_all(&self) -> Result<(), ConnectionError> {
        self.send_command(Command::ResetAll).await
    }

    async fn next_checklist(&self) -> Result<(), ConnectionError> {
        self.send_command(Command::NextChecklist).await
    }

    async fn previous_checklist(&self) -> Result<(), ConnectionError> {
        self.send_command(Command::PreviousChecklist).await
    }

    fn model(&self) -> ModelReader {
        ModelReader {
            rx: self.model.clone(),
        }
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

struct ModelWriter {
    reconciler: Reconciler,
    model: watch::Sender<Arc<ReconciliationState>>,
    outbound: Arc<dyn Outbound>,
    events: broadcast::Sender<ClientEvent>,
}

impl ModelWriter {
    async fn run(mut self, mut inbound: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = inbound.recv().await {
            self.handle(event).await;
        }
        debug!("runtime: inbound stream closed; model writer stopping");
    }

    async fn handle(&mut self, event: TransportEvent) {
        let reaction = match event {
            TransportEvent::Connected => {
                let _ = self.events.send(ClientEvent::Connected);
                self.reconciler.on_connected()
            }
            TransportEvent::Disconnected { reason } => {
                let _ = self.events.send(ClientEvent::Disconnected { reason });
                return;
            }
            TransportEvent::Event { name, payload } => {
                debug!(event = %name, "runtime: received event");
                let reaction = self.reconciler.apply(InboundEvent::decode(&name, payload));
                self.publish();
                reaction
            }
        };
        self.carry_out(reaction).await;
    }

    fn publish(&self) {
        let snapshot = Arc::new(self.reconciler.state().clone());
        self.model.send_replace(snapshot);
    }

    async fn carry_out(&self, reaction: Reaction) {
        for effect in reaction.effects {
            match effect {
                Effect::Outbound(request) => {
                    let message = OutboundMessage::from(request);
                    if let Err(err) = self.outbound.emit(message).await {
                        debug!(request = request.event_name(), %err, "runtime: request not sent");
                    }
                }
                Effect::CheckFeedbacks(kinds) => {
                    let _ = self.events.send(ClientEvent::FeedbacksChanged(kinds));
                }
                Effect::RefreshVariableDefinitions => {
                    let definitions = catalog::variable_definitions(self.reconciler.state());
                    let _ = self
                        .events
                        .send(ClientEvent::VariableDefinitionsChanged(definitions));
                }
                Effect::PublishVariables => {
                    let values = catalog::variable_values(self.reconciler.state());
                    let _ = self.events.send(ClientEvent::VariablesChanged(values));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
