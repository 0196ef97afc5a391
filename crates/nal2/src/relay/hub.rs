//! Per-connection protocol handling for the relay topology.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::broker::CorrelationBroker;
use super::channel::{ChannelHandle, ChannelId, ClientMessage, Role, ServerMessage};
use super::registry::ChannelRegistry;

/// State of one connected peer.
#[derive(Debug)]
pub struct Session {
    handle: ChannelHandle,
    role: Option<Role>,
}

impl Session {
    pub fn id(&self) -> ChannelId {
        self.handle.id()
    }
}

/// Routes messages between connected peers and feeds engine replies to the broker.
#[derive(Clone)]
pub struct RelayHub {
    registry: Arc<ChannelRegistry>,
    broker: Arc<CorrelationBroker>,
}

impl RelayHub {
    pub fn new(registry: Arc<ChannelRegistry>, broker: Arc<CorrelationBroker>) -> Self {
        Self { registry, broker }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn broker(&self) -> &Arc<CorrelationBroker> {
        &self.broker
    }

    /// Open a session for a new connection. The receiver yields every
    /// message destined for that peer.
    pub fn connect(&self) -> (Session, mpsc::UnboundedReceiver<ServerMessage>) {
        let (handle, rx) = ChannelHandle::new();
        info!("Channel {} connected", handle.id());
        (Session { handle, role: None }, rx)
    }

    /// Handle one raw text frame. Unparseable frames are dropped.
    pub fn on_text(&self, session: &mut Session, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.on_message(session, message),
            Err(e) => warn!("Dropping unparseable frame from {}: {}", session.id(), e),
        }
    }

    pub fn on_message(&self, session: &mut Session, message: ClientMessage) {
        if session.role.is_none() && !matches!(message, ClientMessage::Register { .. }) {
            warn!("Ignoring message from unregistered channel {}", session.id());
            return;
        }

        match message {
            ClientMessage::Register { client } => self.register(session, client),
            ClientMessage::SendToApp { input } => match self.registry.get(Role::Engine) {
                Some(engine) if engine.send(ServerMessage::ProcessInput { input }).is_ok() => {
                    debug!("Forwarded input from {} to engine {}", session.id(), engine.id());
                }
                _ => {
                    let _ = session.handle.send(ServerMessage::Error {
                        message: "engine not connected".to_string(),
                    });
                }
            },
            ClientMessage::SendToWeb { output } => match self.registry.get(Role::Frontend) {
                Some(frontend) => {
                    if frontend.send(ServerMessage::ReceiveOutput { output }).is_err() {
                        debug!("Frontend {} closed, output dropped", frontend.id());
                    }
                }
                None => debug!("No frontend registered, output dropped"),
            },
            ClientMessage::Nal2Response {
                sequence_num,
                result,
            } => {
                if session.role != Some(Role::Engine)
                    || !self.registry.is_current(Role::Engine, session.id())
                {
                    warn!(
                        "Ignoring reply {} from {} which is not the current engine",
                        sequence_num,
                        session.id()
                    );
                    return;
                }
                self.broker.resolve(session.id(), sequence_num, result);
            }
        }
    }

    fn register(&self, session: &mut Session, role: Role) {
        if let Some(previous) = session.role.replace(role) {
            if previous != role {
                self.release(session.id(), previous);
            }
        }
        if let Some(superseded) = self.registry.register(role, session.handle.clone()) {
            if role == Role::Engine {
                self.broker.channel_lost(superseded.id());
            }
        }
        let _ = session.handle.send(ServerMessage::Registered { client: role });
    }

    /// Tear down a session whose connection closed.
    pub fn disconnect(&self, session: Session) {
        info!("Channel {} disconnected", session.id());
        if let Some(role) = session.role {
            self.release(session.id(), role);
        }
    }

    fn release(&self, id: ChannelId, role: Role) {
        self.registry.unregister(role, id);
        if role == Role::Engine {
            self.broker.channel_lost(id);
        }
    }
}
