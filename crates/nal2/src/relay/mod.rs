//! Relay topology: the engine runs on another host behind a duplex channel.

pub mod broker;
pub mod channel;
pub mod gateway;
pub mod hub;
pub mod registry;

pub use broker::CorrelationBroker;
pub use channel::{ChannelClosed, ChannelHandle, ChannelId, ClientMessage, Role, ServerMessage};
pub use gateway::RelayGateway;
pub use hub::{RelayHub, Session};
pub use registry::ChannelRegistry;
