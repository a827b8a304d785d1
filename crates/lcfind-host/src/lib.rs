//! # lcfind-host
//!
//! Device-side implementation of the LC-FIND protocol: a responder that
//! advertises the device's identity to discovery broadcasts and arbitrates
//! remotely requested network-configuration changes.
//!
//! # How the host is put together
//!
//! ```text
//! HostService::start()
//!  ├─ lcfind-pump thread   -- blocking socket reads → bounded InboundQueue
//!  └─ lcfind-tick thread   -- drains commands, runs HostEngine::tick()
//! ```
//!
//! The engine's state is touched by exactly one thread (the tick loop). The
//! pump only converts datagrams into [`queue::RawMessage`] values and
//! enqueues them; API calls from the embedding application travel to the
//! tick loop as commands. The bounded queue is therefore the only shared
//! structure, and a reconfiguration can never race a discovery reply.
//!
//! Reconfiguring the very interface the protocol runs on is risky: the
//! change can sever the operator's connection mid-request. The engine
//! therefore stages every accepted proposal: an optional, time-bounded
//! human-confirmation step, then the delegate call that commits the change,
//! then a cooldown window before the next proposal is admitted.
//!
//! The host never touches OS network settings itself. The embedding
//! application supplies a [`delegate::ConfigurationDelegate`] that reads and
//! writes the real configuration; this crate only speaks the protocol.

pub mod config;
pub mod delegate;
pub mod engine;
pub mod queue;
pub mod sender;
pub mod service;

pub use config::HostConfig;
pub use delegate::{ConfigurationDelegate, MemoryConfigurationDelegate};
pub use engine::{EngineError, EngineSettings, HostEngine};
pub use queue::{InboundQueue, RawMessage};
pub use sender::{ResponseSender, SendError, UdpResponseSender};
pub use service::{HostService, ServiceError};
