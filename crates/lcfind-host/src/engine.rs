//! The reconfiguration state machine.
//!
//! Two status fields drive everything. `actual_status` is what the host
//! currently *is* and what it advertises on the wire; `target_status` is
//! what it should become. Protocol traffic and API calls only ever adjust
//! the target (and the pending-request slot); once per tick the pair is
//! reconciled, and the side effects of the transition (such as applying the
//! staged configuration and sending the CONF verdict) happen there and
//! nowhere else. The split is what lets a request's arrival and its
//! eventual effect sit ticks apart, which is the whole point of the
//! confirmation and cooldown windows.
//!
//! ```text
//!            enable            CONFReq accepted           confirm / auto
//! Disabled ─────────► Ready ───────────────► Awaiting ───────────► Cooldown
//!    ▲                  ▲    (confirmation    Confirmation            │
//!    │                  │     disabled: straight to Cooldown)         │
//!    │                  ├──────────── timeout ◄───────────┘           │
//!    └── disable ───────┴─────────────── cooldown elapsed ◄───────────┘
//! ```
//!
//! At most one reconfiguration is ever in flight: the single `pending` slot
//! is the invariant, and a competing CONFReq is answered `Error-Busy` on the
//! spot, never queued behind the first.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lcfind_core::protocol::codec::{self, classify, peek_hardware_address};
use lcfind_core::protocol::messages::MessageKind;
use lcfind_core::{
    is_usable_unicast_ipv4, ConfReply, FindReply, Message, NetworkConfiguration, NetworkMode,
    Status,
};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::delegate::ConfigurationDelegate;
use crate::queue::{InboundQueue, RawMessage};
use crate::sender::{ResponseSender, SendError};

/// Result strings that do not originate in the codec.
const RESULT_OK: &str = "Ok";
const RESULT_BUSY: &str = "Error-Busy";
const RESULT_APPLY_FAILED: &str = "Error-Unable to set requested configuration";
const RESULT_CONFIRMATION_TIMEOUT: &str = "Error-Host did not confirm request in time";
const RESULT_UNUSABLE_IP: &str = "Error-Cannot use this IP address";

/// Error type for engine operations. Any of these stops the host's
/// activities: the engine never limps along half-working.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The delegate could not supply a configuration at construction time,
    /// so the host does not even know its own MAC address.
    #[error("the embedding application could not supply a network configuration")]
    NoConfiguration,

    /// A reply failed to send for a reason other than an unreachable
    /// destination.
    #[error(transparent)]
    Send(#[from] SendError),
}

/// Behaviour knobs for the engine, distilled from the host configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub serial_number: String,
    pub device_name: String,
    /// When `true`, an admitted proposal waits in `AwaitingConfirmation`
    /// for a local `confirm()` call before it is applied.
    pub confirmation_enabled: bool,
    pub confirmation_timeout: Duration,
    pub cooldown_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let identity = crate::config::DeviceIdentity::default();
        Self {
            serial_number: identity.serial_number,
            device_name: identity.device_name,
            confirmation_enabled: false,
            confirmation_timeout: Duration::from_secs(60),
            cooldown_timeout: Duration::from_secs(60),
        }
    }
}

/// The one reconfiguration proposal a host may hold at a time.
#[derive(Debug)]
struct PendingRequest {
    configuration: NetworkConfiguration,
    requester: SocketAddr,
}

/// Device-side protocol state machine.
///
/// All methods must be called from a single thread (the tick loop); the
/// engine itself holds no locks. Cross-thread input arrives solely through
/// the shared [`InboundQueue`].
pub struct HostEngine {
    settings: EngineSettings,
    hardware_address: String,
    actual_status: Status,
    target_status: Status,
    pending: Option<PendingRequest>,
    confirmation_deadline: Option<Instant>,
    cooldown_deadline: Option<Instant>,
    queue: Arc<InboundQueue>,
    delegate: Box<dyn ConfigurationDelegate + Send>,
    sender: Box<dyn ResponseSender + Send>,
}

impl HostEngine {
    /// Creates an engine in the `Disabled` state: a pure discovery responder
    /// until [`enable_reconfiguration`](Self::enable_reconfiguration) is
    /// called.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoConfiguration`] when the delegate cannot
    /// report the current configuration; without it the host has no MAC
    /// address to answer to.
    pub fn new(
        settings: EngineSettings,
        queue: Arc<InboundQueue>,
        delegate: Box<dyn ConfigurationDelegate + Send>,
        sender: Box<dyn ResponseSender + Send>,
    ) -> Result<Self, EngineError> {
        let hardware_address = delegate
            .try_get_configuration()
            .ok_or(EngineError::NoConfiguration)?
            .mac_address;

        Ok(Self {
            settings,
            hardware_address,
            actual_status: Status::Disabled,
            target_status: Status::Disabled,
            pending: None,
            confirmation_deadline: None,
            cooldown_deadline: None,
            queue,
            delegate,
            sender,
        })
    }

    /// The externally observable status, as advertised on the wire.
    pub fn actual_status(&self) -> Status {
        self.actual_status
    }

    pub fn is_reconfiguration_enabled(&self) -> bool {
        self.actual_status != Status::Disabled
    }

    /// Requests that reconfiguration be switched on. Effective on the next
    /// tick; ignored unless the engine is currently `Disabled`.
    pub fn enable_reconfiguration(&mut self) {
        if self.actual_status == Status::Disabled {
            self.target_status = Status::Ready;
        }
    }

    /// Requests that reconfiguration be switched off, from any state.
    /// Discovery requests are still answered while disabled. A pending
    /// proposal is abandoned without a final reply, a documented limitation
    /// of the protocol.
    pub fn disable_reconfiguration(&mut self) {
        self.target_status = Status::Disabled;
    }

    /// Confirms the currently staged proposal. No effect unless the engine
    /// is in `AwaitingConfirmation`.
    pub fn confirm(&mut self) {
        if self.actual_status == Status::AwaitingConfirmation {
            self.target_status = Status::Cooldown;
        }
    }

    /// One cycle of the engine: dequeue and act on at most one inbound
    /// message, then reconcile `actual_status` toward `target_status`.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal send failures; the caller must stop
    /// the host's activities.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> Result<(), EngineError> {
        if let Some(message) = self.queue.pop() {
            self.process_message(&message)?;
        }
        self.reconcile(now)
    }

    // ── Message handling ──────────────────────────────────────────────────────

    fn process_message(&mut self, message: &RawMessage) -> Result<(), EngineError> {
        match classify(&message.payload) {
            Some(MessageKind::FindRequest) => self.answer_find_request(message.sender),
            Some(MessageKind::ConfRequest) => self.consider_conf_request(message),
            Some(MessageKind::Find) | Some(MessageKind::Conf) => {
                // Replies from other hosts, or our own rebroadcasts echoed
                // back to us. Not our business.
                trace!(sender = %message.sender, "ignoring a reply datagram");
                Ok(())
            }
            None => {
                warn!(sender = %message.sender, "dropping an unrecognizable datagram");
                Ok(())
            }
        }
    }

    /// Discovery is always answered, regardless of state: even `Disabled`
    /// only switches off reconfiguration, not visibility.
    fn answer_find_request(&mut self, requester: SocketAddr) -> Result<(), EngineError> {
        let Some(current) = self.delegate.try_get_configuration() else {
            error!("could not retrieve the network configuration; FINDReq left unanswered");
            return Ok(());
        };

        let reply = Message::Find(FindReply {
            ip_address: current.ip_address.unwrap_or(Ipv4Addr::UNSPECIFIED),
            mac_address: current.mac_address,
            device_name: self.settings.device_name.clone(),
            serial_number: self.settings.serial_number.clone(),
            status: self.actual_status,
            network_mode: current.mode,
            subnet_mask: current.subnet_mask.unwrap_or(Ipv4Addr::UNSPECIFIED),
            gateway_address: current.gateway_address.unwrap_or(Ipv4Addr::UNSPECIFIED),
        });
        self.sender
            .send_response(&codec::encode_message(&reply), requester)?;
        Ok(())
    }

    fn consider_conf_request(&mut self, message: &RawMessage) -> Result<(), EngineError> {
        // Attribution first: a CONFReq for another device is none of our
        // business even when malformed, so the target MAC is extracted
        // leniently before any validation.
        let Some(target) = peek_hardware_address(&message.payload) else {
            return Ok(());
        };
        if !target.eq_ignore_ascii_case(&self.hardware_address) {
            trace!(%target, "CONFReq addressed to another device");
            return Ok(());
        }

        if self.actual_status != Status::Ready || self.pending.is_some() {
            debug!(
                status = %self.actual_status,
                "rejecting CONFReq, not ready to stage a request"
            );
            return self.send_conf_reply(message.sender, RESULT_BUSY.to_string());
        }

        let configuration = match codec::decode_message(&message.payload) {
            Ok(Message::ConfRequest(configuration)) => configuration,
            Ok(_) => return Ok(()),
            Err(reason) => {
                debug!(%reason, "rejecting malformed CONFReq");
                return self.send_conf_reply(message.sender, format!("Error-{reason}"));
            }
        };

        // The proposed address must be plausible before the change is
        // staged; a DHCP proposal carries no address to vet.
        if configuration.mode == NetworkMode::Static {
            if let Some(ip) = configuration.ip_address {
                if !is_usable_unicast_ipv4(ip) {
                    debug!(%ip, "rejecting CONFReq proposing an unusable address");
                    return self.send_conf_reply(message.sender, RESULT_UNUSABLE_IP.to_string());
                }
            }
        }

        info!(
            requester = %message.sender,
            mode = %configuration.mode,
            "staging a reconfiguration request"
        );
        self.pending = Some(PendingRequest {
            configuration,
            requester: message.sender,
        });
        self.target_status = if self.settings.confirmation_enabled {
            Status::AwaitingConfirmation
        } else {
            Status::Cooldown
        };
        Ok(())
    }

    // ── State reconciliation ──────────────────────────────────────────────────

    fn reconcile(&mut self, now: Instant) -> Result<(), EngineError> {
        use Status::*;

        match (self.actual_status, self.target_status) {
            // The risky transition: commit the staged configuration.
            (Ready, Cooldown) | (AwaitingConfirmation, Cooldown) => self.apply_pending(now),

            (Ready, AwaitingConfirmation) => {
                self.actual_status = AwaitingConfirmation;
                self.confirmation_deadline = Some(now + self.settings.confirmation_timeout);
                info!("awaiting confirmation of the staged request");
                Ok(())
            }

            (AwaitingConfirmation, AwaitingConfirmation) => {
                if self.confirmation_deadline.is_some_and(|deadline| now >= deadline) {
                    // Timed out; the revert happens on the next tick.
                    self.target_status = Ready;
                }
                Ok(())
            }

            (AwaitingConfirmation, Ready) => {
                self.actual_status = Ready;
                self.confirmation_deadline = None;
                if let Some(pending) = self.pending.take() {
                    warn!(requester = %pending.requester, "request was not confirmed in time");
                    self.send_conf_reply(
                        pending.requester,
                        RESULT_CONFIRMATION_TIMEOUT.to_string(),
                    )?;
                }
                Ok(())
            }

            (Cooldown, Cooldown) => {
                if self.cooldown_deadline.is_some_and(|deadline| now >= deadline) {
                    self.target_status = Ready;
                }
                Ok(())
            }

            (Cooldown, Ready) => {
                self.actual_status = Ready;
                self.cooldown_deadline = None;
                debug!("cooldown over, accepting requests again");
                Ok(())
            }

            (Disabled, Ready) => {
                self.actual_status = Ready;
                info!("reconfiguration enabled");
                Ok(())
            }

            (Ready | AwaitingConfirmation | Cooldown, Disabled) => {
                if self.pending.take().is_some() {
                    warn!("reconfiguration disabled with a request pending; requester abandoned");
                }
                self.actual_status = Disabled;
                self.confirmation_deadline = None;
                self.cooldown_deadline = None;
                info!("reconfiguration disabled");
                Ok(())
            }

            // Identity transitions and combinations no input can produce.
            _ => Ok(()),
        }
    }

    /// Commits the pending configuration through the delegate and reports
    /// the outcome. This is the single place the device's own network
    /// settings change.
    fn apply_pending(&mut self, now: Instant) -> Result<(), EngineError> {
        let Some(pending) = self.pending.take() else {
            // Nothing staged; there is nothing to cool down from.
            self.target_status = Status::Ready;
            return Ok(());
        };
        self.confirmation_deadline = None;

        let result = if self
            .delegate
            .try_set_configuration(pending.configuration.clone())
        {
            info!(requester = %pending.requester, "new network configuration applied");
            self.actual_status = Status::Cooldown;
            self.target_status = Status::Cooldown;
            self.cooldown_deadline = Some(now + self.settings.cooldown_timeout);
            RESULT_OK.to_string()
        } else {
            warn!("the embedding application rejected the staged configuration");
            self.actual_status = Status::Ready;
            self.target_status = Status::Ready;
            RESULT_APPLY_FAILED.to_string()
        };

        self.send_conf_reply(pending.requester, result)
    }

    /// Builds and sends a CONF reply carrying `result` and echoing the
    /// device's configuration as of now (addresses only for static mode).
    fn send_conf_reply(&mut self, requester: SocketAddr, result: String) -> Result<(), EngineError> {
        let current = self.delegate.try_get_configuration();
        let statics = current
            .as_ref()
            .filter(|c| !c.is_dhcp_enabled())
            .cloned();

        let reply = Message::Conf(ConfReply {
            mac_address: self.hardware_address.clone(),
            status: self.actual_status,
            result,
            network_mode: current.as_ref().map(|c| c.mode),
            ip_address: statics.as_ref().and_then(|c| c.ip_address),
            subnet_mask: statics.as_ref().and_then(|c| c.subnet_mask),
            gateway_address: statics.as_ref().and_then(|c| c.gateway_address),
        });
        self.sender
            .send_response(&codec::encode_message(&reply), requester)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
