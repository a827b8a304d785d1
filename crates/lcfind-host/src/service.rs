//! Socket ownership and the host's two background activities.
//!
//! `HostService::start` binds the protocol socket and spawns:
//!
//! - **`lcfind-pump`** – blocking `recv_from` loop with a 500 ms read
//!   timeout. It converts each datagram into a [`RawMessage`] and pushes it
//!   onto the bounded queue; it decodes nothing and never touches engine
//!   state. The read timeout exists so the running flag is re-checked at
//!   least twice a second.
//! - **`lcfind-tick`** – the single writer of engine state. Each iteration
//!   drains any queued API commands, runs one [`HostEngine::tick`], publishes
//!   the observable status, and sleeps ~1 ms.
//!
//! Shutdown is one flag store plus two joins; the sockets are dropped when
//! the threads exit, so the port is released deterministically. A fatal tick
//! error (a send failure that is not an unreachable condition) clears the
//! running flag itself: the host stops rather than half-operating.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{error, info, warn};

use lcfind_core::Status;

use crate::config::HostConfig;
use crate::delegate::ConfigurationDelegate;
use crate::engine::{EngineError, EngineSettings, HostEngine};
use crate::queue::{InboundQueue, RawMessage};
use crate::sender::UdpResponseSender;

/// How long a blocking read waits before the pump re-checks the running flag.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause between ticks. Millisecond-scale polling is plenty: deadlines are
/// measured in seconds and discovery traffic in messages per second.
const TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Big enough to hold any UDP datagram.
const RECEIVE_BUFFER_SIZE: usize = 0x10000;

/// Error type for starting the host service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The protocol socket could not be bound. Make sure no other program
    /// holds the port without the reuse-address option.
    #[error("failed to bind LC-FIND socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Preparing the sender's socket handle failed.
    #[error("failed to clone the protocol socket: {0}")]
    SocketClone(#[source] io::Error),

    /// The engine could not be constructed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// API calls travel to the tick thread as commands so that engine state has
/// exactly one writer. Each takes effect on the next tick.
enum EngineCommand {
    EnableReconfiguration,
    DisableReconfiguration,
    Confirm,
}

/// Handle to a running host: the embedding application's control surface.
pub struct HostService {
    running: Arc<AtomicBool>,
    commands: mpsc::Sender<EngineCommand>,
    status: Arc<Mutex<Status>>,
    pump: Option<JoinHandle<()>>,
    tick: Option<JoinHandle<()>>,
}

impl HostService {
    /// Binds the protocol socket and starts the pump and tick activities.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BindFailed`] when the socket cannot be bound
    /// (there is no point continuing without it) and
    /// [`ServiceError::Engine`] when the delegate cannot supply the device's
    /// configuration at startup.
    pub fn start(
        config: &HostConfig,
        delegate: Box<dyn ConfigurationDelegate + Send>,
    ) -> Result<Self, ServiceError> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.protocol.port));
        let socket = bind_protocol_socket(addr)
            .map_err(|source| ServiceError::BindFailed { addr, source })?;
        let reply_socket = socket.try_clone().map_err(ServiceError::SocketClone)?;
        // Replies rebroadcast on the port actually bound, which matters when
        // a test config binds an ephemeral port.
        let bound_port = socket
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(config.protocol.port);

        let queue = Arc::new(InboundQueue::new(config.protocol.queue_capacity));
        let settings = EngineSettings {
            serial_number: config.device.serial_number.clone(),
            device_name: config.device.device_name.clone(),
            confirmation_enabled: config.protocol.confirmation_enabled,
            confirmation_timeout: Duration::from_secs(config.protocol.confirmation_timeout_secs),
            cooldown_timeout: Duration::from_secs(config.protocol.cooldown_timeout_secs),
        };
        let mut engine = HostEngine::new(
            settings,
            Arc::clone(&queue),
            delegate,
            Box::new(UdpResponseSender::new(reply_socket, bound_port)),
        )?;

        let running = Arc::new(AtomicBool::new(true));
        let status = Arc::new(Mutex::new(engine.actual_status()));
        let (command_tx, command_rx) = mpsc::channel::<EngineCommand>();

        let pump = {
            let running = Arc::clone(&running);
            let queue = Arc::clone(&queue);
            std::thread::Builder::new()
                .name("lcfind-pump".to_string())
                .spawn(move || pump_loop(socket, queue, running))
                .expect("failed to spawn pump thread")
        };

        let tick = {
            let running = Arc::clone(&running);
            let status = Arc::clone(&status);
            std::thread::Builder::new()
                .name("lcfind-tick".to_string())
                .spawn(move || {
                    while running.load(Ordering::Relaxed) {
                        while let Ok(command) = command_rx.try_recv() {
                            apply_command(&mut engine, command);
                        }
                        if let Err(e) = engine.tick() {
                            error!("tick failed: {e}; host activities will stop now");
                            running.store(false, Ordering::Relaxed);
                            break;
                        }
                        publish_status(&status, engine.actual_status());
                        std::thread::sleep(TICK_INTERVAL);
                    }
                    info!("tick loop stopped");
                })
                .expect("failed to spawn tick thread")
        };

        info!("LC-FIND host listening on UDP {addr}");
        Ok(Self {
            running,
            commands: command_tx,
            status,
            pump: Some(pump),
            tick: Some(tick),
        })
    }

    /// Switches reconfiguration on. Effective on the next tick; ignored
    /// unless the host is currently disabled.
    pub fn enable_reconfiguration(&self) {
        let _ = self.commands.send(EngineCommand::EnableReconfiguration);
    }

    /// Switches reconfiguration off from any state. Discovery replies
    /// continue; a pending request is abandoned without a final reply.
    pub fn disable_reconfiguration(&self) {
        let _ = self.commands.send(EngineCommand::DisableReconfiguration);
    }

    /// Confirms a staged request awaiting the human-confirmation step.
    pub fn confirm(&self) {
        let _ = self.commands.send(EngineCommand::Confirm);
    }

    /// The engine's observable status as of the last completed tick.
    pub fn actual_status(&self) -> Status {
        *self
            .status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// True while both activities are running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stops both activities and waits for them to exit, releasing the
    /// socket. Idempotent.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.pump.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.tick.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HostService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply_command(engine: &mut HostEngine, command: EngineCommand) {
    match command {
        EngineCommand::EnableReconfiguration => engine.enable_reconfiguration(),
        EngineCommand::DisableReconfiguration => engine.disable_reconfiguration(),
        EngineCommand::Confirm => engine.confirm(),
    }
}

fn publish_status(cell: &Mutex<Status>, status: Status) {
    *cell.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = status;
}

/// Creates the protocol socket with reuse-address and broadcast enabled
/// before binding: host and client share the fixed port, and replies are
/// rebroadcast.
fn bind_protocol_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.bind(&addr.into())?;
    let socket: UdpSocket = socket.into();
    socket.set_read_timeout(Some(READ_TIMEOUT))?;
    Ok(socket)
}

/// The receive pump: read datagrams, enqueue raw messages, nothing else.
fn pump_loop(socket: UdpSocket, queue: Arc<InboundQueue>, running: Arc<AtomicBool>) {
    let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];

    while running.load(Ordering::Relaxed) {
        let (len, sender) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if is_timeout(&e) => continue,
            Err(e) => {
                error!("receive failed: {e}");
                continue;
            }
        };

        if len == 0 {
            warn!(%sender, "message of zero length received");
            continue;
        }

        // Raw bytes become text here and nowhere else; invalid UTF-8 turns
        // into replacement characters and fails decoding later, on the tick
        // thread, where a proper error reply can be produced.
        let payload = String::from_utf8_lossy(&buf[..len]).into_owned();
        queue.push(RawMessage { payload, sender });
    }
    info!("receive pump stopped");
}

/// Returns `true` for OS timeout / would-block errors the pump should
/// simply retry.
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
