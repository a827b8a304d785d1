//! Integration tests driving the reconfiguration workflows through the
//! engine's public API, the way the service's tick loop does.
//!
//! Collaborators are the real in-memory delegate plus a recording sender,
//! so each test can inspect both what was applied and what went out on the
//! wire.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lcfind_core::{NetworkConfiguration, Status};
use lcfind_host::{
    ConfigurationDelegate, EngineSettings, HostEngine, InboundQueue, MemoryConfigurationDelegate,
    RawMessage, ResponseSender, SendError,
};

const MAC: &str = "00-11-22-33-44-55";

/// Sender double that records every reply instead of touching a socket.
#[derive(Clone, Default)]
struct RecordingSender {
    sent: Arc<Mutex<Vec<(String, SocketAddr)>>>,
}

impl RecordingSender {
    fn replies(&self) -> Vec<(String, SocketAddr)> {
        self.sent.lock().expect("sender lock").clone()
    }
}

impl ResponseSender for RecordingSender {
    fn send_response(&self, message: &str, destination: SocketAddr) -> Result<(), SendError> {
        self.sent
            .lock()
            .expect("sender lock")
            .push((message.to_string(), destination));
        Ok(())
    }
}

/// Delegate wrapper so tests keep a handle to the configuration the engine
/// owns.
#[derive(Clone)]
struct SharedDelegate(Arc<MemoryConfigurationDelegate>);

impl ConfigurationDelegate for SharedDelegate {
    fn try_get_configuration(&self) -> Option<NetworkConfiguration> {
        self.0.try_get_configuration()
    }

    fn try_set_configuration(&self, configuration: NetworkConfiguration) -> bool {
        self.0.try_set_configuration(configuration)
    }
}

struct Harness {
    engine: HostEngine,
    queue: Arc<InboundQueue>,
    sender: RecordingSender,
    delegate: SharedDelegate,
    requester: SocketAddr,
}

impl Harness {
    fn new(settings: EngineSettings) -> Self {
        let delegate = SharedDelegate(Arc::new(MemoryConfigurationDelegate::new(
            NetworkConfiguration::dhcp(MAC),
        )));
        let sender = RecordingSender::default();
        let queue = Arc::new(InboundQueue::new(10));
        let engine = HostEngine::new(
            settings,
            Arc::clone(&queue),
            Box::new(delegate.clone()),
            Box::new(sender.clone()),
        )
        .expect("engine");
        Self {
            engine,
            queue,
            sender,
            delegate,
            requester: "192.168.1.9:50022".parse().unwrap(),
        }
    }

    fn push(&self, payload: &str) {
        self.queue.push(RawMessage {
            payload: payload.to_string(),
            sender: self.requester,
        });
    }

    fn tick(&mut self) {
        self.engine.tick().expect("tick");
    }

    fn make_ready(&mut self) {
        self.engine.enable_reconfiguration();
        self.tick();
        assert_eq!(self.engine.actual_status(), Status::Ready);
    }
}

fn fast_settings(confirmation_enabled: bool) -> EngineSettings {
    EngineSettings {
        serial_number: "CB5678".to_string(),
        device_name: "CARBIDE".to_string(),
        confirmation_enabled,
        confirmation_timeout: Duration::from_millis(40),
        cooldown_timeout: Duration::from_millis(40),
    }
}

fn static_conf_request() -> String {
    format!(
        "CONFReq=1;HWADDR={MAC};NetworkMode=Static;IP=192.168.1.80;\
         Mask=255.255.255.0;Gateway=192.168.1.1;\0"
    )
}

#[test]
fn full_reconfiguration_cycle_without_confirmation() {
    let mut h = Harness::new(fast_settings(false));
    h.make_ready();

    h.push(&static_conf_request());
    h.tick();
    assert_eq!(h.engine.actual_status(), Status::Cooldown);

    // The change reached the delegate, MAC preserved.
    let applied = h.delegate.try_get_configuration().expect("configuration");
    assert!(!applied.is_dhcp_enabled());
    assert_eq!(applied.ip_address, Some(Ipv4Addr::new(192, 168, 1, 80)));
    assert_eq!(applied.mac_address, MAC);

    // Exactly one CONF reply, Ok, to the requester.
    let replies = h.sender.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].0.starts_with("CONF=1;"));
    assert!(replies[0].0.contains("Result=Ok;"));
    assert_eq!(replies[0].1, h.requester);

    // After the cooldown elapses the host accepts requests again.
    std::thread::sleep(Duration::from_millis(60));
    h.tick();
    h.tick();
    assert_eq!(h.engine.actual_status(), Status::Ready);

    h.push(&format!("CONFReq=1;HWADDR={MAC};NetworkMode=DHCP;\0"));
    h.tick();
    assert_eq!(h.engine.actual_status(), Status::Cooldown);
    assert!(h
        .delegate
        .try_get_configuration()
        .expect("configuration")
        .is_dhcp_enabled());
}

#[test]
fn confirmation_gate_holds_the_change_until_confirmed() {
    let mut h = Harness::new(fast_settings(true));
    h.make_ready();

    h.push(&static_conf_request());
    h.tick();
    assert_eq!(h.engine.actual_status(), Status::AwaitingConfirmation);

    // Nothing applied and nothing sent while the gate is closed.
    assert!(h.delegate.try_get_configuration().expect("cfg").is_dhcp_enabled());
    assert!(h.sender.replies().is_empty());

    h.engine.confirm();
    h.tick();
    assert_eq!(h.engine.actual_status(), Status::Cooldown);
    assert!(!h.delegate.try_get_configuration().expect("cfg").is_dhcp_enabled());

    let replies = h.sender.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].0.contains("Result=Ok;"));
}

#[test]
fn unconfirmed_request_times_out_with_an_error_reply() {
    let mut h = Harness::new(fast_settings(true));
    h.make_ready();

    h.push(&static_conf_request());
    h.tick();
    assert_eq!(h.engine.actual_status(), Status::AwaitingConfirmation);

    std::thread::sleep(Duration::from_millis(60));
    h.tick(); // notices the elapsed deadline
    h.tick(); // performs the revert and replies
    assert_eq!(h.engine.actual_status(), Status::Ready);

    // The device configuration never changed.
    assert!(h.delegate.try_get_configuration().expect("cfg").is_dhcp_enabled());

    let replies = h.sender.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].0.contains("Result=Error-Host did not confirm request in time;"));

    // The slate is clean: a new request is admitted.
    h.push(&static_conf_request());
    h.tick();
    assert_eq!(h.engine.actual_status(), Status::AwaitingConfirmation);
}

#[test]
fn competing_request_is_rejected_and_first_wins() {
    let mut h = Harness::new(fast_settings(true));
    h.make_ready();

    h.push(&static_conf_request());
    h.tick();

    h.push(&format!(
        "CONFReq=1;HWADDR={MAC};NetworkMode=Static;IP=10.9.9.9;\
         Mask=255.0.0.0;Gateway=10.0.0.1;\0"
    ));
    h.tick();

    let replies = h.sender.replies();
    assert_eq!(replies.len(), 1, "only the busy rejection so far");
    assert!(replies[0].0.contains("Result=Error-Busy;"));

    h.engine.confirm();
    h.tick();

    // The first request's address was applied, not the competitor's.
    let applied = h.delegate.try_get_configuration().expect("cfg");
    assert_eq!(applied.ip_address, Some(Ipv4Addr::new(192, 168, 1, 80)));
}

#[test]
fn one_message_is_processed_per_tick() {
    let mut h = Harness::new(fast_settings(false));
    h.make_ready();

    h.push("FINDReq=1;\0");
    h.push(&static_conf_request());

    h.tick();
    let after_first = h.sender.replies();
    assert_eq!(after_first.len(), 1);
    assert!(after_first[0].0.starts_with("FIND=1;"), "discovery answered first");
    assert_eq!(h.engine.actual_status(), Status::Ready);

    h.tick();
    let after_second = h.sender.replies();
    assert_eq!(after_second.len(), 2);
    assert!(after_second[1].0.contains("Result=Ok;"));
    assert_eq!(h.engine.actual_status(), Status::Cooldown);
}

#[test]
fn discovery_reply_reflects_live_status() {
    let mut h = Harness::new(fast_settings(false));

    h.push("FINDReq=1;\0");
    h.tick();
    assert!(h.sender.replies()[0].0.contains("Status=Disabled;"));

    h.make_ready();
    h.push("FINDReq=1;\0");
    h.tick();
    assert!(h.sender.replies()[1].0.contains("Status=Ready;"));
}
