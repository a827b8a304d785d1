//! Seam between the protocol engine and the embedding application's actual
//! network configuration.

use std::sync::Mutex;

use lcfind_core::NetworkConfiguration;

#[cfg(test)]
use mockall::automock;

/// Capability the embedding application must supply: reading the device's
/// current network configuration and committing a new one.
///
/// `try_set_configuration` is called synchronously from the tick loop; it
/// must not return until the change has been committed or rejected, because
/// the CONF reply reporting the outcome is not sent until it returns. No
/// partial-apply rollback is attempted.
#[cfg_attr(test, automock)]
pub trait ConfigurationDelegate {
    /// Returns the current configuration, or `None` when it is momentarily
    /// unobtainable (e.g. the NIC is still coming up).
    fn try_get_configuration(&self) -> Option<NetworkConfiguration>;

    /// Commits `configuration` to the device. Returns `false` when the
    /// change was rejected or failed.
    fn try_set_configuration(&self, configuration: NetworkConfiguration) -> bool;
}

/// In-memory delegate: holds a configuration and accepts every change.
///
/// Backs the demo binary and the integration tests; a real device replaces
/// it with a delegate that programs the NIC.
pub struct MemoryConfigurationDelegate {
    current: Mutex<NetworkConfiguration>,
}

impl MemoryConfigurationDelegate {
    pub fn new(initial: NetworkConfiguration) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }
}

impl ConfigurationDelegate for MemoryConfigurationDelegate {
    fn try_get_configuration(&self) -> Option<NetworkConfiguration> {
        Some(self.lock().clone())
    }

    fn try_set_configuration(&self, configuration: NetworkConfiguration) -> bool {
        let mut current = self.lock();
        // The hardware address is not reconfigurable; keep the device's own.
        let mac_address = current.mac_address.clone();
        *current = NetworkConfiguration {
            mac_address,
            ..configuration
        };
        true
    }
}

impl MemoryConfigurationDelegate {
    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkConfiguration> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
