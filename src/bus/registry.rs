//! Named cache of opened buses
//!
//! Opening the same serial port twice fails on most platforms, so callers
//! that resolve buses by name share one registry and go through
//! [`BusRegistry::get_or_open`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::I2cBus;
use crate::config::SerialConfig;
use crate::device::DeviceClient;
use crate::error::Result;
use crate::serial::{self, SerialTransport};

/// Registry of buses keyed by name
pub struct BusRegistry<T> {
    buses: Mutex<HashMap<String, Arc<I2cBus<T>>>>,
}

impl<T> Default for BusRegistry<T> {
    fn default() -> Self {
        Self {
            buses: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: SerialTransport> BusRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the bus registered as `name`, opening it with `open` if absent
    ///
    /// The registry lock is held while `open` runs, so concurrent callers
    /// asking for the same name never open the device twice. A failed open
    /// leaves the registry unchanged.
    pub async fn get_or_open<F, Fut>(&self, name: &str, open: F) -> Result<Arc<I2cBus<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DeviceClient<T>>>,
    {
        let mut buses = self.buses.lock().await;

        if let Some(bus) = buses.get(name) {
            return Ok(bus.clone());
        }

        let device = open().await?;
        let bus = Arc::new(I2cBus::new(name, device));
        buses.insert(name.to_string(), bus.clone());

        info!("Registered I2C bus {}", name);
        Ok(bus)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<I2cBus<T>>> {
        self.buses.lock().await.get(name).cloned()
    }

    /// Forget the bus registered as `name`
    ///
    /// The transport closes once the last outstanding handle is dropped.
    pub async fn remove(&self, name: &str) -> Option<Arc<I2cBus<T>>> {
        self.buses.lock().await.remove(name)
    }

    pub async fn len(&self) -> usize {
        self.buses.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buses.lock().await.is_empty()
    }
}

impl BusRegistry<tokio_serial::SerialStream> {
    /// Return the bus `name`, opening the serial port in `config` if absent
    pub async fn get_or_open_serial(
        &self,
        name: &str,
        config: &SerialConfig,
    ) -> Result<Arc<I2cBus<tokio_serial::SerialStream>>> {
        self.get_or_open(name, || serial::open_device(config)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::io::{Builder, Mock};

    #[tokio::test]
    async fn test_get_or_open_opens_once() {
        let registry: BusRegistry<Mock> = BusRegistry::new();
        let counter = AtomicUsize::new(0);
        let opened = &counter;

        let open = move || async move {
            opened.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BridgeError>(DeviceClient::new(Builder::new().build()))
        };

        let first = registry.get_or_open("i2c0", open).await.unwrap();
        let second = registry.get_or_open("i2c0", open).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(first.name(), "i2c0");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_names_open_distinct_buses() {
        let registry: BusRegistry<Mock> = BusRegistry::new();
        let open = || async { Ok::<_, BridgeError>(DeviceClient::new(Builder::new().build())) };

        let a = registry.get_or_open("i2c0", open).await.unwrap();
        let b = registry.get_or_open("i2c1", open).await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_open_is_not_cached() {
        let registry: BusRegistry<Mock> = BusRegistry::new();

        let result = registry
            .get_or_open("i2c0", || async {
                Err::<DeviceClient<Mock>, _>(BridgeError::Serial("Failed to open /dev/ttyUSB9".to_string()))
            })
            .await;
        assert!(matches!(result, Err(BridgeError::Serial(_))));
        assert!(registry.is_empty().await);

        registry
            .get_or_open("i2c0", || async { Ok::<_, BridgeError>(DeviceClient::new(Builder::new().build())) })
            .await
            .unwrap();
        assert!(registry.get("i2c0").await.is_some());
    }

    #[tokio::test]
    async fn test_remove() {
        let registry: BusRegistry<Mock> = BusRegistry::new();
        registry
            .get_or_open("i2c0", || async { Ok::<_, BridgeError>(DeviceClient::new(Builder::new().build())) })
            .await
            .unwrap();

        assert!(registry.remove("i2c0").await.is_some());
        assert!(registry.remove("i2c0").await.is_none());
        assert!(registry.get("i2c0").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_or_open_serial_invalid_port() {
        let registry: BusRegistry<tokio_serial::SerialStream> = BusRegistry::new();
        let config = SerialConfig {
            port: "/dev/nonexistent_serial_device_12345".to_string(),
            ..SerialConfig::default()
        };

        let result = registry.get_or_open_serial("i2c0", &config).await;
        assert!(matches!(result, Err(BridgeError::Serial(_))));
        assert!(registry.is_empty().await);
    }
}
