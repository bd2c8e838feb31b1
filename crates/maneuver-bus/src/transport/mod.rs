//! Transport layer
//!
//! This module provides the raw device abstraction and the adapter the
//! control loop talks to:
//! - SocketCAN device for raw CAN (Linux only)
//! - Mock device for testing and dry runs
//!
//! # Example
//!
//! ```ignore
//! use maneuver_bus::config::{DeviceConfig, MockConfig};
//! use maneuver_bus::transport::{create_device, TransportAdapter};
//!
//! let device = create_device(&DeviceConfig::Mock(MockConfig::default()))?;
//! let transport = TransportAdapter::new(device);
//! let batch = transport.receive(false).await?;
//! ```

mod adapter;
mod device;
pub mod error;
pub mod mock;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan;

pub use adapter::TransportAdapter;
pub use device::BusDevice;
pub use error::TransportError;

use std::sync::Arc;

use crate::config::DeviceConfig;

/// Open a bus device based on configuration
pub fn create_device(config: &DeviceConfig) -> Result<Arc<dyn BusDevice>, TransportError> {
    match config {
        #[cfg(all(target_os = "linux", feature = "socketcan"))]
        DeviceConfig::SocketCan(cfg) => {
            let device = socketcan::SocketCanDevice::open(cfg)?;
            Ok(Arc::new(device))
        }
        #[cfg(not(all(target_os = "linux", feature = "socketcan")))]
        DeviceConfig::SocketCan(_) => Err(TransportError::Unsupported(
            "SocketCAN requires Linux and the 'socketcan' feature".to_string(),
        )),
        DeviceConfig::Mock(cfg) => {
            let device = mock::MockBusDevice::from_config(cfg)?;
            Ok(Arc::new(device))
        }
    }
}
