use std::sync::Arc;

use btleplug::api::BDAddr;
use tracing::info;

use super::btleplug_backend::BtleplugTransport;
use super::fake_backend::{FakeDevice, FakeTransport};
use super::transport::BleTransport;
use crate::error::InteractionError;

/// Runtime BLE backend selection.
#[derive(Debug, Clone)]
pub enum HardwareBackend {
    /// Platform Bluetooth via `btleplug`.
    Real,
    /// In-process emulator starting from the given device state.
    Fake(FakeDevice),
}

/// Builds the transport for the selected backend.
///
/// # Errors
///
/// Returns an error if the platform BLE manager cannot be created.
pub async fn transport_from_backend(
    backend: HardwareBackend,
    address: BDAddr,
) -> Result<Arc<dyn BleTransport>, InteractionError> {
    let transport: Arc<dyn BleTransport> = match backend {
        HardwareBackend::Real => Arc::new(BtleplugTransport::new(address).await?),
        HardwareBackend::Fake(device) => {
            info!("using fake BLE backend");
            Arc::new(FakeTransport::builder().device(device).build())
        }
    };

    Ok(transport)
}
