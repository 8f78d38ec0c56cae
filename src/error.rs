use std::time::Duration;

use btleplug::api::BDAddr;
use derive_more::From;
use thiserror::Error;

use crate::handlers::FrameCodecError;
use crate::protocol::EndpointId;

/// Errors returned by BLE transport operations.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("BLE operation failed")]
    Ble(#[from] btleplug::Error),
    #[error("no BLE adapters were found")]
    NoAdapters,
    #[error("no peripheral with address {address} was found")]
    DeviceNotFound { address: BDAddr },
    #[error("connecting to {address} timed out after {}", humantime::format_duration(*timeout))]
    ConnectTimeout { address: BDAddr, timeout: Duration },
    #[error("the peripheral is not connected")]
    NotConnected,
    #[error(
        "required endpoint `{name}` ({uuid}) was not found on the connected device",
        name = endpoint.name(),
        uuid = endpoint.uuid()
    )]
    MissingCharacteristic { endpoint: EndpointId },
    #[error(
        "endpoint `{name}` ({uuid}) matched {count} characteristics; exactly one is required",
        name = endpoint.name(),
        uuid = endpoint.uuid()
    )]
    AmbiguousCharacteristic { endpoint: EndpointId, count: usize },
    #[error("characteristic {uuid} is not exposed by the connected device")]
    UnknownCharacteristic { uuid: String },
    #[error("fake transport rejected `{operation}`")]
    InjectedFailure { operation: &'static str },
    #[error("failed while waiting for Ctrl+C")]
    CtrlC { source: std::io::Error },
}

/// Errors returned when parsing hexadecimal fixtures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FixtureError {
    #[error("hex payload is empty")]
    EmptyPayload,
    #[error("hex payload is invalid")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Errors returned when validating runtime backend options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("--address is required unless --fake is set")]
    MissingAddress,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level protocol errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ProtocolError {
    #[error(transparent)]
    #[from(FrameCodecError, Box<FrameCodecError>)]
    FrameCodec(Box<FrameCodecError>),
    #[error(transparent)]
    #[from(InteractionError, Box<InteractionError>)]
    Interaction(Box<InteractionError>),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn scan_miss_and_connect_timeout_are_reported_differently() {
        let address = BDAddr::from([0xA4, 0xC1, 0x38, 0x10, 0x01, 0x00]);

        assert_eq!(
            "no peripheral with address A4:C1:38:10:01:00 was found",
            InteractionError::DeviceNotFound { address }.to_string()
        );
        assert_eq!(
            "connecting to A4:C1:38:10:01:00 timed out after 20s",
            InteractionError::ConnectTimeout {
                address,
                timeout: Duration::from_secs(20),
            }
            .to_string()
        );
    }
}
