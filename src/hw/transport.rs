use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::model::CharacteristicInfo;
use crate::error::InteractionError;

/// Receives every notification payload for a subscribed characteristic.
pub type NotificationCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Invoked when the link drops without the session asking for it.
pub type DisconnectCallback = Arc<dyn Fn() + Send + Sync>;

/// Platform BLE client bound to one peripheral.
///
/// Implementations own discovery of the peripheral by address; the session only
/// drives the primitives below.
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// Connects to the peripheral, failing if `timeout` elapses first.
    async fn connect(&self, timeout: Duration) -> Result<(), InteractionError>;

    /// Closes the link if it is open.
    async fn disconnect(&self) -> Result<(), InteractionError>;

    /// Whether the link is currently up.
    async fn is_connected(&self) -> bool;

    /// Lists every characteristic exposed by the connected peripheral.
    async fn characteristics(&self) -> Result<Vec<CharacteristicInfo>, InteractionError>;

    /// Writes `payload` to the characteristic with `uuid`.
    async fn write(&self, uuid: &str, payload: &[u8]) -> Result<(), InteractionError>;

    /// Enables notifications on `uuid`, delivering each payload to `callback`.
    async fn subscribe(
        &self,
        uuid: &str,
        callback: NotificationCallback,
    ) -> Result<(), InteractionError>;

    /// Stops notifications on `uuid`.
    async fn unsubscribe(&self, uuid: &str) -> Result<(), InteractionError>;

    /// Installs the handler for unsolicited disconnects.
    fn set_disconnect_handler(&self, handler: DisconnectCallback);
}
