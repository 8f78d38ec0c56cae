use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::{sleep, timeout};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::model::CharacteristicInfo;
use super::transport::{BleTransport, DisconnectCallback, NotificationCallback};
use crate::error::InteractionError;

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Link {
    peripheral: Peripheral,
    watcher: CancellationToken,
}

/// [`BleTransport`] backed by `btleplug`, bound to one peripheral address.
pub struct BtleplugTransport {
    manager: Manager,
    address: BDAddr,
    link: Mutex<Option<Link>>,
    subscriptions: Mutex<HashMap<String, CancellationToken>>,
    disconnect_handler: Arc<Mutex<Option<DisconnectCallback>>>,
}

impl BtleplugTransport {
    /// Creates the transport. Nothing is scanned until [`BleTransport::connect`].
    ///
    /// # Errors
    ///
    /// Returns an error if the platform BLE manager cannot be created.
    pub async fn new(address: BDAddr) -> Result<Self, InteractionError> {
        let manager = Manager::new().await?;
        Ok(Self {
            manager,
            address,
            link: Mutex::new(None),
            subscriptions: Mutex::new(HashMap::new()),
            disconnect_handler: Arc::new(Mutex::new(None)),
        })
    }

    fn link(&self) -> MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscriptions(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn peripheral(&self) -> Result<Peripheral, InteractionError> {
        self.link()
            .as_ref()
            .map(|link| link.peripheral.clone())
            .ok_or(InteractionError::NotConnected)
    }

    fn characteristic(&self, uuid: &str) -> Result<(Peripheral, Characteristic), InteractionError> {
        let peripheral = self.peripheral()?;
        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|characteristic| characteristic.uuid.to_string().eq_ignore_ascii_case(uuid))
            .ok_or_else(|| InteractionError::UnknownCharacteristic {
                uuid: uuid.to_string(),
            })?;
        Ok((peripheral, characteristic))
    }

    #[instrument(skip(self), level = "trace")]
    async fn adapters(&self) -> Result<Vec<Adapter>, InteractionError> {
        let adapters = self.manager.adapters().await?;
        if adapters.is_empty() {
            return Err(InteractionError::NoAdapters);
        }
        Ok(adapters)
    }

    /// Scans every adapter until a peripheral with the bound address appears.
    #[instrument(skip(self, adapters), level = "debug", fields(address = %self.address))]
    async fn find_peripheral(
        &self,
        adapters: &[Adapter],
    ) -> Result<(Adapter, Peripheral), InteractionError> {
        for adapter in adapters {
            adapter.start_scan(ScanFilter::default()).await?;
        }

        loop {
            for adapter in adapters {
                for peripheral in adapter.peripherals().await? {
                    if peripheral.address() != self.address {
                        continue;
                    }

                    for handle in adapters {
                        if let Err(error) = handle.stop_scan().await {
                            debug!(?error, "failed to stop adapter scan cleanly");
                        }
                    }
                    return Ok((adapter.clone(), peripheral));
                }
            }

            sleep(SCAN_POLL_INTERVAL).await;
        }
    }

    fn spawn_disconnect_watcher(&self, adapter: Adapter, peripheral: &Peripheral) -> CancellationToken {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let peripheral_id = peripheral.id();
        let handler = Arc::clone(&self.disconnect_handler);

        tokio::spawn(async move {
            let mut events = match adapter.events().await {
                Ok(events) => events,
                Err(error) => {
                    warn!(?error, "could not subscribe to adapter events");
                    return;
                }
            };

            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    event = events.next() => match event {
                        Some(CentralEvent::DeviceDisconnected(id)) if id == peripheral_id => {
                            info!("peripheral disconnected");
                            let handler = handler
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .clone();
                            if let Some(handler) = handler {
                                handler();
                            }
                            break;
                        }
                        Some(_other) => {}
                        None => break,
                    },
                }
            }
        });

        token
    }

    fn cancel_subscriptions(&self) {
        for (_uuid, token) in self.subscriptions().drain() {
            token.cancel();
        }
    }
}

#[async_trait]
impl BleTransport for BtleplugTransport {
    #[instrument(skip(self), level = "debug", fields(address = %self.address))]
    async fn connect(&self, connect_timeout: Duration) -> Result<(), InteractionError> {
        if self.is_connected().await {
            return Ok(());
        }

        let adapters = self.adapters().await?;
        info!(adapter_count = adapters.len(), "scanning for peripheral");
        let (adapter, peripheral) = timeout(connect_timeout, self.find_peripheral(&adapters))
            .await
            .map_err(|_elapsed| InteractionError::DeviceNotFound {
                address: self.address,
            })??;

        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        peripheral.discover_services().await?;

        let watcher = self.spawn_disconnect_watcher(adapter, &peripheral);
        let previous = self.link().replace(Link {
            peripheral,
            watcher,
        });
        if let Some(previous) = previous {
            previous.watcher.cancel();
        }
        info!("connected to peripheral");
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(address = %self.address))]
    async fn disconnect(&self) -> Result<(), InteractionError> {
        self.cancel_subscriptions();
        let Some(link) = self.link().take() else {
            return Ok(());
        };
        link.watcher.cancel();
        if link.peripheral.is_connected().await? {
            link.peripheral.disconnect().await?;
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let Ok(peripheral) = self.peripheral() else {
            return false;
        };
        peripheral.is_connected().await.unwrap_or(false)
    }

    async fn characteristics(&self) -> Result<Vec<CharacteristicInfo>, InteractionError> {
        let peripheral = self.peripheral()?;
        Ok(peripheral
            .characteristics()
            .into_iter()
            .map(|characteristic| {
                CharacteristicInfo::new(
                    characteristic.uuid.to_string(),
                    property_labels(characteristic.properties),
                )
            })
            .collect())
    }

    #[instrument(skip(self, payload), level = "trace", fields(payload_len = payload.len()))]
    async fn write(&self, uuid: &str, payload: &[u8]) -> Result<(), InteractionError> {
        let (peripheral, characteristic) = self.characteristic(uuid)?;
        let write_type = if characteristic.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        peripheral
            .write(&characteristic, payload, write_type)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, callback), level = "debug")]
    async fn subscribe(
        &self,
        uuid: &str,
        callback: NotificationCallback,
    ) -> Result<(), InteractionError> {
        let (peripheral, characteristic) = self.characteristic(uuid)?;
        let mut notifications = peripheral.notifications().await?;
        peripheral.subscribe(&characteristic).await?;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let expected = characteristic.uuid;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    notification = notifications.next() => match notification {
                        Some(notification) if notification.uuid == expected => {
                            callback(notification.value);
                        }
                        Some(_other) => {}
                        None => {
                            trace!("notification stream closed");
                            break;
                        }
                    },
                }
            }
        });

        if let Some(previous) = self.subscriptions().insert(uuid.to_ascii_lowercase(), token) {
            previous.cancel();
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn unsubscribe(&self, uuid: &str) -> Result<(), InteractionError> {
        if let Some(token) = self.subscriptions().remove(&uuid.to_ascii_lowercase()) {
            token.cancel();
        }
        let (peripheral, characteristic) = self.characteristic(uuid)?;
        peripheral.unsubscribe(&characteristic).await?;
        Ok(())
    }

    fn set_disconnect_handler(&self, handler: DisconnectCallback) {
        *self
            .disconnect_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }
}

impl std::fmt::Debug for BtleplugTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleplugTransport")
            .field("address", &self.address)
            .field("linked", &self.link().is_some())
            .finish_non_exhaustive()
    }
}

fn property_labels(flags: CharPropFlags) -> Vec<String> {
    let labels: Vec<String> = flags
        .iter_names()
        .map(|(name, _)| name.to_lowercase())
        .collect();
    if labels.is_empty() {
        vec!["none".to_string()]
    } else {
        labels
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn property_labels_lowercase_flag_names() {
        let labels = property_labels(CharPropFlags::WRITE | CharPropFlags::NOTIFY);
        assert_eq!(vec!["write".to_string(), "notify".to_string()], labels);
    }

    #[test]
    fn property_labels_reports_none_for_empty_flags() {
        assert_eq!(vec!["none".to_string()], property_labels(CharPropFlags::empty()));
    }

    #[test]
    fn labels_feed_capability_checks() {
        let info = CharacteristicInfo::new(
            "8b00ace7-eb0b-49b0-bbe9-9aee0a26e1a3",
            property_labels(CharPropFlags::WRITE_WITHOUT_RESPONSE),
        );
        assert!(info.supports_write());
        assert!(!info.supports_notify());
    }
}
