use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bon::bon;
use tokio::time::sleep;
use tracing::{debug, instrument, trace};

use super::model::CharacteristicInfo;
use super::transport::{BleTransport, DisconnectCallback, NotificationCallback};
use crate::error::InteractionError;
use crate::handlers::{FrameCodec, LightCommand, Rgb};
use crate::protocol::{
    Channel, NOTIFY_CHARACTERISTIC_UUID, OPCODE_STATUS_REQUEST, ReplyVersion,
    WRITE_CHARACTERISTIC_UUID,
};
use crate::utils::format_hex;

/// Effect the firmware falls back to when the colour channel powers up.
const POWER_UP_EFFECT: u8 = 2;

/// Emulated TL100 device state, in wire units.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FakeDevice {
    /// White channel on flag.
    pub white_on: bool,
    /// White channel brightness percentage.
    pub white_wire: u8,
    /// Colour channel on flag.
    pub color_on: bool,
    /// Colour channel brightness percentage.
    pub color_wire: u8,
    /// Colour channel RGB value.
    pub rgb: Rgb,
    /// Active effect index.
    pub effect: u8,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            white_on: false,
            white_wire: 50,
            color_on: false,
            color_wire: 50,
            rgb: Rgb::new(255, 255, 255),
            effect: 0,
        }
    }
}

impl FakeDevice {
    /// Builds the version-1 notification the device sends for its white channel.
    #[must_use]
    pub fn white_status(&self) -> Vec<u8> {
        status_frame(&[
            OPCODE_STATUS_REQUEST,
            ReplyVersion::WhiteStatus.as_byte(),
            u8::from(self.white_on),
            self.white_wire,
        ])
    }

    /// Builds the version-2 notification the device sends for its colour channel.
    #[must_use]
    pub fn color_status(&self) -> Vec<u8> {
        status_frame(&[
            OPCODE_STATUS_REQUEST,
            ReplyVersion::ColorStatus.as_byte(),
            u8::from(self.color_on),
            self.color_wire,
            0x00,
            0x00,
            self.rgb.red,
            self.rgb.green,
            self.rgb.blue,
            self.effect,
        ])
    }

    fn apply(&mut self, command: LightCommand) {
        match command {
            LightCommand::PowerOn(Channel::White) => self.white_on = true,
            LightCommand::PowerOn(Channel::Color) => {
                if !self.color_on {
                    self.effect = POWER_UP_EFFECT;
                }
                self.color_on = true;
            }
            LightCommand::PowerOff(Channel::White) => self.white_on = false,
            LightCommand::PowerOff(Channel::Color) => self.color_on = false,
            LightCommand::SetBrightness(Channel::White, brightness) => {
                self.white_wire = brightness.to_wire();
            }
            LightCommand::SetBrightness(Channel::Color, brightness) => {
                self.color_wire = brightness.to_wire();
            }
            LightCommand::SetRgb(rgb) => self.rgb = rgb,
            LightCommand::SetEffect(index) => self.effect = index,
            LightCommand::StatusRequest(_channel) => {}
        }
    }
}

/// Builds a status notification in the same envelope as outbound frames.
fn status_frame(payload: &[u8]) -> Vec<u8> {
    FrameCodec::encode(payload).unwrap_or_default()
}

#[derive(Default)]
struct FakeState {
    connected: bool,
    device: FakeDevice,
    characteristics: Vec<CharacteristicInfo>,
    subscriptions: HashMap<String, NotificationCallback>,
    disconnect_handler: Option<DisconnectCallback>,
    connect_attempts: usize,
    connect_failures_remaining: usize,
    fail_writes: bool,
    mute_status: bool,
    written: Vec<Vec<u8>>,
}

/// In-process TL100 emulator implementing [`BleTransport`].
///
/// Writes are decoded and applied to a [`FakeDevice`]; status requests are
/// answered synchronously through the subscribed notification callback.
pub struct FakeTransport {
    state: Mutex<FakeState>,
    connect_delay: Duration,
}

#[bon]
impl FakeTransport {
    /// Creates a fake transport.
    ///
    /// ```
    /// use tl100::{FakeDevice, FakeTransport};
    ///
    /// let transport = FakeTransport::builder()
    ///     .device(FakeDevice { white_on: true, ..FakeDevice::default() })
    ///     .connect_failures(1)
    ///     .build();
    /// assert_eq!(0, transport.connect_attempts());
    /// ```
    #[builder]
    pub fn new(
        #[builder(default)] device: FakeDevice,
        characteristics: Option<Vec<CharacteristicInfo>>,
        #[builder(default)] connect_failures: usize,
        #[builder(default)] connect_delay: Duration,
    ) -> Self {
        let state = FakeState {
            device,
            characteristics: characteristics.unwrap_or_else(default_characteristics),
            connect_failures_remaining: connect_failures,
            ..FakeState::default()
        };
        Self {
            state: Mutex::new(state),
            connect_delay,
        }
    }
}

impl FakeTransport {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of `connect` calls observed so far.
    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.state().connect_attempts
    }

    /// Current emulated device state.
    #[must_use]
    pub fn device(&self) -> FakeDevice {
        self.state().device
    }

    /// Every frame written so far, in order.
    #[must_use]
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    /// Every well-formed command written so far, in order.
    #[must_use]
    pub fn written_commands(&self) -> Vec<LightCommand> {
        self.state()
            .written
            .iter()
            .filter_map(|frame| FrameCodec::decode(frame).ok())
            .filter_map(LightCommand::parse)
            .collect()
    }

    /// Forgets recorded writes.
    pub fn clear_written(&self) {
        self.state().written.clear();
    }

    /// Makes every subsequent write fail until reset.
    pub fn set_write_failure(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Stops (or resumes) answering status requests.
    pub fn set_status_replies(&self, enabled: bool) {
        self.state().mute_status = !enabled;
    }

    /// Whether notifications are enabled on the notify characteristic.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.state()
            .subscriptions
            .contains_key(NOTIFY_CHARACTERISTIC_UUID)
    }

    /// Delivers an arbitrary payload to the notify subscriber, if any.
    pub fn notify(&self, payload: &[u8]) {
        let callback = self
            .state()
            .subscriptions
            .get(NOTIFY_CHARACTERISTIC_UUID)
            .cloned();
        match callback {
            Some(callback) => callback(payload.to_vec()),
            None => debug!("dropping injected notification without subscriber"),
        }
    }

    /// Simulates the peripheral going out of range.
    pub fn drop_link(&self) {
        let handler = {
            let mut state = self.state();
            state.connected = false;
            state.subscriptions.clear();
            state.disconnect_handler.clone()
        };
        if let Some(handler) = handler {
            handler();
        }
    }
}

#[async_trait]
impl BleTransport for FakeTransport {
    #[instrument(skip(self), level = "debug")]
    async fn connect(&self, timeout: Duration) -> Result<(), InteractionError> {
        {
            let mut state = self.state();
            state.connect_attempts += 1;
            if state.connect_failures_remaining > 0 {
                state.connect_failures_remaining -= 1;
                return Err(InteractionError::InjectedFailure {
                    operation: "connect",
                });
            }
        }

        if !self.connect_delay.is_zero() {
            sleep(self.connect_delay).await;
        }
        self.state().connected = true;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn disconnect(&self) -> Result<(), InteractionError> {
        let mut state = self.state();
        state.connected = false;
        state.subscriptions.clear();
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.state().connected
    }

    async fn characteristics(&self) -> Result<Vec<CharacteristicInfo>, InteractionError> {
        let state = self.state();
        if !state.connected {
            return Err(InteractionError::NotConnected);
        }
        Ok(state.characteristics.clone())
    }

    #[instrument(skip(self, payload), level = "trace", fields(payload_len = payload.len()))]
    async fn write(&self, uuid: &str, payload: &[u8]) -> Result<(), InteractionError> {
        let replies = {
            let mut state = self.state();
            if !state.connected {
                return Err(InteractionError::NotConnected);
            }
            if state.fail_writes {
                return Err(InteractionError::InjectedFailure { operation: "write" });
            }
            if !uuid.eq_ignore_ascii_case(WRITE_CHARACTERISTIC_UUID) {
                return Err(InteractionError::UnknownCharacteristic {
                    uuid: uuid.to_string(),
                });
            }
            state.written.push(payload.to_vec());

            let Some(command) = FrameCodec::decode(payload)
                .ok()
                .and_then(LightCommand::parse)
            else {
                trace!(frame = %format_hex(payload), "fake device ignored malformed frame");
                return Ok(());
            };
            state.device.apply(command);

            let reply = match command {
                _ if state.mute_status => None,
                LightCommand::StatusRequest(Channel::White) => Some(state.device.white_status()),
                LightCommand::StatusRequest(Channel::Color) => Some(state.device.color_status()),
                _ => None,
            };
            let subscriber = state.subscriptions.get(NOTIFY_CHARACTERISTIC_UUID).cloned();
            reply.zip(subscriber)
        };

        if let Some((reply, callback)) = replies {
            callback(reply);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        uuid: &str,
        callback: NotificationCallback,
    ) -> Result<(), InteractionError> {
        let mut state = self.state();
        if !state.connected {
            return Err(InteractionError::NotConnected);
        }
        state
            .subscriptions
            .insert(uuid.to_ascii_lowercase(), callback);
        Ok(())
    }

    async fn unsubscribe(&self, uuid: &str) -> Result<(), InteractionError> {
        self.state()
            .subscriptions
            .remove(&uuid.to_ascii_lowercase());
        Ok(())
    }

    fn set_disconnect_handler(&self, handler: DisconnectCallback) {
        self.state().disconnect_handler = Some(handler);
    }
}

impl std::fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("FakeTransport")
            .field("connected", &state.connected)
            .field("device", &state.device)
            .field("connect_attempts", &state.connect_attempts)
            .finish_non_exhaustive()
    }
}

fn default_characteristics() -> Vec<CharacteristicInfo> {
    vec![
        CharacteristicInfo::new("00002a00-0000-1000-8000-00805f9b34fb", ["read"]),
        CharacteristicInfo::new(WRITE_CHARACTERISTIC_UUID, ["write", "write_without_response"]),
        CharacteristicInfo::new(NOTIFY_CHARACTERISTIC_UUID, ["notify"]),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::notification::{NotificationHandler, ParsedStatus};

    #[test]
    fn power_up_resets_effect_to_rainbow() {
        let mut device = FakeDevice {
            effect: 6,
            ..FakeDevice::default()
        };
        device.apply(LightCommand::PowerOn(Channel::Color));
        assert_eq!(POWER_UP_EFFECT, device.effect);

        device.apply(LightCommand::SetEffect(6));
        device.apply(LightCommand::PowerOn(Channel::Color));
        assert_eq!(6, device.effect);
    }

    #[test]
    fn status_frames_decode_as_their_reply_versions() {
        let device = FakeDevice {
            color_on: true,
            rgb: Rgb::new(1, 2, 3),
            effect: 4,
            ..FakeDevice::default()
        };

        let Some(ParsedStatus::White(white)) = NotificationHandler::decode(&device.white_status())
        else {
            panic!("white status should decode as version 1");
        };
        assert!(!white.on);

        let Some(ParsedStatus::Color(color)) = NotificationHandler::decode(&device.color_status())
        else {
            panic!("colour status should decode as version 2");
        };
        assert_eq!(Rgb::new(1, 2, 3), color.rgb);
        assert_eq!(Some("Fusion"), color.effect);
    }

    #[tokio::test]
    async fn status_request_replies_through_subscription() -> anyhow::Result<()> {
        let transport = FakeTransport::builder().build();
        transport.connect(Duration::from_secs(1)).await?;

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        transport
            .subscribe(
                NOTIFY_CHARACTERISTIC_UUID,
                Arc::new(move |payload| {
                    sink.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(payload);
                }),
            )
            .await?;

        let frame = LightCommand::StatusRequest(Channel::Color).frame()?;
        transport.write(WRITE_CHARACTERISTIC_UUID, &frame).await?;

        let received = received.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(vec![transport.device().color_status()], *received);
        Ok(())
    }

    #[tokio::test]
    async fn writes_fail_while_disconnected() {
        let transport = FakeTransport::builder().build();
        let result = transport.write(WRITE_CHARACTERISTIC_UUID, &[0x00]).await;
        assert!(matches!(result, Err(InteractionError::NotConnected)));
    }
}
