use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use bon::{Builder, bon};
use btleplug::api::BDAddr;
use serde::Serialize;
use strum_macros::Display;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use tracing::{Instrument, Span, debug, info, info_span, instrument, trace, warn};

use super::notifier::{ChangeCallback, ChangeNotifier};
use super::state::{ColorMode, LightSnapshot, LightState, Reconciled};
use crate::effects::EffectCatalog;
use crate::error::{InteractionError, ProtocolError};
use crate::handlers::{Brightness, LightCommand, Rgb};
use crate::hw::{BleTransport, ConnectionHandle, NotificationCallback};
use crate::notification::{NotificationHandler, ParsedStatus};
use crate::protocol::Channel;
use crate::utils::format_hex;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_COMMAND_SPACING: Duration = Duration::from_millis(100);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_STATUS_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Delays the session observes between transport operations.
///
/// The firmware drops writes that arrive back to back, so every write is
/// followed by `command_spacing`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct SessionTiming {
    /// Upper bound for a single connection attempt.
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,
    /// Pause after every write.
    #[builder(default = DEFAULT_COMMAND_SPACING)]
    pub command_spacing: Duration,
    /// Extra pause before dependent commands and status refreshes.
    #[builder(default = DEFAULT_SETTLE_DELAY)]
    pub settle_delay: Duration,
    /// How long [`LightSession::update`] waits for the colour status reply.
    #[builder(default = DEFAULT_STATUS_REPLY_TIMEOUT)]
    pub status_reply_timeout: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Result of a polled [`LightSession::update`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// A colour status arrived and the local state is current.
    #[strum(to_string = "completed")]
    Completed,
    /// The status pair was sent but no colour status arrived in time.
    #[strum(to_string = "timed out")]
    TimedOut,
    /// The device could not be reached.
    #[strum(to_string = "unavailable")]
    Unavailable,
}

struct SessionInner {
    transport: Arc<dyn BleTransport>,
    address: BDAddr,
    timing: SessionTiming,
    span: Span,
    state: Mutex<LightState>,
    handle: Mutex<Option<ConnectionHandle>>,
    notifier: ChangeNotifier,
    pending_status: Mutex<Option<oneshot::Sender<()>>>,
    gate: tokio::sync::Mutex<()>,
}

/// Stateful connection to one TL100 light.
///
/// Commands never return errors. A failing transport collapses the session to
/// the disconnected state, which callers observe through [`Self::is_on`],
/// [`Self::is_available`] and the change callback. The next command reconnects.
///
/// Commands are serialized: a command issued while another is in flight waits
/// for it to finish.
#[derive(Clone)]
pub struct LightSession {
    inner: Arc<SessionInner>,
}

#[bon]
impl LightSession {
    /// Creates a session bound to `address`.
    ///
    /// `span` parents every operation's span; it defaults to
    /// `light_session{mac = ..}`.
    #[builder]
    pub fn new(
        transport: Arc<dyn BleTransport>,
        address: BDAddr,
        #[builder(default)] timing: SessionTiming,
        span: Option<Span>,
    ) -> Self {
        let span = span.unwrap_or_else(|| info_span!("light_session", mac = %address));
        let inner = Arc::new(SessionInner {
            transport,
            address,
            timing,
            span,
            state: Mutex::new(LightState::default()),
            handle: Mutex::new(None),
            notifier: ChangeNotifier::default(),
            pending_status: Mutex::new(None),
            gate: tokio::sync::Mutex::new(()),
        });

        let weak = Arc::downgrade(&inner);
        inner.transport.set_disconnect_handler(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                info!(parent: &inner.span, "peripheral dropped the link");
                LightSession { inner }.collapse();
            }
        }));

        Self { inner }
    }
}

impl LightSession {
    /// Opens the connection and primes the local state. No-op when connected.
    pub async fn connect(&self) {
        let _gate = self.inner.gate.lock().await;
        let result = self
            .ensure_connected()
            .instrument(self.operation_span("connect"))
            .await;
        self.conclude("connect", result).await;
    }

    /// Reconnects if needed and waits for a fresh status pair.
    pub async fn update(&self) -> RefreshOutcome {
        let _gate = self.inner.gate.lock().await;
        let span = self.operation_span("update");
        async {
            if let Err(error) = self.ensure_connected().await {
                warn!(%error, "device unavailable during update");
                self.disconnect_locked().await;
                return RefreshOutcome::Unavailable;
            }

            let (sender, receiver) = oneshot::channel();
            *self.pending_status() = Some(sender);
            if let Err(error) = self.trigger_status_refresh().await {
                warn!(%error, "status refresh failed; dropping connection");
                self.disconnect_locked().await;
                return RefreshOutcome::Unavailable;
            }

            match timeout(self.inner.timing.status_reply_timeout, receiver).await {
                Ok(Ok(())) => RefreshOutcome::Completed,
                Ok(Err(_closed)) => RefreshOutcome::Unavailable,
                Err(_elapsed) => {
                    self.pending_status().take();
                    debug!("no colour status before the reply timeout");
                    RefreshOutcome::TimedOut
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Closes the connection and reports the light as off.
    pub async fn disconnect(&self) {
        let _gate = self.inner.gate.lock().await;
        self.disconnect_locked()
            .instrument(self.operation_span("disconnect"))
            .await;
    }

    /// Switches to colour mode and shows `rgb`.
    pub async fn set_color(&self, rgb: Rgb) {
        let _gate = self.inner.gate.lock().await;
        {
            let mut state = self.state();
            state.active_mode = ColorMode::Color;
            state.rgb_color = rgb;
        }
        let result = async {
            self.ensure_color_on().await?;
            self.send_command(LightCommand::SetRgb(rgb)).await?;
            self.settle().await;
            self.trigger_status_refresh().await
        }
        .instrument(self.operation_span("set_color"))
        .await;
        self.conclude("set_color", result).await;
    }

    /// Switches to colour mode at `level`.
    pub async fn set_color_brightness(&self, level: Brightness) {
        let _gate = self.inner.gate.lock().await;
        {
            let mut state = self.state();
            state.active_mode = ColorMode::Color;
            state.color_brightness = Some(level);
        }
        let result = async {
            self.ensure_color_on().await?;
            self.send_command(LightCommand::SetBrightness(Channel::Color, level))
                .await?;
            self.settle().await;
            self.trigger_status_refresh().await
        }
        .instrument(self.operation_span("set_color_brightness"))
        .await;
        self.conclude("set_color_brightness", result).await;
    }

    /// Switches to the white reading light at `level` and stops any effect.
    pub async fn set_white(&self, level: Brightness) {
        let _gate = self.inner.gate.lock().await;
        {
            let mut state = self.state();
            state.active_mode = ColorMode::White;
            state.white_brightness = Some(level);
        }
        let result = async {
            self.ensure_connected().await?;
            let white_on = self.claim_mode(ColorMode::White).white_on;
            if !white_on {
                self.turn_on_locked().await?;
            }
            self.send_command(LightCommand::SetBrightness(Channel::White, level))
                .await?;
            self.settle().await;
            self.send_command(LightCommand::SetEffect(EffectCatalog::index_of(
                EffectCatalog::OFF,
            )))
            .await?;
            self.trigger_status_refresh().await
        }
        .instrument(self.operation_span("set_white"))
        .await;
        self.conclude("set_white", result).await;
    }

    /// Starts the effect called `name`; unknown names select `"Off"`.
    pub async fn set_effect(&self, name: &str) {
        let _gate = self.inner.gate.lock().await;
        let index = EffectCatalog::index_of(name);
        {
            let mut state = self.state();
            state.active_mode = ColorMode::Color;
            state.active_effect = EffectCatalog::name_of(index);
        }
        let result = async {
            self.ensure_color_on().await?;
            self.send_command(LightCommand::SetEffect(index)).await?;
            self.settle().await;
            self.trigger_status_refresh().await
        }
        .instrument(self.operation_span("set_effect"))
        .await;
        self.conclude("set_effect", result).await;
    }

    /// Powers on the channel for the current mode.
    ///
    /// When the colour channel comes up from off, the firmware starts its
    /// rainbow effect; the last known effect, colour and brightness are sent
    /// again to undo that.
    pub async fn turn_on(&self) {
        let _gate = self.inner.gate.lock().await;
        let result = self
            .turn_on_locked()
            .instrument(self.operation_span("turn_on"))
            .await;
        self.conclude("turn_on", result).await;
    }

    /// Powers off both channels.
    pub async fn turn_off(&self) {
        let _gate = self.inner.gate.lock().await;
        let result = async {
            self.send_command(LightCommand::PowerOff(Channel::White))
                .await?;
            self.send_command(LightCommand::PowerOff(Channel::Color))
                .await?;
            self.trigger_status_refresh().await
        }
        .instrument(self.operation_span("turn_off"))
        .await;
        self.conclude("turn_off", result).await;
    }

    /// Installs the callback fired whenever observable state changes.
    pub fn set_update_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: ChangeCallback = Arc::new(callback);
        self.inner.notifier.set(callback);
    }

    /// Whether either channel is lit.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state().overall_on()
    }

    /// Last known colour.
    #[must_use]
    pub fn rgb_color(&self) -> Rgb {
        self.state().rgb_color
    }

    #[must_use]
    pub fn color_brightness(&self) -> Option<Brightness> {
        self.state().color_brightness
    }

    #[must_use]
    pub fn white_brightness(&self) -> Option<Brightness> {
        self.state().white_brightness
    }

    /// Brightness of the channel the current mode drives.
    #[must_use]
    pub fn brightness(&self) -> Option<Brightness> {
        self.snapshot().brightness()
    }

    /// Active effect name; white mode always reports `"Off"`.
    #[must_use]
    pub fn effect(&self) -> Option<&'static str> {
        let state = self.state();
        match state.active_mode {
            ColorMode::White => Some(EffectCatalog::OFF),
            ColorMode::Color | ColorMode::Unset => state.active_effect,
        }
    }

    #[must_use]
    pub fn color_mode(&self) -> ColorMode {
        self.state().active_mode
    }

    /// Every effect name the device accepts, in wire order.
    #[must_use]
    pub fn supported_effects(&self) -> &'static [&'static str] {
        EffectCatalog::names()
    }

    /// Address of the light.
    #[must_use]
    pub fn mac(&self) -> BDAddr {
        self.inner.address
    }

    /// Whether the session currently holds resolved characteristics.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.connection_handle().is_some()
    }

    /// Copies the observable state.
    #[must_use]
    pub fn snapshot(&self) -> LightSnapshot {
        let available = self.is_available();
        self.state().snapshot(available)
    }
}

impl LightSession {
    fn state(&self) -> MutexGuard<'_, LightState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reasserts the commanded mode after a reconnect refresh may have replaced it.
    fn claim_mode(&self, mode: ColorMode) -> MutexGuard<'_, LightState> {
        let mut state = self.state();
        state.active_mode = mode;
        state
    }

    fn pending_status(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.inner
            .pending_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_slot(&self) -> MutexGuard<'_, Option<ConnectionHandle>> {
        self.inner
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn connection_handle(&self) -> Option<ConnectionHandle> {
        self.handle_slot().clone()
    }

    fn operation_span(&self, operation: &'static str) -> Span {
        info_span!(parent: &self.inner.span, "light_command", operation)
    }

    async fn settle(&self) {
        sleep(self.inner.timing.settle_delay).await;
    }

    async fn conclude(&self, operation: &'static str, result: Result<(), ProtocolError>) {
        if let Err(error) = result {
            warn!(parent: &self.inner.span, operation, %error, "command failed; dropping connection");
            self.disconnect_locked().await;
        }
    }

    async fn ensure_connected(&self) -> Result<(), ProtocolError> {
        if self.is_available() && self.inner.transport.is_connected().await {
            return Ok(());
        }
        self.open_connection().await
    }

    #[instrument(skip(self), level = "debug", fields(mac = %self.inner.address))]
    async fn open_connection(&self) -> Result<(), ProtocolError> {
        let timing = self.inner.timing;
        let transport = &self.inner.transport;

        match timeout(timing.connect_timeout, transport.connect(timing.connect_timeout)).await {
            Ok(result) => result?,
            Err(_elapsed) => {
                return Err(InteractionError::ConnectTimeout {
                    address: self.inner.address,
                    timeout: timing.connect_timeout,
                }
                .into());
            }
        }
        sleep(timing.command_spacing).await;

        let characteristics = transport.characteristics().await?;
        let handle = ConnectionHandle::resolve(&characteristics)?;
        transport
            .subscribe(handle.notify_uuid(), self.notification_callback())
            .await?;
        *self.handle_slot() = Some(handle.clone());
        info!("connected");
        sleep(timing.command_spacing).await;

        self.write_command(&handle, LightCommand::StatusRequest(Channel::White))
            .await?;
        self.write_command(&handle, LightCommand::StatusRequest(Channel::Color))
            .await
    }

    fn notification_callback(&self) -> NotificationCallback {
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        Arc::new(move |payload: Vec<u8>| {
            if let Some(inner) = weak.upgrade() {
                LightSession { inner }.handle_notification(&payload);
            }
        })
    }

    fn handle_notification(&self, payload: &[u8]) {
        let _entered = self.inner.span.enter();
        trace!(payload = %format_hex(payload), "notification received");
        let Some(status) = NotificationHandler::decode(payload) else {
            debug!(payload = %format_hex(payload), "ignoring undecodable notification");
            return;
        };

        let reconciled = self.state().apply(&status);
        match reconciled {
            Reconciled::Quiet => {}
            Reconciled::Publish => {
                if matches!(status, ParsedStatus::Color(_))
                    && let Some(sender) = self.pending_status().take()
                {
                    let _ = sender.send(());
                }
                self.inner.notifier.fire();
            }
            Reconciled::Shutdown => {
                info!("device announced shutdown");
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let session = self.clone();
                        runtime.spawn(async move { session.disconnect().await });
                    }
                    Err(_) => self.collapse(),
                }
            }
        }
    }

    async fn send_command(&self, command: LightCommand) -> Result<(), ProtocolError> {
        self.ensure_connected().await?;
        let handle = self
            .connection_handle()
            .ok_or(InteractionError::NotConnected)?;
        self.write_command(&handle, command).await
    }

    /// Frames and writes one command on an already resolved connection.
    async fn write_command(
        &self,
        handle: &ConnectionHandle,
        command: LightCommand,
    ) -> Result<(), ProtocolError> {
        let frame = command.frame()?;
        debug!(?command, frame = %format_hex(&frame), "writing command");
        self.inner
            .transport
            .write(handle.write_uuid(), &frame)
            .await?;
        sleep(self.inner.timing.command_spacing).await;
        Ok(())
    }

    async fn trigger_status_refresh(&self) -> Result<(), ProtocolError> {
        self.send_command(LightCommand::StatusRequest(Channel::White))
            .await?;
        self.send_command(LightCommand::StatusRequest(Channel::Color))
            .await
    }

    async fn ensure_color_on(&self) -> Result<(), ProtocolError> {
        self.ensure_connected().await?;
        let color_on = self.claim_mode(ColorMode::Color).color_on;
        if color_on {
            return Ok(());
        }
        self.turn_on_locked().await
    }

    async fn turn_on_locked(&self) -> Result<(), ProtocolError> {
        self.ensure_connected().await?;
        let (mode, color_was_on) = {
            let state = self.state();
            (state.active_mode, state.color_on)
        };

        match mode {
            ColorMode::White => {
                self.send_command(LightCommand::PowerOn(Channel::White))
                    .await?;
            }
            ColorMode::Color | ColorMode::Unset => {
                self.send_command(LightCommand::PowerOn(Channel::Color))
                    .await?;
                if !color_was_on && mode == ColorMode::Color {
                    self.restore_color_state().await?;
                }
            }
        }

        self.settle().await;
        self.trigger_status_refresh().await
    }

    async fn restore_color_state(&self) -> Result<(), ProtocolError> {
        let (effect, rgb, brightness) = {
            let state = self.state();
            (
                state.active_effect,
                state.rgb_color,
                state.color_brightness,
            )
        };
        debug!(?effect, %rgb, ?brightness, "restoring colour state after power-up");

        if let Some(effect) = effect {
            self.send_command(LightCommand::SetEffect(EffectCatalog::index_of(effect)))
                .await?;
        }
        self.send_command(LightCommand::SetRgb(rgb)).await?;
        if let Some(brightness) = brightness {
            self.send_command(LightCommand::SetBrightness(Channel::Color, brightness))
                .await?;
        }
        Ok(())
    }

    async fn disconnect_locked(&self) {
        let handle = self.handle_slot().take();
        let transport = &self.inner.transport;
        if let Some(handle) = &handle
            && let Err(error) = transport.unsubscribe(handle.notify_uuid()).await
        {
            debug!(%error, "failed to unsubscribe cleanly");
        }
        if transport.is_connected().await
            && let Err(error) = transport.disconnect().await
        {
            warn!(%error, "failed to close the connection cleanly");
        }
        self.collapse();
    }

    /// Drops the connection handle and reports both channels off.
    fn collapse(&self) {
        self.handle_slot().take();
        self.state().mark_off();
        self.pending_status().take();
        self.inner.notifier.fire();
    }
}

impl std::fmt::Debug for LightSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightSession")
            .field("address", &self.inner.address)
            .field("timing", &self.inner.timing)
            .field("available", &self.is_available())
            .field("notifier", &self.inner.notifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_timing_matches_firmware_limits() {
        let timing = SessionTiming::default();
        assert_eq!(Duration::from_secs(20), timing.connect_timeout);
        assert_eq!(Duration::from_millis(100), timing.command_spacing);
        assert_eq!(Duration::from_millis(200), timing.settle_delay);
        assert_eq!(Duration::from_secs(2), timing.status_reply_timeout);
    }

    #[test]
    fn timing_builder_overrides_single_field() {
        let timing = SessionTiming::builder()
            .command_spacing(Duration::from_millis(5))
            .build();
        assert_eq!(Duration::from_millis(5), timing.command_spacing);
        assert_eq!(DEFAULT_CONNECT_TIMEOUT, timing.connect_timeout);
    }
}
