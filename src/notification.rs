use serde::Serialize;
use tracing::instrument;

use crate::effects::EffectCatalog;
use crate::handlers::{Brightness, Rgb};
use crate::protocol::ReplyVersion;

const MIN_STATUS_LEN: usize = 9;
const REPLY_VERSION_INDEX: usize = 8;
const ON_FLAG_INDEX: usize = 9;
const BRIGHTNESS_INDEX: usize = 10;
const RGB_INDEX: usize = 13;
const EFFECT_INDEX: usize = 16;

/// White-channel status carried by a version-1 notification.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct WhiteStatus {
    /// Whether the white channel is lit.
    pub on: bool,
    /// Reported brightness; only decoded while the channel is on.
    pub brightness: Option<Brightness>,
}

/// Colour-channel status carried by a version-2 notification.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ColorStatus {
    /// Whether the colour channel is lit.
    pub on: bool,
    /// Reported brightness, decoded regardless of the on flag.
    pub brightness: Option<Brightness>,
    /// Reported RGB value.
    pub rgb: Rgb,
    /// Active effect name, only decoded while the channel is on.
    pub effect: Option<&'static str>,
}

/// Typed status decoded from one TL100 notification.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParsedStatus {
    /// Version 1: white channel status.
    White(WhiteStatus),
    /// Version 2: colour channel status.
    Color(ColorStatus),
    /// Version 255: both channels are off.
    FullyOff,
    /// Version 0: the device is about to drop the link.
    ShuttingDown,
}

/// Decodes raw notify-characteristic payloads into typed status.
pub struct NotificationHandler;

impl NotificationHandler {
    /// Decodes one notification payload.
    ///
    /// Returns `None` for payloads that are too short, carry an unknown reply
    /// version, or are truncated before a field their version requires.
    ///
    /// ```
    /// use tl100::{NotificationHandler, ParsedStatus};
    ///
    /// let mut payload = [0u8; 9];
    /// payload[8] = 255;
    /// assert_eq!(Some(ParsedStatus::FullyOff), NotificationHandler::decode(&payload));
    /// assert_eq!(None, NotificationHandler::decode(&payload[..8]));
    /// ```
    #[instrument(skip(payload), level = "trace", fields(payload_len = payload.len()))]
    #[must_use]
    pub fn decode(payload: &[u8]) -> Option<ParsedStatus> {
        if payload.len() < MIN_STATUS_LEN {
            return None;
        }

        match ReplyVersion::from_byte(payload[REPLY_VERSION_INDEX])? {
            ReplyVersion::WhiteStatus => decode_white(payload).map(ParsedStatus::White),
            ReplyVersion::ColorStatus => decode_color(payload).map(ParsedStatus::Color),
            ReplyVersion::FullyOff => Some(ParsedStatus::FullyOff),
            ReplyVersion::ShuttingDown => Some(ParsedStatus::ShuttingDown),
        }
    }
}

fn decode_white(payload: &[u8]) -> Option<WhiteStatus> {
    let on = *payload.get(ON_FLAG_INDEX)? == 1;
    let brightness = if on {
        Brightness::from_wire(*payload.get(BRIGHTNESS_INDEX)?)
    } else {
        None
    };
    Some(WhiteStatus { on, brightness })
}

fn decode_color(payload: &[u8]) -> Option<ColorStatus> {
    let fields = payload.get(ON_FLAG_INDEX..=EFFECT_INDEX)?;
    let on = fields[0] == 1;
    let brightness = Brightness::from_wire(payload[BRIGHTNESS_INDEX]);
    let rgb = Rgb::new(
        payload[RGB_INDEX],
        payload[RGB_INDEX + 1],
        payload[RGB_INDEX + 2],
    );
    let effect = if on {
        EffectCatalog::name_of(payload[EFFECT_INDEX])
    } else {
        None
    };
    Some(ColorStatus {
        on,
        brightness,
        rgb,
        effect,
    })
}
