use strum_macros::Display;

/// UUID of the characteristic that accepts command frames.
pub const WRITE_CHARACTERISTIC_UUID: &str = "8b00ace7-eb0b-49b0-bbe9-9aee0a26e1a3";
/// UUID of the characteristic that emits status notifications.
pub const NOTIFY_CHARACTERISTIC_UUID: &str = "0734594a-a8e7-4b1a-a6b1-cd5243059a57";

pub(crate) const OPCODE_STATUS_REQUEST: u8 = 0x30;
pub(crate) const OPCODE_SET_BRIGHTNESS: u8 = 0x31;
pub(crate) const OPCODE_SET_RGB: u8 = 0x32;
pub(crate) const OPCODE_SET_EFFECT: u8 = 0x34;
pub(crate) const OPCODE_POWER_OFF: u8 = 0x35;
pub(crate) const OPCODE_POWER_ON: u8 = 0x37;

/// Known TL100 GATT endpoints.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display)]
pub enum EndpointId {
    /// Characteristic used for command writes.
    #[strum(to_string = "write_characteristic")]
    WriteCharacteristic,
    /// Characteristic used for status notifications.
    #[strum(to_string = "notify_characteristic")]
    NotifyCharacteristic,
}

impl EndpointId {
    /// Human-readable endpoint name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::WriteCharacteristic => "TL100 command write",
            Self::NotifyCharacteristic => "TL100 status notify",
        }
    }

    /// Endpoint UUID in lowercase hyphenated form.
    #[must_use]
    pub fn uuid(self) -> &'static str {
        match self {
            Self::WriteCharacteristic => WRITE_CHARACTERISTIC_UUID,
            Self::NotifyCharacteristic => NOTIFY_CHARACTERISTIC_UUID,
        }
    }
}

/// Light subsystem addressed by the second payload byte of most commands.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display)]
pub enum Channel {
    /// White reading-light channel.
    #[strum(to_string = "white")]
    White,
    /// RGB mood-light channel.
    #[strum(to_string = "color")]
    Color,
}

impl Channel {
    /// Returns the protocol byte for this channel.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::White => 0x01,
            Self::Color => 0x02,
        }
    }

    /// Parses a protocol channel byte.
    #[must_use]
    pub const fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::White),
            0x02 => Some(Self::Color),
            _ => None,
        }
    }
}

/// Reply-version tag carried at byte 8 of every status notification.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum ReplyVersion {
    /// The device is about to drop the link.
    #[strum(to_string = "shutting_down")]
    ShuttingDown,
    /// White channel status.
    #[strum(to_string = "white_status")]
    WhiteStatus,
    /// Colour channel status.
    #[strum(to_string = "color_status")]
    ColorStatus,
    /// Both channels are off.
    #[strum(to_string = "fully_off")]
    FullyOff,
}

impl ReplyVersion {
    /// Returns the raw tag byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::ShuttingDown => 0,
            Self::WhiteStatus => 1,
            Self::ColorStatus => 2,
            Self::FullyOff => 255,
        }
    }

    /// Parses a raw tag byte; unknown tags yield `None`.
    #[must_use]
    pub const fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ShuttingDown),
            1 => Some(Self::WhiteStatus),
            2 => Some(Self::ColorStatus),
            255 => Some(Self::FullyOff),
            _ => None,
        }
    }
}
