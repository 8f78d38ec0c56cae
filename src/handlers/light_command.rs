use crate::protocol::{
    Channel, OPCODE_POWER_OFF, OPCODE_POWER_ON, OPCODE_SET_BRIGHTNESS, OPCODE_SET_EFFECT,
    OPCODE_SET_RGB, OPCODE_STATUS_REQUEST,
};

use super::{Brightness, FrameCodec, FrameCodecError};

/// RGB colour triple.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, serde::Serialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    /// Creates an RGB colour.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        Self::new(red, green, blue)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.red, self.green, self.blue)
    }
}

/// One outbound TL100 command, before framing.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LightCommand {
    /// Ask the device to announce the status of one channel.
    StatusRequest(Channel),
    /// Set a channel's brightness.
    SetBrightness(Channel, Brightness),
    /// Set the colour-channel RGB value.
    SetRgb(Rgb),
    /// Select an effect by catalog index.
    SetEffect(u8),
    /// Switch a channel off.
    PowerOff(Channel),
    /// Switch a channel on.
    PowerOn(Channel),
}

impl LightCommand {
    /// Returns the unframed payload, opcode first.
    ///
    /// ```
    /// use tl100::{Brightness, Channel, LightCommand};
    ///
    /// let payload = LightCommand::SetBrightness(Channel::Color, Brightness::new(255)).payload();
    /// assert_eq!(vec![0x31, 0x02, 100], payload);
    /// ```
    #[must_use]
    pub fn payload(self) -> Vec<u8> {
        match self {
            Self::StatusRequest(channel) => vec![OPCODE_STATUS_REQUEST, channel.as_byte()],
            Self::SetBrightness(channel, brightness) => vec![
                OPCODE_SET_BRIGHTNESS,
                channel.as_byte(),
                brightness.to_wire(),
            ],
            Self::SetRgb(rgb) => vec![OPCODE_SET_RGB, rgb.red, rgb.green, rgb.blue],
            Self::SetEffect(index) => vec![OPCODE_SET_EFFECT, index],
            Self::PowerOff(channel) => vec![OPCODE_POWER_OFF, channel.as_byte()],
            Self::PowerOn(channel) => vec![OPCODE_POWER_ON, channel.as_byte()],
        }
    }

    /// Returns the fully framed command.
    ///
    /// # Errors
    ///
    /// Returns an error when framing fails.
    pub fn frame(self) -> Result<Vec<u8>, FrameCodecError> {
        FrameCodec::encode(&self.payload())
    }

    /// Parses an unframed payload back into a command.
    ///
    /// Brightness is carried as a device percentage, so the parsed value is the
    /// local-scale equivalent of that percentage (`0` stays `0`).
    #[must_use]
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match *payload {
            [OPCODE_STATUS_REQUEST, channel] => {
                Some(Self::StatusRequest(Channel::from_byte(channel)?))
            }
            [OPCODE_SET_BRIGHTNESS, channel, wire] => Some(Self::SetBrightness(
                Channel::from_byte(channel)?,
                Brightness::from_wire(wire).unwrap_or(Brightness::new(0)),
            )),
            [OPCODE_SET_RGB, red, green, blue] => Some(Self::SetRgb(Rgb::new(red, green, blue))),
            [OPCODE_SET_EFFECT, index] => Some(Self::SetEffect(index)),
            [OPCODE_POWER_OFF, channel] => Some(Self::PowerOff(Channel::from_byte(channel)?)),
            [OPCODE_POWER_ON, channel] => Some(Self::PowerOn(Channel::from_byte(channel)?)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(LightCommand::StatusRequest(Channel::White), vec![0x30, 0x01])]
    #[case(LightCommand::StatusRequest(Channel::Color), vec![0x30, 0x02])]
    #[case(LightCommand::SetBrightness(Channel::White, Brightness::new(130)), vec![0x31, 0x01, 51])]
    #[case(LightCommand::SetRgb(Rgb::new(10, 20, 30)), vec![0x32, 10, 20, 30])]
    #[case(LightCommand::SetEffect(6), vec![0x34, 6])]
    #[case(LightCommand::PowerOff(Channel::Color), vec![0x35, 0x02])]
    #[case(LightCommand::PowerOn(Channel::White), vec![0x37, 0x01])]
    fn payloads_match_protocol(#[case] command: LightCommand, #[case] expected: Vec<u8>) {
        assert_eq!(expected, command.payload());
        assert_eq!(Some(command), LightCommand::parse(&expected));
    }

    #[test]
    fn frame_wraps_payload() {
        let frame = LightCommand::PowerOn(Channel::Color)
            .frame()
            .expect("power frame should encode");
        assert_eq!(
            vec![0xFE, 0xEF, 0x0A, 0x09, 0xAB, 0xAA, 0x04, 0x37, 0x02, 0x31, 0x55, 0x0D, 0x0A],
            frame
        );
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0x30, 0x03])]
    #[case(&[0x33, 0x01])]
    #[case(&[0x32, 0x01, 0x02])]
    fn parse_rejects_unknown_payloads(#[case] payload: &[u8]) {
        assert_eq!(None, LightCommand::parse(payload));
    }
}
