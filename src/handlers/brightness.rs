use serde::Serialize;

const WIRE_MAX: u16 = 100;
const LOCAL_MAX: u16 = 255;

/// Brightness on the local 8-bit scale (`0..=255`).
///
/// The device speaks a `0..=100` percentage; conversions round to nearest.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    derive_more::Display,
    derive_more::From,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct Brightness(u8);

impl Brightness {
    /// Creates a brightness value on the local scale.
    ///
    /// ```
    /// use tl100::Brightness;
    ///
    /// assert_eq!(128, Brightness::new(128).value());
    /// ```
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the local-scale byte.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Converts to the device percentage, `round(value * 100 / 255)`.
    ///
    /// ```
    /// use tl100::Brightness;
    ///
    /// assert_eq!(50, Brightness::new(128).to_wire());
    /// assert_eq!(100, Brightness::new(255).to_wire());
    /// ```
    #[must_use]
    pub fn to_wire(self) -> u8 {
        scale_rounded(u16::from(self.0), WIRE_MAX, LOCAL_MAX)
    }

    /// Converts a device percentage to the local scale.
    ///
    /// A wire value of `0` means the device reported no brightness and yields
    /// `None`. Values above `100` are clamped.
    ///
    /// ```
    /// use tl100::Brightness;
    ///
    /// assert_eq!(None, Brightness::from_wire(0));
    /// assert_eq!(Some(Brightness::new(130)), Brightness::from_wire(51));
    /// ```
    #[must_use]
    pub fn from_wire(wire: u8) -> Option<Self> {
        if wire == 0 {
            return None;
        }
        let wire = u16::from(wire).min(WIRE_MAX);
        Some(Self(scale_rounded(wire, LOCAL_MAX, WIRE_MAX)))
    }
}

fn scale_rounded(value: u16, numerator: u16, denominator: u16) -> u8 {
    let scaled = (u32::from(value) * u32::from(numerator) + u32::from(denominator) / 2)
        / u32::from(denominator);
    u8::try_from(scaled).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(3, 1)]
    #[case(128, 50)]
    #[case(130, 51)]
    #[case(255, 100)]
    fn to_wire_rounds_to_nearest_percent(#[case] local: u8, #[case] wire: u8) {
        assert_eq!(wire, Brightness::new(local).to_wire());
    }

    #[test]
    fn wire_zero_means_unknown() {
        assert_eq!(None, Brightness::from_wire(0));
    }

    #[test]
    fn wire_values_survive_a_local_round_trip() {
        for wire in 1..=100u8 {
            let local = Brightness::from_wire(wire).expect("non-zero wire value is known");
            assert_eq!(wire, local.to_wire(), "wire value {wire} drifted");
        }
    }

    #[test]
    fn local_values_stay_within_one_step_after_wire_round_trip() {
        for local in 2..=255u8 {
            let back = Brightness::from_wire(Brightness::new(local).to_wire())
                .expect("non-zero wire value is known");
            assert!(
                back.value().abs_diff(local) <= 1,
                "local value {local} came back as {back}"
            );
        }
    }

    #[test]
    fn out_of_range_wire_values_are_clamped() {
        assert_eq!(Some(Brightness::new(255)), Brightness::from_wire(200));
    }
}
