/// Effect names in wire order; the index is the protocol effect code.
const EFFECT_NAMES: [&str; 11] = [
    "Off",
    "Random",
    "Rainbow",
    "Rainbow Slow",
    "Fusion",
    "Pulse",
    "Wave",
    "Chill",
    "Action",
    "Forest",
    "Summer",
];

/// Fixed catalog of device-side animated effects.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct EffectCatalog;

impl EffectCatalog {
    /// Name of the "no effect" entry at index 0.
    pub const OFF: &'static str = EFFECT_NAMES[0];

    /// Returns every effect name in protocol order.
    ///
    /// ```
    /// use tl100::EffectCatalog;
    ///
    /// assert_eq!(11, EffectCatalog::names().len());
    /// assert_eq!("Off", EffectCatalog::names()[0]);
    /// ```
    #[must_use]
    pub const fn names() -> &'static [&'static str] {
        &EFFECT_NAMES
    }

    /// Resolves an effect name to its protocol index.
    ///
    /// Unknown names resolve to `0` ("Off").
    ///
    /// ```
    /// use tl100::EffectCatalog;
    ///
    /// assert_eq!(2, EffectCatalog::index_of("Rainbow"));
    /// assert_eq!(0, EffectCatalog::index_of("Nonexistent"));
    /// ```
    #[must_use]
    pub fn index_of(name: &str) -> u8 {
        EFFECT_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .and_then(|index| u8::try_from(index).ok())
            .unwrap_or(0)
    }

    /// Returns the name for a protocol index, if it is in range.
    #[must_use]
    pub fn name_of(index: u8) -> Option<&'static str> {
        EFFECT_NAMES.get(usize::from(index)).copied()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Off", 0)]
    #[case("Rainbow", 2)]
    #[case("Wave", 6)]
    #[case("Summer", 10)]
    #[case("Nonexistent", 0)]
    #[case("rainbow", 0)]
    fn index_of_falls_back_to_off(#[case] name: &str, #[case] expected: u8) {
        assert_eq!(expected, EffectCatalog::index_of(name));
    }

    #[test]
    fn name_of_is_inverse_for_catalog_indices() {
        for (index, name) in EffectCatalog::names().iter().enumerate() {
            let index = u8::try_from(index).expect("catalog index fits in a byte");
            assert_eq!(Some(*name), EffectCatalog::name_of(index));
            assert_eq!(index, EffectCatalog::index_of(name));
        }
        assert_eq!(None, EffectCatalog::name_of(11));
    }
}
