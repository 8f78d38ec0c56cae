/// A characteristic description discovered on a connected peripheral.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CharacteristicInfo {
    uuid: String,
    properties: Vec<String>,
}

impl CharacteristicInfo {
    /// Creates a characteristic description.
    ///
    /// ```
    /// use tl100::CharacteristicInfo;
    ///
    /// let info = CharacteristicInfo::new("0734594A-A8E7-4B1A-A6B1-CD5243059A57", ["notify"]);
    /// assert_eq!("0734594a-a8e7-4b1a-a6b1-cd5243059a57", info.uuid());
    /// assert!(info.supports_notify());
    /// ```
    #[must_use]
    pub fn new<I, S>(uuid: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uuid: uuid.into().to_ascii_lowercase(),
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the characteristic UUID in lowercase form.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Returns property labels for this characteristic.
    #[must_use]
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Whether the characteristic accepts writes of either kind.
    #[must_use]
    pub fn supports_write(&self) -> bool {
        self.has_property("write") || self.has_property("write_without_response")
    }

    /// Whether the characteristic can notify or indicate.
    #[must_use]
    pub fn supports_notify(&self) -> bool {
        self.has_property("notify") || self.has_property("indicate")
    }

    fn has_property(&self, property: &str) -> bool {
        self.properties
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(property))
    }
}
