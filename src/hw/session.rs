use tracing::instrument;

use super::model::CharacteristicInfo;
use crate::error::InteractionError;
use crate::protocol::EndpointId;

/// Characteristic identities resolved for one live connection.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConnectionHandle {
    write_uuid: String,
    notify_uuid: String,
}

impl ConnectionHandle {
    /// Resolves the write and notify characteristics from an enumerated list.
    ///
    /// Each endpoint must match exactly one characteristic that carries the
    /// endpoint UUID and the matching capability.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::MissingCharacteristic`] when an endpoint has
    /// no match and [`InteractionError::AmbiguousCharacteristic`] when it has
    /// several.
    #[instrument(skip(characteristics), level = "debug", fields(characteristic_count = characteristics.len()))]
    pub fn resolve(characteristics: &[CharacteristicInfo]) -> Result<Self, InteractionError> {
        Ok(Self {
            write_uuid: resolve_endpoint(characteristics, EndpointId::WriteCharacteristic)?,
            notify_uuid: resolve_endpoint(characteristics, EndpointId::NotifyCharacteristic)?,
        })
    }

    /// UUID of the command characteristic.
    #[must_use]
    pub fn write_uuid(&self) -> &str {
        &self.write_uuid
    }

    /// UUID of the status notification characteristic.
    #[must_use]
    pub fn notify_uuid(&self) -> &str {
        &self.notify_uuid
    }
}

fn resolve_endpoint(
    characteristics: &[CharacteristicInfo],
    endpoint: EndpointId,
) -> Result<String, InteractionError> {
    let capable = |characteristic: &&CharacteristicInfo| match endpoint {
        EndpointId::WriteCharacteristic => characteristic.supports_write(),
        EndpointId::NotifyCharacteristic => characteristic.supports_notify(),
    };
    let matches: Vec<&CharacteristicInfo> = characteristics
        .iter()
        .filter(|characteristic| characteristic.uuid().eq_ignore_ascii_case(endpoint.uuid()))
        .filter(capable)
        .collect();

    match matches.as_slice() {
        [single] => Ok(single.uuid().to_string()),
        [] => Err(InteractionError::MissingCharacteristic { endpoint }),
        several => Err(InteractionError::AmbiguousCharacteristic {
            endpoint,
            count: several.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::protocol::{NOTIFY_CHARACTERISTIC_UUID, WRITE_CHARACTERISTIC_UUID};

    fn characteristic(uuid: &str, properties: &[&str]) -> CharacteristicInfo {
        CharacteristicInfo::new(uuid, properties.iter().copied())
    }

    #[test]
    fn resolve_finds_both_endpoints() {
        let characteristics = vec![
            characteristic("00002a00-0000-1000-8000-00805f9b34fb", &["read"]),
            characteristic(&WRITE_CHARACTERISTIC_UUID.to_uppercase(), &["write"]),
            characteristic(NOTIFY_CHARACTERISTIC_UUID, &["notify", "read"]),
        ];

        let handle = ConnectionHandle::resolve(&characteristics).expect("endpoints should resolve");
        assert_eq!(WRITE_CHARACTERISTIC_UUID, handle.write_uuid());
        assert_eq!(NOTIFY_CHARACTERISTIC_UUID, handle.notify_uuid());
    }

    #[rstest]
    #[case(vec![], EndpointId::WriteCharacteristic)]
    #[case(
        vec![characteristic(WRITE_CHARACTERISTIC_UUID, &["write"])],
        EndpointId::NotifyCharacteristic
    )]
    #[case(
        vec![characteristic(NOTIFY_CHARACTERISTIC_UUID, &["notify"])],
        EndpointId::WriteCharacteristic
    )]
    #[case(
        vec![
            characteristic(WRITE_CHARACTERISTIC_UUID, &["write_without_response"]),
            characteristic(NOTIFY_CHARACTERISTIC_UUID, &["read"]),
        ],
        EndpointId::NotifyCharacteristic
    )]
    #[case(
        vec![
            characteristic(WRITE_CHARACTERISTIC_UUID, &["read"]),
            characteristic(NOTIFY_CHARACTERISTIC_UUID, &["notify"]),
        ],
        EndpointId::WriteCharacteristic
    )]
    fn resolve_reports_missing_endpoint(
        #[case] characteristics: Vec<CharacteristicInfo>,
        #[case] expected: EndpointId,
    ) {
        let error = ConnectionHandle::resolve(&characteristics)
            .expect_err("missing endpoint should fail resolution");
        assert_matches!(
            error,
            InteractionError::MissingCharacteristic { endpoint } if endpoint == expected
        );
    }

    #[test]
    fn resolve_rejects_ambiguous_matches() {
        let characteristics = vec![
            characteristic(WRITE_CHARACTERISTIC_UUID, &["write"]),
            characteristic(NOTIFY_CHARACTERISTIC_UUID, &["notify"]),
            characteristic(NOTIFY_CHARACTERISTIC_UUID, &["indicate"]),
        ];

        let error = ConnectionHandle::resolve(&characteristics)
            .expect_err("duplicate notify endpoint should fail resolution");
        assert_matches!(
            error,
            InteractionError::AmbiguousCharacteristic {
                endpoint: EndpointId::NotifyCharacteristic,
                count: 2,
            }
        );
    }
}
