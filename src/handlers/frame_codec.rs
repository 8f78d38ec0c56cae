use thiserror::Error;

const PREAMBLE: [u8; 3] = [0xFE, 0xEF, 0x0A];
const MARKER: [u8; 2] = [0xAB, 0xAA];
const TRAILER: [u8; 3] = [0x55, 0x0D, 0x0A];
/// Bytes wrapped around the payload: preamble, length, marker, inner length,
/// checksum, trailer.
const FRAME_OVERHEAD: usize = 11;
const OUTER_LENGTH_BIAS: usize = 7;
const INNER_LENGTH_BIAS: usize = 2;
const MAX_PAYLOAD_LEN: usize = u8::MAX as usize - OUTER_LENGTH_BIAS;

/// Errors returned by frame encoding and decoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameCodecError {
    /// The payload cannot be described by the single-byte length fields.
    #[error("frame payload is too large: {payload_len} bytes exceeds max {max_payload_len}")]
    PayloadTooLarge {
        payload_len: usize,
        max_payload_len: usize,
    },
    /// The frame is shorter than the fixed framing overhead.
    #[error("frame is too short: expected at least 11 bytes, got {actual}")]
    TooShort { actual: usize },
    /// The frame does not start with `FE EF 0A`.
    #[error("frame preamble is invalid")]
    InvalidPreamble,
    /// Byte 4..6 is not the `AB AA` marker.
    #[error("frame marker is invalid")]
    InvalidMarker,
    /// The frame does not end with `55 0D 0A`.
    #[error("frame trailer is invalid")]
    InvalidTrailer,
    /// A declared length does not match the frame size.
    #[error("frame length mismatch: declared {declared}, expected {expected}")]
    LengthMismatch { declared: u8, expected: usize },
    /// The checksum byte does not match the XOR-fold of the payload.
    #[error("frame checksum mismatch: declared {declared:#04x}, computed {computed:#04x}")]
    ChecksumMismatch { declared: u8, computed: u8 },
}

/// Encoder/decoder for the checksum-framed TL100 command protocol.
pub struct FrameCodec;

impl FrameCodec {
    /// Wraps a command payload in the TL100 frame.
    ///
    /// ```
    /// use tl100::FrameCodec;
    ///
    /// let frame = FrameCodec::encode(&[0x30, 0x01])?;
    /// assert_eq!(
    ///     vec![0xFE, 0xEF, 0x0A, 0x09, 0xAB, 0xAA, 0x04, 0x30, 0x01, 0x35, 0x55, 0x0D, 0x0A],
    ///     frame
    /// );
    /// # Ok::<(), tl100::FrameCodecError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error when the payload does not fit the single-byte length field.
    pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameCodecError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameCodecError::PayloadTooLarge {
                payload_len: payload.len(),
                max_payload_len: MAX_PAYLOAD_LEN,
            });
        }

        let inner_len = length_byte(payload.len() + INNER_LENGTH_BIAS)?;
        let outer_len = length_byte(payload.len() + OUTER_LENGTH_BIAS)?;

        let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
        frame.extend_from_slice(&PREAMBLE);
        frame.push(outer_len);
        frame.extend_from_slice(&MARKER);
        frame.push(inner_len);
        frame.extend_from_slice(payload);
        frame.push(Self::checksum(inner_len, payload));
        frame.extend_from_slice(&TRAILER);
        Ok(frame)
    }

    /// Extracts the payload from a complete frame, validating every fixed field.
    ///
    /// # Errors
    ///
    /// Returns an error when framing, lengths, or checksum do not match.
    pub fn decode(frame: &[u8]) -> Result<&[u8], FrameCodecError> {
        if frame.len() < FRAME_OVERHEAD {
            return Err(FrameCodecError::TooShort {
                actual: frame.len(),
            });
        }
        if frame[..3] != PREAMBLE {
            return Err(FrameCodecError::InvalidPreamble);
        }
        if frame[4..6] != MARKER {
            return Err(FrameCodecError::InvalidMarker);
        }
        if frame[frame.len() - 3..] != TRAILER {
            return Err(FrameCodecError::InvalidTrailer);
        }

        let payload_len = frame.len() - FRAME_OVERHEAD;
        let outer_len = frame[3];
        if usize::from(outer_len) != payload_len + OUTER_LENGTH_BIAS {
            return Err(FrameCodecError::LengthMismatch {
                declared: outer_len,
                expected: payload_len + OUTER_LENGTH_BIAS,
            });
        }
        let inner_len = frame[6];
        if usize::from(inner_len) != payload_len + INNER_LENGTH_BIAS {
            return Err(FrameCodecError::LengthMismatch {
                declared: inner_len,
                expected: payload_len + INNER_LENGTH_BIAS,
            });
        }

        let payload = &frame[7..7 + payload_len];
        let declared = frame[7 + payload_len];
        let computed = Self::checksum(inner_len, payload);
        if declared != computed {
            return Err(FrameCodecError::ChecksumMismatch { declared, computed });
        }

        Ok(payload)
    }

    /// XOR-fold of the inner length byte followed by every payload byte.
    #[must_use]
    pub fn checksum(inner_len: u8, payload: &[u8]) -> u8 {
        payload.iter().fold(inner_len, |acc, byte| acc ^ byte)
    }
}

fn length_byte(value: usize) -> Result<u8, FrameCodecError> {
    u8::try_from(value).map_err(|_error| FrameCodecError::PayloadTooLarge {
        payload_len: value,
        max_payload_len: MAX_PAYLOAD_LEN,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn checksum_folds_inner_length_and_payload() {
        let payload = [0x32, 10, 20, 30];
        assert_eq!(6 ^ 0x32 ^ 10 ^ 20 ^ 30, FrameCodec::checksum(6, &payload));

        let frame = FrameCodec::encode(&payload).expect("colour payload should encode");
        assert_eq!(6 ^ 0x32 ^ 10 ^ 20 ^ 30, frame[11]);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0x30, 0x02])]
    #[case(&[0x31, 0x01, 0x32])]
    #[case(&[0x32, 0xFF, 0x00, 0x7F])]
    fn encoded_frames_have_fixed_envelope(#[case] payload: &[u8]) {
        let frame = FrameCodec::encode(payload).expect("small payload should encode");

        assert_eq!(payload.len() + 11, frame.len());
        assert_eq!([0xFE, 0xEF, 0x0A], frame[..3]);
        assert_eq!([0x55, 0x0D, 0x0A], frame[frame.len() - 3..]);
        assert_eq!(payload.len() + 7, usize::from(frame[3]));
        assert_eq!(payload.len() + 2, usize::from(frame[6]));
        assert_eq!(payload, FrameCodec::decode(&frame).expect("frame should decode"));
    }

    #[test]
    fn encode_rejects_payloads_beyond_length_byte() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert_matches!(
            FrameCodec::encode(&payload),
            Err(FrameCodecError::PayloadTooLarge { payload_len, .. }) if payload_len == MAX_PAYLOAD_LEN + 1
        );
        assert!(FrameCodec::encode(&vec![0u8; MAX_PAYLOAD_LEN]).is_ok());
    }

    #[test]
    fn decode_rejects_corrupted_checksum() {
        let mut frame = FrameCodec::encode(&[0x37, 0x02]).expect("power frame should encode");
        frame[9] ^= 0xFF;
        assert_matches!(
            FrameCodec::decode(&frame),
            Err(FrameCodecError::ChecksumMismatch { .. })
        );
    }

    #[rstest]
    #[case(&[0xFE, 0xEF], FrameCodecError::TooShort { actual: 2 })]
    #[case(
        &[0x00, 0xEF, 0x0A, 0x09, 0xAB, 0xAA, 0x04, 0x30, 0x01, 0x35, 0x55, 0x0D, 0x0A],
        FrameCodecError::InvalidPreamble
    )]
    #[case(
        &[0xFE, 0xEF, 0x0A, 0x09, 0xAB, 0x00, 0x04, 0x30, 0x01, 0x35, 0x55, 0x0D, 0x0A],
        FrameCodecError::InvalidMarker
    )]
    #[case(
        &[0xFE, 0xEF, 0x0A, 0x09, 0xAB, 0xAA, 0x04, 0x30, 0x01, 0x35, 0x55, 0x0D, 0x00],
        FrameCodecError::InvalidTrailer
    )]
    #[case(
        &[0xFE, 0xEF, 0x0A, 0x0A, 0xAB, 0xAA, 0x04, 0x30, 0x01, 0x35, 0x55, 0x0D, 0x0A],
        FrameCodecError::LengthMismatch { declared: 0x0A, expected: 9 }
    )]
    fn decode_rejects_malformed_frames(#[case] frame: &[u8], #[case] expected: FrameCodecError) {
        assert_eq!(Err(expected), FrameCodec::decode(frame));
    }
}
