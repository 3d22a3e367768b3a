use chrono::{DateTime, Utc};
use snafu::ensure;

use crate::{
    cursor::ByteCursor,
    error::{BufferUnderrunSnafu, InvalidVersionSnafu, Result},
};

pub const IPFIX_VERSION: u16 = 10;

/// IPFIX message header, RFC 7011 section 3.1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total length of the message in bytes, including this header.
    pub length: u16,
    pub export_time: DateTime<Utc>,
    pub sequence_number: u32,
    pub observation_domain_id: u32,
}

impl MessageHeader {
    pub const LENGTH: usize = 16;

    /// Decodes the header, advancing `cursor` by exactly [`Self::LENGTH`] bytes.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let remaining = cursor.remaining();
        ensure!(
            remaining >= Self::LENGTH,
            BufferUnderrunSnafu {
                needed: Self::LENGTH,
                remaining,
                position: cursor.position(),
            }
        );

        let version = cursor.read_u16()?;
        ensure!(version == IPFIX_VERSION, InvalidVersionSnafu { version });

        let length = cursor.read_u16()?;
        let export_secs = cursor.read_u32()?;
        let sequence_number = cursor.read_u32()?;
        let observation_domain_id = cursor.read_u32()?;

        Ok(Self {
            length,
            export_time: from_epoch_seconds(export_secs),
            sequence_number,
            observation_domain_id,
        })
    }
}

/// Every `u32` second count is within chrono's range, so this never falls back to the epoch.
pub(crate) fn from_epoch_seconds(secs: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(i64::from(secs), 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::Error;

    fn header_bytes(version: u16) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&version.to_be_bytes());
        bytes.extend_from_slice(&16u16.to_be_bytes());
        bytes.extend_from_slice(&1_536_874_753u32.to_be_bytes());
        bytes.extend_from_slice(&42u32.to_be_bytes());
        bytes.extend_from_slice(&7u32.to_be_bytes());
        bytes
    }

    #[test]
    fn decodes_header() {
        let bytes = header_bytes(10);
        let mut cursor = ByteCursor::new(&bytes);

        let header = MessageHeader::decode(&mut cursor).unwrap();
        assert_eq!(header.length, 16);
        assert_eq!(
            header.export_time,
            Utc.with_ymd_and_hms(2018, 9, 13, 21, 39, 13).unwrap()
        );
        assert_eq!(header.sequence_number, 42);
        assert_eq!(header.observation_domain_id, 7);
        assert_eq!(cursor.position(), MessageHeader::LENGTH);
    }

    #[test]
    fn rejects_other_versions() {
        for version in [0u16, 5, 9, 11, u16::MAX] {
            let bytes = header_bytes(version);
            let error = MessageHeader::decode(&mut ByteCursor::new(&bytes)).unwrap_err();
            assert_eq!(error, Error::InvalidVersion { version });
        }
    }

    #[test]
    fn short_buffer() {
        let bytes = header_bytes(10);
        let error = MessageHeader::decode(&mut ByteCursor::new(&bytes[..10])).unwrap_err();
        assert!(matches!(error, Error::BufferUnderrun { needed: 16, .. }));
    }
}
