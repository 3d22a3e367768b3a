//! Splitting a message into its sets, RFC 7011 section 3.3.

use snafu::ensure;

use crate::{
    cursor::ByteCursor,
    error::{IncompleteMessageSnafu, InvalidSetLengthSnafu, ReservedSetIdSnafu, Result},
    header::MessageHeader,
    internal_events::IpfixSetPaddingSkipped,
};

pub const TEMPLATE_SET_ID: u16 = 2;
pub const OPTIONS_TEMPLATE_SET_ID: u16 = 3;
/// Every set id from here up is a data set, named after the template it uses.
pub const MIN_DATA_SET_ID: u16 = 4;

const SET_HEADER_LENGTH: u16 = 4;
const TEMPLATE_RECORD_HEADER_LENGTH: usize = 4;
const OPTIONS_TEMPLATE_RECORD_HEADER_LENGTH: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SetKind {
    Template,
    OptionsTemplate,
    Data,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Set<'a> {
    pub id: u16,
    pub length: u16,
    /// Set body without the set header.
    pub content: &'a [u8],
}

impl<'a> Set<'a> {
    pub fn kind(&self) -> SetKind {
        match self.id {
            TEMPLATE_SET_ID => SetKind::Template,
            OPTIONS_TEMPLATE_SET_ID => SetKind::OptionsTemplate,
            _ => SetKind::Data,
        }
    }

    pub fn cursor(&self) -> ByteCursor<'a> {
        ByteCursor::new(self.content)
    }

    /// Calls `f` for every record of a template or options template set,
    /// stopping at trailing padding too short for another record header.
    pub fn for_each_template_record<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut ByteCursor<'a>) -> Result<()>,
    {
        let min_record_length = if self.kind() == SetKind::OptionsTemplate {
            OPTIONS_TEMPLATE_RECORD_HEADER_LENGTH
        } else {
            TEMPLATE_RECORD_HEADER_LENGTH
        };

        let mut cursor = self.cursor();
        while cursor.has_remaining() {
            let remaining = cursor.remaining();
            if remaining < min_record_length {
                emit!(IpfixSetPaddingSkipped { padding: remaining });
                break;
            }
            f(&mut cursor)?;
        }
        Ok(())
    }
}

/// Decodes the message header and splits the rest of `packet` into sets.
///
/// The buffer must hold exactly the number of bytes the header declares.
/// Set ids 0 and 1 are rejected here.
pub(crate) fn read_sets(packet: &[u8]) -> Result<(MessageHeader, Vec<Set<'_>>)> {
    let mut cursor = ByteCursor::new(packet);
    let header = MessageHeader::decode(&mut cursor)?;
    ensure!(
        usize::from(header.length) == packet.len(),
        IncompleteMessageSnafu {
            declared: header.length,
            actual: packet.len(),
        }
    );

    let mut sets = Vec::new();
    while cursor.has_remaining() {
        let id = cursor.read_u16()?;
        let length = cursor.read_u16()?;
        ensure!(id >= TEMPLATE_SET_ID, ReservedSetIdSnafu { set_id: id });
        ensure!(
            length >= SET_HEADER_LENGTH,
            InvalidSetLengthSnafu { set_id: id, length }
        );

        let content = cursor.read_bytes(usize::from(length - SET_HEADER_LENGTH))?;
        sets.push(Set {
            id,
            length,
            content,
        });
    }

    Ok((header, sets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn message(sets: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x00, 0x0a];
        bytes.extend((16 + sets.len() as u16).to_be_bytes());
        bytes.extend([0x5b, 0x9a, 0xd9, 0x01, 0, 0, 0, 1, 0, 0, 0, 0]);
        bytes.extend(sets);
        bytes
    }

    #[test]
    fn splits_sets() {
        let packet = message(&[
            0x00, 0x02, 0x00, 0x08, 0x01, 0x00, 0x00, 0x00, // template set, one withdrawal-sized record
            0x01, 0x00, 0x00, 0x06, 0xaa, 0xbb, // data set 256
            0x00, 0x64, 0x00, 0x04, // data set 100, empty
        ]);

        let (header, sets) = read_sets(&packet).unwrap();

        assert_eq!(usize::from(header.length), packet.len());
        let kinds: Vec<_> = sets.iter().map(Set::kind).collect();
        assert_eq!(kinds, [SetKind::Template, SetKind::Data, SetKind::Data]);
        assert_eq!(sets[1].id, 256);
        assert_eq!(sets[1].content, &[0xaa, 0xbb]);
        assert!(sets[2].content.is_empty());
    }

    #[test]
    fn header_length_must_match_buffer() {
        let mut packet = message(&[0x01, 0x00, 0x00, 0x04]);
        packet.push(0);

        assert_eq!(
            read_sets(&packet).unwrap_err(),
            Error::IncompleteMessage {
                declared: 20,
                actual: 21
            }
        );
    }

    #[test]
    fn rejects_set_ids_zero_and_one() {
        for set_id in [0u8, 1] {
            let packet = message(&[0x00, set_id, 0x00, 0x04]);
            assert_eq!(
                read_sets(&packet).unwrap_err(),
                Error::ReservedSetId {
                    set_id: u16::from(set_id)
                }
            );
        }
    }

    #[test]
    fn rejects_short_set_length() {
        let packet = message(&[0x01, 0x00, 0x00, 0x03]);
        assert_eq!(
            read_sets(&packet).unwrap_err(),
            Error::InvalidSetLength {
                set_id: 256,
                length: 3
            }
        );
    }

    #[test]
    fn set_longer_than_message() {
        let packet = message(&[0x01, 0x00, 0x00, 0x10, 0xaa]);
        assert!(matches!(
            read_sets(&packet).unwrap_err(),
            Error::BufferUnderrun { needed: 12, .. }
        ));
    }

    #[test]
    fn template_set_padding() {
        let packet = message(&[0x00, 0x02, 0x00, 0x0b, 0x01, 0x00, 0x00, 0x00, 0, 0, 0]);
        let (_, sets) = read_sets(&packet).unwrap();

        let mut records = 0;
        sets[0]
            .for_each_template_record(|cursor| {
                records += 1;
                cursor.skip(4)
            })
            .unwrap();
        assert_eq!(records, 1);
    }
}
