//! Decoding of data records against the field layout of their template.
//!
//! Data records carry no length of their own: the decoder walks the field
//! descriptors in template order, resolves each field's wire length (fixed, or
//! announced by a variable-length prefix), and converts the bytes according to
//! the data type registered for the element. Sub-template lists recurse into
//! the same machinery and are flattened into the enclosing flow.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use snafu::{OptionExt, ensure};

use crate::{
    cursor::ByteCursor,
    definitions::{DataType, DefinitionRegistry, InformationElementDefinition},
    error::{
        InvalidBooleanSnafu, InvalidFieldLengthSnafu, InvalidTimestampSnafu, NestingTooDeepSnafu,
        Result,
    },
    flow::{Flow, Value},
    internal_events::{
        IpfixBasicListSkipped, IpfixSetPaddingSkipped, IpfixSubTemplateListMissingTemplate,
        IpfixSubTemplateMultiListSkipped, IpfixUnsupportedField,
    },
    template::{InformationElement, TemplateCatalog},
};

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 8;

/// Seconds from the NTP era 0 epoch (1900-01-01) to the Unix epoch.
const NTP_UNIX_OFFSET_SECS: i64 = 2_208_988_800;

/// dateTimeMicroseconds only carries 21 significant fraction bits, RFC 7011 section 6.1.9.
const MICROSECOND_FRACTION_MASK: u32 = !0x7FF;

/// Decodes data sets into flows, looking up field types in a [`DefinitionRegistry`].
#[derive(Clone, Copy, Debug)]
pub struct FlowDecoder<'a> {
    registry: &'a DefinitionRegistry,
    max_nesting_depth: usize,
}

impl<'a> FlowDecoder<'a> {
    pub const fn new(registry: &'a DefinitionRegistry) -> Self {
        Self {
            registry,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Limits how deep sub-template lists may nest. 0 rejects any sub-template list
    /// whose template is known.
    pub const fn with_max_nesting_depth(mut self, max_nesting_depth: usize) -> Self {
        self.max_nesting_depth = max_nesting_depth;
        self
    }

    /// Decodes every record of a data set body. `cursor` must cover exactly the
    /// set content, without the 4 byte set header.
    ///
    /// Trailing bytes too short to hold another record are set padding and are skipped.
    pub fn decode_data_set(
        &self,
        fields: &[InformationElement],
        catalog: &TemplateCatalog,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<Vec<Flow>> {
        self.decode_records(fields, catalog, cursor, 0)
    }

    fn decode_records(
        &self,
        fields: &[InformationElement],
        catalog: &TemplateCatalog,
        cursor: &mut ByteCursor<'_>,
        depth: usize,
    ) -> Result<Vec<Flow>> {
        let min_record_length: usize = fields
            .iter()
            .map(InformationElement::min_wire_length)
            .sum();

        let mut flows = Vec::new();
        while cursor.has_remaining() {
            let remaining = cursor.remaining();
            if min_record_length == 0 || remaining < min_record_length {
                emit!(IpfixSetPaddingSkipped { padding: remaining });
                cursor.skip(remaining)?;
                break;
            }
            flows.push(self.decode_record(fields, catalog, cursor, depth)?);
        }
        Ok(flows)
    }

    pub(crate) fn decode_record(
        &self,
        fields: &[InformationElement],
        catalog: &TemplateCatalog,
        cursor: &mut ByteCursor<'_>,
        depth: usize,
    ) -> Result<Flow> {
        let mut flow = Flow::new();

        for field in fields {
            let definition = self
                .registry
                .lookup(field.id, field.enterprise_number)?;
            let length = resolve_length(field, cursor)?;
            let mut value = cursor.read_slice(usize::from(length))?;

            match definition {
                Some(definition) => {
                    self.decode_field(definition, length, &mut value, catalog, depth, &mut flow)?
                }
                None => emit!(IpfixUnsupportedField {
                    element_id: field.id,
                    enterprise_number: field.enterprise_number,
                    length,
                }),
            }
        }

        Ok(flow)
    }

    fn decode_field(
        &self,
        definition: &InformationElementDefinition,
        length: u16,
        value: &mut ByteCursor<'_>,
        catalog: &TemplateCatalog,
        depth: usize,
        flow: &mut Flow,
    ) -> Result<()> {
        let name = definition.field_name.as_str();
        let data_type = definition.data_type;
        let invalid_length = InvalidFieldLengthSnafu {
            field: name,
            data_type,
            length,
        };

        let decoded = match data_type {
            DataType::Unsigned8
            | DataType::Unsigned16
            | DataType::Unsigned32
            | DataType::Unsigned64 => {
                ensure!((1..=8).contains(&length), invalid_length);
                Some(Value::Unsigned(decode_unsigned(value.peek_remaining())))
            }
            DataType::Signed8 | DataType::Signed16 | DataType::Signed32 | DataType::Signed64 => {
                ensure!((1..=8).contains(&length), invalid_length);
                Some(Value::Signed(decode_signed(value.peek_remaining())))
            }
            DataType::Float32 | DataType::Float64 => match length {
                4 => Some(Value::Float(f64::from(value.read_f32()?))),
                8 => Some(Value::Float(value.read_f64()?)),
                _ => return invalid_length.fail(),
            },
            DataType::MacAddress => {
                ensure!(length == 6, invalid_length);
                Some(Value::String(format_mac(value.peek_remaining())))
            }
            DataType::Ipv4Address => {
                ensure!(length == 4, invalid_length);
                Some(Value::String(Ipv4Addr::from(value.read_u32()?).to_string()))
            }
            DataType::Ipv6Address => {
                ensure!(length == 16, invalid_length);
                Some(Value::String(Ipv6Addr::from(value.read_u128()?).to_string()))
            }
            DataType::Boolean => {
                ensure!(length == 1, invalid_length);
                Some(Value::Boolean(decode_boolean(name, value.read_u8()?)?))
            }
            DataType::String => Some(Value::String(decode_string(value.peek_remaining()))),
            DataType::OctetArray => Some(Value::Hex(hex::encode(value.peek_remaining()))),
            DataType::DateTimeSeconds => {
                ensure!(length == 4, invalid_length);
                let timestamp = DateTime::from_timestamp(i64::from(value.read_u32()?), 0);
                Some(Value::Timestamp(
                    timestamp.context(InvalidTimestampSnafu { field: name })?,
                ))
            }
            DataType::DateTimeMilliseconds => {
                ensure!(length == 8, invalid_length);
                let timestamp = i64::try_from(value.read_u64()?)
                    .ok()
                    .and_then(DateTime::from_timestamp_millis);
                Some(Value::Timestamp(
                    timestamp.context(InvalidTimestampSnafu { field: name })?,
                ))
            }
            DataType::DateTimeMicroseconds | DataType::DateTimeNanoseconds => {
                ensure!(length == 8, invalid_length);
                let seconds = value.read_u32()?;
                let mut fraction = value.read_u32()?;
                if data_type == DataType::DateTimeMicroseconds {
                    fraction &= MICROSECOND_FRACTION_MASK;
                }
                Some(Value::Timestamp(
                    ntp_timestamp(seconds, fraction).context(InvalidTimestampSnafu { field: name })?,
                ))
            }
            DataType::BasicList => {
                self.skip_basic_list(name, value)?;
                None
            }
            DataType::SubTemplateList => {
                self.decode_sub_template_list(name, value, catalog, depth, flow)?;
                None
            }
            DataType::SubTemplateMultiList => {
                emit!(IpfixSubTemplateMultiListSkipped {
                    field_name: name,
                    length,
                });
                None
            }
        };

        if let Some(decoded) = decoded {
            flow.insert(name, decoded);
        }
        Ok(())
    }

    /// basicList contents are not decoded; only the element header is checked.
    fn skip_basic_list(&self, name: &str, list: &mut ByteCursor<'_>) -> Result<()> {
        let _semantic = list.read_u8()?;
        let element = InformationElement::decode(list)?;

        match self
            .registry
            .lookup(element.id, element.enterprise_number)?
        {
            Some(_) => emit!(IpfixBasicListSkipped {
                field_name: name,
                element_id: element.id,
                enterprise_number: element.enterprise_number,
            }),
            None => emit!(IpfixUnsupportedField {
                element_id: element.id,
                enterprise_number: element.enterprise_number,
                length: element.length,
            }),
        }
        Ok(())
    }

    /// Decodes the records of a sub-template list and flattens them into `flow`
    /// as `<name>_<record index>_<nested field name>`.
    fn decode_sub_template_list(
        &self,
        name: &str,
        list: &mut ByteCursor<'_>,
        catalog: &TemplateCatalog,
        depth: usize,
        flow: &mut Flow,
    ) -> Result<()> {
        let _semantic = list.read_u8()?;
        let template_id = list.read_u16()?;

        let Some(fields) = catalog.fields_for(template_id) else {
            emit!(IpfixSubTemplateListMissingTemplate {
                field_name: name,
                template_id,
            });
            return Ok(());
        };
        ensure!(
            depth < self.max_nesting_depth,
            NestingTooDeepSnafu {
                max_depth: self.max_nesting_depth,
            }
        );

        let records = self.decode_records(fields, catalog, list, depth + 1)?;
        for (index, record) in records.into_iter().enumerate() {
            for (field, value) in record {
                flow.insert(format!("{name}_{index}_{field}"), value);
            }
        }
        Ok(())
    }
}

/// Wire length of the next value of `field`: the template length, or for
/// variable-length fields the 1 or 3 byte prefix read from `cursor`.
pub fn resolve_length(field: &InformationElement, cursor: &mut ByteCursor<'_>) -> Result<u16> {
    if !field.is_variable_length() {
        return Ok(field.length);
    }
    match cursor.read_u8()? {
        255 => cursor.read_u16(),
        length => Ok(u16::from(length)),
    }
}

/// Big-endian integer of up to 8 bytes, zero-extended.
pub fn decode_unsigned(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// Big-endian integer of up to 8 bytes, sign-extended from its most significant byte.
pub fn decode_signed(bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    let shift = 64 - 8 * bytes.len() as u32;
    ((decode_unsigned(bytes) << shift) as i64) >> shift
}

/// RFC 7011 booleans: 1 is true, 2 is false, anything else is invalid.
pub fn decode_boolean(field: &str, value: u8) -> Result<bool> {
    match value {
        1 => Ok(true),
        2 => Ok(false),
        value => InvalidBooleanSnafu { field, value }.fail(),
    }
}

fn decode_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\0', "")
}

fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn ntp_timestamp(seconds: u32, fraction: u32) -> Option<DateTime<Utc>> {
    let nanos = (u64::from(fraction) * 1_000_000_000) >> 32;
    DateTime::from_timestamp(
        i64::from(seconds) - NTP_UNIX_OFFSET_SECS,
        u32::try_from(nanos).ok()?,
    )
}
