//! First phase parsing: finds out which templates a message declares and
//! which ones its data sets reference, without decoding any field values.
//!
//! Templates and the data sets using them may arrive in different messages.
//! A collector can scan each message, keep the raw template records it
//! needs, and decode the data sets later once all templates are at hand.

use std::collections::BTreeSet;

use bytes::Bytes;

use crate::{
    cursor::ByteCursor,
    error::Result,
    header::MessageHeader,
    set::{SetKind, read_sets},
    template::{OptionsTemplateRecord, TemplateRecord},
};

/// A data set kept as raw bytes, together with the export time of its message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShallowDataSet {
    pub template_id: u16,
    /// Export time of the enclosing message, in seconds since the Unix epoch.
    pub export_time_secs: u32,
    /// Set body without the set header.
    pub content: Bytes,
}

/// Result of a shallow parse.
///
/// Template records are kept as raw bytes in the order they were declared,
/// including repeated declarations of the same template id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageDescription {
    header: MessageHeader,
    templates: Vec<(u16, Bytes)>,
    options_templates: Vec<(u16, Bytes)>,
    data_sets: Vec<ShallowDataSet>,
}

impl MessageDescription {
    /// Scans `packet`. The returned byte spans share the packet's memory.
    pub fn scan(packet: &Bytes) -> Result<Self> {
        let (header, sets) = read_sets(packet)?;
        let export_time_secs = header.export_time.timestamp() as u32;

        let mut templates = Vec::new();
        let mut options_templates = Vec::new();
        let mut data_sets = Vec::new();

        for set in &sets {
            match set.kind() {
                SetKind::Template => set.for_each_template_record(|cursor| {
                    let (record, raw) = raw_record(cursor, TemplateRecord::decode)?;
                    templates.push((record.template_id, packet.slice_ref(raw)));
                    Ok(())
                })?,
                SetKind::OptionsTemplate => set.for_each_template_record(|cursor| {
                    let (record, raw) = raw_record(cursor, OptionsTemplateRecord::decode)?;
                    options_templates.push((record.template_id, packet.slice_ref(raw)));
                    Ok(())
                })?,
                SetKind::Data => data_sets.push(ShallowDataSet {
                    template_id: set.id,
                    export_time_secs,
                    content: packet.slice_ref(set.content),
                }),
            }
        }

        Ok(Self {
            header,
            templates,
            options_templates,
            data_sets,
        })
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn declared_template_ids(&self) -> BTreeSet<u16> {
        self.templates.iter().map(|(id, _)| *id).collect()
    }

    pub fn declared_options_template_ids(&self) -> BTreeSet<u16> {
        self.options_templates.iter().map(|(id, _)| *id).collect()
    }

    /// Template ids used by the data sets of this message.
    pub fn referenced_template_ids(&self) -> BTreeSet<u16> {
        self.data_sets.iter().map(|set| set.template_id).collect()
    }

    /// Referenced template ids declared by neither a template nor an options
    /// template record of this message.
    pub fn missing_template_ids(&self) -> BTreeSet<u16> {
        let declared = self.declared_template_ids();
        let declared_options = self.declared_options_template_ids();
        self.referenced_template_ids()
            .into_iter()
            .filter(|id| !declared.contains(id) && !declared_options.contains(id))
            .collect()
    }

    /// Raw bytes of the last template record declaring `template_id`.
    pub fn template_record(&self, template_id: u16) -> Option<&Bytes> {
        last_record(&self.templates, template_id)
    }

    pub fn options_template_record(&self, template_id: u16) -> Option<&Bytes> {
        last_record(&self.options_templates, template_id)
    }

    /// Raw template records in declaration order.
    pub fn template_records(&self) -> impl Iterator<Item = (u16, &Bytes)> {
        self.templates.iter().map(|(id, raw)| (*id, raw))
    }

    pub fn options_template_records(&self) -> impl Iterator<Item = (u16, &Bytes)> {
        self.options_templates.iter().map(|(id, raw)| (*id, raw))
    }

    pub fn data_sets(&self) -> &[ShallowDataSet] {
        &self.data_sets
    }
}

fn last_record(records: &[(u16, Bytes)], template_id: u16) -> Option<&Bytes> {
    records
        .iter()
        .rev()
        .find(|(id, _)| *id == template_id)
        .map(|(_, raw)| raw)
}

/// Decodes one record with `decode` and returns it along with the bytes it spans.
fn raw_record<'a, T>(
    cursor: &mut ByteCursor<'a>,
    decode: impl FnOnce(&mut ByteCursor<'a>) -> Result<T>,
) -> Result<(T, &'a [u8])> {
    let start = cursor.mark();
    let record = decode(cursor)?;
    Ok((record, cursor.consumed_since(start)))
}
