use std::sync::Arc;

use bytes::Bytes;
use snafu::OptionExt;

use crate::{
    cursor::ByteCursor,
    decoder::{DEFAULT_MAX_NESTING_DEPTH, FlowDecoder},
    definitions::DefinitionRegistry,
    error::{MissingTemplateSnafu, Result},
    flow::Flow,
    header::MessageHeader,
    internal_events::{IpfixMessageDecoded, IpfixParseError},
    set::{Set, SetKind, read_sets},
    shallow::{MessageDescription, ShallowDataSet},
    template::{InformationElement, OptionsTemplateRecord, TemplateCatalog, TemplateRecord},
};

/// A fully decoded IPFIX message.
#[derive(Clone, Debug, PartialEq)]
pub struct IpfixMessage {
    pub header: MessageHeader,
    pub template_records: Vec<TemplateRecord>,
    pub options_template_records: Vec<OptionsTemplateRecord>,
    pub flows: Vec<Flow>,
}

/// Decodes IPFIX messages.
///
/// The parser holds no per-message state: every call builds its own template
/// catalog from the sets it is given. Cloning is cheap and clones share the
/// definition registry.
#[derive(Clone, Debug)]
pub struct IpfixParser {
    registry: Arc<DefinitionRegistry>,
    max_nesting_depth: usize,
}

impl IpfixParser {
    pub fn new(registry: impl Into<Arc<DefinitionRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    pub const fn with_max_nesting_depth(mut self, max_nesting_depth: usize) -> Self {
        self.max_nesting_depth = max_nesting_depth;
        self
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    fn decoder(&self) -> FlowDecoder<'_> {
        FlowDecoder::new(&self.registry).with_max_nesting_depth(self.max_nesting_depth)
    }

    /// Decodes a complete message.
    ///
    /// Every data set must reference a template declared in the same message,
    /// otherwise the whole message fails with `MissingTemplate`. A data set uses
    /// the latest declaration of its template that precedes it, or the last
    /// one in the message when the template only appears after it.
    pub fn parse_message(&self, packet: &[u8]) -> Result<IpfixMessage> {
        let result = self.decode_message(packet);
        report(&result);
        result
    }

    fn decode_message(&self, packet: &[u8]) -> Result<IpfixMessage> {
        let (header, sets) = read_sets(packet)?;
        let decoder = self.decoder();

        let mut catalog = TemplateCatalog::new();
        let mut template_records = Vec::new();
        let mut options_template_records = Vec::new();
        // Flows per data set, in set order. A data set whose template is only
        // declared further down is decoded once the whole message is read.
        let mut decoded = Vec::new();
        let mut deferred = Vec::new();
        for set in &sets {
            match set.kind() {
                SetKind::Template => set.for_each_template_record(|cursor| {
                    let record = TemplateRecord::decode(cursor)?;
                    catalog.insert_template(record.clone());
                    template_records.push(record);
                    Ok(())
                })?,
                SetKind::OptionsTemplate => set.for_each_template_record(|cursor| {
                    let record = OptionsTemplateRecord::decode(cursor)?;
                    catalog.insert_options_template(record.clone());
                    options_template_records.push(record);
                    Ok(())
                })?,
                SetKind::Data if catalog.contains(set.id) => {
                    decoded.push(decode_data_set(&decoder, &catalog, set)?);
                }
                SetKind::Data => {
                    deferred.push((decoded.len(), set));
                    decoded.push(Vec::new());
                }
            }
        }
        for (index, set) in deferred {
            decoded[index] = decode_data_set(&decoder, &catalog, set)?;
        }
        let flows = decoded.into_iter().flatten().collect();

        Ok(IpfixMessage {
            header,
            template_records,
            options_template_records,
            flows,
        })
    }

    /// Lists the templates a message declares and references without decoding
    /// any field values. Never fails because of a missing template.
    pub fn shallow_parse_message(&self, packet: &[u8]) -> Result<MessageDescription> {
        let result = MessageDescription::scan(&Bytes::copy_from_slice(packet));
        if let Err(error) = &result {
            emit!(IpfixParseError { error });
        }
        result
    }

    /// Decodes the data sets of a shallow description, using the template
    /// records it carries. Template records from earlier messages can be
    /// added to a catalog with [`Self::parse_template_record`] and passed to
    /// [`Self::parse_data_set`] instead.
    pub fn decode_description(&self, description: &MessageDescription) -> Result<IpfixMessage> {
        let result = self.decode_description_inner(description);
        report(&result);
        result
    }

    fn decode_description_inner(&self, description: &MessageDescription) -> Result<IpfixMessage> {
        let mut catalog = TemplateCatalog::new();
        let mut template_records = Vec::new();
        let mut options_template_records = Vec::new();

        for (_, raw) in description.template_records() {
            let record = self.parse_template_record(raw)?;
            catalog.insert_template(record.clone());
            template_records.push(record);
        }
        for (_, raw) in description.options_template_records() {
            let record = self.parse_options_template_record(raw)?;
            catalog.insert_options_template(record.clone());
            options_template_records.push(record);
        }

        let decoder = self.decoder();
        let mut flows = Vec::new();
        for ShallowDataSet {
            template_id,
            content,
            ..
        } in description.data_sets()
        {
            let fields = catalog.fields_for(*template_id).context(MissingTemplateSnafu {
                template_id: *template_id,
            })?;
            flows.extend(decoder.decode_data_set(fields, &catalog, &mut ByteCursor::new(content))?);
        }

        Ok(IpfixMessage {
            header: description.header().clone(),
            template_records,
            options_template_records,
            flows,
        })
    }

    /// Decodes one raw template record, as kept by [`MessageDescription::template_record`].
    pub fn parse_template_record(&self, raw: &[u8]) -> Result<TemplateRecord> {
        TemplateRecord::decode(&mut ByteCursor::new(raw))
    }

    /// Decodes one raw options template record.
    pub fn parse_options_template_record(&self, raw: &[u8]) -> Result<OptionsTemplateRecord> {
        OptionsTemplateRecord::decode(&mut ByteCursor::new(raw))
    }

    /// Decodes the body of a data set whose records follow `fields`. `catalog`
    /// resolves the templates of nested sub-template lists.
    pub fn parse_data_set(
        &self,
        fields: &[InformationElement],
        catalog: &TemplateCatalog,
        content: &[u8],
    ) -> Result<Vec<Flow>> {
        self.decoder()
            .decode_data_set(fields, catalog, &mut ByteCursor::new(content))
    }
}

fn decode_data_set(
    decoder: &FlowDecoder<'_>,
    catalog: &TemplateCatalog,
    set: &Set<'_>,
) -> Result<Vec<Flow>> {
    let fields = catalog
        .fields_for(set.id)
        .context(MissingTemplateSnafu { template_id: set.id })?;
    decoder.decode_data_set(fields, catalog, &mut set.cursor())
}

fn report(result: &Result<IpfixMessage>) {
    match result {
        Ok(message) => emit!(IpfixMessageDecoded {
            observation_domain_id: message.header.observation_domain_id,
            sequence_number: message.header.sequence_number,
            template_count: message.template_records.len(),
            options_template_count: message.options_template_records.len(),
            flow_count: message.flows.len(),
        }),
        Err(error) => emit!(IpfixParseError { error }),
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::{
        error::Error,
        flow::Value,
        internal_events::test_util::{clear_recorded_events, recorded_count},
    };

    fn parser() -> IpfixParser {
        IpfixParser::new(DefinitionRegistry::iana().unwrap())
    }

    fn packet(sets: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x00, 0x0a];
        bytes.extend((16 + sets.len() as u16).to_be_bytes());
        bytes.extend(1_536_874_753u32.to_be_bytes());
        bytes.extend([0, 0, 0, 1, 0, 0, 0, 0]);
        bytes.extend(sets);
        bytes
    }

    const TEMPLATE_SET: [u8; 12] = [
        0x00, 0x02, 0x00, 0x0c, // template set
        0x01, 0x00, 0x00, 0x01, // template 256, 1 field
        0x00, 0x08, 0x00, 0x04, // sourceIPv4Address
    ];

    const DATA_SET: [u8; 8] = [0x01, 0x00, 0x00, 0x08, 192, 168, 0, 1];

    fn single_flow() -> Flow {
        let mut flow = Flow::new();
        flow.insert("sourceIPv4Address", "192.168.0.1");
        flow
    }

    #[test]
    fn decodes_single_flow() {
        crate::test_util::trace_init();
        clear_recorded_events();
        let mut sets = TEMPLATE_SET.to_vec();
        sets.extend(DATA_SET);

        let message = parser().parse_message(&packet(&sets)).unwrap();

        assert_eq!(message.flows, vec![single_flow()]);
        assert_eq!(message.template_records.len(), 1);
        assert_eq!(message.header.sequence_number, 1);
        assert_eq!(recorded_count("IpfixMessageDecoded"), 1);
    }

    #[test]
    fn template_may_follow_data() {
        let mut sets = DATA_SET.to_vec();
        sets.extend(TEMPLATE_SET);

        let message = parser().parse_message(&packet(&sets)).unwrap();
        assert_eq!(message.flows, vec![single_flow()]);
    }

    #[test]
    fn missing_template_fails_full_parse_only() {
        clear_recorded_events();
        let packet = packet(&DATA_SET);
        let parser = parser();

        assert_eq!(
            parser.parse_message(&packet),
            Err(Error::MissingTemplate { template_id: 256 })
        );
        assert_eq!(recorded_count("IpfixParseError"), 1);

        let description = parser.shallow_parse_message(&packet).unwrap();
        assert_eq!(description.missing_template_ids().len(), 1);
        assert_eq!(
            parser.decode_description(&description),
            Err(Error::MissingTemplate { template_id: 256 })
        );
    }

    #[test]
    fn options_template_data() {
        let sets = [
            0x00, 0x03, 0x00, 0x12, // options template set
            0x01, 0x02, 0x00, 0x02, 0x00, 0x01, // template 258, 2 fields, 1 scope
            0x00, 0x95, 0x00, 0x04, // observationDomainId
            0x00, 0x29, 0x00, 0x02, // exportedMessageTotalCount, reduced to 2 bytes
            0x01, 0x02, 0x00, 0x0a, // data set 258
            0x00, 0x00, 0x00, 0x07, 0x01, 0x00,
        ];

        let message = parser().parse_message(&packet(&sets)).unwrap();

        assert_eq!(message.options_template_records.len(), 1);
        assert_eq!(message.options_template_records[0].scope_fields().len(), 1);
        let mut expected = Flow::new();
        expected.insert("observationDomainId", 7u64);
        expected.insert("exportedMessageTotalCount", 256u64);
        assert_eq!(message.flows, vec![expected]);
    }

    #[test]
    fn shallow_then_full() {
        let mut sets = TEMPLATE_SET.to_vec();
        sets.extend(DATA_SET);
        let packet = packet(&sets);
        let parser = parser();

        let description = parser.shallow_parse_message(&packet).unwrap();
        let replayed = parser.decode_description(&description).unwrap();

        assert_eq!(replayed, parser.parse_message(&packet).unwrap());
    }

    #[test]
    fn templates_from_an_earlier_message() {
        let parser = parser();
        let templates = parser
            .shallow_parse_message(&packet(&TEMPLATE_SET))
            .unwrap();
        let data = parser.shallow_parse_message(&packet(&DATA_SET)).unwrap();

        let mut catalog = TemplateCatalog::new();
        for (_, raw) in templates.template_records() {
            catalog.insert_template(parser.parse_template_record(raw).unwrap());
        }
        let data_set = &data.data_sets()[0];
        let fields = catalog.fields_for(data_set.template_id).unwrap();
        let flows = parser
            .parse_data_set(fields, &catalog, &data_set.content)
            .unwrap();

        assert_eq!(flows, vec![single_flow()]);
        assert_eq!(
            flows[0].get("sourceIPv4Address"),
            Some(&Value::from("192.168.0.1"))
        );
    }

    const LOW_ID_TEMPLATE_SET: [u8; 12] = [
        0x00, 0x02, 0x00, 0x0c, // template set
        0x00, 0x64, 0x00, 0x01, // template 100, 1 field
        0x00, 0x08, 0x00, 0x04, // sourceIPv4Address
    ];

    const LOW_ID_DATA_SET: [u8; 8] = [0x00, 0x64, 0x00, 0x08, 192, 168, 0, 1];

    #[test]
    fn set_ids_below_256_are_data_sets() {
        let mut sets = LOW_ID_TEMPLATE_SET.to_vec();
        sets.extend(LOW_ID_DATA_SET);
        let packet = packet(&sets);
        let parser = parser();

        let message = parser.parse_message(&packet).unwrap();
        assert_eq!(message.template_records[0].template_id, 100);
        assert_eq!(message.flows, vec![single_flow()]);

        let description = parser.shallow_parse_message(&packet).unwrap();
        assert_eq!(parser.decode_description(&description).unwrap(), message);
    }

    #[test]
    fn low_id_data_set_without_template() {
        let packet = packet(&LOW_ID_DATA_SET);
        let parser = parser();

        assert_eq!(
            parser.parse_message(&packet),
            Err(Error::MissingTemplate { template_id: 100 })
        );
        let description = parser.shallow_parse_message(&packet).unwrap();
        assert_eq!(
            description.referenced_template_ids(),
            std::collections::BTreeSet::from([100])
        );
    }

    #[test]
    fn redefined_template_applies_to_later_sets() {
        let redefinition = [
            0x00, 0x02, 0x00, 0x0c, // template set
            0x01, 0x00, 0x00, 0x01, // template 256, 1 field
            0x00, 0x07, 0x00, 0x02, // sourceTransportPort
        ];
        let mut sets = TEMPLATE_SET.to_vec();
        sets.extend(DATA_SET);
        sets.extend(redefinition);
        sets.extend([0x01, 0x00, 0x00, 0x06, 0x00, 0x35]);
        let packet = packet(&sets);
        let parser = parser();

        let message = parser.parse_message(&packet).unwrap();

        let mut port = Flow::new();
        port.insert("sourceTransportPort", 53u64);
        assert_eq!(message.flows, vec![single_flow(), port]);
        assert_eq!(message.template_records.len(), 2);

        let description = parser.shallow_parse_message(&packet).unwrap();
        let replayed = parser.decode_description(&description).unwrap();
        assert_eq!(replayed.template_records, message.template_records);
    }

    #[test]
    fn parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IpfixParser>();
    }
}
