// Shared by every integration test, each of which only needs some of the helpers.
#![allow(dead_code)]

pub const EXPORT_TIME_SECS: u32 = 1_536_874_753;

const ENTERPRISE_BIT: u16 = 0x8000;

pub fn trace_init() {
    let filter = std::env::var("TEST_LOG").unwrap_or_else(|_| "error".to_owned());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A field specifier: element id, length and private enterprise number (0 for IANA).
#[derive(Clone, Copy, Debug)]
pub struct Field(pub u16, pub u16, pub u32);

impl Field {
    pub const fn iana(id: u16, length: u16) -> Self {
        Self(id, length, 0)
    }

    fn write(&self, buf: &mut Vec<u8>) {
        let Self(id, length, enterprise_number) = *self;
        if enterprise_number == 0 {
            buf.extend(id.to_be_bytes());
            buf.extend(length.to_be_bytes());
        } else {
            buf.extend((id | ENTERPRISE_BIT).to_be_bytes());
            buf.extend(length.to_be_bytes());
            buf.extend(enterprise_number.to_be_bytes());
        }
    }
}

/// Builds IPFIX messages set by set.
#[derive(Clone, Debug)]
pub struct MessageBuilder {
    export_time_secs: u32,
    sequence_number: u32,
    observation_domain_id: u32,
    sets: Vec<u8>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self {
            export_time_secs: EXPORT_TIME_SECS,
            sequence_number: 0,
            observation_domain_id: 0,
            sets: Vec::new(),
        }
    }
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence_number(mut self, sequence_number: u32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn observation_domain_id(mut self, observation_domain_id: u32) -> Self {
        self.observation_domain_id = observation_domain_id;
        self
    }

    pub fn template(self, template_id: u16, fields: &[Field]) -> Self {
        let mut record = Vec::new();
        record.extend(template_id.to_be_bytes());
        record.extend((fields.len() as u16).to_be_bytes());
        fields.iter().for_each(|field| field.write(&mut record));
        self.set(2, &record)
    }

    pub fn options_template(self, template_id: u16, scope: &[Field], options: &[Field]) -> Self {
        let mut record = Vec::new();
        record.extend(template_id.to_be_bytes());
        record.extend(((scope.len() + options.len()) as u16).to_be_bytes());
        record.extend((scope.len() as u16).to_be_bytes());
        scope
            .iter()
            .chain(options)
            .for_each(|field| field.write(&mut record));
        self.set(3, &record)
    }

    pub fn data(self, template_id: u16, content: &[u8]) -> Self {
        self.set(template_id, content)
    }

    pub fn set(mut self, set_id: u16, content: &[u8]) -> Self {
        self.sets.extend(set_id.to_be_bytes());
        self.sets.extend((content.len() as u16 + 4).to_be_bytes());
        self.sets.extend(content);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut message = Vec::with_capacity(16 + self.sets.len());
        message.extend(10u16.to_be_bytes());
        message.extend((16 + self.sets.len() as u16).to_be_bytes());
        message.extend(self.export_time_secs.to_be_bytes());
        message.extend(self.sequence_number.to_be_bytes());
        message.extend(self.observation_domain_id.to_be_bytes());
        message.extend(self.sets);
        message
    }
}
