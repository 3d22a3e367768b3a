//! Decoder for IPFIX messages, RFC 7011.
//!
//! An [`IpfixParser`] turns the bytes of one IPFIX message into its template
//! records and decoded [`Flow`]s:
//!
//! ```
//! use ipfix_parser::{DefinitionRegistry, IpfixParser};
//!
//! let parser = IpfixParser::new(DefinitionRegistry::iana().unwrap());
//! let packet = [
//!     0x00, 0x0a, 0x00, 0x24, 0x5b, 0x9a, 0xd9, 0x01, // version, length, export time
//!     0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // sequence number, domain
//!     0x00, 0x02, 0x00, 0x0c, 0x01, 0x00, 0x00, 0x01, // template 256
//!     0x00, 0x08, 0x00, 0x04, //                         sourceIPv4Address
//!     0x01, 0x00, 0x00, 0x08, 0xc0, 0xa8, 0x00, 0x01, // data set 256
//! ];
//!
//! let message = parser.parse_message(&packet).unwrap();
//! assert_eq!(
//!     message.flows[0].get("sourceIPv4Address").unwrap().to_string(),
//!     "192.168.0.1"
//! );
//! ```
//!
//! Templates frequently arrive in a different message than the data sets
//! referencing them. [`IpfixParser::shallow_parse_message`] lists what a
//! message declares and needs without decoding values, so a collector can
//! keep raw template records around and decode data later through
//! [`IpfixParser::decode_description`] or [`IpfixParser::parse_data_set`].

#[macro_use]
mod internal_events;

pub mod config;
pub mod cursor;
pub mod decoder;
pub mod definitions;
pub mod error;
pub mod flow;
pub mod header;
pub mod parser;
mod set;
pub mod shallow;
pub mod template;
#[cfg(test)]
mod test_util;

pub use config::IpfixParserConfig;
pub use decoder::FlowDecoder;
pub use definitions::{
    DataType, DefinitionRegistry, DefinitionRegistryBuilder, DefinitionSource, ElementSource,
    InformationElementDefinition,
};
pub use error::{DefinitionError, Error, ErrorKind, Result};
pub use flow::{Flow, Value};
pub use header::MessageHeader;
pub use parser::{IpfixMessage, IpfixParser};
pub use set::{MIN_DATA_SET_ID, OPTIONS_TEMPLATE_SET_ID, TEMPLATE_SET_ID};
pub use shallow::{MessageDescription, ShallowDataSet};
pub use template::{InformationElement, OptionsTemplateRecord, TemplateCatalog, TemplateRecord};
