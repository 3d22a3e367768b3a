use snafu::Snafu;

use crate::definitions::DataType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that abort decoding of an IPFIX message.
///
/// Conditions the decoder can recover from (unsupported list types, unknown
/// element ids within a known enterprise) are never reported here; they are
/// logged through internal events and the affected field is left out of the flow.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid IPFIX message version {version}, expected 10"))]
    InvalidVersion { version: u16 },

    #[snafu(display(
        "IPFIX message length mismatch: header declares {declared} bytes, buffer holds {actual}"
    ))]
    IncompleteMessage { declared: u16, actual: usize },

    #[snafu(display("Invalid length {length} for set {set_id}"))]
    InvalidSetLength { set_id: u16, length: u16 },

    #[snafu(display("Invalid set id in IPFIX message: {set_id}"))]
    ReservedSetId { set_id: u16 },

    #[snafu(display(
        "Unexpected end of buffer at offset {position}: needed {needed} bytes, {remaining} remaining"
    ))]
    BufferUnderrun {
        needed: usize,
        remaining: usize,
        position: usize,
    },

    #[snafu(display("Unexpected length {length} for {data_type} field {field:?}"))]
    InvalidFieldLength {
        field: String,
        data_type: DataType,
        length: u16,
    },

    #[snafu(display("Invalid value for boolean field {field:?}: {value}"))]
    InvalidBoolean { field: String, value: u8 },

    #[snafu(display("Timestamp of field {field:?} is out of range"))]
    InvalidTimestamp { field: String },

    #[snafu(display(
        "Options template {template_id} declares {scope_field_count} scope fields out of {field_count}"
    ))]
    InvalidOptionsTemplate {
        template_id: u16,
        field_count: u16,
        scope_field_count: u16,
    },

    #[snafu(display(
        "No information element definitions for private enterprise number {enterprise_number} (element id {element_id})"
    ))]
    MissingDefinition {
        enterprise_number: u32,
        element_id: u16,
    },

    #[snafu(display(
        "Missing template for data set using template id {template_id}. Cannot parse data set."
    ))]
    MissingTemplate { template_id: u16 },

    #[snafu(display("Sub-template lists nested deeper than {max_depth} levels"))]
    NestingTooDeep { max_depth: usize },
}

/// Coarse classification of [`Error`], used for logging and metrics tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The packet does not follow RFC 7011.
    ProtocolViolation,
    /// An enterprise number has no configured definitions.
    MissingDefinition,
    /// A data set references a template that is not part of the packet.
    MissingTemplate,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProtocolViolation => "protocol_violation",
            Self::MissingDefinition => "missing_definition",
            Self::MissingTemplate => "missing_template",
        }
    }
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingDefinition { .. } => ErrorKind::MissingDefinition,
            Self::MissingTemplate { .. } => ErrorKind::MissingTemplate,
            Self::InvalidVersion { .. }
            | Self::IncompleteMessage { .. }
            | Self::InvalidSetLength { .. }
            | Self::ReservedSetId { .. }
            | Self::BufferUnderrun { .. }
            | Self::InvalidFieldLength { .. }
            | Self::InvalidBoolean { .. }
            | Self::InvalidTimestamp { .. }
            | Self::InvalidOptionsTemplate { .. }
            | Self::NestingTooDeep { .. } => ErrorKind::ProtocolViolation,
        }
    }
}

/// Errors raised while building a [`DefinitionRegistry`](crate::DefinitionRegistry).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DefinitionError {
    #[snafu(display("Could not parse information element definitions: {source}"))]
    Json { source: serde_json::Error },

    #[snafu(display(
        "Unknown data type {data_type:?} for element {element_id} of enterprise {enterprise_number}"
    ))]
    UnknownDataType {
        data_type: String,
        element_id: u16,
        enterprise_number: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Error::InvalidVersion { version: 9 }.kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            Error::MissingTemplate { template_id: 256 }.kind(),
            ErrorKind::MissingTemplate
        );
        assert_eq!(
            Error::MissingDefinition {
                enterprise_number: 3054,
                element_id: 110
            }
            .kind(),
            ErrorKind::MissingDefinition
        );
    }

    #[test]
    fn invalid_version_mentions_version() {
        let message = Error::InvalidVersion { version: 9 }.to_string();
        assert!(message.contains('9'), "{message}");
    }
}
