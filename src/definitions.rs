//! Information element definitions: which wire data type and field name a
//! given (enterprise number, element id) pair maps to.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};

use crate::error::{
    DefinitionError, JsonSnafu, MissingDefinitionSnafu, Result, UnknownDataTypeSnafu,
};

/// Enterprise number of the IANA-assigned information elements.
pub const IANA_ENTERPRISE_NUMBER: u32 = 0;

const IANA_DEFINITIONS: &str = include_str!("../resources/ipfix-iana-elements.json");

/// Abstract data types of RFC 7011 section 6.1 and RFC 6313.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Unsigned8,
    Unsigned16,
    Unsigned32,
    Unsigned64,
    Signed8,
    Signed16,
    Signed32,
    Signed64,
    Float32,
    Float64,
    MacAddress,
    Ipv4Address,
    Ipv6Address,
    Boolean,
    String,
    OctetArray,
    DateTimeSeconds,
    DateTimeMilliseconds,
    DateTimeMicroseconds,
    DateTimeNanoseconds,
    BasicList,
    SubTemplateList,
    SubTemplateMultiList,
}

impl DataType {
    /// Upper-cased name, as used in definition files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unsigned8 => "UNSIGNED8",
            Self::Unsigned16 => "UNSIGNED16",
            Self::Unsigned32 => "UNSIGNED32",
            Self::Unsigned64 => "UNSIGNED64",
            Self::Signed8 => "SIGNED8",
            Self::Signed16 => "SIGNED16",
            Self::Signed32 => "SIGNED32",
            Self::Signed64 => "SIGNED64",
            Self::Float32 => "FLOAT32",
            Self::Float64 => "FLOAT64",
            Self::MacAddress => "MACADDRESS",
            Self::Ipv4Address => "IPV4ADDRESS",
            Self::Ipv6Address => "IPV6ADDRESS",
            Self::Boolean => "BOOLEAN",
            Self::String => "STRING",
            Self::OctetArray => "OCTETARRAY",
            Self::DateTimeSeconds => "DATETIMESECONDS",
            Self::DateTimeMilliseconds => "DATETIMEMILLISECONDS",
            Self::DateTimeMicroseconds => "DATETIMEMICROSECONDS",
            Self::DateTimeNanoseconds => "DATETIMENANOSECONDS",
            Self::BasicList => "BASICLIST",
            Self::SubTemplateList => "SUBTEMPLATELIST",
            Self::SubTemplateMultiList => "SUBTEMPLATEMULTILIST",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a data type name case-insensitively.
impl FromStr for DataType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "UNSIGNED8" => Self::Unsigned8,
            "UNSIGNED16" => Self::Unsigned16,
            "UNSIGNED32" => Self::Unsigned32,
            "UNSIGNED64" => Self::Unsigned64,
            "SIGNED8" => Self::Signed8,
            "SIGNED16" => Self::Signed16,
            "SIGNED32" => Self::Signed32,
            "SIGNED64" => Self::Signed64,
            "FLOAT32" => Self::Float32,
            "FLOAT64" => Self::Float64,
            "MACADDRESS" => Self::MacAddress,
            "IPV4ADDRESS" => Self::Ipv4Address,
            "IPV6ADDRESS" => Self::Ipv6Address,
            "BOOLEAN" => Self::Boolean,
            "STRING" => Self::String,
            "OCTETARRAY" => Self::OctetArray,
            "DATETIMESECONDS" => Self::DateTimeSeconds,
            "DATETIMEMILLISECONDS" => Self::DateTimeMilliseconds,
            "DATETIMEMICROSECONDS" => Self::DateTimeMicroseconds,
            "DATETIMENANOSECONDS" => Self::DateTimeNanoseconds,
            "BASICLIST" => Self::BasicList,
            "SUBTEMPLATELIST" => Self::SubTemplateList,
            "SUBTEMPLATEMULTILIST" => Self::SubTemplateMultiList,
            _ => return Err(()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InformationElementDefinition {
    pub data_type: DataType,
    pub field_name: String,
    pub id: u16,
}

/// One definition document, as found in the JSON definition files.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DefinitionSource {
    pub enterprise_number: u32,
    #[serde(default)]
    pub information_elements: Vec<ElementSource>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ElementSource {
    pub element_id: u16,
    pub data_type: String,
    pub name: String,
}

impl DefinitionSource {
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(json).context(JsonSnafu)
    }
}

/// Read-only lookup table of information element definitions, keyed by
/// private enterprise number and element id.
///
/// Built once through [`DefinitionRegistryBuilder`] and never mutated
/// afterwards, so it can be shared freely between threads.
#[derive(Clone, Debug, Default)]
pub struct DefinitionRegistry {
    enterprises: HashMap<u32, HashMap<u16, InformationElementDefinition>>,
}

impl DefinitionRegistry {
    pub fn builder() -> DefinitionRegistryBuilder {
        DefinitionRegistryBuilder::default()
    }

    /// A registry without any definitions. Lookups always fail.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The IANA standard information elements bundled with this crate.
    pub fn iana() -> Result<Self, DefinitionError> {
        Ok(Self::builder().with_iana()?.build())
    }

    /// Looks up the definition of an element.
    ///
    /// An enterprise number without any definitions is an error, since it
    /// means a vendor definition source is missing from the configuration.
    /// An unknown element id within a known enterprise yields `Ok(None)` and
    /// the caller decides how to treat the unsupported field.
    pub fn lookup(
        &self,
        element_id: u16,
        enterprise_number: u32,
    ) -> Result<Option<&InformationElementDefinition>> {
        let elements = self
            .enterprises
            .get(&enterprise_number)
            .context(MissingDefinitionSnafu {
                enterprise_number,
                element_id,
            })?;
        Ok(elements.get(&element_id))
    }

    pub fn contains_enterprise(&self, enterprise_number: u32) -> bool {
        self.enterprises.contains_key(&enterprise_number)
    }

    pub fn enterprise_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.enterprises.keys().copied()
    }

    /// Total number of element definitions across all enterprises.
    pub fn len(&self) -> usize {
        self.enterprises.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct DefinitionRegistryBuilder {
    enterprises: HashMap<u32, HashMap<u16, InformationElementDefinition>>,
}

impl DefinitionRegistryBuilder {
    pub fn with_iana(self) -> Result<Self, DefinitionError> {
        self.add_json(IANA_DEFINITIONS)
    }

    pub fn add_json(self, json: &str) -> Result<Self, DefinitionError> {
        let source = DefinitionSource::from_json(json)?;
        self.add_source(&source)
    }

    /// Adds all elements of `source`. Elements of an enterprise that is already
    /// known are merged in, replacing earlier definitions with the same id.
    pub fn add_source(mut self, source: &DefinitionSource) -> Result<Self, DefinitionError> {
        let enterprise_number = source.enterprise_number;
        let elements = self.enterprises.entry(enterprise_number).or_default();

        for element in &source.information_elements {
            let data_type = element
                .data_type
                .parse::<DataType>()
                .ok()
                .context(UnknownDataTypeSnafu {
                    data_type: element.data_type.clone(),
                    element_id: element.element_id,
                    enterprise_number,
                })?;

            elements.insert(
                element.element_id,
                InformationElementDefinition {
                    data_type,
                    field_name: element.name.clone(),
                    id: element.element_id,
                },
            );
        }
        Ok(self)
    }

    pub fn build(self) -> DefinitionRegistry {
        DefinitionRegistry {
            enterprises: self.enterprises,
        }
    }
}
