use serde::{Deserialize, Serialize};

use crate::{
    decoder::DEFAULT_MAX_NESTING_DEPTH,
    definitions::{DefinitionRegistry, DefinitionSource},
    error::DefinitionError,
    parser::IpfixParser,
};

const fn default_include_iana_definitions() -> bool {
    true
}

const fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_NESTING_DEPTH
}

/// Configuration for building an [`IpfixParser`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IpfixParserConfig {
    /// Whether to load the IANA standard information elements bundled with this crate.
    #[serde(default = "default_include_iana_definitions")]
    pub include_iana_definitions: bool,

    /// Additional information element definitions, usually one per vendor.
    ///
    /// Definitions for an enterprise number that is already known are merged,
    /// replacing earlier definitions of the same element id.
    #[serde(default)]
    pub definitions: Vec<DefinitionSource>,

    /// How deep sub-template lists may nest inside each other.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for IpfixParserConfig {
    fn default() -> Self {
        Self {
            include_iana_definitions: default_include_iana_definitions(),
            definitions: Vec::new(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl IpfixParserConfig {
    pub fn build_registry(&self) -> Result<DefinitionRegistry, DefinitionError> {
        let mut builder = DefinitionRegistry::builder();
        if self.include_iana_definitions {
            builder = builder.with_iana()?;
        }
        for source in &self.definitions {
            builder = builder.add_source(source)?;
        }
        Ok(builder.build())
    }

    pub fn build(&self) -> Result<IpfixParser, DefinitionError> {
        Ok(IpfixParser::new(self.build_registry()?).with_max_nesting_depth(self.max_nesting_depth))
    }
}
