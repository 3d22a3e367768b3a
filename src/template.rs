//! Template records and the field descriptors they are made of.

use std::collections::HashMap;

use snafu::ensure;

use crate::{
    cursor::ByteCursor,
    error::{InvalidOptionsTemplateSnafu, Result},
};

/// Field length announcing a variable-length encoded value, RFC 7011 section 7.
pub const VARIABLE_LENGTH: u16 = 65535;

const ENTERPRISE_BIT: u16 = 0x8000;

/// A field specifier inside a template record: layout only, no value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InformationElement {
    pub id: u16,
    pub length: u16,
    /// 0 for IANA-assigned elements.
    pub enterprise_number: u32,
}

impl InformationElement {
    pub const fn new(id: u16, length: u16, enterprise_number: u32) -> Self {
        Self {
            id,
            length,
            enterprise_number,
        }
    }

    /// Reads a 4 byte field specifier, or 8 bytes if the enterprise bit is set.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let id_and_enterprise_bit = cursor.read_u16()?;
        let length = cursor.read_u16()?;

        let (id, enterprise_number) = if id_and_enterprise_bit & ENTERPRISE_BIT != 0 {
            (id_and_enterprise_bit & !ENTERPRISE_BIT, cursor.read_u32()?)
        } else {
            (id_and_enterprise_bit, 0)
        };

        Ok(Self::new(id, length, enterprise_number))
    }

    pub const fn is_variable_length(&self) -> bool {
        self.length == VARIABLE_LENGTH
    }

    /// The fewest bytes a value of this field can occupy in a data record.
    pub const fn min_wire_length(&self) -> usize {
        if self.is_variable_length() {
            1
        } else {
            self.length as usize
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TemplateRecord {
    pub template_id: u16,
    pub information_elements: Vec<InformationElement>,
}

impl TemplateRecord {
    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let template_id = cursor.read_u16()?;
        let field_count = cursor.read_u16()?;

        let information_elements = (0..field_count)
            .map(|_| InformationElement::decode(cursor))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            template_id,
            information_elements,
        })
    }
}

/// An options template record. Scope fields always come first on the wire,
/// so both kinds are kept in one vector split at `scope_field_count`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OptionsTemplateRecord {
    pub template_id: u16,
    fields: Vec<InformationElement>,
    scope_field_count: usize,
}

impl OptionsTemplateRecord {
    pub fn new(
        template_id: u16,
        scope_fields: Vec<InformationElement>,
        option_fields: Vec<InformationElement>,
    ) -> Result<Self> {
        let field_count =
            u16::try_from(scope_fields.len() + option_fields.len()).unwrap_or(u16::MAX);
        let scope_field_count = scope_fields.len();
        ensure!(
            scope_field_count > 0,
            InvalidOptionsTemplateSnafu {
                template_id,
                field_count,
                scope_field_count: 0u16,
            }
        );

        let mut fields = scope_fields;
        fields.extend(option_fields);
        Ok(Self {
            template_id,
            fields,
            scope_field_count,
        })
    }

    pub fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let template_id = cursor.read_u16()?;
        let field_count = cursor.read_u16()?;
        let scope_field_count = cursor.read_u16()?;
        ensure!(
            scope_field_count > 0 && scope_field_count <= field_count,
            InvalidOptionsTemplateSnafu {
                template_id,
                field_count,
                scope_field_count,
            }
        );

        let fields = (0..field_count)
            .map(|_| InformationElement::decode(cursor))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            template_id,
            fields,
            scope_field_count: usize::from(scope_field_count),
        })
    }

    pub fn scope_fields(&self) -> &[InformationElement] {
        &self.fields[..self.scope_field_count]
    }

    pub fn option_fields(&self) -> &[InformationElement] {
        &self.fields[self.scope_field_count..]
    }

    /// Scope fields followed by option fields, the layout of the matching data records.
    pub fn fields(&self) -> &[InformationElement] {
        &self.fields
    }
}

/// Templates known while decoding a single message (or a single replayed
/// journal entry). Data sets and sub-template lists resolve their field
/// layout through it.
#[derive(Clone, Debug, Default)]
pub struct TemplateCatalog {
    templates: HashMap<u16, TemplateRecord>,
    options_templates: HashMap<u16, OptionsTemplateRecord>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_template(&mut self, record: TemplateRecord) {
        self.templates.insert(record.template_id, record);
    }

    pub fn insert_options_template(&mut self, record: OptionsTemplateRecord) {
        self.options_templates.insert(record.template_id, record);
    }

    pub fn template(&self, template_id: u16) -> Option<&TemplateRecord> {
        self.templates.get(&template_id)
    }

    pub fn options_template(&self, template_id: u16) -> Option<&OptionsTemplateRecord> {
        self.options_templates.get(&template_id)
    }

    /// Field layout of data records using `template_id`, looking at
    /// templates first and options templates second.
    pub fn fields_for(&self, template_id: u16) -> Option<&[InformationElement]> {
        self.template(template_id)
            .map(|record| record.information_elements.as_slice())
            .or_else(|| self.options_template(template_id).map(OptionsTemplateRecord::fields))
    }

    pub fn contains(&self, template_id: u16) -> bool {
        self.fields_for(template_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.options_templates.is_empty()
    }
}
