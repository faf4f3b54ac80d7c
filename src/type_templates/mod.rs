//! Class templates: the save's self-description of every serialized type.
//!
//! A save carries a table of [`TypeTemplate`]s, one per .NET class the game
//! serialized. Each template lists fields and then properties, in the exact
//! order their bytes appear in the stream; that order is load-bearing for
//! both directions. Sub-modules:
//!
//! - [`type_info`] – the type-descriptor byte language
//! - [`values`] – reading/writing actual values driven by descriptors

pub mod type_info;
pub mod values;

use serde::{Deserialize, Serialize};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Result, SaveError};
use crate::ident::validate_identifier;
use self::type_info::{TypeInfo, parse_type_info, write_type_info};

/// One field or property of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTemplateMember {
    pub name: String,
    pub type_info: TypeInfo,
}

impl TypeTemplateMember {
    pub fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        TypeTemplateMember {
            name: name.into(),
            type_info,
        }
    }
}

/// Serialization layout of one .NET class: ordered fields, then ordered
/// properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTemplate {
    pub name: String,
    pub fields: Vec<TypeTemplateMember>,
    pub properties: Vec<TypeTemplateMember>,
}

/// The save-scoped template table, looked up by class name.
///
/// The table is passed by reference through the value codec rather than
/// living in any global state, so parses stay re-entrant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateTable {
    pub templates: Vec<TypeTemplate>,
}

impl TemplateTable {
    pub fn new(templates: Vec<TypeTemplate>) -> Self {
        TemplateTable { templates }
    }

    /// Find a template by class name. Names are unique within a save.
    pub fn find(&self, name: &str) -> Option<&TypeTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeTemplate> {
        self.templates.iter()
    }

    /// Parse the count-prefixed table.
    pub fn parse(reader: &mut BinaryReader) -> Result<Self> {
        let offset = reader.offset();
        let count = reader.read_i32()?;
        if count < 0 {
            return Err(SaveError::corruption_at(
                format!("invalid template count {count}"),
                offset,
            ));
        }
        let mut templates = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            templates.push(parse_template(reader)?);
        }
        Ok(TemplateTable { templates })
    }

    /// Write the table in its original order.
    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_i32(self.templates.len() as i32);
        for template in &self.templates {
            write_template(writer, template)?;
        }
        Ok(())
    }
}

fn parse_template(reader: &mut BinaryReader) -> Result<TypeTemplate> {
    let name = validate_identifier(reader.read_klei_string()?)?;

    let offset = reader.offset();
    let field_count = reader.read_i32()?;
    let property_count = reader.read_i32()?;
    if field_count < 0 || property_count < 0 {
        return Err(SaveError::corruption_at(
            format!(
                "template \"{name}\" has invalid member counts ({field_count} fields, \
                 {property_count} properties)"
            ),
            offset,
        ));
    }

    let mut fields = Vec::with_capacity(field_count.min(1024) as usize);
    for _ in 0..field_count {
        let field_name = validate_identifier(reader.read_klei_string()?)?;
        let type_info = parse_type_info(reader)?;
        fields.push(TypeTemplateMember::new(field_name, type_info));
    }

    let mut properties = Vec::with_capacity(property_count.min(1024) as usize);
    for _ in 0..property_count {
        let property_name = validate_identifier(reader.read_klei_string()?)?;
        let type_info = parse_type_info(reader)?;
        properties.push(TypeTemplateMember::new(property_name, type_info));
    }

    Ok(TypeTemplate {
        name,
        fields,
        properties,
    })
}

fn write_template(writer: &mut BinaryWriter, template: &TypeTemplate) -> Result<()> {
    writer.write_klei_string(Some(&template.name));
    writer.write_i32(template.fields.len() as i32);
    writer.write_i32(template.properties.len() as i32);
    for member in template.fields.iter().chain(&template.properties) {
        writer.write_klei_string(Some(&member.name));
        write_type_info(writer, &member.type_info)?;
    }
    Ok(())
}
