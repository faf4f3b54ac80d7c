//! Template-driven value codec.
//!
//! [`read_value`] and [`write_value`] walk a [`TypeInfo`] descriptor and
//! the template table to decode or encode one value. Composites embed
//! their own byte length, so the write side builds each composite body in
//! a scratch buffer, measures it, then writes length followed by body.
//! That is the only way to know the length without serializing twice.
//!
//! Wire conventions that are easy to get wrong:
//!
//! - Dictionaries store all values first, then all keys; entries pair up
//!   positionally and their order is load-bearing.
//! - Collections of value-type user-defined elements pack the elements
//!   back-to-back with no per-element length prefix.
//! - Null sentinels: strings and pairs and user-defined values use a bare
//!   `-1` length; collections and dictionaries use a `-1` element count
//!   (with a length field of 4 by convention).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Result, SaveError};
use crate::model::{Colour, Vector2, Vector2I, Vector3};
use crate::type_templates::TemplateTable;
use crate::type_templates::type_info::{TypeCode, TypeInfo};

/// A decoded value: the heterogeneous tree produced by the codec.
///
/// Leaves are primitives; composites own their children. `Object` holds a
/// user-defined value's fields and properties in one ordered map, in
/// declared template order, which is the byte order on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    String(Option<String>),
    /// Enumerations are serialized as their `i32` value.
    Enum(i32),
    Vector2(Vector2),
    Vector2I(Vector2I),
    Vector3(Vector3),
    Colour(Colour),
    /// Collection of `Byte` elements, stored as one raw region.
    ByteArray(Option<Vec<u8>>),
    /// Array, List, HashSet or Queue of non-byte elements.
    Collection(Option<Vec<TypedValue>>),
    /// Entries as (key, value), in wire order.
    Dictionary(Option<Vec<(TypedValue, TypedValue)>>),
    Pair(Option<Box<(TypedValue, TypedValue)>>),
    /// User-defined object: field block then property block in one map.
    Object(Option<IndexMap<String, TypedValue>>),
}

impl TypedValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            TypedValue::Int32(v) | TypedValue::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            TypedValue::Single(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(Some(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, TypedValue>> {
        match self {
            TypedValue::Object(Some(map)) => Some(map),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[TypedValue]> {
        match self {
            TypedValue::Collection(Some(items)) => Some(items),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&[(TypedValue, TypedValue)]> {
        match self {
            TypedValue::Dictionary(Some(entries)) => Some(entries),
            _ => None,
        }
    }
}

fn element_type(type_info: &TypeInfo) -> Result<&TypeInfo> {
    type_info.sub_types.first().ok_or_else(|| {
        SaveError::corruption(format!(
            "{:?} descriptor is missing its element type",
            type_info.code
        ))
    })
}

fn key_value_types(type_info: &TypeInfo) -> Result<(&TypeInfo, &TypeInfo)> {
    match type_info.sub_types.as_slice() {
        [key, value] => Ok((key, value)),
        other => Err(SaveError::corruption(format!(
            "{:?} descriptor has {} type arguments, expected 2",
            type_info.code,
            other.len()
        ))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reading
// ────────────────────────────────────────────────────────────────────────────

/// Decode the field and property blocks of a user-defined class, in
/// declared order, into one ordered map.
pub fn read_object(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
    template_name: &str,
) -> Result<IndexMap<String, TypedValue>> {
    let template = templates.find(template_name).ok_or_else(|| {
        SaveError::corruption(format!("template \"{template_name}\" not found"))
    })?;
    let mut result = IndexMap::with_capacity(template.fields.len() + template.properties.len());
    for member in template.fields.iter().chain(&template.properties) {
        let value = read_value(reader, templates, &member.type_info)?;
        result.insert(member.name.clone(), value);
    }
    Ok(result)
}

/// Decode one value as described by `type_info`.
pub fn read_value(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
    type_info: &TypeInfo,
) -> Result<TypedValue> {
    match type_info.code {
        TypeCode::Boolean => Ok(TypedValue::Boolean(reader.read_bool()?)),
        TypeCode::SByte => Ok(TypedValue::SByte(reader.read_i8()?)),
        TypeCode::Byte => Ok(TypedValue::Byte(reader.read_u8()?)),
        TypeCode::Int16 => Ok(TypedValue::Int16(reader.read_i16()?)),
        TypeCode::UInt16 => Ok(TypedValue::UInt16(reader.read_u16()?)),
        TypeCode::Int32 => Ok(TypedValue::Int32(reader.read_i32()?)),
        TypeCode::UInt32 => Ok(TypedValue::UInt32(reader.read_u32()?)),
        TypeCode::Int64 => Ok(TypedValue::Int64(reader.read_i64()?)),
        TypeCode::UInt64 => Ok(TypedValue::UInt64(reader.read_u64()?)),
        TypeCode::Single => Ok(TypedValue::Single(reader.read_f32()?)),
        TypeCode::Double => Ok(TypedValue::Double(reader.read_f64()?)),
        TypeCode::String => Ok(TypedValue::String(reader.read_klei_string()?)),
        TypeCode::Enumeration => Ok(TypedValue::Enum(reader.read_i32()?)),
        TypeCode::Vector2 => Ok(TypedValue::Vector2(Vector2 {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
        })),
        TypeCode::Vector2I => Ok(TypedValue::Vector2I(Vector2I {
            x: reader.read_i32()?,
            y: reader.read_i32()?,
        })),
        TypeCode::Vector3 => Ok(TypedValue::Vector3(Vector3 {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
            z: reader.read_f32()?,
        })),
        TypeCode::Colour => Ok(TypedValue::Colour(Colour {
            r: reader.read_u8()? as f32 / 255.0,
            g: reader.read_u8()? as f32 / 255.0,
            b: reader.read_u8()? as f32 / 255.0,
            a: reader.read_u8()? as f32 / 255.0,
        })),
        TypeCode::Array | TypeCode::List | TypeCode::HashSet | TypeCode::Queue => {
            read_array_like(reader, templates, type_info)
        }
        TypeCode::Dictionary => read_dictionary(reader, templates, type_info),
        TypeCode::Pair => read_pair(reader, templates, type_info),
        TypeCode::UserDefined => read_user_defined(reader, templates, type_info),
    }
}

fn read_array_like(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
    type_info: &TypeInfo,
) -> Result<TypedValue> {
    let element = element_type(type_info)?;
    let data_length = reader.read_i32()?;
    let count_offset = reader.offset();
    let count = reader.read_i32()?;
    if count == -1 {
        return Ok(if element.code == TypeCode::Byte {
            TypedValue::ByteArray(None)
        } else {
            TypedValue::Collection(None)
        });
    }
    if count < 0 {
        return Err(SaveError::corruption_at(
            format!("invalid collection count {count}"),
            count_offset,
        ));
    }
    let count = count as usize;
    let start = reader.offset();

    let value = if element.code == TypeCode::Byte {
        // Byte elements: the region is the elements, one byte each.
        TypedValue::ByteArray(Some(reader.read_bytes(count)?.to_vec()))
    } else if element.is_value_type {
        // Value types pack back-to-back, sized by their template alone.
        if element.code != TypeCode::UserDefined {
            return Err(SaveError::corruption_at(
                format!("type {:?} cannot be decoded as a value type", element.code),
                start,
            ));
        }
        let name = element.template_name.as_deref().ok_or_else(|| {
            SaveError::corruption("value-type element descriptor is missing its class name")
        })?;
        let mut items = Vec::new();
        for _ in 0..count {
            items.push(TypedValue::Object(Some(read_object(
                reader, templates, name,
            )?)));
        }
        TypedValue::Collection(Some(items))
    } else {
        let mut items = Vec::new();
        for _ in 0..count {
            items.push(read_value(reader, templates, element)?);
        }
        TypedValue::Collection(Some(items))
    };

    let consumed = reader.offset() - start;
    if consumed != data_length as usize {
        // Real saves are inconsistent about this field; the region itself
        // is authoritative.
        log::debug!(
            "collection of {:?} declared {data_length} bytes but held {consumed}",
            element.code
        );
    }
    Ok(value)
}

fn read_dictionary(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
    type_info: &TypeInfo,
) -> Result<TypedValue> {
    let (key_type, value_type) = key_value_types(type_info)?;
    let data_length = reader.read_i32()?;
    let count_offset = reader.offset();
    let count = reader.read_i32()?;
    if count == -1 {
        return Ok(TypedValue::Dictionary(None));
    }
    if count < 0 {
        return Err(SaveError::corruption_at(
            format!("invalid dictionary count {count}"),
            count_offset,
        ));
    }
    let count = count as usize;
    let start = reader.offset();

    // All values first, then all keys; entries pair up by position.
    let mut values = Vec::new();
    for _ in 0..count {
        values.push(read_value(reader, templates, value_type)?);
    }
    let mut entries = Vec::with_capacity(count);
    for value in values {
        let key = read_value(reader, templates, key_type)?;
        entries.push((key, value));
    }

    let consumed = reader.offset() - start;
    if consumed != data_length as usize {
        log::debug!("dictionary declared {data_length} bytes but held {consumed}");
    }
    Ok(TypedValue::Dictionary(Some(entries)))
}

fn read_pair(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
    type_info: &TypeInfo,
) -> Result<TypedValue> {
    let (key_type, value_type) = key_value_types(type_info)?;
    let data_length = reader.read_i32()?;
    if data_length < 0 {
        return Ok(TypedValue::Pair(None));
    }
    let start = reader.offset();
    let key = read_value(reader, templates, key_type)?;
    let value = read_value(reader, templates, value_type)?;
    let consumed = reader.offset() - start;
    if consumed != data_length as usize {
        log::debug!("pair declared {data_length} bytes but held {consumed}");
    }
    Ok(TypedValue::Pair(Some(Box::new((key, value)))))
}

fn read_user_defined(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
    type_info: &TypeInfo,
) -> Result<TypedValue> {
    let name = type_info.template_name.as_deref().ok_or_else(|| {
        SaveError::corruption("user-defined descriptor is missing its class name")
    })?;
    let data_length = reader.read_i32()?;
    if data_length < 0 {
        return Ok(TypedValue::Object(None));
    }
    let start = reader.offset();
    let object = read_object(reader, templates, name)?;
    let consumed = reader.offset() - start;
    if consumed != data_length as usize {
        let (delta, direction) = if consumed > data_length as usize {
            (consumed - data_length as usize, "more")
        } else {
            (data_length as usize - consumed, "less")
        };
        return Err(SaveError::corruption_at(
            format!("template \"{name}\" decoded {delta} bytes {direction} than declared"),
            start,
        ));
    }
    Ok(TypedValue::Object(Some(object)))
}

// ────────────────────────────────────────────────────────────────────────────
// Writing
// ────────────────────────────────────────────────────────────────────────────

/// Encode the field and property blocks of a user-defined class.
///
/// Every member of the template must be present in `object`.
pub fn write_object(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    template_name: &str,
    object: &IndexMap<String, TypedValue>,
) -> Result<()> {
    let template = templates.find(template_name).ok_or_else(|| {
        SaveError::corruption(format!("template \"{template_name}\" not found"))
    })?;
    for member in template.fields.iter().chain(&template.properties) {
        let value = object.get(&member.name).ok_or_else(|| {
            SaveError::corruption(format!(
                "object of \"{template_name}\" is missing member \"{}\"",
                member.name
            ))
        })?;
        write_value(writer, templates, value, &member.type_info)?;
    }
    Ok(())
}

fn type_mismatch(type_info: &TypeInfo, value: &TypedValue) -> SaveError {
    SaveError::corruption(format!(
        "value {value:?} does not match descriptor {:?}",
        type_info.code
    ))
}

/// Encode one value as described by `type_info`.
pub fn write_value(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    value: &TypedValue,
    type_info: &TypeInfo,
) -> Result<()> {
    match (type_info.code, value) {
        (TypeCode::Boolean, TypedValue::Boolean(v)) => writer.write_bool(*v),
        (TypeCode::SByte, TypedValue::SByte(v)) => writer.write_i8(*v),
        (TypeCode::Byte, TypedValue::Byte(v)) => writer.write_u8(*v),
        (TypeCode::Int16, TypedValue::Int16(v)) => writer.write_i16(*v),
        (TypeCode::UInt16, TypedValue::UInt16(v)) => writer.write_u16(*v),
        (TypeCode::Int32, TypedValue::Int32(v)) => writer.write_i32(*v),
        (TypeCode::UInt32, TypedValue::UInt32(v)) => writer.write_u32(*v),
        (TypeCode::Int64, TypedValue::Int64(v)) => writer.write_i64(*v),
        (TypeCode::UInt64, TypedValue::UInt64(v)) => writer.write_u64(*v),
        (TypeCode::Single, TypedValue::Single(v)) => writer.write_f32(*v),
        (TypeCode::Double, TypedValue::Double(v)) => writer.write_f64(*v),
        (TypeCode::String, TypedValue::String(v)) => writer.write_klei_string(v.as_deref()),
        (TypeCode::Enumeration, TypedValue::Enum(v)) => writer.write_i32(*v),
        (TypeCode::Vector2, TypedValue::Vector2(v)) => {
            writer.write_f32(v.x);
            writer.write_f32(v.y);
        }
        (TypeCode::Vector2I, TypedValue::Vector2I(v)) => {
            writer.write_i32(v.x);
            writer.write_i32(v.y);
        }
        (TypeCode::Vector3, TypedValue::Vector3(v)) => {
            writer.write_f32(v.x);
            writer.write_f32(v.y);
            writer.write_f32(v.z);
        }
        (TypeCode::Colour, TypedValue::Colour(v)) => {
            writer.write_u8(frac_to_byte(v.r));
            writer.write_u8(frac_to_byte(v.g));
            writer.write_u8(frac_to_byte(v.b));
            writer.write_u8(frac_to_byte(v.a));
        }
        (TypeCode::Array | TypeCode::List | TypeCode::HashSet | TypeCode::Queue, _) => {
            return write_array_like(writer, templates, value, type_info);
        }
        (TypeCode::Dictionary, _) => return write_dictionary(writer, templates, value, type_info),
        (TypeCode::Pair, _) => return write_pair(writer, templates, value, type_info),
        (TypeCode::UserDefined, _) => {
            return write_user_defined(writer, templates, value, type_info);
        }
        _ => return Err(type_mismatch(type_info, value)),
    }
    Ok(())
}

/// Colour components round to the nearest byte, ties away from zero.
/// Anything that originated as `byte / 255.0` lands back on the same byte.
fn frac_to_byte(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

fn write_array_like(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    value: &TypedValue,
    type_info: &TypeInfo,
) -> Result<()> {
    let element = element_type(type_info)?;
    match value {
        TypedValue::ByteArray(None) | TypedValue::Collection(None) => {
            writer.write_i32(4);
            writer.write_i32(-1);
            Ok(())
        }
        TypedValue::ByteArray(Some(bytes)) => {
            if element.code != TypeCode::Byte {
                return Err(type_mismatch(type_info, value));
            }
            writer.write_i32(bytes.len() as i32);
            writer.write_i32(bytes.len() as i32);
            writer.write_bytes(bytes);
            Ok(())
        }
        TypedValue::Collection(Some(items)) => {
            if element.code == TypeCode::Byte {
                return Err(type_mismatch(type_info, value));
            }
            let mut scratch = BinaryWriter::new();
            if element.is_value_type {
                if element.code != TypeCode::UserDefined {
                    return Err(SaveError::corruption(format!(
                        "type {:?} cannot be encoded as a value type",
                        element.code
                    )));
                }
                let name = element.template_name.as_deref().ok_or_else(|| {
                    SaveError::corruption(
                        "value-type element descriptor is missing its class name",
                    )
                })?;
                for item in items {
                    let object = item.as_object().ok_or_else(|| {
                        SaveError::corruption(format!(
                            "value-type collection of \"{name}\" holds a non-object element"
                        ))
                    })?;
                    write_object(&mut scratch, templates, name, object)?;
                }
            } else {
                for item in items {
                    write_value(&mut scratch, templates, item, element)?;
                }
            }
            writer.write_i32(scratch.len() as i32);
            writer.write_i32(items.len() as i32);
            writer.write_bytes(scratch.as_bytes());
            Ok(())
        }
        _ => Err(type_mismatch(type_info, value)),
    }
}

fn write_dictionary(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    value: &TypedValue,
    type_info: &TypeInfo,
) -> Result<()> {
    let (key_type, value_type) = key_value_types(type_info)?;
    let entries = match value {
        TypedValue::Dictionary(None) => {
            writer.write_i32(4);
            writer.write_i32(-1);
            return Ok(());
        }
        TypedValue::Dictionary(Some(entries)) => entries,
        _ => return Err(type_mismatch(type_info, value)),
    };
    let mut scratch = BinaryWriter::new();
    for (_, entry_value) in entries {
        write_value(&mut scratch, templates, entry_value, value_type)?;
    }
    for (entry_key, _) in entries {
        write_value(&mut scratch, templates, entry_key, key_type)?;
    }
    writer.write_i32(scratch.len() as i32);
    writer.write_i32(entries.len() as i32);
    writer.write_bytes(scratch.as_bytes());
    Ok(())
}

fn write_pair(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    value: &TypedValue,
    type_info: &TypeInfo,
) -> Result<()> {
    let (key_type, value_type) = key_value_types(type_info)?;
    let pair = match value {
        TypedValue::Pair(None) => {
            writer.write_i32(-1);
            return Ok(());
        }
        TypedValue::Pair(Some(pair)) => pair,
        _ => return Err(type_mismatch(type_info, value)),
    };
    let mut scratch = BinaryWriter::new();
    write_value(&mut scratch, templates, &pair.0, key_type)?;
    write_value(&mut scratch, templates, &pair.1, value_type)?;
    writer.write_i32(scratch.len() as i32);
    writer.write_bytes(scratch.as_bytes());
    Ok(())
}

fn write_user_defined(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    value: &TypedValue,
    type_info: &TypeInfo,
) -> Result<()> {
    let name = type_info.template_name.as_deref().ok_or_else(|| {
        SaveError::corruption("user-defined descriptor is missing its class name")
    })?;
    let object = match value {
        TypedValue::Object(None) => {
            writer.write_i32(-1);
            return Ok(());
        }
        TypedValue::Object(Some(object)) => object,
        _ => return Err(type_mismatch(type_info, value)),
    };
    let mut scratch = BinaryWriter::new();
    write_object(&mut scratch, templates, name, object)?;
    writer.write_i32(scratch.len() as i32);
    writer.write_bytes(scratch.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_templates::{TypeTemplate, TypeTemplateMember};

    fn roundtrip(
        templates: &TemplateTable,
        value: &TypedValue,
        type_info: &TypeInfo,
    ) -> TypedValue {
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, templates, value, type_info).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        let decoded = read_value(&mut reader, templates, type_info).unwrap();
        assert_eq!(reader.remaining(), 0, "codec left unread bytes");
        decoded
    }

    fn no_templates() -> TemplateTable {
        TemplateTable::default()
    }

    #[test]
    fn test_primitive_roundtrips() {
        let templates = no_templates();
        let cases = [
            (TypedValue::Boolean(true), TypeInfo::simple(TypeCode::Boolean)),
            (TypedValue::SByte(-3), TypeInfo::simple(TypeCode::SByte)),
            (TypedValue::Int16(-900), TypeInfo::simple(TypeCode::Int16)),
            (TypedValue::UInt64(u64::MAX), TypeInfo::simple(TypeCode::UInt64)),
            (TypedValue::Single(293.15), TypeInfo::simple(TypeCode::Single)),
            (TypedValue::Double(-1.5e300), TypeInfo::simple(TypeCode::Double)),
            (TypedValue::Enum(7), TypeInfo::enumeration("SimHashes")),
            (
                TypedValue::String(Some("Meep".into())),
                TypeInfo::simple(TypeCode::String),
            ),
            (TypedValue::String(None), TypeInfo::simple(TypeCode::String)),
            (
                TypedValue::Vector3(Vector3::new(1.0, -2.0, 0.5)),
                TypeInfo::simple(TypeCode::Vector3),
            ),
        ];
        for (value, type_info) in cases {
            assert_eq!(roundtrip(&templates, &value, &type_info), value);
        }
    }

    #[test]
    fn test_colour_roundtrip_is_byte_stable() {
        let templates = no_templates();
        let type_info = TypeInfo::simple(TypeCode::Colour);
        for byte in [0u8, 1, 127, 128, 254, 255] {
            let component = byte as f32 / 255.0;
            let value = TypedValue::Colour(Colour {
                r: component,
                g: component,
                b: component,
                a: component,
            });
            let mut writer = BinaryWriter::new();
            write_value(&mut writer, &templates, &value, &type_info).unwrap();
            assert_eq!(writer.as_bytes(), &[byte; 4]);
        }
    }

    #[test]
    fn test_colour_write_clamps() {
        let templates = no_templates();
        let value = TypedValue::Colour(Colour {
            r: -0.5,
            g: 2.0,
            b: 0.0,
            a: 1.0,
        });
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, &templates, &value, &TypeInfo::simple(TypeCode::Colour)).unwrap();
        assert_eq!(writer.as_bytes(), &[0, 255, 0, 255]);
    }

    #[test]
    fn test_byte_array_region_is_raw() {
        let templates = no_templates();
        let type_info = TypeInfo::array(TypeInfo::simple(TypeCode::Byte));
        let value = TypedValue::ByteArray(Some(vec![1, 2, 3]));
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, &templates, &value, &type_info).unwrap();
        // data_length 3, count 3, then the raw bytes
        assert_eq!(
            writer.as_bytes(),
            &[3, 0, 0, 0, 3, 0, 0, 0, 1, 2, 3]
        );
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }

    #[test]
    fn test_null_collection_sentinel() {
        let templates = no_templates();
        let type_info = TypeInfo::container(TypeCode::List, TypeInfo::simple(TypeCode::Int32));
        let value = TypedValue::Collection(None);
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, &templates, &value, &type_info).unwrap();
        // data_length 4 by convention, count -1
        assert_eq!(writer.as_bytes(), &[4, 0, 0, 0, 255, 255, 255, 255]);
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }

    #[test]
    fn test_list_of_strings_roundtrip() {
        let templates = no_templates();
        let type_info = TypeInfo::container(TypeCode::List, TypeInfo::simple(TypeCode::String));
        let value = TypedValue::Collection(Some(vec![
            TypedValue::String(Some("alpha".into())),
            TypedValue::String(None),
            TypedValue::String(Some(String::new())),
        ]));
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }

    #[test]
    fn test_dictionary_writes_values_then_keys() {
        let templates = no_templates();
        let type_info = TypeInfo::dictionary(
            TypeInfo::simple(TypeCode::String),
            TypeInfo::simple(TypeCode::Int32),
        );
        let value = TypedValue::Dictionary(Some(vec![
            (TypedValue::String(Some("a".into())), TypedValue::Int32(100)),
            (TypedValue::String(Some("b".into())), TypedValue::Int32(200)),
        ]));
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, &templates, &value, &type_info).unwrap();
        let bytes = writer.into_bytes();

        let mut expected = BinaryWriter::new();
        expected.write_i32(18); // element region size
        expected.write_i32(2);
        expected.write_i32(100);
        expected.write_i32(200);
        expected.write_klei_string(Some("a"));
        expected.write_klei_string(Some("b"));
        assert_eq!(bytes, expected.into_bytes());

        let mut reader = BinaryReader::new(&bytes);
        let decoded = read_value(&mut reader, &templates, &type_info).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_pair_null_is_bare_minus_one() {
        let templates = no_templates();
        let type_info = TypeInfo::pair(
            TypeInfo::simple(TypeCode::Int32),
            TypeInfo::simple(TypeCode::String),
        );
        let value = TypedValue::Pair(None);
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, &templates, &value, &type_info).unwrap();
        assert_eq!(writer.as_bytes(), (-1i32).to_le_bytes());
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }

    #[test]
    fn test_pair_roundtrip() {
        let templates = no_templates();
        let type_info = TypeInfo::pair(
            TypeInfo::simple(TypeCode::Int32),
            TypeInfo::simple(TypeCode::String),
        );
        let value = TypedValue::Pair(Some(Box::new((
            TypedValue::Int32(42),
            TypedValue::String(Some("answer".into())),
        ))));
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }

    fn point_templates() -> TemplateTable {
        TemplateTable::new(vec![TypeTemplate {
            name: "Point".into(),
            fields: vec![
                TypeTemplateMember::new("x", TypeInfo::simple(TypeCode::Int32)),
                TypeTemplateMember::new("y", TypeInfo::simple(TypeCode::Int32)),
            ],
            properties: vec![],
        }])
    }

    fn point(x: i32, y: i32) -> TypedValue {
        let mut map = IndexMap::new();
        map.insert("x".to_string(), TypedValue::Int32(x));
        map.insert("y".to_string(), TypedValue::Int32(y));
        TypedValue::Object(Some(map))
    }

    #[test]
    fn test_user_defined_roundtrip_and_length() {
        let templates = point_templates();
        let type_info = TypeInfo::user_defined("Point");
        let value = point(3, -4);
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, &templates, &value, &type_info).unwrap();
        // 8 bytes of body behind the length prefix
        assert_eq!(writer.as_bytes()[..4], 8i32.to_le_bytes());
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }

    #[test]
    fn test_user_defined_null_is_bare_minus_one() {
        let templates = point_templates();
        let type_info = TypeInfo::user_defined("Point");
        let value = TypedValue::Object(None);
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, &templates, &value, &type_info).unwrap();
        assert_eq!(writer.as_bytes(), (-1i32).to_le_bytes());
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }

    #[test]
    fn test_user_defined_length_mismatch_is_corruption() {
        let templates = point_templates();
        let mut writer = BinaryWriter::new();
        writer.write_i32(9); // declared one byte beyond the real body
        writer.write_i32(3);
        writer.write_i32(-4);
        writer.write_u8(0);
        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        let result = read_value(&mut reader, &templates, &TypeInfo::user_defined("Point"));
        assert!(matches!(result, Err(SaveError::Corruption { .. })));
    }

    #[test]
    fn test_value_type_elements_pack_bare() {
        let templates = point_templates();
        let type_info = TypeInfo::container(
            TypeCode::List,
            TypeInfo::user_defined("Point").value_type(),
        );
        let value = TypedValue::Collection(Some(vec![point(1, 2), point(3, 4)]));
        let mut writer = BinaryWriter::new();
        write_value(&mut writer, &templates, &value, &type_info).unwrap();
        // two bare 8-byte bodies, no per-element prefixes
        assert_eq!(writer.as_bytes()[..4], 16i32.to_le_bytes());
        assert_eq!(writer.len(), 4 + 4 + 16);
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }

    #[test]
    fn test_value_type_primitive_element_is_corruption() {
        let templates = no_templates();
        let type_info = TypeInfo::container(
            TypeCode::List,
            TypeInfo::simple(TypeCode::Int32).value_type(),
        );
        let mut writer = BinaryWriter::new();
        writer.write_i32(4);
        writer.write_i32(1);
        writer.write_i32(7);
        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        assert!(read_value(&mut reader, &templates, &type_info).is_err());
    }

    #[test]
    fn test_missing_template_is_corruption() {
        let templates = no_templates();
        let mut writer = BinaryWriter::new();
        writer.write_i32(0);
        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        let result = read_value(&mut reader, &templates, &TypeInfo::user_defined("Ghost"));
        assert!(matches!(result, Err(SaveError::Corruption { .. })));
    }

    #[test]
    fn test_nested_generics_roundtrip() {
        let templates = point_templates();
        // Dictionary<i32, List<Point>>
        let type_info = TypeInfo::dictionary(
            TypeInfo::simple(TypeCode::Int32),
            TypeInfo::container(TypeCode::List, TypeInfo::user_defined("Point")),
        );
        let value = TypedValue::Dictionary(Some(vec![
            (
                TypedValue::Int32(1),
                TypedValue::Collection(Some(vec![point(0, 0), point(5, 5)])),
            ),
            (TypedValue::Int32(2), TypedValue::Collection(None)),
        ]));
        assert_eq!(roundtrip(&templates, &value, &type_info), value);
    }
}
