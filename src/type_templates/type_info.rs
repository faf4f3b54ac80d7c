//! The type-descriptor language embedded in template tables.
//!
//! Every serialized value is described by a [`TypeInfo`]: a tag byte whose
//! low 6 bits are the [`TypeCode`], plus a value-type flag (0x40) and a
//! generic flag (0x80). User-defined and enumeration descriptors carry a
//! class name; generic descriptors carry a byte-counted list of child
//! descriptors and arrays carry exactly one.

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Result, SaveError};
use crate::ident::validate_identifier;

/// Mask of the type-code bits in a descriptor tag byte.
pub const VALUE_MASK: u8 = 0x3F;
/// Tag-byte flag: elements of this type serialize without per-element
/// length prefixes inside collections.
pub const IS_VALUE_TYPE: u8 = 0x40;
/// Tag-byte flag: the descriptor is followed by a child-descriptor list.
pub const IS_GENERIC_TYPE: u8 = 0x80;

/// Wire type codes, in the lower 6 bits of the descriptor tag byte.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive,
)]
#[repr(u8)]
pub enum TypeCode {
    UserDefined = 0,
    SByte = 1,
    Byte = 2,
    Boolean = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Single = 10,
    Double = 11,
    String = 12,
    Enumeration = 13,
    Vector2I = 14,
    Vector2 = 15,
    Vector3 = 16,
    Array = 17,
    Pair = 18,
    Dictionary = 19,
    List = 20,
    HashSet = 21,
    Queue = 22,
    Colour = 23,
}

impl TypeCode {
    /// Whether the generic flag is legal on this code.
    pub fn is_generic_capable(self) -> bool {
        matches!(
            self,
            TypeCode::Pair
                | TypeCode::Dictionary
                | TypeCode::List
                | TypeCode::HashSet
                | TypeCode::UserDefined
                | TypeCode::Queue
        )
    }
}

/// A decoded type descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub code: TypeCode,
    pub is_value_type: bool,
    pub is_generic: bool,
    /// Class name, present for `UserDefined` and `Enumeration`.
    pub template_name: Option<String>,
    /// Child descriptors: one element type for arrays/lists/sets/queues,
    /// key and value for pairs/dictionaries, type arguments for generic
    /// user-defined classes. Empty otherwise.
    pub sub_types: Vec<TypeInfo>,
}

impl TypeInfo {
    /// A plain, non-generic descriptor with no name or children.
    pub fn simple(code: TypeCode) -> Self {
        TypeInfo {
            code,
            is_value_type: false,
            is_generic: false,
            template_name: None,
            sub_types: Vec::new(),
        }
    }

    /// A non-generic user-defined class descriptor.
    pub fn user_defined(name: impl Into<String>) -> Self {
        TypeInfo {
            template_name: Some(name.into()),
            ..TypeInfo::simple(TypeCode::UserDefined)
        }
    }

    /// An enumeration descriptor (serialized as `i32`).
    pub fn enumeration(name: impl Into<String>) -> Self {
        TypeInfo {
            template_name: Some(name.into()),
            ..TypeInfo::simple(TypeCode::Enumeration)
        }
    }

    /// An array descriptor with the given element type.
    pub fn array(element: TypeInfo) -> Self {
        TypeInfo {
            sub_types: vec![element],
            ..TypeInfo::simple(TypeCode::Array)
        }
    }

    /// A generic single-element container (`List`, `HashSet` or `Queue`).
    pub fn container(code: TypeCode, element: TypeInfo) -> Self {
        TypeInfo {
            is_generic: true,
            sub_types: vec![element],
            ..TypeInfo::simple(code)
        }
    }

    pub fn dictionary(key: TypeInfo, value: TypeInfo) -> Self {
        TypeInfo {
            is_generic: true,
            sub_types: vec![key, value],
            ..TypeInfo::simple(TypeCode::Dictionary)
        }
    }

    pub fn pair(key: TypeInfo, value: TypeInfo) -> Self {
        TypeInfo {
            is_generic: true,
            sub_types: vec![key, value],
            ..TypeInfo::simple(TypeCode::Pair)
        }
    }

    /// Builder: mark this descriptor as a value type.
    pub fn value_type(mut self) -> Self {
        self.is_value_type = true;
        self
    }

    /// Reassemble the wire tag byte from code and flags.
    pub fn tag_byte(&self) -> u8 {
        let mut tag = self.code as u8;
        if self.is_value_type {
            tag |= IS_VALUE_TYPE;
        }
        if self.is_generic {
            tag |= IS_GENERIC_TYPE;
        }
        tag
    }
}

/// Decode one descriptor from the stream, recursing into children.
pub fn parse_type_info(reader: &mut BinaryReader) -> Result<TypeInfo> {
    let offset = reader.offset();
    let tag = reader.read_u8()?;
    let code = TypeCode::try_from(tag & VALUE_MASK).map_err(|_| {
        SaveError::corruption_at(format!("unknown type code {}", tag & VALUE_MASK), offset)
    })?;
    let is_value_type = tag & IS_VALUE_TYPE != 0;
    let is_generic = tag & IS_GENERIC_TYPE != 0;

    let template_name = if matches!(code, TypeCode::UserDefined | TypeCode::Enumeration) {
        let name = reader.read_klei_string()?;
        if name.is_none() {
            return Err(SaveError::corruption_at(
                "expected a non-null class name for a user-defined or enumeration type",
                offset,
            ));
        }
        Some(validate_identifier(name)?)
    } else {
        None
    };

    let mut sub_types = Vec::new();
    if is_generic {
        if !code.is_generic_capable() {
            return Err(SaveError::corruption_at(
                format!("non-generic type {code:?} marked as generic"),
                offset,
            ));
        }
        let count = reader.read_u8()?;
        for _ in 0..count {
            sub_types.push(parse_type_info(reader)?);
        }
    } else if code == TypeCode::Array {
        sub_types.push(parse_type_info(reader)?);
    }

    Ok(TypeInfo {
        code,
        is_value_type,
        is_generic,
        template_name,
        sub_types,
    })
}

/// Encode one descriptor, the exact inverse of [`parse_type_info`].
pub fn write_type_info(writer: &mut BinaryWriter, type_info: &TypeInfo) -> Result<()> {
    if type_info.is_generic && !type_info.code.is_generic_capable() {
        return Err(SaveError::corruption(format!(
            "non-generic type {:?} marked as generic",
            type_info.code
        )));
    }
    writer.write_u8(type_info.tag_byte());

    if matches!(type_info.code, TypeCode::UserDefined | TypeCode::Enumeration) {
        let name = type_info.template_name.as_deref().ok_or_else(|| {
            SaveError::corruption(format!(
                "{:?} descriptor is missing its class name",
                type_info.code
            ))
        })?;
        writer.write_klei_string(Some(name));
    }

    if type_info.is_generic {
        if type_info.sub_types.len() > u8::MAX as usize {
            return Err(SaveError::corruption(format!(
                "too many type arguments ({})",
                type_info.sub_types.len()
            )));
        }
        writer.write_u8(type_info.sub_types.len() as u8);
        for sub in &type_info.sub_types {
            write_type_info(writer, sub)?;
        }
    } else if type_info.code == TypeCode::Array {
        let element = type_info.sub_types.first().ok_or_else(|| {
            SaveError::corruption("array descriptor is missing its element type")
        })?;
        write_type_info(writer, element)?;
    }

    Ok(())
}
