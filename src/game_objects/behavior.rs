//! Per-behavior (component) codec.
//!
//! A behavior on the wire is its class name followed by a length-prefixed
//! payload. The payload starts with the field/property block described by
//! the class template; for `Storage` it continues with a count-prefixed
//! list of stored entities, each a prefab name plus a full entity record.
//! Whatever bytes remain inside the declared length are preserved verbatim
//! in `extra_raw` and written back unchanged, so behaviors with structure
//! this crate does not model still round-trip byte-for-byte.
//!
//! The declared length is also the recovery anchor: when the save carries
//! no template for a behavior, the whole payload is kept raw and parsing
//! continues at the next behavior.

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Result, SaveError};
use crate::game_objects::{parse_game_object, write_game_object};
use crate::ident::validate_identifier;
use crate::model::{GameObjectBehavior, StoredItem};
use crate::type_templates::TemplateTable;
use crate::type_templates::values::{read_object, write_object};

/// The one behavior whose extra data is structured: a list of stored
/// entities.
pub const STORAGE_BEHAVIOR: &str = "Storage";

/// Parse one behavior.
pub fn parse_behavior(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
) -> Result<GameObjectBehavior> {
    let name = validate_identifier(reader.read_klei_string()?)?;

    let length_offset = reader.offset();
    let data_length = reader.read_i32()?;
    if data_length < 0 {
        return Err(SaveError::corruption_at(
            format!("invalid data length {data_length} for behavior \"{name}\""),
            length_offset,
        ));
    }
    let data_length = data_length as usize;
    let start = reader.offset();

    if templates.find(&name).is_none() {
        // No template for this class: keep the payload raw and move on.
        log::warn!("no template for behavior \"{name}\", preserving {data_length} raw bytes");
        let extra_raw = reader.read_bytes(data_length)?.to_vec();
        return Ok(GameObjectBehavior {
            name,
            template_data: None,
            extra_data: Vec::new(),
            extra_raw,
        });
    }

    let template_data = read_object(reader, templates, &name)?;

    let mut extra_data = Vec::new();
    if name == STORAGE_BEHAVIOR {
        let count_offset = reader.offset();
        let item_count = reader.read_i32()?;
        if item_count < 0 {
            return Err(SaveError::corruption_at(
                format!("invalid stored item count {item_count}"),
                count_offset,
            ));
        }
        for _ in 0..item_count {
            let item_name = validate_identifier(reader.read_klei_string()?)?;
            let object = parse_game_object(reader, templates)?;
            extra_data.push(StoredItem {
                name: item_name,
                object,
            });
        }
    }

    let consumed = reader.offset() - start;
    if consumed > data_length {
        return Err(SaveError::corruption_at(
            format!(
                "behavior \"{name}\" consumed {consumed} bytes but declared {data_length}"
            ),
            reader.offset(),
        ));
    }
    let extra_raw = reader.read_bytes(data_length - consumed)?.to_vec();

    Ok(GameObjectBehavior {
        name,
        template_data: Some(template_data),
        extra_data,
        extra_raw,
    })
}

/// Write one behavior: name, then the measured payload.
pub fn write_behavior(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    behavior: &GameObjectBehavior,
) -> Result<()> {
    writer.write_klei_string(Some(&behavior.name));

    let mut scratch = BinaryWriter::new();
    if let Some(template_data) = &behavior.template_data {
        write_object(&mut scratch, templates, &behavior.name, template_data)?;
        if behavior.name == STORAGE_BEHAVIOR {
            scratch.write_i32(behavior.extra_data.len() as i32);
            for item in &behavior.extra_data {
                scratch.write_klei_string(Some(&item.name));
                write_game_object(&mut scratch, templates, &item.object)?;
            }
        }
    }
    scratch.write_bytes(&behavior.extra_raw);

    writer.write_i32(scratch.len() as i32);
    writer.write_bytes(scratch.as_bytes());
    Ok(())
}
