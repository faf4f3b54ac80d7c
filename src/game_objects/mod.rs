//! Game entities: transforms, behavior lists, and prefab groups.
//!
//! Entities are stored grouped by prefab name. Each group declares its
//! instance count and the byte length of its entity block, which is
//! validated exactly on read and measured via a scratch buffer on write.
//!
//! - [`behavior`] – the per-component codec, including `Storage`

pub mod behavior;

pub use self::behavior::{parse_behavior, write_behavior};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Result, SaveError};
use crate::ident::validate_identifier;
use crate::model::{GameObject, GameObjectGroup, Quaternion, Vector3};
use crate::type_templates::TemplateTable;

pub(crate) fn read_vector3(reader: &mut BinaryReader) -> Result<Vector3> {
    Ok(Vector3 {
        x: reader.read_f32()?,
        y: reader.read_f32()?,
        z: reader.read_f32()?,
    })
}

pub(crate) fn write_vector3(writer: &mut BinaryWriter, v: &Vector3) {
    writer.write_f32(v.x);
    writer.write_f32(v.y);
    writer.write_f32(v.z);
}

pub(crate) fn read_quaternion(reader: &mut BinaryReader) -> Result<Quaternion> {
    Ok(Quaternion {
        x: reader.read_f32()?,
        y: reader.read_f32()?,
        z: reader.read_f32()?,
        w: reader.read_f32()?,
    })
}

pub(crate) fn write_quaternion(writer: &mut BinaryWriter, q: &Quaternion) {
    writer.write_f32(q.x);
    writer.write_f32(q.y);
    writer.write_f32(q.z);
    writer.write_f32(q.w);
}

/// Parse one entity: transform, folder byte, then its behaviors in file
/// order.
pub fn parse_game_object(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
) -> Result<GameObject> {
    let position = read_vector3(reader)?;
    let rotation = read_quaternion(reader)?;
    let scale = read_vector3(reader)?;
    let folder = reader.read_u8()?;

    let offset = reader.offset();
    let behavior_count = reader.read_i32()?;
    if behavior_count < 0 {
        return Err(SaveError::corruption_at(
            format!("invalid behavior count {behavior_count}"),
            offset,
        ));
    }
    let mut behaviors = Vec::with_capacity(behavior_count.min(4096) as usize);
    for _ in 0..behavior_count {
        behaviors.push(parse_behavior(reader, templates)?);
    }

    Ok(GameObject {
        position,
        rotation,
        scale,
        folder,
        behaviors,
    })
}

pub fn write_game_object(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    object: &GameObject,
) -> Result<()> {
    write_vector3(writer, &object.position);
    write_quaternion(writer, &object.rotation);
    write_vector3(writer, &object.scale);
    writer.write_u8(object.folder);
    writer.write_i32(object.behaviors.len() as i32);
    for behavior in &object.behaviors {
        write_behavior(writer, templates, behavior)?;
    }
    Ok(())
}

/// Parse one prefab group. The declared byte length of the entity block
/// must match what the entities actually consumed.
pub fn parse_game_object_group(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
) -> Result<GameObjectGroup> {
    let prefab_name = validate_identifier(reader.read_klei_string()?)?;

    let offset = reader.offset();
    let instance_count = reader.read_i32()?;
    if instance_count < 0 {
        return Err(SaveError::corruption_at(
            format!("invalid instance count {instance_count} for prefab \"{prefab_name}\""),
            offset,
        ));
    }
    let data_length = reader.read_i32()?;
    if data_length < 0 {
        return Err(SaveError::corruption_at(
            format!("invalid data length {data_length} for prefab \"{prefab_name}\""),
            offset,
        ));
    }

    let start = reader.offset();
    let mut objects = Vec::with_capacity(instance_count.min(4096) as usize);
    for _ in 0..instance_count {
        objects.push(parse_game_object(reader, templates)?);
    }

    let consumed = reader.offset() - start;
    if consumed != data_length as usize {
        return Err(SaveError::corruption_at(
            format!(
                "prefab group \"{prefab_name}\" declared {data_length} bytes but its \
                 entities consumed {consumed}"
            ),
            reader.offset(),
        ));
    }

    Ok(GameObjectGroup {
        prefab_name,
        objects,
    })
}

pub fn write_game_object_group(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    group: &GameObjectGroup,
) -> Result<()> {
    writer.write_klei_string(Some(&group.prefab_name));
    writer.write_i32(group.objects.len() as i32);

    let mut scratch = BinaryWriter::new();
    for object in &group.objects {
        write_game_object(&mut scratch, templates, object)?;
    }
    writer.write_i32(scratch.len() as i32);
    writer.write_bytes(scratch.as_bytes());
    Ok(())
}

/// Parse the whole entity-groups collection.
pub fn parse_game_objects(
    reader: &mut BinaryReader,
    templates: &TemplateTable,
) -> Result<Vec<GameObjectGroup>> {
    let offset = reader.offset();
    let group_count = reader.read_i32()?;
    if group_count < 0 {
        return Err(SaveError::corruption_at(
            format!("invalid game object group count {group_count}"),
            offset,
        ));
    }
    let mut groups = Vec::with_capacity(group_count.min(4096) as usize);
    for _ in 0..group_count {
        groups.push(parse_game_object_group(reader, templates)?);
    }
    Ok(groups)
}

pub fn write_game_objects(
    writer: &mut BinaryWriter,
    templates: &TemplateTable,
    groups: &[GameObjectGroup],
) -> Result<()> {
    writer.write_i32(groups.len() as i32);
    for group in groups {
        write_game_object_group(writer, templates, group)?;
    }
    Ok(())
}
