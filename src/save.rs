//! Top-level save pipeline: header → version gate → template table →
//! (optionally compressed) body → world/settings objects → sim blob →
//! entity groups → trailing game data, and the exact inverse for writing.

use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use indexmap::IndexMap;

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Result, SaveError};
use crate::game_objects::{parse_game_objects, write_game_objects};
use crate::header::{parse_header, write_header};
use crate::ident::validate_identifier;
use crate::model::{GameObjectGroup, SaveGame};
use crate::type_templates::TemplateTable;
use crate::type_templates::values::{TypedValue, read_object, write_object};

/// Save version this parser targets.
pub const CURRENT_MAJOR_VERSION: i32 = 7;
pub const CURRENT_MINOR_VERSION: i32 = 35;

/// Magic marker between the sim blob and the entity groups. Raw ASCII,
/// not length-prefixed.
pub const SAVE_MAGIC: &str = "KSAV";

const WORLD_MARKER: &str = "world";
const WORLD_ROOT_CLASS: &str = "Klei.SaveFileRoot";
const SETTINGS_CLASS: &str = "Game+Settings";

/// Parse a complete save file.
///
/// With `verify_version` on, the header's save version is checked against
/// the targeted 7.35 before anything past the header is touched: a major
/// mismatch always fails, a minor mismatch fails unless
/// `allow_minor_mismatch` is set.
pub fn parse_save_game(
    data: &[u8],
    verify_version: bool,
    allow_minor_mismatch: bool,
) -> Result<SaveGame> {
    let mut reader = BinaryReader::new(data);

    let header = parse_header(&mut reader)?;
    log::debug!(
        "parsed header: build {}, header version {}, compressed: {}",
        header.build_version,
        header.header_version,
        header.is_compressed
    );

    if verify_version {
        let actual_major = header.game_info.save_major_version;
        let actual_minor = header.game_info.save_minor_version;
        let minor_ok = allow_minor_mismatch || actual_minor == CURRENT_MINOR_VERSION;
        if actual_major != CURRENT_MAJOR_VERSION || !minor_ok {
            return Err(SaveError::VersionMismatch {
                expected_major: CURRENT_MAJOR_VERSION,
                expected_minor: CURRENT_MINOR_VERSION,
                actual_major,
                actual_minor,
            });
        }
    }

    let templates = TemplateTable::parse(&mut reader)?;
    log::debug!("parsed {} type templates", templates.len());

    let body = if header.is_compressed {
        let offset = reader.offset();
        let mut decompressed = Vec::new();
        ZlibDecoder::new(reader.rest())
            .read_to_end(&mut decompressed)
            .map_err(|e| {
                SaveError::corruption_at(format!("failed to decompress save body: {e}"), offset)
            })?;
        log::debug!("decompressed body: {} bytes", decompressed.len());
        Some(decompressed)
    } else {
        None
    };

    let body = match &body {
        Some(bytes) => parse_save_body(&mut BinaryReader::new(bytes), &templates)?,
        None => parse_save_body(&mut reader, &templates)?,
    };

    Ok(SaveGame {
        header,
        templates,
        world: body.world,
        settings: body.settings,
        sim_data: body.sim_data,
        version_major: body.version_major,
        version_minor: body.version_minor,
        game_objects: body.game_objects,
        game_data: body.game_data,
    })
}

struct SaveBody {
    world: IndexMap<String, TypedValue>,
    settings: IndexMap<String, TypedValue>,
    sim_data: Vec<u8>,
    version_major: i32,
    version_minor: i32,
    game_objects: Vec<GameObjectGroup>,
    game_data: Vec<u8>,
}

/// Read a klei-string that must equal `expected`.
fn expect_marker(reader: &mut BinaryReader, expected: &str) -> Result<()> {
    let offset = reader.offset();
    let marker = reader.read_klei_string()?;
    if marker.as_deref() != Some(expected) {
        return Err(SaveError::corruption_at(
            format!("expected \"{expected}\" marker, got {marker:?}"),
            offset,
        ));
    }
    Ok(())
}

fn parse_save_body(reader: &mut BinaryReader, templates: &TemplateTable) -> Result<SaveBody> {
    expect_marker(reader, WORLD_MARKER)?;

    let offset = reader.offset();
    let world_class = validate_identifier(reader.read_klei_string()?)?;
    if world_class != WORLD_ROOT_CLASS {
        return Err(SaveError::corruption_at(
            format!("expected world class \"{WORLD_ROOT_CLASS}\", got \"{world_class}\""),
            offset,
        ));
    }
    let world = read_object(reader, templates, &world_class)?;

    let offset = reader.offset();
    let settings_class = validate_identifier(reader.read_klei_string()?)?;
    if settings_class != SETTINGS_CLASS {
        return Err(SaveError::corruption_at(
            format!("expected settings class \"{SETTINGS_CLASS}\", got \"{settings_class}\""),
            offset,
        ));
    }
    let settings = read_object(reader, templates, &settings_class)?;

    let offset = reader.offset();
    let sim_data_length = reader.read_i32()?;
    if sim_data_length < 0 {
        return Err(SaveError::corruption_at(
            format!("invalid sim data length {sim_data_length}"),
            offset,
        ));
    }
    let sim_data = reader.read_bytes(sim_data_length as usize)?.to_vec();

    let offset = reader.offset();
    let magic = reader.read_chars(SAVE_MAGIC.len())?;
    if magic != SAVE_MAGIC {
        return Err(SaveError::corruption_at(
            format!("expected \"{SAVE_MAGIC}\" marker, got \"{magic}\""),
            offset,
        ));
    }

    let version_major = reader.read_i32()?;
    let version_minor = reader.read_i32()?;

    let game_objects = parse_game_objects(reader, templates)?;
    log::debug!("parsed {} game object groups", game_objects.len());

    // Anything past the entity groups has no specified structure.
    let game_data = reader.rest().to_vec();

    Ok(SaveBody {
        world,
        settings,
        sim_data,
        version_major,
        version_minor,
        game_objects,
        game_data,
    })
}

/// Serialize a save back to bytes. The body is zlib-compressed iff the
/// header says so.
pub fn write_save_game(save_game: &SaveGame) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    write_header(&mut writer, &save_game.header)?;
    save_game.templates.write(&mut writer)?;

    let mut body = BinaryWriter::new();
    write_save_body(&mut body, save_game)?;

    if save_game.header.is_compressed {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        let compressed = encoder
            .write_all(body.as_bytes())
            .and_then(|_| encoder.finish())
            .map_err(|e| SaveError::corruption(format!("failed to compress save body: {e}")))?;
        writer.write_bytes(&compressed);
    } else {
        writer.write_bytes(body.as_bytes());
    }

    Ok(writer.into_bytes())
}

fn write_save_body(writer: &mut BinaryWriter, save_game: &SaveGame) -> Result<()> {
    writer.write_klei_string(Some(WORLD_MARKER));

    writer.write_klei_string(Some(WORLD_ROOT_CLASS));
    write_object(writer, &save_game.templates, WORLD_ROOT_CLASS, &save_game.world)?;

    writer.write_klei_string(Some(SETTINGS_CLASS));
    write_object(
        writer,
        &save_game.templates,
        SETTINGS_CLASS,
        &save_game.settings,
    )?;

    writer.write_i32(save_game.sim_data.len() as i32);
    writer.write_bytes(&save_game.sim_data);

    writer.write_chars(SAVE_MAGIC);
    writer.write_i32(save_game.version_major);
    writer.write_i32(save_game.version_minor);

    write_game_objects(writer, &save_game.templates, &save_game.game_objects)?;

    writer.write_bytes(&save_game.game_data);
    Ok(())
}

impl SaveGame {
    /// Read and parse a save file from disk.
    pub fn from_file(
        path: impl AsRef<Path>,
        verify_version: bool,
        allow_minor_mismatch: bool,
    ) -> Result<Self> {
        let data = std::fs::read(path)?;
        parse_save_game(&data, verify_version, allow_minor_mismatch)
    }

    /// Serialize and write this save to disk.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = write_save_game(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
