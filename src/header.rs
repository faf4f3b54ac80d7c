//! Save file header: version quad plus the embedded game-info JSON.

use serde::{Deserialize, Serialize};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Result, SaveError};

/// The "game info" record embedded in the header as UTF-8 JSON.
///
/// Field names on the wire are camelCase. Unrecognized fields are kept in
/// `extra` so they survive a round trip; the core treats all of this as
/// payload and never interprets it beyond the version gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub number_of_cycles: i32,
    pub number_of_duplicants: i32,
    pub base_name: String,
    pub is_auto_save: bool,
    pub original_save_name: String,
    pub save_major_version: i32,
    pub save_minor_version: i32,
    pub cluster_id: String,
    pub sandbox_enabled: bool,
    pub colony_guid: String,
    pub dlc_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Parsed save header. `header_version` 1 introduced the compression flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGameHeader {
    pub build_version: u32,
    pub header_version: u32,
    pub is_compressed: bool,
    pub game_info: GameInfo,
}

/// Parse the header at the start of a save file.
pub fn parse_header(reader: &mut BinaryReader) -> Result<SaveGameHeader> {
    let build_version = reader.read_u32()?;
    let header_size = reader.read_u32()?;
    let header_version = reader.read_u32()?;

    let is_compressed = if header_version >= 1 {
        reader.read_u32()? != 0
    } else {
        false
    };

    let offset = reader.offset();
    let info_bytes = reader.read_bytes(header_size as usize)?;
    let game_info: GameInfo = serde_json::from_slice(info_bytes).map_err(|e| {
        SaveError::corruption_at(format!("failed to parse game info JSON: {e}"), offset)
    })?;

    Ok(SaveGameHeader {
        build_version,
        header_version,
        is_compressed,
        game_info,
    })
}

/// Write a save header. The size field is recomputed from the serialized
/// game info.
pub fn write_header(writer: &mut BinaryWriter, header: &SaveGameHeader) -> Result<()> {
    let info_bytes = serde_json::to_vec(&header.game_info)
        .map_err(|e| SaveError::corruption(format!("failed to serialize game info JSON: {e}")))?;

    writer.write_u32(header.build_version);
    writer.write_u32(info_bytes.len() as u32);
    writer.write_u32(header.header_version);
    if header.header_version >= 1 {
        writer.write_u32(header.is_compressed as u32);
    }
    writer.write_bytes(&info_bytes);
    Ok(())
}
