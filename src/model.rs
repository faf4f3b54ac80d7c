//! Data model for a parsed save: the [`SaveGame`] root, game objects and
//! their behaviors, plus the small math types the wire format uses.
//!
//! The whole model derives `Serialize`/`Deserialize`, so a parsed save can
//! be dumped as JSON for inspection by external tooling.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::header::SaveGameHeader;
use crate::type_templates::TemplateTable;
use crate::type_templates::values::TypedValue;

// ────────────────────────────────────────────────────────────────────────────
// Math types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vector2I {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub fn identity() -> Self {
        Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

/// RGBA colour with components in 0..1. On the wire each component is a
/// single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Game objects
// ────────────────────────────────────────────────────────────────────────────

/// A component (behavior) attached to a game object, e.g. `MinionIdentity`,
/// `Health`, `Storage`.
///
/// `template_data` is the field/property block decoded via the class
/// template, or `None` when the save contained no template for this
/// behavior, in which case the whole payload sits in `extra_raw`. Any
/// trailing bytes past what the template (and Storage item list) describe
/// are also kept in `extra_raw`, so unmodeled data survives a round trip
/// byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameObjectBehavior {
    pub name: String,
    pub template_data: Option<IndexMap<String, TypedValue>>,
    /// Stored entities, only ever populated for `Storage` behaviors.
    pub extra_data: Vec<StoredItem>,
    pub extra_raw: Vec<u8>,
}

/// An entity stored inside a `Storage` behavior: its prefab name plus the
/// full entity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub name: String,
    pub object: GameObject,
}

/// A positioned game entity with an ordered list of behaviors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub position: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
    /// Prefab folder index, a single byte.
    pub folder: u8,
    pub behaviors: Vec<GameObjectBehavior>,
}

impl GameObject {
    /// First behavior with the given name, if any.
    pub fn behavior(&self, name: &str) -> Option<&GameObjectBehavior> {
        self.behaviors.iter().find(|b| b.name == name)
    }

    pub fn behavior_mut(&mut self, name: &str) -> Option<&mut GameObjectBehavior> {
        self.behaviors.iter_mut().find(|b| b.name == name)
    }
}

/// All instances of one prefab, in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObjectGroup {
    pub prefab_name: String,
    pub objects: Vec<GameObject>,
}

// ────────────────────────────────────────────────────────────────────────────
// SaveGame root
// ────────────────────────────────────────────────────────────────────────────

/// A fully parsed save file.
///
/// The tree is single-rooted with no shared sub-trees; callers may mutate
/// any part of it and hand it back to [`write_save_game`] for re-serialization
/// that reproduces everything they did not touch byte-for-byte.
///
/// [`write_save_game`]: crate::save::write_save_game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub header: SaveGameHeader,
    pub templates: TemplateTable,
    /// Value of the `Klei.SaveFileRoot` template.
    pub world: IndexMap<String, TypedValue>,
    /// Value of the `Game+Settings` template.
    pub settings: IndexMap<String, TypedValue>,
    /// Simulation state, an opaque length-prefixed blob.
    pub sim_data: Vec<u8>,
    pub version_major: i32,
    pub version_minor: i32,
    /// Entities grouped by prefab, in file order.
    pub game_objects: Vec<GameObjectGroup>,
    /// Trailing body bytes after the entity groups, preserved verbatim.
    pub game_data: Vec<u8>,
}

impl SaveGame {
    /// Prefab names of all entity groups, in file order.
    pub fn prefab_names(&self) -> impl Iterator<Item = &str> {
        self.game_objects.iter().map(|g| g.prefab_name.as_str())
    }

    /// All entities of one prefab. Empty slice when the prefab is absent.
    pub fn objects_of(&self, prefab_name: &str) -> &[GameObject] {
        self.game_objects
            .iter()
            .find(|g| g.prefab_name == prefab_name)
            .map(|g| g.objects.as_slice())
            .unwrap_or(&[])
    }

    /// Mutable access to the entities of one prefab.
    pub fn objects_of_mut(&mut self, prefab_name: &str) -> Option<&mut Vec<GameObject>> {
        self.game_objects
            .iter_mut()
            .find(|g| g.prefab_name == prefab_name)
            .map(|g| &mut g.objects)
    }

    /// Entity count per prefab, in group order.
    pub fn prefab_counts(&self) -> IndexMap<&str, usize> {
        self.game_objects
            .iter()
            .map(|g| (g.prefab_name.as_str(), g.objects.len()))
            .collect()
    }

    /// Colony summary assembled from the header.
    pub fn colony_info(&self) -> ColonyInfo {
        let info = &self.header.game_info;
        ColonyInfo {
            colony_name: info.base_name.clone(),
            cycle: info.number_of_cycles,
            duplicant_count: info.number_of_duplicants,
            cluster_id: info.cluster_id.clone(),
            dlc_id: info.dlc_id.clone(),
            sandbox_enabled: info.sandbox_enabled,
            is_auto_save: info.is_auto_save,
            save_version: format!("{}.{}", info.save_major_version, info.save_minor_version),
            build_version: self.header.build_version,
            compressed: self.header.is_compressed,
        }
    }
}

/// High-level colony facts, extracted from the save header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonyInfo {
    pub colony_name: String,
    pub cycle: i32,
    pub duplicant_count: i32,
    pub cluster_id: String,
    pub dlc_id: String,
    pub sandbox_enabled: bool,
    pub is_auto_save: bool,
    pub save_version: String,
    pub build_version: u32,
    pub compressed: bool,
}
