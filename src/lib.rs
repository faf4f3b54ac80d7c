//! Oxygen Not Included save file parser and writer.
//!
//! A save file is a JSON header, a table of reflection-derived class
//! templates, and a (usually zlib-compressed) body holding the world and
//! settings objects, the simulation blob, and every game entity grouped
//! by prefab. This crate parses all of that into a mutable [`SaveGame`]
//! tree and serializes it back, reproducing untouched data byte-for-byte,
//! including payloads of components it has no template for.
//!
//! ```no_run
//! use oni_save::SaveGame;
//!
//! let save = SaveGame::from_file("MyColony.sav", true, true)?;
//! let info = save.colony_info();
//! println!("{}: cycle {}, {} duplicants", info.colony_name, info.cycle, info.duplicant_count);
//! for prefab in save.prefab_names() {
//!     println!("  {prefab}");
//! }
//! save.to_file("MyColony_copy.sav")?;
//! # Ok::<(), oni_save::SaveError>(())
//! ```

pub mod binary;
pub mod error;
pub mod game_objects;
pub mod header;
pub mod ident;
pub mod model;
pub mod save;
pub mod type_templates;

pub use error::{Result, SaveError};
pub use header::{GameInfo, SaveGameHeader};
pub use ident::sdbm32_lower;
pub use model::{
    ColonyInfo, Colour, GameObject, GameObjectBehavior, GameObjectGroup, Quaternion, SaveGame,
    StoredItem, Vector2, Vector2I, Vector3,
};
pub use save::{
    CURRENT_MAJOR_VERSION, CURRENT_MINOR_VERSION, parse_save_game, write_save_game,
};
pub use type_templates::type_info::{TypeCode, TypeInfo};
pub use type_templates::values::TypedValue;
pub use type_templates::{TemplateTable, TypeTemplate, TypeTemplateMember};
