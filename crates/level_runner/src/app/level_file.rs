use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use scene_core::objects::{INFINITE_TIMES, PARAMETER_SLOTS};
use scene_core::tilemap::OBSTACLE_DISTANCE_CAP;
use scene_core::{
    ActorId, ActorSpawn, FloorType, GridPos, GridRect, Layer, LevelData, LevelId, LevelInfo,
    ModelKind, ModelRef, ObjectId, ObjectInfo, ObjectTweak, ScriptId, Tile, Tilemap,
    TilemapError, TriggerShape, WorldPos, NO_LINKED_OBJECT,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Decoded level records as stored on disk by the extraction tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelFile {
    pub city: u32,
    pub scene: u32,
    pub layers: Vec<LayerRecord>,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
    #[serde(default)]
    pub actors: Vec<ActorRecord>,
    #[serde(default)]
    pub tweaks: BTreeMap<u16, TweakRecord>,
}

/// Row-major tiles. An empty `tiles` list means a fully open layer, with `blocked` tiles
/// punched out of it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerRecord {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub origin: WorldPos,
    #[serde(default)]
    pub tiles: Vec<TileRecord>,
    #[serde(default)]
    pub blocked: Vec<GridPos>,
    #[serde(default)]
    pub portals: Vec<GridRect>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileRecord {
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub floor: u8,
    #[serde(default = "default_true")]
    pub walkable: bool,
    #[serde(default = "default_obstacle_distance")]
    pub obstacle_distance: u8,
}

impl Default for TileRecord {
    fn default() -> Self {
        Self {
            y: 0.0,
            floor: 0,
            walkable: true,
            obstacle_distance: OBSTACLE_DISTANCE_CAP,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectRecord {
    pub id: u16,
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<ModelRecord>,
    #[serde(default)]
    pub position: WorldPos,
    #[serde(default)]
    pub rotation_y_degrees: f32,
    #[serde(default)]
    pub layer: usize,
    #[serde(default)]
    pub parameters: [i32; PARAMETER_SLOTS],
    #[serde(default)]
    pub switch_state: u8,
    #[serde(default)]
    pub initially_active: bool,
    #[serde(default = "default_times")]
    pub times: u8,
    #[serde(default = "default_linked")]
    pub linked: u16,
    #[serde(default)]
    pub trigger: Option<TriggerRecord>,
    #[serde(default)]
    pub script_id: u32,
    #[serde(default)]
    pub sfx: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRecord {
    pub path: String,
    #[serde(default)]
    pub animated: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TriggerRecord {
    TileRect { layer: usize, rect: GridRect },
    Bounds { min: WorldPos, max: WorldPos },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorRecord {
    pub id: u32,
    pub tile: GridPos,
    #[serde(default)]
    pub layer: usize,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub player: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TweakRecord {
    pub skip_camera_focus: bool,
    pub script_override: Option<u32>,
    pub forced_layer: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_obstacle_distance() -> u8 {
    OBSTACLE_DISTANCE_CAP
}

fn default_times() -> u8 {
    INFINITE_TIMES
}

fn default_linked() -> u16 {
    NO_LINKED_OBJECT
}

#[derive(Debug, Error)]
pub enum LevelFileError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level file {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("layer {index} is invalid: {source}")]
    Layer {
        index: usize,
        #[source]
        source: TilemapError,
    },
    #[error("blocked tile ({x}, {y}) lies outside layer {index}")]
    BlockedTileOutside { index: usize, x: i32, y: i32 },
    #[error("level has no usable tilemap: {0}")]
    Tilemap(#[source] TilemapError),
}

/// A decoded level together with the digest of the bytes it came from.
#[derive(Debug)]
pub struct LoadedLevel {
    pub data: LevelData,
    pub sha256_hex: String,
}

pub fn load_level_file(path: &Path) -> Result<LoadedLevel, LevelFileError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse_level_json(&raw).map_err(|(field, source)| LevelFileError::Parse {
        path: path.to_path_buf(),
        field,
        source,
    })?;
    Ok(LoadedLevel {
        data: file.into_level_data()?,
        sha256_hex: sha256_hex(raw.as_bytes()),
    })
}

fn parse_level_json(raw: &str) -> Result<LevelFile, (String, serde_json::Error)> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, LevelFile>(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        let field = if field.is_empty() { ".".to_string() } else { field };
        (field, error.into_inner())
    })
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

impl LevelFile {
    pub fn into_level_data(self) -> Result<LevelData, LevelFileError> {
        let layers = self
            .layers
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_layer(index))
            .collect::<Result<Vec<_>, _>>()?;
        let tilemap = Tilemap::new(layers).map_err(LevelFileError::Tilemap)?;

        let mut info = LevelInfo::new(LevelId::new(self.city, self.scene));
        info.tweaks = self
            .tweaks
            .into_iter()
            .map(|(id, tweak)| {
                (
                    ObjectId(id),
                    ObjectTweak {
                        skip_camera_focus: tweak.skip_camera_focus,
                        script_override: tweak.script_override.map(ScriptId),
                        forced_layer: tweak.forced_layer,
                    },
                )
            })
            .collect();

        Ok(LevelData {
            info,
            tilemap,
            objects: self.objects.into_iter().map(ObjectRecord::into_info).collect(),
            actors: self
                .actors
                .into_iter()
                .map(|actor| ActorSpawn {
                    id: ActorId(actor.id),
                    tile: actor.tile,
                    layer: actor.layer,
                    active: actor.active,
                    is_player: actor.player,
                })
                .collect(),
        })
    }
}

impl LayerRecord {
    fn into_layer(self, index: usize) -> Result<Layer, LevelFileError> {
        let mut tiles: Vec<Tile> = if self.tiles.is_empty() {
            let count = self.width as usize * self.height as usize;
            vec![TileRecord::default().into_tile(); count]
        } else {
            self.tiles.into_iter().map(TileRecord::into_tile).collect()
        };

        let width = self.width as i32;
        let height = self.height as i32;
        for pos in self.blocked {
            let slot = (pos.x >= 0 && pos.y >= 0 && pos.x < width && pos.y < height)
                .then(|| (pos.y * width + pos.x) as usize)
                .and_then(|at| tiles.get_mut(at));
            let Some(tile) = slot else {
                return Err(LevelFileError::BlockedTileOutside {
                    index,
                    x: pos.x,
                    y: pos.y,
                });
            };
            *tile = Tile::new(tile.y_height, tile.floor_type, false, 0);
        }

        Layer::new(self.width, self.height, self.origin, tiles, self.portals)
            .map_err(|source| LevelFileError::Layer { index, source })
    }
}

impl TileRecord {
    fn into_tile(self) -> Tile {
        Tile::new(
            self.y,
            FloorType(self.floor),
            self.walkable,
            self.obstacle_distance,
        )
    }
}

impl ObjectRecord {
    fn into_info(self) -> ObjectInfo {
        ObjectInfo {
            id: ObjectId(self.id),
            kind_tag: self.kind,
            name: self.name.unwrap_or_else(|| format!("object_{}", self.id)),
            model: self.model.map(|model| ModelRef {
                path: model.path,
                kind: if model.animated {
                    ModelKind::Animated
                } else {
                    ModelKind::Static
                },
            }),
            position: self.position,
            rotation_y_degrees: self.rotation_y_degrees,
            layer_index: self.layer,
            parameters: self.parameters,
            switch_state: self.switch_state,
            initially_active: self.initially_active,
            times: self.times,
            linked_object_id: self.linked,
            trigger: self.trigger.map(|trigger| match trigger {
                TriggerRecord::TileRect { layer, rect } => TriggerShape::TileRect { layer, rect },
                TriggerRecord::Bounds { min, max } => TriggerShape::Bounds { min, max },
            }),
            script_id: self.script_id,
            sfx: self.sfx,
        }
    }
}
