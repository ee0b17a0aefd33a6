//! Narrow interfaces to the systems this runtime drives but does not own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{GridPos, WorldPos};
use crate::objects::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoveTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Tint {
    pub const WHITE: Tint = Tint {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
}

impl Default for Tint {
    fn default() -> Self {
        Self::WHITE
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Box { half_extents: WorldPos },
    Cylinder { radius: f32, height: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDesc {
    pub name: String,
    pub model_path: Option<String>,
    pub position: WorldPos,
    pub rotation_y_degrees: f32,
    pub tint: Tint,
    pub parent: Option<EntityHandle>,
}

pub trait SceneGraph {
    fn create_entity(&mut self, desc: EntityDesc) -> EntityHandle;
    fn set_transform(&mut self, entity: EntityHandle, position: WorldPos, rotation_y_degrees: f32);
    fn attach_collider(&mut self, entity: EntityHandle, shape: ColliderShape);
    fn attach_trigger(&mut self, entity: EntityHandle, shape: ColliderShape);
    fn play_animation(&mut self, entity: EntityHandle, clip: &str) -> AnimationTicket;
    fn destroy_entity(&mut self, entity: EntityHandle);
}

pub trait ActorMovement {
    fn move_to(&mut self, actor: ActorId, target: WorldPos, obstacle_aware: bool) -> MoveTicket;
    fn set_navigation_layer(&mut self, actor: ActorId, layer: usize);
    fn current_tile(&self, actor: ActorId) -> Option<(GridPos, usize)>;
    fn cancel_movement(&mut self, actor: ActorId);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelId {
    pub city: u32,
    pub scene: u32,
}

impl LevelId {
    pub fn new(city: u32, scene: u32) -> Self {
        Self { city, scene }
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.city, self.scene)
    }
}

/// Persisted deltas for one object. Absent fields keep the level's authored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_state: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<WorldPos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidirectional_push_state: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_phase_state: Option<u8>,
}

impl ObjectOverride {
    pub fn apply(&mut self, field: PersistedField) {
        match field {
            PersistedField::SwitchState(value) => self.switch_state = Some(value),
            PersistedField::Activated(value) => self.activated = Some(value),
            PersistedField::Position(value) => self.position = Some(value),
            PersistedField::LayerIndex(value) => self.layer_index = Some(value),
            PersistedField::Times(value) => self.times = Some(value),
            PersistedField::BidirectionalPushState(value) => {
                self.bidirectional_push_state = Some(value)
            }
            PersistedField::ThreePhaseState(value) => self.three_phase_state = Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PersistedField {
    SwitchState(u8),
    Activated(bool),
    Position(WorldPos),
    LayerIndex(usize),
    Times(u8),
    BidirectionalPushState(u8),
    ThreePhaseState(u8),
}

/// Writes are fire-and-forget; nothing reads back within the same session.
pub trait SaveStateStore {
    fn object_override(&self, level: &LevelId, object: ObjectId) -> Option<ObjectOverride>;
    fn persist(&mut self, level: &LevelId, object: ObjectId, field: PersistedField);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySaveState {
    pub levels: BTreeMap<String, BTreeMap<ObjectId, ObjectOverride>>,
}

impl MemorySaveState {
    pub fn override_count(&self) -> usize {
        self.levels.values().map(BTreeMap::len).sum()
    }
}

impl SaveStateStore for MemorySaveState {
    fn object_override(&self, level: &LevelId, object: ObjectId) -> Option<ObjectOverride> {
        self.levels.get(&level.key())?.get(&object).cloned()
    }

    fn persist(&mut self, level: &LevelId, object: ObjectId, field: PersistedField) {
        self.levels
            .entry(level.key())
            .or_default()
            .entry(object)
            .or_default()
            .apply(field);
    }
}
