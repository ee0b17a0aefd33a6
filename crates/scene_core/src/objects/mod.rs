mod base;
pub mod kinds;
mod registry;
mod sequence;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bus::{CommandOutbox, CorrelationId};
use crate::collab::{
    ActorId, ActorMovement, EntityHandle, LevelId, SaveStateStore, SceneGraph, ScriptId, Tint,
};
use crate::math::{GridPos, GridRect, WorldPos};
use crate::tilemap::Tilemap;

pub use base::{ActivationError, ModelRequirement, ObjectCore};
pub use registry::{KindRegistration, ObjectRegistry, RegistryError, DEFAULT_REGISTRATIONS};
pub use sequence::{Sequence, Step, WaitCondition};

pub const NO_LINKED_OBJECT: u16 = 0xFFFF;
pub const INFINITE_TIMES: u8 = 0xFF;
pub const PARAMETER_SLOTS: usize = 6;
/// World-space reach for the player's "nearby interactables" prompt.
pub const DIRECT_INTERACTION_RADIUS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u16);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! object_kinds {
    ($($name:ident = $tag:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum ObjectKind {
            $($name = $tag),+
        }

        impl ObjectKind {
            pub const ALL: &'static [ObjectKind] = &[$(ObjectKind::$name),+];

            pub fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $($tag => Some(ObjectKind::$name),)+
                    _ => None,
                }
            }
        }
    };
}

object_kinds! {
    AutoTrigger = 0,
    PreciseTrigger = 1,
    Door = 2,
    Chest = 3,
    RareChest = 4,
    Switch = 5,
    ToggleSwitch = 6,
    PedalSwitch = 7,
    ThreePhaseSwitch = 8,
    ThreePhaseBridge = 9,
    SpecialSwitch = 10,
    Collidable = 11,
    Shakeable = 12,
    Climbable = 13,
    Pushable = 14,
    BidirectionalPushable = 15,
    Elevator = 16,
    ElevatorDoor = 17,
    ElevatorPedal = 18,
    MovableCarrier = 19,
    RotatingBridge = 20,
    SuspensionBridge = 21,
    SwordBridge = 22,
    SlideWay = 23,
    Collectible = 24,
    Trap = 25,
    FallableObstacle = 26,
    FallableWeapon = 27,
    WindBlocker = 28,
    WaterSurfaceRoadBlocker = 29,
    RetractableBlocker = 30,
    GravityTrigger = 31,
    JumpableArea = 32,
    SavingPoint = 33,
    InvestigationTrigger = 34,
    CameraTrigger = 35,
    DivineTreeFlower = 36,
    DivineTreePortal = 37,
    StaticProp = 38,
    AnimatedProp = 39,
    SpecialMechanism = 40,
    SceneTransitionTrigger = 41,
    BreakableWall = 42,
    Teleporter = 43,
    TimedSwitch = 44,
    EditorMarker = 45,
}

impl ObjectKind {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Static,
    Animated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub path: String,
    pub kind: ModelKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerShape {
    TileRect { layer: usize, rect: GridRect },
    Bounds { min: WorldPos, max: WorldPos },
}

impl TriggerShape {
    pub fn contains(&self, tilemap: &Tilemap, tile: GridPos, layer: usize) -> bool {
        match *self {
            TriggerShape::TileRect {
                layer: trigger_layer,
                rect,
            } => trigger_layer == layer && rect.contains(tile),
            TriggerShape::Bounds { min, max } => {
                let world = tilemap.grid_to_world(tile, layer);
                world.x >= min.x && world.x <= max.x && world.z >= min.z && world.z <= max.z
            }
        }
    }
}

/// Decoded descriptor for one interactive object, as authored for the level.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub kind_tag: u8,
    pub name: String,
    pub model: Option<ModelRef>,
    pub position: WorldPos,
    pub rotation_y_degrees: f32,
    pub layer_index: usize,
    pub parameters: [i32; PARAMETER_SLOTS],
    pub switch_state: u8,
    pub initially_active: bool,
    pub times: u8,
    pub linked_object_id: u16,
    pub trigger: Option<TriggerShape>,
    pub script_id: u32,
    pub sfx: Option<String>,
}

impl ObjectInfo {
    pub fn new(id: ObjectId, kind: ObjectKind) -> Self {
        Self {
            id,
            kind_tag: kind.tag(),
            name: format!("object_{}", id.0),
            model: None,
            position: WorldPos::default(),
            rotation_y_degrees: 0.0,
            layer_index: 0,
            parameters: [0; PARAMETER_SLOTS],
            switch_state: 0,
            initially_active: false,
            times: INFINITE_TIMES,
            linked_object_id: NO_LINKED_OBJECT,
            trigger: None,
            script_id: 0,
            sfx: None,
        }
    }

    pub fn kind(&self) -> Option<ObjectKind> {
        ObjectKind::from_tag(self.kind_tag)
    }

    pub fn linked_object(&self) -> Option<ObjectId> {
        (self.linked_object_id != NO_LINKED_OBJECT).then_some(ObjectId(self.linked_object_id))
    }
}

/// Per-object fix-ups authored alongside the level instead of living in kind logic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectTweak {
    pub skip_camera_focus: bool,
    pub script_override: Option<ScriptId>,
    pub forced_layer: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelInfo {
    pub id: LevelId,
    pub tweaks: BTreeMap<ObjectId, ObjectTweak>,
}

impl LevelInfo {
    pub fn new(id: LevelId) -> Self {
        Self {
            id,
            tweaks: BTreeMap::new(),
        }
    }

    pub fn tweak(&self, object: ObjectId) -> ObjectTweak {
        self.tweaks.get(&object).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionContext {
    pub correlation_id: CorrelationId,
    pub initiator: ObjectId,
    pub player: Option<ActorId>,
    pub started_by_player: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerResponse {
    Ignore,
    InteractNow,
    InteractAfter(f32),
}

/// Read-only view of every other object while one object is being driven.
#[derive(Clone, Copy)]
pub struct Peers<'a> {
    objects: Option<&'a BTreeMap<ObjectId, Box<dyn InteractiveObject>>>,
}

impl<'a> Peers<'a> {
    pub fn new(objects: &'a BTreeMap<ObjectId, Box<dyn InteractiveObject>>) -> Self {
        Self {
            objects: Some(objects),
        }
    }

    pub fn none() -> Self {
        Self { objects: None }
    }

    pub fn get(&self, id: ObjectId) -> Option<&'a dyn InteractiveObject> {
        self.objects?.get(&id).map(|object| object.as_ref())
    }

    pub fn is_active(&self, id: ObjectId) -> bool {
        self.get(id).is_some_and(|object| object.core().is_active())
    }
}

/// Session-scoped services handed to an object for the duration of one call.
pub struct ObjectEnv<'a> {
    pub level: &'a LevelInfo,
    pub tilemap: &'a mut Tilemap,
    pub scene: &'a mut dyn SceneGraph,
    pub movement: &'a mut dyn ActorMovement,
    pub save: &'a mut dyn SaveStateStore,
    pub outbox: &'a mut CommandOutbox,
    pub peers: Peers<'a>,
}

/// Lifecycle contract shared by every kind.
///
/// `Inactive -> Active/Idle <-> Active/Interacting -> Inactive`. The interacting flag lives on
/// [`ObjectCore`] and is managed by the session; kinds only describe what an interaction does.
pub trait InteractiveObject: fmt::Debug {
    fn core(&self) -> &ObjectCore;
    fn core_mut(&mut self) -> &mut ObjectCore;

    fn model_requirement(&self) -> ModelRequirement {
        ModelRequirement::Optional
    }

    /// Returns the existing handle when already active.
    fn activate(
        &mut self,
        env: &mut ObjectEnv<'_>,
        tint: Tint,
    ) -> Result<EntityHandle, ActivationError> {
        if let Some(handle) = self.core().entity() {
            return Ok(handle);
        }
        let requirement = self.model_requirement();
        let handle = self.core_mut().activate_base(env, tint, requirement)?;
        self.on_activated(env);
        Ok(handle)
    }

    fn on_activated(&mut self, _env: &mut ObjectEnv<'_>) {}

    fn is_directly_interactable(&self, _distance: f32) -> bool {
        false
    }

    fn should_go_to_cutscene_when_interaction_started(&self) -> bool {
        true
    }

    /// Whether a chain that activates this object carries on into its linked id.
    fn forwards_chain(&self) -> bool {
        true
    }

    /// Checked before the times budget is spent. False means `interact` would do nothing.
    fn can_interact(&self, _env: &ObjectEnv<'_>) -> bool {
        true
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence;

    /// Continuation for a `Step::Resume` this object scheduled earlier.
    fn resume(&mut self, _tag: u32, _ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        Sequence::new(self.core().id())
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        TriggerResponse::Ignore
    }

    fn on_player_exited(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        TriggerResponse::Ignore
    }

    /// Returns true when the object wants an interaction to play out the new phase.
    fn on_three_phase_changed(
        &mut self,
        _previous: u8,
        _current: u8,
        _env: &mut ObjectEnv<'_>,
    ) -> bool {
        false
    }

    fn deactivate(&mut self, env: &mut ObjectEnv<'_>) {
        if !self.core().is_active() {
            return;
        }
        self.on_deactivating(env);
        self.core_mut().teardown(env);
    }

    fn on_deactivating(&mut self, _env: &mut ObjectEnv<'_>) {}
}
