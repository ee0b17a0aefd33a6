use std::collections::BTreeMap;

use crate::bus::{CommandOutbox, CorrelationId};
use crate::collab::{ActorId, LevelId, MemorySaveState};
use crate::headless::{HeadlessMovement, HeadlessSceneGraph};
use crate::math::GridPos;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectEnv, ObjectId, ObjectInfo, ObjectKind,
    ObjectRegistry, Peers,
};
use crate::tilemap::tests::open_tilemap;
use crate::tilemap::Tilemap;

pub(crate) const PLAYER: ActorId = ActorId(1);

/// Collaborators for driving one object by hand.
pub(crate) struct TestWorld {
    pub level: LevelInfo,
    pub tilemap: Tilemap,
    pub scene: HeadlessSceneGraph,
    pub movement: HeadlessMovement,
    pub save: MemorySaveState,
    pub outbox: CommandOutbox,
    pub peers: BTreeMap<ObjectId, Box<dyn InteractiveObject>>,
}

impl TestWorld {
    pub fn new() -> Self {
        let tilemap = open_tilemap(8, 8);
        let mut movement = HeadlessMovement::default();
        movement.place(PLAYER, GridPos::new(0, 0), 0, &tilemap);
        Self {
            level: LevelInfo::new(LevelId::new(1, 1)),
            tilemap,
            scene: HeadlessSceneGraph::default(),
            movement,
            save: MemorySaveState::default(),
            outbox: CommandOutbox::default(),
            peers: BTreeMap::new(),
        }
    }

    pub fn with_tilemap(tilemap: Tilemap) -> Self {
        let mut world = Self::new();
        world
            .movement
            .place(PLAYER, GridPos::new(0, 0), 0, &tilemap);
        world.tilemap = tilemap;
        world
    }

    pub fn env(&mut self) -> ObjectEnv<'_> {
        ObjectEnv {
            level: &self.level,
            tilemap: &mut self.tilemap,
            scene: &mut self.scene,
            movement: &mut self.movement,
            save: &mut self.save,
            outbox: &mut self.outbox,
            peers: Peers::new(&self.peers),
        }
    }

    pub fn build(&self, info: ObjectInfo) -> Box<dyn InteractiveObject> {
        ObjectRegistry::with_default_kinds()
            .expect("registry")
            .create(info, &self.level)
            .expect("registered kind")
    }

    pub fn activated(&mut self, info: ObjectInfo) -> Box<dyn InteractiveObject> {
        let mut object = self.build(info);
        object
            .activate(&mut self.env(), Default::default())
            .expect("activate");
        object
    }

    pub fn add_peer(&mut self, info: ObjectInfo) {
        let object = self.activated(info);
        self.peers.insert(object.core().id(), object);
    }
}

pub(crate) fn info(id: u16, kind: ObjectKind) -> ObjectInfo {
    ObjectInfo::new(ObjectId(id), kind)
}

pub(crate) fn ctx(initiator: u16) -> InteractionContext {
    InteractionContext {
        correlation_id: CorrelationId(1),
        initiator: ObjectId(initiator),
        player: Some(PLAYER),
        started_by_player: true,
    }
}
