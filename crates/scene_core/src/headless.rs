//! In-memory collaborators for tools and tests: nothing renders and nothing animates, but every
//! request is recorded so callers can complete it explicitly.

use std::collections::BTreeMap;

use crate::collab::{
    ActorId, ActorMovement, AnimationTicket, ColliderShape, EntityDesc, EntityHandle, MoveTicket,
    SceneGraph,
};
use crate::math::{GridPos, WorldPos};
use crate::tilemap::Tilemap;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessEntity {
    pub desc: EntityDesc,
    pub position: WorldPos,
    pub rotation_y_degrees: f32,
    pub colliders: Vec<ColliderShape>,
    pub triggers: Vec<ColliderShape>,
}

#[derive(Debug, Default)]
pub struct HeadlessSceneGraph {
    next_id: u64,
    entities: BTreeMap<EntityHandle, HeadlessEntity>,
    created_total: usize,
    pending_animations: Vec<(AnimationTicket, EntityHandle, String)>,
}

impl HeadlessSceneGraph {
    pub fn live_entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn created_total(&self) -> usize {
        self.created_total
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&HeadlessEntity> {
        self.entities.get(&handle)
    }

    pub fn children_of(&self, parent: EntityHandle) -> Vec<EntityHandle> {
        self.entities
            .iter()
            .filter(|(_, entity)| entity.desc.parent == Some(parent))
            .map(|(handle, _)| *handle)
            .collect()
    }

    pub fn pending_animation_count(&self) -> usize {
        self.pending_animations.len()
    }

    /// Hands every requested clip back to the caller as finished.
    pub fn take_pending_animations(&mut self) -> Vec<AnimationTicket> {
        self.pending_animations
            .drain(..)
            .map(|(ticket, _, _)| ticket)
            .collect()
    }
}

impl SceneGraph for HeadlessSceneGraph {
    fn create_entity(&mut self, desc: EntityDesc) -> EntityHandle {
        self.next_id += 1;
        self.created_total += 1;
        let handle = EntityHandle(self.next_id);
        self.entities.insert(
            handle,
            HeadlessEntity {
                position: desc.position,
                rotation_y_degrees: desc.rotation_y_degrees,
                desc,
                colliders: Vec::new(),
                triggers: Vec::new(),
            },
        );
        handle
    }

    fn set_transform(&mut self, entity: EntityHandle, position: WorldPos, rotation_y_degrees: f32) {
        if let Some(entity) = self.entities.get_mut(&entity) {
            entity.position = position;
            entity.rotation_y_degrees = rotation_y_degrees;
        }
    }

    fn attach_collider(&mut self, entity: EntityHandle, shape: ColliderShape) {
        if let Some(entity) = self.entities.get_mut(&entity) {
            entity.colliders.push(shape);
        }
    }

    fn attach_trigger(&mut self, entity: EntityHandle, shape: ColliderShape) {
        if let Some(entity) = self.entities.get_mut(&entity) {
            entity.triggers.push(shape);
        }
    }

    fn play_animation(&mut self, entity: EntityHandle, clip: &str) -> AnimationTicket {
        self.next_id += 1;
        let ticket = AnimationTicket(self.next_id);
        self.pending_animations.push((ticket, entity, clip.to_string()));
        ticket
    }

    fn destroy_entity(&mut self, entity: EntityHandle) {
        for child in self.children_of(entity) {
            self.destroy_entity(child);
        }
        self.entities.remove(&entity);
        self.pending_animations
            .retain(|(_, owner, _)| *owner != entity);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessActor {
    pub position: WorldPos,
    pub tile: GridPos,
    pub layer: usize,
}

#[derive(Debug, Default)]
pub struct HeadlessMovement {
    next_ticket: u64,
    actors: BTreeMap<ActorId, HeadlessActor>,
    pending: Vec<(MoveTicket, ActorId, WorldPos)>,
}

impl HeadlessMovement {
    pub fn place(&mut self, actor: ActorId, tile: GridPos, layer: usize, tilemap: &Tilemap) {
        let position = tilemap.grid_to_world(tile, layer);
        self.actors.insert(
            actor,
            HeadlessActor {
                position,
                tile,
                layer,
            },
        );
    }

    pub fn remove(&mut self, actor: ActorId) {
        self.actors.remove(&actor);
        self.pending.retain(|(_, owner, _)| *owner != actor);
    }

    pub fn actor(&self, actor: ActorId) -> Option<HeadlessActor> {
        self.actors.get(&actor).copied()
    }

    pub fn pending_move_count(&self) -> usize {
        self.pending.len()
    }

    /// Teleports every moving actor to its target and returns the finished tickets.
    pub fn complete_moves(&mut self, tilemap: &Tilemap) -> Vec<MoveTicket> {
        let mut finished = Vec::with_capacity(self.pending.len());
        for (ticket, actor, target) in self.pending.drain(..) {
            if let Some(state) = self.actors.get_mut(&actor) {
                state.position = target;
                state.tile = tilemap.world_to_grid(target, state.layer);
            }
            finished.push(ticket);
        }
        finished
    }
}

impl ActorMovement for HeadlessMovement {
    fn move_to(&mut self, actor: ActorId, target: WorldPos, _obstacle_aware: bool) -> MoveTicket {
        self.next_ticket += 1;
        let ticket = MoveTicket(self.next_ticket);
        self.pending.push((ticket, actor, target));
        ticket
    }

    fn set_navigation_layer(&mut self, actor: ActorId, layer: usize) {
        if let Some(state) = self.actors.get_mut(&actor) {
            state.layer = layer;
        }
    }

    fn current_tile(&self, actor: ActorId) -> Option<(GridPos, usize)> {
        self.actors.get(&actor).map(|state| (state.tile, state.layer))
    }

    fn cancel_movement(&mut self, actor: ActorId) {
        self.pending.retain(|(_, owner, _)| *owner != actor);
    }
}
