use thiserror::Error;
use tracing::debug;

use crate::collab::{
    AnimationTicket, ColliderShape, EntityDesc, EntityHandle, LevelId, ObjectOverride,
    PersistedField, ScriptId, Tint,
};
use crate::math::WorldPos;
use crate::tilemap::TILE_SIZE;

use super::{
    LevelInfo, ModelKind, ObjectEnv, ObjectId, ObjectInfo, ObjectKind, ObjectTweak, TriggerShape,
    INFINITE_TIMES, PARAMETER_SLOTS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRequirement {
    Optional,
    Required,
    Animated,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error("object {object} ({kind:?}) needs an animated model but `{path}` is static")]
    UnsupportedModel {
        object: ObjectId,
        kind: Option<ObjectKind>,
        path: String,
    },
    #[error("object {object} ({kind:?}) has no model")]
    MissingModel {
        object: ObjectId,
        kind: Option<ObjectKind>,
    },
}

/// State every kind embeds: the authored descriptor, its persisted deltas and the entities the
/// object currently owns.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    info: ObjectInfo,
    level: LevelId,
    tweak: ObjectTweak,
    restored: ObjectOverride,
    entity: Option<EntityHandle>,
    sub_entities: Vec<EntityHandle>,
    interacting: bool,
}

impl ObjectCore {
    pub fn new(info: ObjectInfo, level: &LevelInfo) -> Self {
        let tweak = level.tweak(info.id);
        Self {
            info,
            level: level.id.clone(),
            tweak,
            restored: ObjectOverride::default(),
            entity: None,
            sub_entities: Vec::new(),
            interacting: false,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.info.id
    }

    pub fn kind(&self) -> Option<ObjectKind> {
        self.info.kind()
    }

    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    pub fn level(&self) -> &LevelId {
        &self.level
    }

    pub fn tweak(&self) -> &ObjectTweak {
        &self.tweak
    }

    /// Persisted kind-specific fields read back at the last activation.
    pub fn restored(&self) -> &ObjectOverride {
        &self.restored
    }

    pub fn param(&self, slot: usize) -> i32 {
        if slot < PARAMETER_SLOTS {
            self.info.parameters[slot]
        } else {
            0
        }
    }

    /// Parameters authored in tenths of a second.
    pub fn param_seconds(&self, slot: usize) -> f32 {
        self.param(slot).max(0) as f32 / 10.0
    }

    pub fn entity(&self) -> Option<EntityHandle> {
        self.entity
    }

    pub fn is_active(&self) -> bool {
        self.entity.is_some()
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn sub_entity_count(&self) -> usize {
        self.sub_entities.len()
    }

    pub fn position(&self) -> WorldPos {
        self.info.position
    }

    pub fn layer_index(&self) -> usize {
        self.info.layer_index
    }

    pub fn switch_state(&self) -> u8 {
        self.info.switch_state
    }

    pub fn times(&self) -> u8 {
        self.info.times
    }

    pub fn linked_object(&self) -> Option<ObjectId> {
        self.info.linked_object()
    }

    pub fn trigger(&self) -> Option<TriggerShape> {
        self.info.trigger
    }

    pub fn script(&self) -> Option<ScriptId> {
        self.tweak
            .script_override
            .or((self.info.script_id != 0).then_some(ScriptId(self.info.script_id)))
    }

    pub fn sfx(&self) -> Option<&str> {
        self.info.sfx.as_deref().filter(|name| !name.is_empty())
    }

    pub(crate) fn activate_base(
        &mut self,
        env: &mut ObjectEnv<'_>,
        tint: Tint,
        requirement: ModelRequirement,
    ) -> Result<EntityHandle, ActivationError> {
        if let Some(handle) = self.entity {
            return Ok(handle);
        }
        self.check_model(requirement)?;
        self.apply_saved_override(env);

        let handle = env.scene.create_entity(EntityDesc {
            name: self.info.name.clone(),
            model_path: self.info.model.as_ref().map(|model| model.path.clone()),
            position: self.info.position,
            rotation_y_degrees: self.info.rotation_y_degrees,
            tint,
            parent: None,
        });
        if let Some(shape) = self.trigger_collider() {
            env.scene.attach_trigger(handle, shape);
        }
        self.entity = Some(handle);
        debug!(
            object_id = self.info.id.0,
            kind = ?self.kind(),
            entity = handle.0,
            "object_activated"
        );
        Ok(handle)
    }

    fn check_model(&self, requirement: ModelRequirement) -> Result<(), ActivationError> {
        match (requirement, &self.info.model) {
            (ModelRequirement::Optional, _) => Ok(()),
            (_, None) => Err(ActivationError::MissingModel {
                object: self.info.id,
                kind: self.kind(),
            }),
            (ModelRequirement::Animated, Some(model)) if model.kind != ModelKind::Animated => {
                Err(ActivationError::UnsupportedModel {
                    object: self.info.id,
                    kind: self.kind(),
                    path: model.path.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn apply_saved_override(&mut self, env: &mut ObjectEnv<'_>) {
        let saved = env
            .save
            .object_override(&self.level, self.info.id)
            .unwrap_or_default();
        if let Some(state) = saved.switch_state {
            self.info.switch_state = state;
        }
        if let Some(position) = saved.position {
            self.info.position = position;
        }
        if let Some(layer) = saved.layer_index {
            self.info.layer_index = layer;
        }
        if let Some(times) = saved.times {
            self.info.times = times;
        }
        if let Some(layer) = self.tweak.forced_layer {
            self.info.layer_index = layer;
        }
        self.restored = saved;
    }

    fn trigger_collider(&self) -> Option<ColliderShape> {
        let half_extents = match self.info.trigger? {
            TriggerShape::TileRect { rect, .. } => WorldPos::new(
                rect.width() as f32 * TILE_SIZE * 0.5,
                1.0,
                rect.height() as f32 * TILE_SIZE * 0.5,
            ),
            TriggerShape::Bounds { min, max } => WorldPos::new(
                (max.x - min.x).abs() * 0.5,
                (max.y - min.y).abs() * 0.5,
                (max.z - min.z).abs() * 0.5,
            ),
        };
        Some(ColliderShape::Box { half_extents })
    }

    /// Consumes one use. The infinite sentinel is never decremented; a depleted counter stays
    /// depleted.
    pub fn is_interactable_based_on_times_count(&mut self, env: &mut ObjectEnv<'_>) -> bool {
        match self.info.times {
            INFINITE_TIMES => true,
            0 => false,
            remaining => {
                self.info.times = remaining - 1;
                self.persist(env, PersistedField::Times(self.info.times));
                true
            }
        }
    }

    pub fn flip_switch_state_and_persist(&mut self, env: &mut ObjectEnv<'_>) -> u8 {
        let next = if self.info.switch_state == 0 { 1 } else { 0 };
        self.set_switch_state_and_persist(env, next);
        next
    }

    pub fn set_switch_state_and_persist(&mut self, env: &mut ObjectEnv<'_>, state: u8) {
        self.info.switch_state = state;
        self.persist(env, PersistedField::SwitchState(state));
    }

    pub fn change_activation_state_and_persist(&mut self, env: &mut ObjectEnv<'_>, active: bool) {
        self.persist(env, PersistedField::Activated(active));
    }

    pub fn set_position_and_persist(&mut self, env: &mut ObjectEnv<'_>, position: WorldPos) {
        self.info.position = position;
        if let Some(entity) = self.entity {
            env.scene
                .set_transform(entity, position, self.info.rotation_y_degrees);
        }
        self.persist(env, PersistedField::Position(position));
    }

    pub fn set_rotation(&mut self, env: &mut ObjectEnv<'_>, rotation_y_degrees: f32) {
        self.info.rotation_y_degrees = rotation_y_degrees;
        if let Some(entity) = self.entity {
            env.scene
                .set_transform(entity, self.info.position, rotation_y_degrees);
        }
    }

    pub fn set_layer_and_persist(&mut self, env: &mut ObjectEnv<'_>, layer: usize) {
        self.info.layer_index = layer;
        self.persist(env, PersistedField::LayerIndex(layer));
    }

    pub fn persist(&self, env: &mut ObjectEnv<'_>, field: PersistedField) {
        env.save.persist(&self.level, self.info.id, field);
    }

    pub(crate) fn begin_interaction(&mut self) -> bool {
        if self.interacting {
            return false;
        }
        self.interacting = true;
        true
    }

    pub(crate) fn end_interaction(&mut self) {
        self.interacting = false;
    }

    pub fn attach_collider(&self, env: &mut ObjectEnv<'_>, shape: ColliderShape) {
        if let Some(entity) = self.entity {
            env.scene.attach_collider(entity, shape);
        }
    }

    /// Child entity parented to the object, destroyed with it on teardown.
    pub fn spawn_sub_entity(
        &mut self,
        env: &mut ObjectEnv<'_>,
        name: &str,
        model_path: Option<&str>,
        offset: WorldPos,
    ) -> Option<EntityHandle> {
        let parent = self.entity?;
        let position = WorldPos::new(
            self.info.position.x + offset.x,
            self.info.position.y + offset.y,
            self.info.position.z + offset.z,
        );
        let handle = env.scene.create_entity(EntityDesc {
            name: format!("{}/{}", self.info.name, name),
            model_path: model_path.map(str::to_string),
            position,
            rotation_y_degrees: self.info.rotation_y_degrees,
            tint: Tint::WHITE,
            parent: Some(parent),
        });
        self.sub_entities.push(handle);
        Some(handle)
    }

    pub fn destroy_sub_entities(&mut self, env: &mut ObjectEnv<'_>) {
        for handle in self.sub_entities.drain(..) {
            env.scene.destroy_entity(handle);
        }
    }

    pub fn play_animation(&self, env: &mut ObjectEnv<'_>, clip: &str) -> Option<AnimationTicket> {
        let entity = self.entity?;
        Some(env.scene.play_animation(entity, clip))
    }

    pub(crate) fn teardown(&mut self, env: &mut ObjectEnv<'_>) {
        self.destroy_sub_entities(env);
        if let Some(entity) = self.entity.take() {
            env.scene.destroy_entity(entity);
        }
        self.interacting = false;
        debug!(object_id = self.info.id.0, kind = ?self.kind(), "object_deactivated");
    }
}
