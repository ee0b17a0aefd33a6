use tracing::debug;

use crate::collab::ColliderShape;
use crate::math::WorldPos;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo,
    ObjectKind, Sequence,
};

use super::{clip_for_state, floor_param, set_floor_blocked};

/// Opens and closes on each interaction. `param[0]` floor type that is blocked while closed.
///
/// Elevator doors reference their elevator through the linked id and only move while that
/// elevator stops on the door's layer; they never continue a chain.
#[derive(Debug)]
pub struct Door {
    core: ObjectCore,
    elevator_door: bool,
}

impl Door {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let elevator_door = info.kind() == Some(ObjectKind::ElevatorDoor);
        Box::new(Self {
            core: ObjectCore::new(info, level),
            elevator_door,
        })
    }

    fn is_open(&self) -> bool {
        self.core.switch_state() != 0
    }

    /// While closed the door owns a collider-only child panel.
    fn apply_closed(&mut self, env: &mut ObjectEnv<'_>, closed: bool) {
        set_floor_blocked(env, floor_param(&self.core, 0), closed);
        self.core.destroy_sub_entities(env);
        if !closed {
            return;
        }
        if let Some(panel) = self
            .core
            .spawn_sub_entity(env, "panel", None, WorldPos::default())
        {
            env.scene.attach_collider(
                panel,
                ColliderShape::Box {
                    half_extents: WorldPos::new(0.5, 1.0, 0.1),
                },
            );
        }
    }

    fn elevator_is_here(&self, env: &ObjectEnv<'_>) -> bool {
        let Some(elevator) = self.core.linked_object() else {
            return false;
        };
        env.peers
            .get(elevator)
            .filter(|elevator| elevator.core().is_active())
            .is_some_and(|elevator| elevator.core().layer_index() == self.core.layer_index())
    }
}

impl InteractiveObject for Door {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        self.apply_closed(env, !self.is_open());
    }

    fn on_deactivating(&mut self, env: &mut ObjectEnv<'_>) {
        set_floor_blocked(env, floor_param(&self.core, 0), false);
    }

    fn forwards_chain(&self) -> bool {
        !self.elevator_door
    }

    fn can_interact(&self, env: &ObjectEnv<'_>) -> bool {
        !self.elevator_door || self.elevator_is_here(env)
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if self.elevator_door && !self.elevator_is_here(env) {
            debug!(object_id = self.core.id().0, "elevator_door_without_elevator");
            return sequence;
        }

        let state = self.core.flip_switch_state_and_persist(env);
        let ticket = self
            .core
            .play_animation(env, clip_for_state(state, "open", "close"));
        self.apply_closed(env, state == 0);
        let sequence = sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket);
        if self.elevator_door {
            sequence
        } else {
            sequence.chain(self.core.linked_object())
        }
    }
}
