use tracing::debug;

use crate::bus::Command;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo,
    ObjectKind, Sequence, TriggerResponse,
};

use super::{layer_param, tile_param};

/// Runs its script when the player walks in. Precise triggers wait `param[0]` tenths of a
/// second first, and the countdown is dropped if the player leaves early.
#[derive(Debug)]
pub struct ScriptTrigger {
    core: ObjectCore,
    delayed: bool,
}

impl ScriptTrigger {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let delayed = info.kind() == Some(ObjectKind::PreciseTrigger);
        Box::new(Self {
            core: ObjectCore::new(info, level),
            delayed,
        })
    }
}

impl InteractiveObject for ScriptTrigger {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        if self.delayed {
            TriggerResponse::InteractAfter(self.core.param_seconds(0))
        } else {
            TriggerResponse::InteractNow
        }
    }

    fn interact(&mut self, ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .run_script(self.core.script(), ctx)
            .chain(self.core.linked_object())
    }
}

/// Drops the player onto another layer. `param[0]` target layer, `param[1..=2]` landing tile.
#[derive(Debug)]
pub struct GravityTrigger {
    core: ObjectCore,
}

impl GravityTrigger {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for GravityTrigger {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        TriggerResponse::InteractNow
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id()).play_sfx(self.core.sfx());
        let Some(player) = ctx.player else {
            return sequence;
        };
        let layer = layer_param(&self.core, 0);
        let landing = tile_param(&self.core, 1, 2);
        if !env.tilemap.is_inside(landing, layer) {
            debug!(object_id = self.core.id().0, layer, "gravity_landing_outside_grid");
            return sequence;
        }
        env.movement.set_navigation_layer(player, layer);
        let target = env.tilemap.grid_to_world(landing, layer);
        let ticket = env.movement.move_to(player, target, false);
        sequence
            .wait_movement(ticket)
            .chain(self.core.linked_object())
    }
}

/// Frames a spot while the player stands inside. `param[0]` camera travel in tenths of a second.
#[derive(Debug)]
pub struct CameraTrigger {
    core: ObjectCore,
    focused: bool,
}

impl CameraTrigger {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
            focused: false,
        })
    }
}

impl InteractiveObject for CameraTrigger {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn should_go_to_cutscene_when_interaction_started(&self) -> bool {
        false
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        TriggerResponse::InteractNow
    }

    fn on_player_exited(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        if self.focused {
            TriggerResponse::InteractNow
        } else {
            TriggerResponse::Ignore
        }
    }

    fn interact(&mut self, _ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if self.core.tweak().skip_camera_focus {
            return sequence;
        }
        self.focused = !self.focused;
        if self.focused {
            let duration = self.core.param_seconds(0).max(0.1);
            sequence.focus_camera(self.core.position(), duration)
        } else {
            sequence.reset_camera()
        }
    }

    fn on_deactivating(&mut self, env: &mut ObjectEnv<'_>) {
        if self.focused {
            env.outbox.emit(Command::ResetCamera);
            self.focused = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{ActorMovement, ScriptId};
    use crate::math::GridPos;
    use crate::objects::{Step, WaitCondition};
    use crate::testing::{ctx, info, TestWorld, PLAYER};

    #[test]
    fn auto_trigger_fires_now_and_precise_trigger_waits() {
        let mut world = TestWorld::new();
        let mut auto = world.activated(info(1, ObjectKind::AutoTrigger));
        let mut precise_info = info(2, ObjectKind::PreciseTrigger);
        precise_info.parameters[0] = 30;
        let mut precise = world.activated(precise_info);

        assert_eq!(auto.on_player_entered(&mut world.env()), TriggerResponse::InteractNow);
        assert_eq!(
            precise.on_player_entered(&mut world.env()),
            TriggerResponse::InteractAfter(3.0)
        );
    }

    #[test]
    fn script_trigger_without_script_or_link_does_nothing() {
        let mut world = TestWorld::new();
        let mut trigger = world.activated(info(1, ObjectKind::AutoTrigger));
        assert!(trigger.interact(&ctx(1), &mut world.env()).is_empty());
    }

    #[test]
    fn script_override_replaces_authored_script() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::AutoTrigger);
        authored.script_id = 10;
        world.level.tweaks.insert(
            authored.id,
            crate::objects::ObjectTweak {
                script_override: Some(ScriptId(77)),
                ..Default::default()
            },
        );
        let mut trigger = world.activated(authored);
        let sequence = trigger.interact(&ctx(1), &mut world.env());
        assert!(sequence
            .steps()
            .any(|step| *step == Step::Wait(WaitCondition::Script(ScriptId(77)))));
    }

    #[test]
    fn gravity_trigger_moves_player_to_target_layer() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::GravityTrigger);
        authored.parameters = [0, 4, 5, 0, 0, 0];
        let mut trigger = world.activated(authored);
        let sequence = trigger.interact(&ctx(1), &mut world.env());

        assert_eq!(world.movement.pending_move_count(), 1);
        assert!(sequence
            .steps()
            .any(|step| matches!(step, Step::Wait(WaitCondition::Movement(_)))));
        world.movement.complete_moves(&world.tilemap);
        assert_eq!(
            world.movement.current_tile(PLAYER),
            Some((GridPos::new(4, 5), 0))
        );
    }

    #[test]
    fn camera_trigger_focuses_on_entry_and_resets_on_exit() {
        let mut world = TestWorld::new();
        let mut trigger = world.activated(info(1, ObjectKind::CameraTrigger));
        assert_eq!(trigger.on_player_exited(&mut world.env()), TriggerResponse::Ignore);

        let focus = trigger.interact(&ctx(1), &mut world.env());
        assert!(matches!(
            focus.steps().next(),
            Some(Step::Emit(Command::FocusCamera { .. }))
        ));
        assert_eq!(trigger.on_player_exited(&mut world.env()), TriggerResponse::InteractNow);
        let reset = trigger.interact(&ctx(1), &mut world.env());
        assert_eq!(reset.steps().next(), Some(&Step::Emit(Command::ResetCamera)));
    }
}
