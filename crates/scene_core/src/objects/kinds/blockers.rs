use crate::bus::Command;
use crate::collab::ColliderShape;
use crate::math::WorldPos;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo, Sequence,
    TriggerResponse,
};
use crate::tilemap::TILE_SIZE;

use super::{clip_for_state, floor_param, set_floor_blocked};

/// Wind wall or water-surface barrier. Blocks floor `param[0]` for as long as it is active
/// and shows notice `param[1]` when the player walks into it.
#[derive(Debug)]
pub struct Blocker {
    core: ObjectCore,
}

impl Blocker {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for Blocker {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        set_floor_blocked(env, floor_param(&self.core, 0), true);
        self.core.attach_collider(
            env,
            ColliderShape::Box {
                half_extents: WorldPos::new(TILE_SIZE, 1.0, TILE_SIZE),
            },
        );
    }

    fn should_go_to_cutscene_when_interaction_started(&self) -> bool {
        false
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        TriggerResponse::InteractNow
    }

    fn interact(&mut self, _ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        let mut sequence = Sequence::new(self.core.id()).play_sfx(self.core.sfx());
        if let Ok(text_id) = u32::try_from(self.core.param(1)) {
            if text_id > 0 {
                sequence = sequence.emit(Command::ShowNotice { text_id });
            }
        }
        sequence
    }

    fn on_deactivating(&mut self, env: &mut ObjectEnv<'_>) {
        set_floor_blocked(env, floor_param(&self.core, 0), false);
    }
}

/// Gate that sinks into the floor. Floor `param[0]` is blocked while the state is 0.
#[derive(Debug)]
pub struct RetractableBlocker {
    core: ObjectCore,
}

impl RetractableBlocker {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn apply_floor(&self, env: &mut ObjectEnv<'_>) {
        let raised = self.core.switch_state() == 0;
        set_floor_blocked(env, floor_param(&self.core, 0), raised);
    }
}

impl InteractiveObject for RetractableBlocker {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        self.apply_floor(env);
        let clip = clip_for_state(self.core.switch_state(), "lowered", "raised");
        self.core.play_animation(env, clip);
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let state = self.core.flip_switch_state_and_persist(env);
        let ticket = self
            .core
            .play_animation(env, clip_for_state(state, "lower", "raise"));
        self.apply_floor(env);
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .run_script(self.core.script(), ctx)
            .chain(self.core.linked_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::GridPos;
    use crate::objects::{ObjectKind, Step};
    use crate::testing::{ctx, info, TestWorld};
    use crate::tilemap::{FloorType, Layer, Tile, Tilemap};

    fn gated_world() -> TestWorld {
        let tiles = vec![
            Tile::new(0.0, FloorType(0), true, 4),
            Tile::new(0.0, FloorType(3), true, 4),
        ];
        let layer = Layer::new(2, 1, WorldPos::default(), tiles, Vec::new()).expect("layer");
        TestWorld::with_tilemap(Tilemap::new(vec![layer]).expect("tilemap"))
    }

    #[test]
    fn blocker_holds_floor_only_while_active() {
        let mut world = gated_world();
        let mut authored = info(1, ObjectKind::WindBlocker);
        authored.parameters = [3, 40, 0, 0, 0, 0];
        let mut blocker = world.activated(authored);
        assert!(!world.tilemap.is_walkable(GridPos::new(1, 0), 0));
        assert!(!blocker.should_go_to_cutscene_when_interaction_started());

        let sequence = blocker.interact(&ctx(1), &mut world.env());
        assert!(sequence
            .steps()
            .any(|step| *step == Step::Emit(Command::ShowNotice { text_id: 40 })));

        blocker.deactivate(&mut world.env());
        assert!(world.tilemap.is_walkable(GridPos::new(1, 0), 0));
    }

    #[test]
    fn retractable_blocker_lowers_and_raises() {
        let mut world = gated_world();
        let mut authored = info(1, ObjectKind::RetractableBlocker);
        authored.parameters[0] = 3;
        let mut gate = world.activated(authored);
        assert!(!world.tilemap.is_walkable(GridPos::new(1, 0), 0));

        gate.interact(&ctx(1), &mut world.env());
        assert!(world.tilemap.is_walkable(GridPos::new(1, 0), 0));
        gate.interact(&ctx(1), &mut world.env());
        assert!(!world.tilemap.is_walkable(GridPos::new(1, 0), 0));
    }
}
