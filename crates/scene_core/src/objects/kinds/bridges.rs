use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo,
    ObjectKind, Sequence,
};

use super::{floor_param, set_floor_blocked, within_reach};

/// Quarter-turn bridge. Floor `param[0]` is walkable in state 0 and `param[1]` in state 1.
#[derive(Debug)]
pub struct RotatingBridge {
    core: ObjectCore,
}

impl RotatingBridge {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn apply_floors(&self, env: &mut ObjectEnv<'_>) {
        let turned = self.core.switch_state() != 0;
        set_floor_blocked(env, floor_param(&self.core, 0), turned);
        set_floor_blocked(env, floor_param(&self.core, 1), !turned);
    }
}

impl InteractiveObject for RotatingBridge {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        if self.core.switch_state() != 0 {
            let turned = self.core.info().rotation_y_degrees + 90.0;
            self.core.set_rotation(env, turned);
        }
        self.apply_floors(env);
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let state = self.core.flip_switch_state_and_persist(env);
        let delta = if state == 0 { -90.0 } else { 90.0 };
        let rotation = self.core.info().rotation_y_degrees + delta;
        self.core.set_rotation(env, rotation);
        let ticket = self.core.play_animation(env, "rotate");
        self.apply_floors(env);
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .run_script(self.core.script(), ctx)
            .chain(self.core.linked_object())
    }
}

/// Bridge that unrolls once. Floor `param[0]` stays blocked until deployed. The sword
/// variant frames the bridge and runs its script before unrolling.
#[derive(Debug)]
pub struct DeployableBridge {
    core: ObjectCore,
    staged: bool,
}

impl DeployableBridge {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let staged = info.kind() == Some(ObjectKind::SwordBridge);
        Box::new(Self {
            core: ObjectCore::new(info, level),
            staged,
        })
    }

    fn is_deployed(&self) -> bool {
        self.core.switch_state() != 0
    }
}

impl InteractiveObject for DeployableBridge {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        let deployed = self.is_deployed();
        set_floor_blocked(env, floor_param(&self.core, 0), !deployed);
        if deployed {
            self.core.play_animation(env, "deployed");
        }
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        self.staged && !self.is_deployed() && within_reach(distance)
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let mut sequence = Sequence::new(self.core.id());
        if self.is_deployed() {
            return sequence;
        }
        let framed = self.staged && !self.core.tweak().skip_camera_focus;
        if framed {
            sequence = sequence.focus_camera(self.core.position(), 0.8);
        }
        if self.staged {
            sequence = sequence.run_script(self.core.script(), ctx);
        }

        self.core.set_switch_state_and_persist(env, 1);
        let ticket = self.core.play_animation(env, "deploy");
        set_floor_blocked(env, floor_param(&self.core, 0), false);
        sequence = sequence.play_sfx(self.core.sfx()).wait_animation(ticket);
        if framed {
            sequence = sequence.reset_camera();
        }
        if !self.staged {
            sequence = sequence.run_script(self.core.script(), ctx);
        }
        sequence.chain(self.core.linked_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Command;
    use crate::collab::ScriptId;
    use crate::math::{GridPos, WorldPos};
    use crate::objects::Step;
    use crate::testing::{ctx, info, TestWorld};
    use crate::tilemap::{FloorType, Layer, Tile, Tilemap};

    fn two_floor_world() -> TestWorld {
        let tiles = vec![
            Tile::new(0.0, FloorType(4), true, 4),
            Tile::new(0.0, FloorType(5), true, 4),
        ];
        let layer = Layer::new(2, 1, WorldPos::default(), tiles, Vec::new()).expect("layer");
        TestWorld::with_tilemap(Tilemap::new(vec![layer]).expect("tilemap"))
    }

    fn walkable(world: &TestWorld) -> (bool, bool) {
        (
            world.tilemap.is_walkable(GridPos::new(0, 0), 0),
            world.tilemap.is_walkable(GridPos::new(1, 0), 0),
        )
    }

    #[test]
    fn rotating_bridge_swaps_walkable_floor_each_turn() {
        let mut world = two_floor_world();
        let mut authored = info(1, ObjectKind::RotatingBridge);
        authored.parameters = [4, 5, 0, 0, 0, 0];
        let mut bridge = world.activated(authored);
        assert_eq!(walkable(&world), (true, false));

        bridge.interact(&ctx(1), &mut world.env());
        assert_eq!(walkable(&world), (false, true));
        assert_eq!(bridge.core().info().rotation_y_degrees, 90.0);

        bridge.interact(&ctx(1), &mut world.env());
        assert_eq!(walkable(&world), (true, false));
        assert_eq!(bridge.core().info().rotation_y_degrees, 0.0);
    }

    #[test]
    fn suspension_bridge_unblocks_floor_once() {
        let mut world = two_floor_world();
        let mut authored = info(1, ObjectKind::SuspensionBridge);
        authored.parameters[0] = 4;
        let mut bridge = world.activated(authored);
        assert_eq!(walkable(&world), (false, true));
        assert!(!bridge.is_directly_interactable(0.5));

        bridge.interact(&ctx(1), &mut world.env());
        assert_eq!(walkable(&world), (true, true));
        assert!(bridge.interact(&ctx(1), &mut world.env()).is_empty());
    }

    #[test]
    fn sword_bridge_frames_and_scripts_before_deploying() {
        let mut world = two_floor_world();
        let mut authored = info(1, ObjectKind::SwordBridge);
        authored.script_id = 12;
        let mut bridge = world.activated(authored);
        assert!(bridge.is_directly_interactable(1.0));

        let steps: Vec<Step> = bridge
            .interact(&ctx(1), &mut world.env())
            .into_steps()
            .into_iter()
            .collect();
        assert!(matches!(steps[0], Step::Emit(Command::FocusCamera { .. })));
        assert!(matches!(
            steps[2],
            Step::Emit(Command::RunScript {
                script_id: ScriptId(12),
                ..
            })
        ));
        assert_eq!(steps[steps.len() - 2], Step::Emit(Command::ResetCamera));
    }
}
