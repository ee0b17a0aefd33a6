use tracing::debug;

use crate::bus::Command;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo,
    ObjectKind, Sequence, TriggerResponse,
};

use super::{floor_param, set_floor_blocked, tile_param};

/// Springs when the player steps in and knocks them back to tile `param[0..=1]`.
#[derive(Debug)]
pub struct Trap {
    core: ObjectCore,
}

impl Trap {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for Trap {
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
        let ticket = self.core.play_animation(env, "spring");
        let sequence = Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .run_script(self.core.script(), ctx);
        let Some(player) = ctx.player else {
            return sequence;
        };
        let Some((_, layer)) = env.movement.current_tile(player) else {
            return sequence;
        };
        let landing = tile_param(&self.core, 0, 1);
        if !env.tilemap.is_walkable(landing, layer) {
            debug!(object_id = self.core.id().0, x = landing.x, y = landing.y, "trap_landing_blocked");
            return sequence;
        }
        let target = env.tilemap.grid_to_world(landing, layer);
        let ticket = env.movement.move_to(player, target, false);
        sequence.wait_movement(ticket)
    }
}

/// Drops `param[0]` tenths of a second after the player enters. Weapons shake the camera;
/// obstacles land on floor `param[1]` and block it.
#[derive(Debug)]
pub struct FallingObject {
    core: ObjectCore,
    weapon: bool,
}

impl FallingObject {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let weapon = info.kind() == Some(ObjectKind::FallableWeapon);
        Box::new(Self {
            core: ObjectCore::new(info, level),
            weapon,
        })
    }

    fn has_fallen(&self) -> bool {
        self.core.switch_state() != 0
    }
}

impl InteractiveObject for FallingObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        if !self.weapon && self.has_fallen() {
            set_floor_blocked(env, floor_param(&self.core, 1), true);
        }
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        if self.has_fallen() {
            TriggerResponse::Ignore
        } else {
            TriggerResponse::InteractAfter(self.core.param_seconds(0))
        }
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let mut sequence = Sequence::new(self.core.id());
        if self.has_fallen() {
            return sequence;
        }
        self.core.set_switch_state_and_persist(env, 1);
        let ticket = self.core.play_animation(env, "fall");
        sequence = sequence.play_sfx(self.core.sfx()).wait_animation(ticket);
        if self.weapon {
            sequence = sequence.emit(Command::ShakeCamera {
                duration_seconds: 0.4,
            });
        } else {
            set_floor_blocked(env, floor_param(&self.core, 1), true);
        }
        sequence.chain(self.core.linked_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::ActorMovement;
    use crate::math::{GridPos, WorldPos};
    use crate::objects::Step;
    use crate::testing::{ctx, info, TestWorld, PLAYER};
    use crate::tilemap::{FloorType, Layer, Tile, Tilemap};

    #[test]
    fn trap_knocks_player_back_to_landing_tile() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::Trap);
        authored.parameters = [3, 2, 0, 0, 0, 0];
        let mut trap = world.activated(authored);
        assert_eq!(trap.on_player_entered(&mut world.env()), TriggerResponse::InteractNow);

        trap.interact(&ctx(1), &mut world.env());
        world.movement.complete_moves(&world.tilemap);
        assert_eq!(
            world.movement.current_tile(PLAYER),
            Some((GridPos::new(3, 2), 0))
        );
    }

    #[test]
    fn falling_obstacle_waits_then_blocks_its_floor() {
        let tiles = vec![
            Tile::new(0.0, FloorType(0), true, 4),
            Tile::new(0.0, FloorType(6), true, 4),
        ];
        let layer = Layer::new(2, 1, WorldPos::default(), tiles, Vec::new()).expect("layer");
        let mut world = TestWorld::with_tilemap(Tilemap::new(vec![layer]).expect("tilemap"));
        let mut authored = info(1, ObjectKind::FallableObstacle);
        authored.parameters = [15, 6, 0, 0, 0, 0];
        let mut rock = world.activated(authored);

        assert_eq!(
            rock.on_player_entered(&mut world.env()),
            TriggerResponse::InteractAfter(1.5)
        );
        rock.interact(&ctx(1), &mut world.env());
        assert!(!world.tilemap.is_walkable(GridPos::new(1, 0), 0));
        assert_eq!(rock.on_player_entered(&mut world.env()), TriggerResponse::Ignore);
    }

    #[test]
    fn falling_weapon_shakes_the_camera() {
        let mut world = TestWorld::new();
        let mut sword = world.activated(info(1, ObjectKind::FallableWeapon));
        let sequence = sword.interact(&ctx(1), &mut world.env());
        assert!(sequence
            .steps()
            .any(|step| matches!(step, Step::Emit(Command::ShakeCamera { .. }))));
    }
}
