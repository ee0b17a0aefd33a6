use tracing::debug;

use crate::collab::PersistedField;
use crate::math::{GridPos, WorldPos};
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo, Sequence,
};
use crate::tilemap::TILE_SIZE;

use super::{floor_param, player_position, within_reach};

fn push_direction(from: GridPos, to: GridPos) -> (i32, i32) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() >= dy.abs() {
        (dx.signum(), 0)
    } else {
        (0, dy.signum())
    }
}

/// Block the player shoves one tile away from themselves. Landing on floor `param[0]` solves it:
/// the switch state goes to 1 and the chain continues.
#[derive(Debug)]
pub struct PushableBlock {
    core: ObjectCore,
}

impl PushableBlock {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for PushableBlock {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        self.core.switch_state() == 0 && within_reach(distance)
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if self.core.switch_state() != 0 {
            return sequence;
        }
        let layer = self.core.layer_index();
        let Some((_, player_world, _)) = player_position(env, ctx) else {
            return sequence;
        };
        let block = env.tilemap.world_to_grid(self.core.position(), layer);
        let player = env.tilemap.world_to_grid(player_world, layer);
        let (dx, dy) = push_direction(player, block);
        if (dx, dy) == (0, 0) {
            return sequence;
        }
        let destination = block.offset(dx, dy);
        if !env.tilemap.is_walkable(destination, layer) {
            debug!(object_id = self.core.id().0, x = destination.x, y = destination.y, "push_blocked");
            return sequence;
        }

        let ticket = self.core.play_animation(env, "push");
        let target = env.tilemap.grid_to_world(destination, layer);
        self.core.set_position_and_persist(env, target);
        let sequence = sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket);

        let solved = floor_param(&self.core, 0).is_some_and(|goal| {
            env.tilemap
                .tile(destination, layer)
                .is_some_and(|tile| tile.floor_type == goal)
        });
        if !solved {
            return sequence;
        }
        self.core.set_switch_state_and_persist(env, 1);
        sequence.chain(self.core.linked_object())
    }
}

/// Slides between its authored spot and `param[0..=1]` tiles away, one way then back.
#[derive(Debug)]
pub struct BidirectionalPushable {
    core: ObjectCore,
    home: WorldPos,
    pushed: bool,
}

impl BidirectionalPushable {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let home = info.position;
        Box::new(Self {
            core: ObjectCore::new(info, level),
            home,
            pushed: false,
        })
    }

    fn far_position(&self) -> WorldPos {
        WorldPos::new(
            self.home.x + self.core.param(0) as f32 * TILE_SIZE,
            self.home.y,
            self.home.z + self.core.param(1) as f32 * TILE_SIZE,
        )
    }
}

impl InteractiveObject for BidirectionalPushable {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        self.pushed = self
            .core
            .restored()
            .bidirectional_push_state
            .is_some_and(|state| state != 0);
        if self.pushed && self.core.restored().position.is_none() {
            let far = self.far_position();
            self.core.set_position_and_persist(env, far);
        }
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        within_reach(distance)
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        self.pushed = !self.pushed;
        self.core.persist(
            env,
            PersistedField::BidirectionalPushState(u8::from(self.pushed)),
        );
        let target = if self.pushed {
            self.far_position()
        } else {
            self.home
        };
        let ticket = self.core.play_animation(env, "push");
        self.core.set_position_and_persist(env, target);
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .chain(self.core.linked_object())
    }
}
