use tracing::debug;

use crate::math::{GridPos, WorldPos};
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo, Sequence,
    TriggerResponse,
};

use super::{layer_param, player_position, tile_param, within_reach};

/// Walks the player to `tile` on `layer`, switching navigation layers first.
fn carry_player(
    sequence: Sequence,
    core: &ObjectCore,
    ctx: &InteractionContext,
    env: &mut ObjectEnv<'_>,
    tile: GridPos,
    layer: usize,
    obstacle_aware: bool,
) -> Sequence {
    let Some(player) = ctx.player else {
        return sequence;
    };
    if !env.tilemap.is_inside(tile, layer) {
        debug!(object_id = core.id().0, layer, x = tile.x, y = tile.y, "mover_target_outside_grid");
        return sequence;
    }
    env.movement.set_navigation_layer(player, layer);
    let target = env.tilemap.grid_to_world(tile, layer);
    let ticket = env.movement.move_to(player, target, obstacle_aware);
    sequence.wait_movement(ticket)
}

/// Ladder or vine. `param[0..=1]` top tile, `param[2]` top layer.
#[derive(Debug)]
pub struct Climbable {
    core: ObjectCore,
}

impl Climbable {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for Climbable {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        within_reach(distance)
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let tile = tile_param(&self.core, 0, 1);
        let layer = layer_param(&self.core, 2);
        let sequence = Sequence::new(self.core.id()).play_sfx(self.core.sfx());
        carry_player(sequence, &self.core, ctx, env, tile, layer, false)
    }
}

/// Platform shuttling between `param[0]` (lower) and `param[1]` (upper) layers; stop heights
/// are `param[2]` and `param[3]` in tenths. A player standing on it rides along.
#[derive(Debug)]
pub struct Elevator {
    core: ObjectCore,
}

impl Elevator {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn stops(&self) -> (usize, usize) {
        let lower = usize::try_from(self.core.param(0)).unwrap_or(0);
        let upper = usize::try_from(self.core.param(1)).unwrap_or(lower);
        (lower, upper)
    }
}

impl InteractiveObject for Elevator {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let (lower, upper) = self.stops();
        let going_up = self.core.layer_index() != upper;
        let (target_layer, height_slot) = if going_up { (upper, 3) } else { (lower, 2) };
        let sequence = Sequence::new(self.core.id());
        if !env.tilemap.is_inside(GridPos::new(0, 0), target_layer) {
            debug!(object_id = self.core.id().0, target_layer, "elevator_stop_missing");
            return sequence;
        }

        let rider = player_position(env, ctx).filter(|(_, position, layer)| {
            *layer == self.core.layer_index()
                && position.horizontal_distance(self.core.position()) <= 1.0
        });
        let position = self.core.position();
        let destination = WorldPos::new(
            position.x,
            self.core.param(height_slot) as f32 / 10.0,
            position.z,
        );
        let ticket = self.core.play_animation(env, if going_up { "up" } else { "down" });
        self.core.set_layer_and_persist(env, target_layer);
        self.core.set_position_and_persist(env, destination);

        let mut sequence = sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket);
        if let Some((player, _, _)) = rider {
            env.movement.set_navigation_layer(player, target_layer);
            let ride = env.movement.move_to(player, destination, false);
            sequence = sequence.wait_movement(ride);
        }
        sequence.chain(self.core.linked_object())
    }
}

/// Raft or cart moving between its authored spot (state 0) and tile `param[0..=1]` on its
/// layer (state 1), carrying a nearby player.
#[derive(Debug)]
pub struct MovableCarrier {
    core: ObjectCore,
    home: WorldPos,
}

impl MovableCarrier {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let home = info.position;
        Box::new(Self {
            core: ObjectCore::new(info, level),
            home,
        })
    }
}

impl InteractiveObject for MovableCarrier {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        within_reach(distance)
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let layer = self.core.layer_index();
        let far_tile = tile_param(&self.core, 0, 1);
        let sequence = Sequence::new(self.core.id());
        if !env.tilemap.is_inside(far_tile, layer) {
            return sequence;
        }
        let rider = player_position(env, ctx).filter(|(_, position, rider_layer)| {
            *rider_layer == layer && within_reach(position.horizontal_distance(self.core.position()))
        });

        let state = self.core.flip_switch_state_and_persist(env);
        let destination = if state == 0 {
            self.home
        } else {
            env.tilemap.grid_to_world(far_tile, layer)
        };
        self.core.set_position_and_persist(env, destination);

        let mut sequence = sequence.play_sfx(self.core.sfx());
        if let Some((player, _, _)) = rider {
            let ticket = env.movement.move_to(player, destination, false);
            sequence = sequence.wait_movement(ticket);
        }
        sequence.chain(self.core.linked_object())
    }
}

/// Slope the player slides down on entry. `param[0..=1]` bottom tile on the object's layer.
#[derive(Debug)]
pub struct SlideWay {
    core: ObjectCore,
}

impl SlideWay {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for SlideWay {
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
        let tile = tile_param(&self.core, 0, 1);
        let layer = self.core.layer_index();
        let sequence = Sequence::new(self.core.id()).play_sfx(self.core.sfx());
        carry_player(sequence, &self.core, ctx, env, tile, layer, false)
    }
}

/// Gap the player can leap. `param[0..=1]` landing tile, `param[2]` landing layer.
#[derive(Debug)]
pub struct JumpPoint {
    core: ObjectCore,
}

impl JumpPoint {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for JumpPoint {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        within_reach(distance)
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let tile = tile_param(&self.core, 0, 1);
        let layer = layer_param(&self.core, 2);
        let sequence = Sequence::new(self.core.id()).play_sfx(self.core.sfx());
        carry_player(sequence, &self.core, ctx, env, tile, layer, false)
    }
}

/// Pad that sends the player to its linked teleporter, or to tile `param[0..=1]` on layer
/// `param[2]` when unlinked.
#[derive(Debug)]
pub struct Teleporter {
    core: ObjectCore,
}

impl Teleporter {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn destination(&self, env: &ObjectEnv<'_>) -> (GridPos, usize) {
        if let Some(partner) = self
            .core
            .linked_object()
            .and_then(|id| env.peers.get(id))
        {
            let layer = partner.core().layer_index();
            return (env.tilemap.world_to_grid(partner.core().position(), layer), layer);
        }
        (tile_param(&self.core, 0, 1), layer_param(&self.core, 2))
    }
}

impl InteractiveObject for Teleporter {
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
        let (tile, layer) = self.destination(env);
        let sequence = Sequence::new(self.core.id()).play_sfx(self.core.sfx());
        carry_player(sequence, &self.core, ctx, env, tile, layer, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{ActorMovement, SaveStateStore};
    use crate::objects::{ObjectKind, Step};
    use crate::testing::{ctx, info, TestWorld, PLAYER};
    use crate::tilemap::tests::open_layer;
    use crate::tilemap::Tilemap;

    fn two_layer_world() -> TestWorld {
        TestWorld::with_tilemap(
            Tilemap::new(vec![
                open_layer(8, 8, WorldPos::default()),
                open_layer(8, 8, WorldPos::new(0.0, 3.0, 0.0)),
            ])
            .expect("tilemap"),
        )
    }

    #[test]
    fn elevator_carries_player_standing_on_it() {
        let mut world = two_layer_world();
        let mut authored = info(1, ObjectKind::Elevator);
        authored.parameters = [0, 1, 0, 30, 0, 0];
        authored.position = world.tilemap.grid_to_world(GridPos::new(0, 0), 0);
        let mut elevator = world.activated(authored);

        let sequence = elevator.interact(&ctx(1), &mut world.env());
        assert_eq!(elevator.core().layer_index(), 1);
        assert_eq!(elevator.core().position().y, 3.0);
        assert!(sequence
            .steps()
            .any(|step| matches!(step, Step::Wait(crate::objects::WaitCondition::Movement(_)))));
        assert_eq!(world.movement.current_tile(PLAYER).map(|(_, layer)| layer), Some(1));

        let saved = world
            .save
            .object_override(&world.level.id, elevator.core().id())
            .expect("saved");
        assert_eq!(saved.layer_index, Some(1));

        elevator.interact(&ctx(1), &mut world.env());
        assert_eq!(elevator.core().layer_index(), 0);
    }

    #[test]
    fn elevator_leaves_distant_player_behind() {
        let mut world = two_layer_world();
        let mut authored = info(1, ObjectKind::Elevator);
        authored.parameters = [0, 1, 0, 30, 0, 0];
        authored.position = world.tilemap.grid_to_world(GridPos::new(6, 6), 0);
        let mut elevator = world.activated(authored);
        elevator.interact(&ctx(1), &mut world.env());
        assert_eq!(world.movement.pending_move_count(), 0);
    }

    #[test]
    fn carrier_shuttles_between_home_and_far_tile() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::MovableCarrier);
        authored.parameters = [5, 0, 0, 0, 0, 0];
        let home = world.tilemap.grid_to_world(GridPos::new(1, 0), 0);
        authored.position = home;
        let mut carrier = world.activated(authored);

        carrier.interact(&ctx(1), &mut world.env());
        assert_eq!(
            carrier.core().position(),
            world.tilemap.grid_to_world(GridPos::new(5, 0), 0)
        );
        assert_eq!(world.movement.pending_move_count(), 1);
        carrier.interact(&ctx(1), &mut world.env());
        assert_eq!(carrier.core().position(), home);
    }

    #[test]
    fn teleporter_prefers_linked_partner() {
        let mut world = two_layer_world();
        let mut partner = info(2, ObjectKind::Teleporter);
        partner.layer_index = 1;
        partner.position = world.tilemap.grid_to_world(GridPos::new(6, 2), 1);
        world.add_peer(partner);

        let mut authored = info(1, ObjectKind::Teleporter);
        authored.linked_object_id = 2;
        let mut pad = world.activated(authored);
        pad.interact(&ctx(1), &mut world.env());
        world.movement.complete_moves(&world.tilemap);
        assert_eq!(
            world.movement.current_tile(PLAYER),
            Some((GridPos::new(6, 2), 1))
        );
    }

    #[test]
    fn mover_with_target_off_grid_does_not_move_player() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::JumpableArea);
        authored.parameters = [20, 20, 0, 0, 0, 0];
        let mut jump = world.activated(authored);
        jump.interact(&ctx(1), &mut world.env());
        assert_eq!(world.movement.pending_move_count(), 0);
    }
}
