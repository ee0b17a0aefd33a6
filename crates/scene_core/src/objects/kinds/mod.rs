//! The variant catalog. Each type serves one or more kind tags; parameter slots are
//! documented on the type.

pub mod blockers;
pub mod bridges;
pub mod doors;
pub mod hazards;
pub mod movers;
pub mod pickups;
pub mod points;
pub mod portals;
pub mod props;
pub mod pushables;
pub mod switches;
pub mod three_phase;
pub mod triggers;

use crate::collab::ActorId;
use crate::math::{GridPos, WorldPos};
use crate::tilemap::FloorType;

use super::{InteractionContext, ObjectCore, ObjectEnv, DIRECT_INTERACTION_RADIUS};

/// Slot value as a floor type; zero and negatives mean "no floor".
pub(crate) fn floor_param(core: &ObjectCore, slot: usize) -> Option<FloorType> {
    let value = core.param(slot);
    (1..=i32::from(u8::MAX))
        .contains(&value)
        .then_some(FloorType(value as u8))
}

pub(crate) fn tile_param(core: &ObjectCore, x_slot: usize, y_slot: usize) -> GridPos {
    GridPos::new(core.param(x_slot), core.param(y_slot))
}

/// Layer from a slot, falling back to the object's own layer for negatives.
pub(crate) fn layer_param(core: &ObjectCore, slot: usize) -> usize {
    usize::try_from(core.param(slot)).unwrap_or(core.layer_index())
}

pub(crate) fn set_floor_blocked(env: &mut ObjectEnv<'_>, floor: Option<FloorType>, blocked: bool) {
    if let Some(floor) = floor {
        env.tilemap.mark_floor_type_as_obstacle(floor, blocked);
    }
}

pub(crate) fn player_position(env: &ObjectEnv<'_>, ctx: &InteractionContext) -> Option<(ActorId, WorldPos, usize)> {
    let player = ctx.player?;
    let (tile, layer) = env.movement.current_tile(player)?;
    Some((player, env.tilemap.grid_to_world(tile, layer), layer))
}

pub(crate) fn within_reach(distance: f32) -> bool {
    distance <= DIRECT_INTERACTION_RADIUS
}

pub(crate) fn clip_for_state(state: u8, on: &'static str, off: &'static str) -> &'static str {
    if state == 0 {
        off
    } else {
        on
    }
}
