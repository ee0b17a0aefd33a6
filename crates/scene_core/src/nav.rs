use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use tracing::{debug, warn};

use crate::math::GridPos;
use crate::tilemap::{Layer, Tilemap, NEIGHBOR_OFFSETS};

pub const STRAIGHT_STEP_COST: u32 = 10;
pub const DIAGONAL_STEP_COST: u32 = 14;

/// Tile steps from the start (exclusive) to the goal (inclusive), plus the summed cost.
/// An empty path means there is nothing to walk: unreachable, out of bounds, or already there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TilePath {
    pub steps: Vec<GridPos>,
    pub cost: u32,
}

impl TilePath {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn last(&self) -> Option<GridPos> {
        self.steps.last().copied()
    }
}

/// Extra cost for stepping onto a tile, biasing routes away from walls.
pub fn obstacle_weight(distance_to_nearest_obstacle: u8) -> Option<u32> {
    match distance_to_nearest_obstacle {
        0 => None,
        1 => Some(20),
        2 => Some(10),
        3 => Some(5),
        _ => Some(0),
    }
}

/// Any-angle search on one layer.
///
/// `transient` holds tiles occupied right now (actors and their neighbours); those are
/// ignored within one tile of the start and of the goal. Reads only its arguments, so
/// concurrent calls against a shared `Tilemap` need no locking.
pub fn find_path(
    tilemap: &Tilemap,
    layer: usize,
    from: GridPos,
    to: GridPos,
    transient: &HashSet<GridPos>,
) -> TilePath {
    let Some(layer_ref) = tilemap.layer(layer) else {
        warn!(layer, layer_count = tilemap.layer_count(), "path_request_unknown_layer");
        return TilePath::default();
    };
    if !layer_ref.contains(from) || !layer_ref.contains(to) {
        warn!(
            layer,
            from_x = from.x,
            from_y = from.y,
            to_x = to.x,
            to_y = to.y,
            "path_request_out_of_bounds"
        );
        return TilePath::default();
    }

    let goal = if layer_ref.is_walkable(to) {
        to
    } else {
        match tilemap.adjacent_walkable_tile(to, layer) {
            Some(substitute) => substitute,
            None => {
                debug!(layer, to_x = to.x, to_y = to.y, "path_destination_unreachable");
                return TilePath::default();
            }
        }
    };
    if from == goal {
        return TilePath::default();
    }

    let grid = SearchGrid {
        layer: layer_ref,
        start: from,
        goal,
        transient,
    };
    grid.search().unwrap_or_default()
}

struct SearchGrid<'a> {
    layer: &'a Layer,
    start: GridPos,
    goal: GridPos,
    transient: &'a HashSet<GridPos>,
}

type OpenKey = Reverse<(u32, u32, i32, i32, u64)>;

impl SearchGrid<'_> {
    fn passable(&self, pos: GridPos) -> bool {
        if !self.layer.is_walkable(pos) {
            return false;
        }
        if !self.transient.contains(&pos) {
            return true;
        }
        pos.chebyshev_distance(self.start) <= 1 || pos.chebyshev_distance(self.goal) <= 1
    }

    /// Cost of one 8-connected step, or `None` when the step is illegal.
    fn step_cost(&self, from: GridPos, to: GridPos) -> Option<u32> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if !self.passable(to) {
            return None;
        }
        let base = if dx != 0 && dy != 0 {
            if !self.passable(from.offset(dx, 0)) || !self.passable(from.offset(0, dy)) {
                return None;
            }
            DIAGONAL_STEP_COST
        } else {
            STRAIGHT_STEP_COST
        };
        let tile = self.layer.tile_at(to)?;
        let weight = obstacle_weight(tile.distance_to_nearest_obstacle())?;
        Some(base + weight)
    }

    /// Cost of walking the straight segment tile by tile, or `None` when any step is blocked.
    fn segment_cost(&self, from: GridPos, to: GridPos) -> Option<u32> {
        let line = line_tiles(from, to);
        line.windows(2)
            .try_fold(0u32, |total, pair| Some(total + self.step_cost(pair[0], pair[1])?))
    }

    fn search(&self) -> Option<TilePath> {
        let node_count = self.layer.width() as usize * self.layer.height() as usize;
        let start_index = self.layer.index_of(self.start)?;
        let goal_index = self.layer.index_of(self.goal)?;

        let mut closed = vec![false; node_count];
        let mut best_g = vec![u32::MAX; node_count];
        let mut parent = vec![None::<usize>; node_count];
        let mut open: BinaryHeap<OpenKey> = BinaryHeap::new();
        let mut next_insertion = 0u64;

        best_g[start_index] = 0;
        let start_h = octile_distance(self.start, self.goal);
        open.push(Reverse((start_h, start_h, self.start.y, self.start.x, next_insertion)));

        while let Some(Reverse((_, _, y, x, _))) = open.pop() {
            let current = GridPos::new(x, y);
            let Some(current_index) = self.layer.index_of(current) else {
                continue;
            };
            if closed[current_index] {
                continue;
            }
            closed[current_index] = true;

            if current_index == goal_index {
                return Some(self.reconstruct(&parent, start_index, goal_index, best_g[goal_index]));
            }

            let current_g = best_g[current_index];
            let grandparent = parent[current_index];
            for (dx, dy) in NEIGHBOR_OFFSETS {
                let neighbor = current.offset(dx, dy);
                let Some(neighbor_index) = self.layer.index_of(neighbor) else {
                    continue;
                };
                if closed[neighbor_index] {
                    continue;
                }
                let Some(step) = self.step_cost(current, neighbor) else {
                    continue;
                };

                let mut candidate_parent = current_index;
                let mut tentative_g = current_g + step;
                if let Some(grandparent_index) = grandparent {
                    let grandparent_pos = self.layer.position_of(grandparent_index);
                    if let Some(segment) = self.segment_cost(grandparent_pos, neighbor) {
                        let via_grandparent = best_g[grandparent_index] + segment;
                        if via_grandparent <= tentative_g {
                            candidate_parent = grandparent_index;
                            tentative_g = via_grandparent;
                        }
                    }
                }

                if tentative_g >= best_g[neighbor_index] {
                    continue;
                }
                best_g[neighbor_index] = tentative_g;
                parent[neighbor_index] = Some(candidate_parent);
                let h = octile_distance(neighbor, self.goal);
                next_insertion += 1;
                open.push(Reverse((
                    tentative_g + h,
                    h,
                    neighbor.y,
                    neighbor.x,
                    next_insertion,
                )));
            }
        }

        None
    }

    fn reconstruct(
        &self,
        parent: &[Option<usize>],
        start_index: usize,
        goal_index: usize,
        cost: u32,
    ) -> TilePath {
        let mut waypoints = vec![goal_index];
        let mut cursor = goal_index;
        while cursor != start_index {
            let Some(next) = parent.get(cursor).copied().flatten() else {
                return TilePath::default();
            };
            cursor = next;
            waypoints.push(cursor);
        }
        waypoints.reverse();

        let mut steps = Vec::new();
        for pair in waypoints.windows(2) {
            let from = self.layer.position_of(pair[0]);
            let to = self.layer.position_of(pair[1]);
            steps.extend(line_tiles(from, to).into_iter().skip(1));
        }
        TilePath { steps, cost }
    }
}

/// 8-connected Bresenham line, both endpoints included.
pub fn line_tiles(from: GridPos, to: GridPos) -> Vec<GridPos> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);
    let mut tiles = Vec::with_capacity(dx.max(-dy) as usize + 1);

    loop {
        tiles.push(GridPos::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
    tiles
}

fn octile_distance(a: GridPos, b: GridPos) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    let (long, short) = if dx > dy { (dx, dy) } else { (dy, dx) };
    STRAIGHT_STEP_COST * (long - short) + DIAGONAL_STEP_COST * short
}
