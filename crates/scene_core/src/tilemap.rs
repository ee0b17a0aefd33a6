use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{GridPos, GridRect, WorldPos};

/// World-space edge length of one tile.
pub const TILE_SIZE: f32 = 0.5;
pub const OBSTACLE_DISTANCE_CAP: u8 = 4;

/// Neighbour scan order shared by the adjacent-tile lookup and the path search:
/// orthogonal neighbours first, then diagonals.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, -1),
    (-1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorType(pub u8);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub y_height: f32,
    pub floor_type: FloorType,
    walkable: bool,
    distance_to_nearest_obstacle: u8,
    floor_blocked: bool,
}

impl Tile {
    pub fn new(
        y_height: f32,
        floor_type: FloorType,
        walkable: bool,
        distance_to_nearest_obstacle: u8,
    ) -> Self {
        Self {
            y_height,
            floor_type,
            walkable,
            distance_to_nearest_obstacle: distance_to_nearest_obstacle.min(OBSTACLE_DISTANCE_CAP),
            floor_blocked: false,
        }
    }

    pub fn is_walkable(&self) -> bool {
        self.walkable && self.distance_to_nearest_obstacle > 0 && !self.floor_blocked
    }

    pub fn distance_to_nearest_obstacle(&self) -> u8 {
        self.distance_to_nearest_obstacle
    }

    pub fn is_blocked_by_floor_type(&self) -> bool {
        self.floor_blocked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("a tilemap needs at least one layer")]
    NoLayers,
}

/// One vertical stratum of the level.
///
/// `origin` is the world position of the corner of tile (0,0); tile (x,y) covers
/// `origin.x + x * TILE_SIZE .. + TILE_SIZE` on the x axis and the same on z for y.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    width: u32,
    height: u32,
    origin: WorldPos,
    tiles: Arc<Vec<Tile>>,
    portals: Vec<GridRect>,
}

impl Layer {
    pub fn new(
        width: u32,
        height: u32,
        origin: WorldPos,
        tiles: Vec<Tile>,
        portals: Vec<GridRect>,
    ) -> Result<Self, TilemapError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            origin,
            tiles: Arc::new(tiles),
            portals,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> WorldPos {
        self.origin
    }

    pub fn portals(&self) -> &[GridRect] {
        &self.portals
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.index_of(pos).is_some()
    }

    pub fn index_of(&self, pos: GridPos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as u32, pos.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn position_of(&self, index: usize) -> GridPos {
        let width = self.width.max(1) as usize;
        GridPos::new((index % width) as i32, (index / width) as i32)
    }

    pub fn tile_at(&self, pos: GridPos) -> Option<&Tile> {
        self.index_of(pos).and_then(|index| self.tiles.get(index))
    }

    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.tile_at(pos).is_some_and(Tile::is_walkable)
    }

    fn set_floor_blocked(&mut self, floor_type: FloorType, blocked: bool) -> usize {
        let needs_change = self
            .tiles
            .iter()
            .any(|tile| tile.floor_type == floor_type && tile.floor_blocked != blocked);
        if !needs_change {
            return 0;
        }

        let mut changed = 0usize;
        for tile in Arc::make_mut(&mut self.tiles).iter_mut() {
            if tile.floor_type == floor_type && tile.floor_blocked != blocked {
                tile.floor_blocked = blocked;
                changed += 1;
            }
        }
        changed
    }
}

/// Multi-layer walkability grid.
///
/// Cloning is cheap: tiles are shared until a floor-type toggle writes to a layer, so a
/// clone taken before a path request is a stable snapshot for a worker thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    layers: Vec<Layer>,
}

impl Tilemap {
    pub fn new(layers: Vec<Layer>) -> Result<Self, TilemapError> {
        if layers.is_empty() {
            return Err(TilemapError::NoLayers);
        }
        Ok(Self { layers })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn is_inside(&self, pos: GridPos, layer: usize) -> bool {
        self.layer(layer).is_some_and(|layer| layer.contains(pos))
    }

    pub fn world_to_grid(&self, world: WorldPos, layer: usize) -> GridPos {
        let origin = self.layer_origin(layer);
        GridPos::new(
            ((world.x - origin.x) / TILE_SIZE).floor() as i32,
            ((world.z - origin.z) / TILE_SIZE).floor() as i32,
        )
    }

    /// Centre of the cell. Height comes from the tile; out-of-bounds cells sit at the
    /// layer origin height, so check `is_inside` first when the height matters.
    pub fn grid_to_world(&self, pos: GridPos, layer: usize) -> WorldPos {
        let origin = self.layer_origin(layer);
        let y_height = self
            .tile(pos, layer)
            .map(|tile| tile.y_height)
            .unwrap_or(0.0);
        WorldPos {
            x: origin.x + (pos.x as f32 + 0.5) * TILE_SIZE,
            y: origin.y + y_height,
            z: origin.z + (pos.y as f32 + 0.5) * TILE_SIZE,
        }
    }

    pub fn tile(&self, pos: GridPos, layer: usize) -> Option<Tile> {
        self.layer(layer).and_then(|layer| layer.tile_at(pos)).copied()
    }

    pub fn is_walkable(&self, pos: GridPos, layer: usize) -> bool {
        self.layer(layer).is_some_and(|layer| layer.is_walkable(pos))
    }

    pub fn is_inside_portal_area(&self, world: WorldPos, layer: usize) -> bool {
        let Some(layer_ref) = self.layer(layer) else {
            return false;
        };
        let pos = self.world_to_grid(world, layer);
        layer_ref
            .portals()
            .iter()
            .any(|portal| inflate_portal(*portal).contains(pos))
    }

    /// Returns how many tiles changed. Un-marking restores each tile's own walkability.
    pub fn mark_floor_type_as_obstacle(&mut self, floor_type: FloorType, is_obstacle: bool) -> usize {
        self.layers
            .iter_mut()
            .map(|layer| layer.set_floor_blocked(floor_type, is_obstacle))
            .sum()
    }

    pub fn adjacent_walkable_tile(&self, pos: GridPos, layer: usize) -> Option<GridPos> {
        let layer_ref = self.layer(layer)?;
        NEIGHBOR_OFFSETS
            .iter()
            .map(|(dx, dy)| pos.offset(*dx, *dy))
            .find(|neighbor| layer_ref.is_walkable(*neighbor))
    }

    fn layer_origin(&self, layer: usize) -> WorldPos {
        self.layer(layer)
            .map(Layer::origin)
            .unwrap_or_default()
    }
}

fn inflate_portal(rect: GridRect) -> GridRect {
    // Adjacent portals are authored with a one tile gap along their shorter axis.
    if rect.width() < rect.height() {
        GridRect {
            right: rect.right + 1,
            ..rect
        }
    } else {
        GridRect {
            bottom: rect.bottom + 1,
            ..rect
        }
    }
}
