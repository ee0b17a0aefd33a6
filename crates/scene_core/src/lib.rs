pub mod bus;
pub mod collab;
pub mod headless;
pub mod math;
pub mod nav;
pub mod objects;
pub mod session;
pub mod tilemap;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{Command, CommandCounts, CommandKind, CommandOutbox, CorrelationId, SessionCommand};
pub use collab::{
    ActorId, ActorMovement, AnimationTicket, ColliderShape, EntityDesc, EntityHandle, LevelId,
    MemorySaveState, MoveTicket, ObjectOverride, PersistedField, SaveStateStore, SceneGraph,
    ScriptId, Tint,
};
pub use headless::{HeadlessMovement, HeadlessSceneGraph};
pub use math::{GridPos, GridRect, WorldPos};
pub use nav::{find_path, TilePath, DIAGONAL_STEP_COST, STRAIGHT_STEP_COST};
pub use objects::{
    ActivationError, InteractionContext, InteractiveObject, LevelInfo, ModelKind, ModelRef,
    ObjectId, ObjectInfo, ObjectKind, ObjectRegistry, ObjectTweak, RegistryError, TriggerShape,
    NO_LINKED_OBJECT,
};
pub use session::{
    ActorSpawn, CancellationToken, HeadlessSession, LevelData, LevelSession, LoadReport,
    SessionError,
};
pub use tilemap::{FloorType, Layer, Tile, Tilemap, TilemapError, TILE_SIZE};
