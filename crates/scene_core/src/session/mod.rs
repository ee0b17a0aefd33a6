//! Level Session: owns the tile grid, the live objects and the interaction scheduler for one
//! loaded level, and is the only entry point for gameplay commands.

mod scheduler;
mod triggers;

use std::collections::{BTreeMap, HashSet, VecDeque};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::bus::{Command, CommandOutbox, CorrelationId, SessionCommand};
use crate::collab::{
    ActorId, ActorMovement, EntityHandle, MemorySaveState, SaveStateStore, SceneGraph, Tint,
};
use crate::headless::{HeadlessMovement, HeadlessSceneGraph};
use crate::math::GridPos;
use crate::nav::{self, TilePath};
use crate::objects::{
    ActivationError, InteractionContext, InteractiveObject, LevelInfo, ObjectEnv, ObjectId,
    ObjectInfo, ObjectRegistry, Peers, Step, TriggerResponse, WaitCondition,
};
use crate::tilemap::{Tilemap, NEIGHBOR_OFFSETS};

use scheduler::{RunningSequence, Scheduler};
pub use triggers::CancellationToken;
use triggers::TriggerTracker;

/// Passes `route_commands` makes before leaving the remainder for the next call.
pub const MAX_ROUTING_PASSES: usize = 8;
const MAX_COMPLETION_PASSES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorSpawn {
    pub id: ActorId,
    pub tile: GridPos,
    pub layer: usize,
    pub active: bool,
    pub is_player: bool,
}

/// Decoded input for one level entry.
#[derive(Debug, Clone)]
pub struct LevelData {
    pub info: LevelInfo,
    pub tilemap: Tilemap,
    pub objects: Vec<ObjectInfo>,
    pub actors: Vec<ActorSpawn>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub created: usize,
    pub activated: usize,
    pub failed: usize,
    pub unregistered: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("scene object {0} not found")]
    ObjectNotFound(ObjectId),
    #[error(transparent)]
    Activation(#[from] ActivationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActorState {
    active: bool,
    is_player: bool,
}

pub struct LevelSession<G: SceneGraph, M: ActorMovement, S: SaveStateStore> {
    level: LevelInfo,
    tilemap: Tilemap,
    objects: BTreeMap<ObjectId, Box<dyn InteractiveObject>>,
    actors: BTreeMap<ActorId, ActorState>,
    scene: G,
    movement: M,
    save: S,
    outbox: CommandOutbox,
    scheduler: Scheduler,
    triggers: TriggerTracker,
    player_tile: Option<(GridPos, usize)>,
    /// Player tile as last read from the movement collaborator.
    movement_tile: Option<(GridPos, usize)>,
    next_correlation_id: u64,
    load_report: LoadReport,
}

pub type HeadlessSession = LevelSession<HeadlessSceneGraph, HeadlessMovement, MemorySaveState>;

impl<G: SceneGraph, M: ActorMovement, S: SaveStateStore> LevelSession<G, M, S> {
    /// Builds one instance per descriptor and activates those that should be live, with a
    /// saved activation flag taking precedence over the authored one. Objects that fail to
    /// build or activate are counted and skipped.
    pub fn load(data: LevelData, registry: &ObjectRegistry, scene: G, movement: M, save: S) -> Self {
        let LevelData {
            info,
            tilemap,
            objects,
            actors,
        } = data;
        let mut session = Self {
            level: info,
            tilemap,
            objects: BTreeMap::new(),
            actors: actors
                .iter()
                .map(|spawn| {
                    (
                        spawn.id,
                        ActorState {
                            active: spawn.active,
                            is_player: spawn.is_player,
                        },
                    )
                })
                .collect(),
            scene,
            movement,
            save,
            outbox: CommandOutbox::default(),
            scheduler: Scheduler::default(),
            triggers: TriggerTracker::default(),
            player_tile: None,
            movement_tile: None,
            next_correlation_id: 0,
            load_report: LoadReport::default(),
        };

        let mut report = LoadReport::default();
        for object_info in objects {
            let id = object_info.id;
            if session.objects.contains_key(&id) {
                warn!(object_id = id.0, "duplicate_object_id_skipped");
                report.duplicates += 1;
                continue;
            }
            match registry.create(object_info, &session.level) {
                Some(object) => {
                    session.objects.insert(id, object);
                    report.created += 1;
                }
                None => report.unregistered += 1,
            }
        }

        let ids: Vec<ObjectId> = session.objects.keys().copied().collect();
        for id in ids {
            let authored = session
                .objects
                .get(&id)
                .is_some_and(|object| object.core().info().initially_active);
            let saved = session
                .save
                .object_override(&session.level.id, id)
                .and_then(|saved| saved.activated);
            if !saved.unwrap_or(authored) {
                continue;
            }
            match session.activate_object(id) {
                Ok(_) => report.activated += 1,
                Err(_) => report.failed += 1,
            }
        }

        session.player_tile = session
            .player()
            .and_then(|player| session.movement.current_tile(player));
        session.movement_tile = session.player_tile;
        info!(
            level = %session.level.id.key(),
            layers = session.tilemap.layer_count(),
            created = report.created,
            activated = report.activated,
            failed = report.failed,
            unregistered = report.unregistered,
            "level_loaded"
        );
        session.load_report = report;
        session
    }

    pub fn load_report(&self) -> LoadReport {
        self.load_report
    }

    pub fn level(&self) -> &LevelInfo {
        &self.level
    }

    pub fn tilemap(&self) -> &Tilemap {
        &self.tilemap
    }

    pub fn scene(&self) -> &G {
        &self.scene
    }

    pub fn movement(&self) -> &M {
        &self.movement
    }

    pub fn save_state(&self) -> &S {
        &self.save
    }

    pub fn player(&self) -> Option<ActorId> {
        self.actors
            .iter()
            .find(|(_, state)| state.is_player && state.active)
            .map(|(id, _)| *id)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&dyn InteractiveObject> {
        self.objects.get(&id).map(|object| object.as_ref())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn all_activated_object_ids(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, object)| object.core().is_active())
            .map(|(id, _)| *id)
            .collect()
    }

    fn is_object_active(&self, id: ObjectId) -> bool {
        self.objects
            .get(&id)
            .is_some_and(|object| object.core().is_active())
    }

    /// Lends one object its environment. The object is lifted out of the map for the call so
    /// the rest stay readable through `Peers`.
    fn with_object<R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut dyn InteractiveObject, &mut ObjectEnv<'_>) -> R,
    ) -> Option<R> {
        let mut object = self.objects.remove(&id)?;
        let result = {
            let mut env = ObjectEnv {
                level: &self.level,
                tilemap: &mut self.tilemap,
                scene: &mut self.scene,
                movement: &mut self.movement,
                save: &mut self.save,
                outbox: &mut self.outbox,
                peers: Peers::new(&self.objects),
            };
            f(object.as_mut(), &mut env)
        };
        self.objects.insert(id, object);
        Some(result)
    }

    pub fn activate_object(&mut self, id: ObjectId) -> Result<EntityHandle, SessionError> {
        let result = self
            .with_object(id, |object, env| object.activate(env, Tint::WHITE))
            .ok_or(SessionError::ObjectNotFound(id))?;
        match result {
            Ok(handle) => Ok(handle),
            Err(activation_error) => {
                error!(object_id = id.0, error = %activation_error, "object_activation_failed");
                Err(activation_error.into())
            }
        }
    }

    /// Tears the object down and drops every sequence it owns. Returns false for unknown ids.
    pub fn deactivate_object(&mut self, id: ObjectId) -> bool {
        if !self.objects.contains_key(&id) {
            return false;
        }
        for dropped in self.scheduler.drop_owned_by(id) {
            debug!(object_id = id.0, remaining = dropped.steps.len(), "sequence_dropped");
            self.release_dropped(dropped);
        }
        self.triggers.forget(id);
        self.with_object(id, |object, env| object.deactivate(env));
        true
    }

    /// Tiles occupied by active actors on `layer`, each with its eight neighbours.
    pub fn blocking_tiles_for_layer(&self, layer: usize, exclude: Option<ActorId>) -> HashSet<GridPos> {
        let mut blocked = HashSet::new();
        for (actor, state) in &self.actors {
            if !state.active || Some(*actor) == exclude {
                continue;
            }
            let Some((tile, actor_layer)) = self.movement.current_tile(*actor) else {
                continue;
            };
            if actor_layer != layer {
                continue;
            }
            blocked.insert(tile);
            for (dx, dy) in NEIGHBOR_OFFSETS {
                blocked.insert(tile.offset(dx, dy));
            }
        }
        blocked
    }

    pub fn find_path_for_actor(&self, actor: ActorId, to: GridPos) -> TilePath {
        let Some((from, layer)) = self.movement.current_tile(actor) else {
            warn!(actor = actor.0, "path_request_for_unplaced_actor");
            return TilePath::default();
        };
        let transient = self.blocking_tiles_for_layer(layer, Some(actor));
        nav::find_path(&self.tilemap, layer, from, to, &transient)
    }

    /// Objects the player could use right now, nearest first.
    pub fn nearby_interactables(&self) -> Vec<(ObjectId, f32)> {
        let Some((tile, layer)) = self
            .player()
            .and_then(|player| self.movement.current_tile(player))
        else {
            return Vec::new();
        };
        let here = self.tilemap.grid_to_world(tile, layer);
        let mut nearby: Vec<(ObjectId, f32)> = self
            .objects
            .iter()
            .filter(|(_, object)| {
                let core = object.core();
                core.is_active() && !core.is_interacting() && core.layer_index() == layer
            })
            .map(|(id, object)| (*id, here.horizontal_distance(object.core().position())))
            .filter(|(id, distance)| {
                self.objects
                    .get(id)
                    .is_some_and(|object| object.is_directly_interactable(*distance))
            })
            .collect();
        nearby.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        nearby
    }

    fn next_context(&mut self, initiator: ObjectId, started_by_player: bool) -> InteractionContext {
        self.next_correlation_id = self.next_correlation_id.saturating_add(1);
        InteractionContext {
            correlation_id: CorrelationId(self.next_correlation_id),
            initiator,
            player: self.player(),
            started_by_player,
        }
    }

    /// Starts an interaction and runs it up to its first wait. Returns false when the object
    /// is missing, inactive, already interacting or out of uses.
    pub fn request_interaction(&mut self, id: ObjectId, started_by_player: bool) -> bool {
        let Some(object) = self.objects.get(&id) else {
            warn!(object_id = id.0, "scene object not found or not activated yet");
            return false;
        };
        if !object.core().is_active() {
            warn!(object_id = id.0, "scene object not found or not activated yet");
            return false;
        }
        if object.core().is_interacting() {
            debug!(object_id = id.0, "interaction_reentry_ignored");
            return false;
        }
        let cutscene = started_by_player && object.should_go_to_cutscene_when_interaction_started();

        let ready = self
            .with_object(id, |object, env| object.can_interact(env))
            .unwrap_or(false);
        if !ready {
            debug!(object_id = id.0, "interaction_has_nothing_to_do");
            return false;
        }
        let allowed = self
            .with_object(id, |object, env| {
                object.core_mut().is_interactable_based_on_times_count(env)
            })
            .unwrap_or(false);
        if !allowed {
            debug!(object_id = id.0, "interaction_refused_times");
            return false;
        }

        let ctx = self.next_context(id, started_by_player);
        let Some(interaction) = self.with_object(id, |object, env| {
            object.core_mut().begin_interaction();
            object.interact(&ctx, env)
        }) else {
            return false;
        };

        let mut steps: VecDeque<Step> = VecDeque::with_capacity(interaction.len() + 3);
        if cutscene {
            steps.push_back(Step::Emit(Command::BeginCutscene {
                correlation_id: ctx.correlation_id,
            }));
        }
        steps.extend(interaction.into_steps());
        steps.push_back(Step::Finish { object: id });
        if cutscene {
            steps.push_back(Step::Emit(Command::EndCutscene {
                correlation_id: ctx.correlation_id,
            }));
        }
        debug!(
            object_id = id.0,
            correlation_id = ctx.correlation_id.0,
            steps = steps.len(),
            cutscene,
            "interaction_started"
        );
        self.scheduler.start(RunningSequence::new(id, ctx, steps));
        self.drive();
        true
    }

    /// Interacts with an active object. An inactive one is activated and persisted instead,
    /// and the activation carries on down its linked chain the same way a chain step would.
    pub fn activate_or_interact(&mut self, id: ObjectId, started_by_player: bool) -> bool {
        if self.is_object_active(id) {
            return self.request_interaction(id, started_by_player);
        }
        let Some(object) = self.objects.get(&id) else {
            warn!(object_id = id.0, "scene object not found or not activated yet");
            return false;
        };
        let forwards = object.forwards_chain();
        let linked = object.core().linked_object();
        if self.activate_object(id).is_err() {
            return false;
        }
        self.with_object(id, |object, env| {
            object
                .core_mut()
                .change_activation_state_and_persist(env, true)
        });
        if let (true, Some(linked)) = (forwards, linked) {
            let ctx = self.next_context(id, started_by_player);
            let steps = VecDeque::from([Step::Chain {
                object: linked,
                trail: vec![id],
            }]);
            self.scheduler.start(RunningSequence::new(id, ctx, steps));
            self.drive();
        }
        true
    }

    pub fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SetObjectActivation { object, active } => {
                if active {
                    // Failures are logged by `activate_object`.
                    self.activate_object(object).ok();
                } else {
                    self.deactivate_object(object);
                }
            }
            SessionCommand::RequestInteraction {
                object,
                started_by_player,
            } => {
                self.request_interaction(object, started_by_player);
            }
            SessionCommand::PlayerEnteredTrigger { object } => self.player_entered(object),
            SessionCommand::PlayerExitedTrigger { object } => self.player_exited(object),
            SessionCommand::PlayerEnteredTile { tile, layer } => self.player_moved(tile, layer),
            SessionCommand::ThreePhaseStateChanged { previous, current } => {
                self.broadcast_three_phase(previous, current)
            }
            SessionCommand::SetActorActive { actor, active } => {
                if let Some(state) = self.actors.get_mut(&actor) {
                    state.active = active;
                    if !active {
                        self.movement.cancel_movement(actor);
                    }
                }
            }
            SessionCommand::AnimationFinished { ticket } => {
                self.complete_wait(WaitCondition::Animation(ticket))
            }
            SessionCommand::CameraMoveFinished => self.complete_wait(WaitCondition::CameraMove),
            SessionCommand::ScriptFinished { script_id } => {
                self.complete_wait(WaitCondition::Script(script_id))
            }
            SessionCommand::MovementFinished { ticket } => {
                self.complete_wait(WaitCondition::Movement(ticket))
            }
        }
    }

    fn complete_wait(&mut self, done: WaitCondition) {
        if self.scheduler.complete(done) {
            self.drive();
        }
    }

    fn respond(&mut self, id: ObjectId, response: TriggerResponse) {
        match response {
            TriggerResponse::Ignore => {}
            TriggerResponse::InteractAfter(delay) if delay > 0.0 => {
                self.triggers.schedule(id, delay);
                debug!(object_id = id.0, delay, "trigger_countdown_started");
            }
            TriggerResponse::InteractNow | TriggerResponse::InteractAfter(_) => {
                self.request_interaction(id, true);
            }
        }
    }

    fn player_entered(&mut self, id: ObjectId) {
        if !self.is_object_active(id) || !self.triggers.enter(id) {
            return;
        }
        if let Some(response) = self.with_object(id, |object, env| object.on_player_entered(env)) {
            self.respond(id, response);
        }
    }

    fn player_exited(&mut self, id: ObjectId) {
        if !self.triggers.exit(id) || !self.is_object_active(id) {
            return;
        }
        if let Some(response) = self.with_object(id, |object, env| object.on_player_exited(env)) {
            self.respond(id, response);
        }
    }

    /// Diffs the player's trigger membership against the new tile.
    fn player_moved(&mut self, tile: GridPos, layer: usize) {
        self.player_tile = Some((tile, layer));
        let now_inside: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, object)| object.core().is_active())
            .filter(|(_, object)| {
                object
                    .core()
                    .trigger()
                    .is_some_and(|shape| shape.contains(&self.tilemap, tile, layer))
            })
            .map(|(id, _)| *id)
            .collect();
        let left: Vec<ObjectId> = self
            .triggers
            .inside()
            .filter(|id| !now_inside.contains(id))
            .collect();
        for id in left {
            self.player_exited(id);
        }
        for id in now_inside {
            if !self.triggers.is_inside(id) {
                self.player_entered(id);
            }
        }
    }

    fn broadcast_three_phase(&mut self, previous: u8, current: u8) {
        for id in self.all_activated_object_ids() {
            let wants = self
                .with_object(id, |object, env| {
                    object.on_three_phase_changed(previous, current, env)
                })
                .unwrap_or(false);
            if wants {
                self.request_interaction(id, false);
            }
        }
    }

    /// Advances timed waits and trigger countdowns by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.scheduler.tick(dt);
        for id in self.triggers.tick(dt) {
            debug!(object_id = id.0, "trigger_countdown_elapsed");
            self.request_interaction(id, true);
        }
        self.drive();
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        self.outbox.drain()
    }

    /// Feeds session-addressed commands back in and returns the ones meant for other systems.
    pub fn route_commands(&mut self) -> Vec<Command> {
        let mut external = Vec::new();
        for _ in 0..MAX_ROUTING_PASSES {
            if self.outbox.is_empty() {
                break;
            }
            for command in self.outbox.drain() {
                match command.to_session_command() {
                    Some(session_command) => self.handle(session_command),
                    None => external.push(command),
                }
            }
        }
        external
    }

    pub fn running_sequence_count(&self) -> usize {
        self.scheduler.len()
    }

    pub fn outstanding_waits(&self) -> Vec<WaitCondition> {
        self.scheduler.waiting_conditions()
    }

    pub fn pending_trigger_count(&self) -> usize {
        self.triggers.pending_count()
    }

    /// Deactivates everything and drops in-flight work. The session is empty afterwards.
    pub fn unload(&mut self) {
        let dropped = self.scheduler.clear();
        let dropped_count = dropped.len();
        for sequence in dropped {
            self.release_dropped(sequence);
        }
        self.triggers.clear();
        for id in self.all_activated_object_ids() {
            self.with_object(id, |object, env| object.deactivate(env));
        }
        info!(
            level = %self.level.id.key(),
            dropped_sequences = dropped_count,
            "level_unloaded"
        );
    }
}

impl HeadlessSession {
    /// Session over in-memory collaborators, with every actor placed at its spawn tile.
    pub fn headless(data: LevelData, registry: &ObjectRegistry, save: MemorySaveState) -> Self {
        let mut movement = HeadlessMovement::default();
        for spawn in &data.actors {
            movement.place(spawn.id, spawn.tile, spawn.layer, &data.tilemap);
        }
        Self::load(data, registry, HeadlessSceneGraph::default(), movement, save)
    }

    pub fn scene_mut(&mut self) -> &mut HeadlessSceneGraph {
        &mut self.scene
    }

    pub fn movement_mut(&mut self) -> &mut HeadlessMovement {
        &mut self.movement
    }

    /// Completes every outstanding animation, move, camera move and script until nothing is
    /// left to wait on. Returns how many completions were delivered.
    pub fn complete_all_pending(&mut self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_COMPLETION_PASSES {
            let mut progressed = false;
            for ticket in self.scene.take_pending_animations() {
                self.handle(SessionCommand::AnimationFinished { ticket });
                delivered += 1;
                progressed = true;
            }
            for ticket in self.movement.complete_moves(&self.tilemap) {
                self.handle(SessionCommand::MovementFinished { ticket });
                delivered += 1;
                progressed = true;
            }
            self.sync_player_tile();
            for condition in self.scheduler.waiting_conditions() {
                let command = match condition {
                    WaitCondition::CameraMove => SessionCommand::CameraMoveFinished,
                    WaitCondition::Script(script_id) => SessionCommand::ScriptFinished { script_id },
                    _ => continue,
                };
                self.handle(command);
                delivered += 1;
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
        delivered
    }

    /// Places the player and reports the tile, so movement and trigger membership agree.
    pub fn place_player(&mut self, tile: GridPos, layer: usize) {
        if let Some(player) = self.player() {
            self.movement.place(player, tile, layer, &self.tilemap);
            self.movement_tile = Some((tile, layer));
        }
        self.handle(SessionCommand::PlayerEnteredTile { tile, layer });
    }

    /// Reports a tile only when the movement collaborator has moved the player since the last
    /// look. Tile notifications that bypassed movement are not undone.
    fn sync_player_tile(&mut self) {
        let Some(current) = self
            .player()
            .and_then(|player| self.movement.current_tile(player))
        else {
            return;
        };
        if self.movement_tile == Some(current) {
            return;
        }
        self.movement_tile = Some(current);
        if self.player_tile != Some(current) {
            self.handle(SessionCommand::PlayerEnteredTile {
                tile: current.0,
                layer: current.1,
            });
        }
    }
}
