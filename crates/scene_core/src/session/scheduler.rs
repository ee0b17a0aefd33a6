use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::bus::Command;
use crate::collab::{ActorMovement, AnimationTicket, MoveTicket, SaveStateStore, SceneGraph};
use crate::objects::{InteractionContext, ObjectId, Step, WaitCondition};

use super::LevelSession;

#[derive(Debug)]
pub(crate) struct RunningSequence {
    pub(crate) owner: ObjectId,
    pub(crate) ctx: InteractionContext,
    pub(crate) steps: VecDeque<Step>,
    pub(crate) waiting: Option<WaitCondition>,
}

impl RunningSequence {
    pub(crate) fn new(owner: ObjectId, ctx: InteractionContext, steps: VecDeque<Step>) -> Self {
        Self {
            owner,
            ctx,
            steps,
            waiting: None,
        }
    }

    fn is_done(&self) -> bool {
        self.waiting.is_none() && self.steps.is_empty()
    }

    fn splice_front(&mut self, steps: impl DoubleEndedIterator<Item = Step>) {
        for step in steps.rev() {
            self.steps.push_front(step);
        }
    }
}

/// In-flight sequences in start order, plus completions that arrived before anyone waited.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    running: Vec<RunningSequence>,
    early_animations: HashSet<AnimationTicket>,
    early_moves: HashSet<MoveTicket>,
}

impl Scheduler {
    pub(crate) fn start(&mut self, sequence: RunningSequence) {
        self.running.push(sequence);
    }

    pub(crate) fn len(&self) -> usize {
        self.running.len()
    }

    pub(crate) fn waiting_conditions(&self) -> Vec<WaitCondition> {
        self.running
            .iter()
            .filter_map(|sequence| sequence.waiting)
            .collect()
    }

    pub(crate) fn tick(&mut self, dt: f32) {
        for sequence in &mut self.running {
            if let Some(WaitCondition::Seconds(remaining)) = sequence.waiting {
                let left = remaining - dt;
                sequence.waiting = (left > 0.0).then_some(WaitCondition::Seconds(left));
            }
        }
    }

    /// Wakes the earliest sequence waiting on `done`. Animation and movement completions
    /// nobody waits for yet are remembered for a later wait step.
    pub(crate) fn complete(&mut self, done: WaitCondition) -> bool {
        if let Some(sequence) = self
            .running
            .iter_mut()
            .find(|sequence| sequence.waiting == Some(done))
        {
            sequence.waiting = None;
            return true;
        }
        match done {
            WaitCondition::Animation(ticket) => {
                self.early_animations.insert(ticket);
            }
            WaitCondition::Movement(ticket) => {
                self.early_moves.insert(ticket);
            }
            _ => {}
        }
        false
    }

    fn take_early(&mut self, condition: WaitCondition) -> bool {
        match condition {
            WaitCondition::Animation(ticket) => self.early_animations.remove(&ticket),
            WaitCondition::Movement(ticket) => self.early_moves.remove(&ticket),
            _ => false,
        }
    }

    pub(crate) fn drop_owned_by(&mut self, owner: ObjectId) -> Vec<RunningSequence> {
        let (dropped, kept) = std::mem::take(&mut self.running)
            .into_iter()
            .partition(|sequence| sequence.owner == owner);
        self.running = kept;
        dropped
    }

    pub(crate) fn clear(&mut self) -> Vec<RunningSequence> {
        self.early_animations.clear();
        self.early_moves.clear();
        std::mem::take(&mut self.running)
    }
}

impl<G: SceneGraph, M: ActorMovement, S: SaveStateStore> LevelSession<G, M, S> {
    /// Runs every sequence in start order until it waits or ends.
    pub(crate) fn drive(&mut self) {
        let mut current = std::mem::take(&mut self.scheduler.running);
        for sequence in &mut current {
            self.advance(sequence);
        }
        current.retain(|sequence| !sequence.is_done());
        current.append(&mut self.scheduler.running);
        self.scheduler.running = current;
        if self.scheduler.running.is_empty() {
            self.scheduler.early_animations.clear();
            self.scheduler.early_moves.clear();
        }
    }

    fn advance(&mut self, sequence: &mut RunningSequence) {
        while sequence.waiting.is_none() {
            let Some(step) = sequence.steps.pop_front() else {
                return;
            };
            match step {
                Step::Emit(command) => {
                    debug!(owner = sequence.owner.0, command = ?command.kind(), "sequence_emit");
                    self.outbox.emit(command);
                }
                Step::Wait(condition) => {
                    if !self.scheduler.take_early(condition) {
                        sequence.waiting = Some(condition);
                    }
                }
                Step::Resume { object, tag } => self.resume_into(sequence, object, tag),
                Step::Chain { object, trail } => self.chain_into(sequence, object, trail),
                Step::Finish { object } => self.finish_interaction(object),
            }
        }
    }

    fn resume_into(&mut self, sequence: &mut RunningSequence, object: ObjectId, tag: u32) {
        if !self.is_object_active(object) {
            debug!(object_id = object.0, tag, "resume_skipped_inactive");
            return;
        }
        let ctx = sequence.ctx;
        if let Some(resumed) = self.with_object(object, |target, env| target.resume(tag, &ctx, env)) {
            sequence.splice_front(resumed.into_steps().into_iter());
        }
    }

    fn chain_into(&mut self, sequence: &mut RunningSequence, object: ObjectId, trail: Vec<ObjectId>) {
        if trail.contains(&object) {
            debug!(object_id = object.0, "chain_cycle_stopped");
            return;
        }
        let Some(target) = self.objects.get(&object) else {
            return;
        };
        let mut next_trail = trail;
        next_trail.push(object);

        if !target.core().is_active() {
            let forwards = target.forwards_chain();
            let linked = target.core().linked_object();
            if self.activate_object(object).is_err() {
                return;
            }
            self.with_object(object, |target, env| {
                target
                    .core_mut()
                    .change_activation_state_and_persist(env, true)
            });
            debug!(object_id = object.0, "chain_activated");
            if let (true, Some(linked)) = (forwards, linked) {
                sequence.steps.push_front(Step::Chain {
                    object: linked,
                    trail: next_trail,
                });
            }
            return;
        }

        if target.core().is_interacting() {
            debug!(object_id = object.0, "chain_reentry_skipped");
            if let Some(linked) = target.core().linked_object() {
                sequence.steps.push_front(Step::Chain {
                    object: linked,
                    trail: next_trail,
                });
            }
            return;
        }

        let ready = self
            .with_object(object, |target, env| target.can_interact(env))
            .unwrap_or(false);
        if !ready {
            debug!(object_id = object.0, "chain_target_has_nothing_to_do");
            return;
        }
        let allowed = self
            .with_object(object, |target, env| {
                target.core_mut().is_interactable_based_on_times_count(env)
            })
            .unwrap_or(false);
        if !allowed {
            debug!(object_id = object.0, "chain_refused_times");
            return;
        }

        let ctx = sequence.ctx;
        let Some(interaction) = self.with_object(object, |target, env| {
            target.core_mut().begin_interaction();
            target.interact(&ctx, env)
        }) else {
            warn!(object_id = object.0, "chain_target_vanished");
            return;
        };
        debug!(object_id = object.0, steps = interaction.len(), "chain_interaction_spliced");

        let prefix = &next_trail[..next_trail.len() - 1];
        let spliced = interaction
            .into_steps()
            .into_iter()
            .map(|step| match step {
                Step::Chain { object, trail } => Step::Chain {
                    object,
                    trail: prefix.iter().copied().chain(trail).collect(),
                },
                other => other,
            })
            .chain(std::iter::once(Step::Finish { object }))
            .collect::<Vec<_>>();
        sequence.splice_front(spliced.into_iter());
    }

    pub(crate) fn finish_interaction(&mut self, object: ObjectId) {
        if let Some(target) = self.objects.get_mut(&object) {
            target.core_mut().end_interaction();
        }
    }

    /// Releases what a dropped sequence still held: interaction guards and an open cutscene.
    pub(crate) fn release_dropped(&mut self, dropped: RunningSequence) {
        for step in dropped.steps {
            match step {
                Step::Finish { object } => self.finish_interaction(object),
                Step::Emit(command @ Command::EndCutscene { .. }) => self.outbox.emit(command),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::CorrelationId;

    fn running(owner: u16, steps: Vec<Step>) -> RunningSequence {
        RunningSequence::new(
            ObjectId(owner),
            InteractionContext {
                correlation_id: CorrelationId(1),
                initiator: ObjectId(owner),
                player: None,
                started_by_player: false,
            },
            steps.into(),
        )
    }

    #[test]
    fn seconds_wait_counts_down_across_ticks() {
        let mut scheduler = Scheduler::default();
        let mut sequence = running(1, Vec::new());
        sequence.waiting = Some(WaitCondition::Seconds(1.0));
        scheduler.start(sequence);

        scheduler.tick(0.25);
        assert_eq!(
            scheduler.waiting_conditions(),
            vec![WaitCondition::Seconds(0.75)]
        );
        scheduler.tick(0.75);
        assert!(scheduler.waiting_conditions().is_empty());
    }

    #[test]
    fn completion_wakes_only_the_earliest_waiter() {
        let mut scheduler = Scheduler::default();
        for owner in [1, 2] {
            let mut sequence = running(owner, Vec::new());
            sequence.waiting = Some(WaitCondition::CameraMove);
            scheduler.start(sequence);
        }
        assert!(scheduler.complete(WaitCondition::CameraMove));
        assert_eq!(scheduler.waiting_conditions(), vec![WaitCondition::CameraMove]);
        assert_eq!(scheduler.running[1].owner, ObjectId(2));
    }

    #[test]
    fn early_animation_completion_is_remembered() {
        let mut scheduler = Scheduler::default();
        assert!(!scheduler.complete(WaitCondition::Animation(AnimationTicket(7))));
        assert!(scheduler.take_early(WaitCondition::Animation(AnimationTicket(7))));
        assert!(!scheduler.take_early(WaitCondition::Animation(AnimationTicket(7))));
        assert!(!scheduler.complete(WaitCondition::CameraMove));
        assert!(!scheduler.take_early(WaitCondition::CameraMove));
    }

    #[test]
    fn dropping_by_owner_keeps_other_sequences_in_order() {
        let mut scheduler = Scheduler::default();
        for owner in [1, 2, 1, 3] {
            scheduler.start(running(owner, vec![Step::Finish { object: ObjectId(owner) }]));
        }
        let dropped = scheduler.drop_owned_by(ObjectId(1));
        assert_eq!(dropped.len(), 2);
        let owners: Vec<u16> = scheduler.running.iter().map(|sequence| sequence.owner.0).collect();
        assert_eq!(owners, vec![2, 3]);
    }
}
