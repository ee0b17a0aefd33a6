use std::collections::VecDeque;

use crate::bus::Command;
use crate::collab::{AnimationTicket, MoveTicket, ScriptId};
use crate::math::WorldPos;

use super::{InteractionContext, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitCondition {
    Seconds(f32),
    Animation(AnimationTicket),
    CameraMove,
    Script(ScriptId),
    Movement(MoveTicket),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Emit(Command),
    Wait(WaitCondition),
    /// Call back into `object` with `tag` once every earlier step has completed.
    Resume { object: ObjectId, tag: u32 },
    /// Activate `object` if it is inactive, otherwise play its interaction, then continue
    /// into its own linked object. `trail` holds the objects already visited by this chain.
    Chain { object: ObjectId, trail: Vec<ObjectId> },
    /// Releases the interaction guard of `object`.
    Finish { object: ObjectId },
}

/// An interaction body: steps run in order, pausing at each `Wait` until the session sees the
/// matching notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    owner: ObjectId,
    steps: VecDeque<Step>,
}

impl Sequence {
    pub fn new(owner: ObjectId) -> Self {
        Self {
            owner,
            steps: VecDeque::new(),
        }
    }

    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn into_steps(self) -> VecDeque<Step> {
        self.steps
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push_back(step);
    }

    pub fn emit(mut self, command: Command) -> Self {
        self.steps.push_back(Step::Emit(command));
        self
    }

    pub fn wait_seconds(mut self, seconds: f32) -> Self {
        if seconds > 0.0 {
            self.steps
                .push_back(Step::Wait(WaitCondition::Seconds(seconds)));
        }
        self
    }

    /// No ticket means the object had no entity to animate, so there is nothing to wait for.
    pub fn wait_animation(mut self, ticket: Option<AnimationTicket>) -> Self {
        if let Some(ticket) = ticket {
            self.steps
                .push_back(Step::Wait(WaitCondition::Animation(ticket)));
        }
        self
    }

    pub fn wait_movement(mut self, ticket: MoveTicket) -> Self {
        self.steps
            .push_back(Step::Wait(WaitCondition::Movement(ticket)));
        self
    }

    pub fn focus_camera(mut self, target: WorldPos, duration_seconds: f32) -> Self {
        self.steps.push_back(Step::Emit(Command::FocusCamera {
            target,
            duration_seconds,
        }));
        self.steps.push_back(Step::Wait(WaitCondition::CameraMove));
        self
    }

    pub fn reset_camera(mut self) -> Self {
        self.steps.push_back(Step::Emit(Command::ResetCamera));
        self.steps.push_back(Step::Wait(WaitCondition::CameraMove));
        self
    }

    /// Runs the script and waits for it. A missing script is nothing to do.
    pub fn run_script(mut self, script_id: Option<ScriptId>, ctx: &InteractionContext) -> Self {
        if let Some(script_id) = script_id {
            self.steps.push_back(Step::Emit(Command::RunScript {
                script_id,
                correlation_id: ctx.correlation_id,
            }));
            self.steps
                .push_back(Step::Wait(WaitCondition::Script(script_id)));
        }
        self
    }

    pub fn play_sfx(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name {
            self.steps.push_back(Step::Emit(Command::PlaySfx {
                name: name.to_string(),
            }));
        }
        self
    }

    pub fn resume(mut self, tag: u32) -> Self {
        self.steps.push_back(Step::Resume {
            object: self.owner,
            tag,
        });
        self
    }

    /// Continues into the linked object, if any.
    pub fn chain(mut self, linked: Option<ObjectId>) -> Self {
        if let Some(object) = linked {
            self.steps.push_back(Step::Chain {
                object,
                trail: vec![self.owner],
            });
        }
        self
    }

    pub fn has_chain(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, Step::Chain { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::CorrelationId;

    fn ctx() -> InteractionContext {
        InteractionContext {
            correlation_id: CorrelationId(9),
            initiator: ObjectId(1),
            player: None,
            started_by_player: true,
        }
    }

    #[test]
    fn absent_optional_features_add_no_steps() {
        let sequence = Sequence::new(ObjectId(1))
            .run_script(None, &ctx())
            .play_sfx(None)
            .wait_animation(None)
            .wait_seconds(0.0)
            .chain(None);
        assert!(sequence.is_empty());
    }

    #[test]
    fn script_step_emits_then_waits() {
        let sequence = Sequence::new(ObjectId(1)).run_script(Some(ScriptId(5)), &ctx());
        let steps: Vec<Step> = sequence.into_steps().into_iter().collect();
        assert_eq!(
            steps,
            vec![
                Step::Emit(Command::RunScript {
                    script_id: ScriptId(5),
                    correlation_id: CorrelationId(9)
                }),
                Step::Wait(WaitCondition::Script(ScriptId(5))),
            ]
        );
    }

    #[test]
    fn chain_step_records_owner_in_trail() {
        let sequence = Sequence::new(ObjectId(1)).chain(Some(ObjectId(2)));
        assert!(sequence.has_chain());
        assert_eq!(
            sequence.steps().next(),
            Some(&Step::Chain {
                object: ObjectId(2),
                trail: vec![ObjectId(1)]
            })
        );
    }
}
