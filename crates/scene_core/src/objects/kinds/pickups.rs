use crate::bus::Command;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ModelRequirement, ObjectCore, ObjectEnv,
    ObjectInfo, ObjectKind, Sequence, TriggerResponse,
};

use super::within_reach;

fn item_command(core: &ObjectCore) -> Option<Command> {
    let item_id = u32::try_from(core.param(0)).ok().filter(|id| *id > 0)?;
    let count = u32::try_from(core.param(1)).unwrap_or(1).max(1);
    Some(Command::AddItem { item_id, count })
}

/// Opens once and hands over `param[1]` (at least one) of item `param[0]`.
/// Rare chests pull the camera in first.
#[derive(Debug)]
pub struct Chest {
    core: ObjectCore,
    rare: bool,
}

impl Chest {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let rare = info.kind() == Some(ObjectKind::RareChest);
        Box::new(Self {
            core: ObjectCore::new(info, level),
            rare,
        })
    }

    fn is_open(&self) -> bool {
        self.core.switch_state() != 0
    }
}

impl InteractiveObject for Chest {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn model_requirement(&self) -> ModelRequirement {
        ModelRequirement::Animated
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        !self.is_open() && within_reach(distance)
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let mut sequence = Sequence::new(self.core.id());
        if self.is_open() {
            return sequence;
        }
        let focus = self.rare && !self.core.tweak().skip_camera_focus;
        if focus {
            sequence = sequence.focus_camera(self.core.position(), 0.8);
        }

        self.core.set_switch_state_and_persist(env, 1);
        let ticket = self.core.play_animation(env, "open");
        sequence = sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket);
        if let Some(command) = item_command(&self.core) {
            sequence = sequence.emit(command);
        }
        if focus {
            sequence = sequence.reset_camera();
        }
        sequence.chain(self.core.linked_object())
    }
}

/// Picked up by walking over it; the pickup deactivates it for good.
#[derive(Debug)]
pub struct Collectible {
    core: ObjectCore,
}

impl Collectible {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for Collectible {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn should_go_to_cutscene_when_interaction_started(&self) -> bool {
        false
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        TriggerResponse::InteractNow
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let mut sequence = Sequence::new(self.core.id()).play_sfx(self.core.sfx());
        if let Some(command) = item_command(&self.core) {
            sequence = sequence.emit(command);
        }
        self.core.change_activation_state_and_persist(env, false);
        sequence.emit(Command::SetObjectActivation {
            object: self.core.id(),
            active: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::SaveStateStore;
    use crate::objects::{ActivationError, ModelKind, ModelRef, Step};
    use crate::testing::{ctx, info, TestWorld};

    fn chest_info(kind: ObjectKind) -> ObjectInfo {
        let mut authored = info(1, kind);
        authored.model = Some(ModelRef {
            path: "chest.mdl".to_string(),
            kind: ModelKind::Animated,
        });
        authored.parameters[0] = 40;
        authored
    }

    #[test]
    fn chest_opens_once_and_gives_its_item() {
        let mut world = TestWorld::new();
        let mut chest = world.activated(chest_info(ObjectKind::Chest));
        let steps: Vec<Step> = chest
            .interact(&ctx(1), &mut world.env())
            .into_steps()
            .into_iter()
            .collect();
        assert!(steps.contains(&Step::Emit(Command::AddItem {
            item_id: 40,
            count: 1
        })));
        assert!(!chest.is_directly_interactable(0.5));
        assert!(chest.interact(&ctx(1), &mut world.env()).is_empty());
        let saved = world
            .save
            .object_override(&world.level.id, chest.core().id())
            .expect("saved");
        assert_eq!(saved.switch_state, Some(1));
    }

    #[test]
    fn rare_chest_focuses_camera_first() {
        let mut world = TestWorld::new();
        let mut chest = world.activated(chest_info(ObjectKind::RareChest));
        let sequence = chest.interact(&ctx(1), &mut world.env());
        assert!(matches!(
            sequence.steps().next(),
            Some(Step::Emit(Command::FocusCamera { .. }))
        ));
    }

    #[test]
    fn chest_with_static_model_fails_activation() {
        let mut world = TestWorld::new();
        let mut authored = chest_info(ObjectKind::Chest);
        authored.model = Some(ModelRef {
            path: "crate.mdl".to_string(),
            kind: ModelKind::Static,
        });
        let mut chest = world.build(authored);
        let result = chest.activate(&mut world.env(), Default::default());
        assert!(matches!(result, Err(ActivationError::UnsupportedModel { .. })));
        assert!(!chest.core().is_active());
        assert_eq!(world.scene.live_entity_count(), 0);
    }

    #[test]
    fn collectible_requests_its_own_deactivation() {
        let mut world = TestWorld::new();
        let mut authored = info(3, ObjectKind::Collectible);
        authored.parameters = [7, 2, 0, 0, 0, 0];
        let mut pickup = world.activated(authored);
        let steps: Vec<Step> = pickup
            .interact(&ctx(3), &mut world.env())
            .into_steps()
            .into_iter()
            .collect();
        assert_eq!(
            steps,
            vec![
                Step::Emit(Command::AddItem { item_id: 7, count: 2 }),
                Step::Emit(Command::SetObjectActivation {
                    object: pickup.core().id(),
                    active: false
                }),
            ]
        );
    }
}
