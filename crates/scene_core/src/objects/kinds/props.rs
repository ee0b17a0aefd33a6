use crate::bus::Command;
use crate::collab::ColliderShape;
use crate::math::WorldPos;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ModelRequirement, ObjectCore, ObjectEnv,
    ObjectInfo, Sequence, TriggerResponse, INFINITE_TIMES,
};

use super::{floor_param, set_floor_blocked, within_reach};

fn half_extents_param(core: &ObjectCore) -> WorldPos {
    let extent = |slot: usize| match core.param(slot) {
        value if value > 0 => value as f32 / 10.0,
        _ => 0.5,
    };
    WorldPos::new(extent(0), extent(1), extent(2))
}

/// Solid prop that reacts when the player bumps into it. `param[0..=2]` collider half
/// extents in tenths of a unit.
#[derive(Debug)]
pub struct Collidable {
    core: ObjectCore,
}

impl Collidable {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for Collidable {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        self.core.attach_collider(
            env,
            ColliderShape::Box {
                half_extents: half_extents_param(&self.core),
            },
        );
    }

    fn should_go_to_cutscene_when_interaction_started(&self) -> bool {
        self.core.script().is_some()
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        TriggerResponse::InteractNow
    }

    fn interact(&mut self, ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .run_script(self.core.script(), ctx)
    }
}

/// Tree or pot that can be shaken; drops item `param[0]` while its times budget lasts.
#[derive(Debug)]
pub struct Shakeable {
    core: ObjectCore,
}

impl Shakeable {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for Shakeable {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        within_reach(distance)
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let ticket = self.core.play_animation(env, "shake");
        let mut sequence = Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket);
        let drops = self.core.times() != INFINITE_TIMES;
        if let Ok(item_id) = u32::try_from(self.core.param(0)) {
            if drops && item_id > 0 {
                sequence = sequence.emit(Command::AddItem { item_id, count: 1 });
            }
        }
        sequence
    }
}

/// Scenery with a model and nothing else.
#[derive(Debug)]
pub struct StaticProp {
    core: ObjectCore,
}

impl StaticProp {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for StaticProp {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn model_requirement(&self) -> ModelRequirement {
        ModelRequirement::Required
    }

    fn should_go_to_cutscene_when_interaction_started(&self) -> bool {
        false
    }

    fn interact(&mut self, _ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        Sequence::new(self.core.id())
    }
}

/// Scenery that idles on activation and plays its action clip when interacted with.
#[derive(Debug)]
pub struct AnimatedProp {
    core: ObjectCore,
}

impl AnimatedProp {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for AnimatedProp {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn model_requirement(&self) -> ModelRequirement {
        ModelRequirement::Animated
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        self.core.play_animation(env, "idle");
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let ticket = self.core.play_animation(env, "action");
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .run_script(self.core.script(), ctx)
            .chain(self.core.linked_object())
    }
}

/// Scripted contraption: runs, flips its state and passes the chain on.
#[derive(Debug)]
pub struct Mechanism {
    core: ObjectCore,
}

impl Mechanism {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for Mechanism {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        self.core.flip_switch_state_and_persist(env);
        let ticket = self.core.play_animation(env, "run");
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .run_script(self.core.script(), ctx)
            .chain(self.core.linked_object())
    }
}

/// Cracked wall. Blocks `param[0]` floor until broken; breaking is permanent.
#[derive(Debug)]
pub struct BreakableWall {
    core: ObjectCore,
}

impl BreakableWall {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn is_broken(&self) -> bool {
        self.core.switch_state() != 0
    }
}

impl InteractiveObject for BreakableWall {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        let intact = !self.is_broken();
        set_floor_blocked(env, floor_param(&self.core, 0), intact);
        if intact {
            self.core
                .spawn_sub_entity(env, "cracks", None, WorldPos::default());
        }
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if self.is_broken() {
            return sequence;
        }
        self.core.set_switch_state_and_persist(env, 1);
        let ticket = self.core.play_animation(env, "break");
        self.core.destroy_sub_entities(env);
        set_floor_blocked(env, floor_param(&self.core, 0), false);
        sequence
            .emit(Command::ShakeCamera {
                duration_seconds: 0.5,
            })
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .chain(self.core.linked_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{ActivationError, ModelKind, ModelRef, ObjectKind};
    use crate::testing::{ctx, info, TestWorld};

    #[test]
    fn static_prop_without_model_fails_activation() {
        let mut world = TestWorld::new();
        let mut prop = world.build(info(1, ObjectKind::StaticProp));
        let result = prop.activate(&mut world.env(), Default::default());
        assert!(matches!(result, Err(ActivationError::MissingModel { .. })));
    }

    #[test]
    fn animated_prop_starts_idling_on_activation() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::AnimatedProp);
        authored.model = Some(ModelRef {
            path: "fountain.mdl".to_string(),
            kind: ModelKind::Animated,
        });
        world.activated(authored);
        assert_eq!(world.scene.pending_animation_count(), 1);
    }

    #[test]
    fn breakable_wall_owns_cracks_until_broken() {
        let mut world = TestWorld::new();
        let mut wall = world.activated(info(1, ObjectKind::BreakableWall));
        assert_eq!(wall.core().sub_entity_count(), 1);
        assert_eq!(world.scene.live_entity_count(), 2);

        wall.interact(&ctx(1), &mut world.env());
        assert_eq!(wall.core().sub_entity_count(), 0);
        assert_eq!(world.scene.live_entity_count(), 1);
        assert!(wall.interact(&ctx(1), &mut world.env()).is_empty());
    }

    #[test]
    fn shakeable_drops_items_only_with_a_finite_budget() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::Shakeable);
        authored.parameters[0] = 9;
        let mut endless = world.activated(authored.clone());
        let sequence = endless.interact(&ctx(1), &mut world.env());
        assert!(!sequence
            .steps()
            .any(|step| matches!(step, crate::objects::Step::Emit(Command::AddItem { .. }))));

        authored.id = crate::objects::ObjectId(2);
        authored.times = 2;
        let mut limited = world.activated(authored);
        let sequence = limited.interact(&ctx(2), &mut world.env());
        assert!(sequence
            .steps()
            .any(|step| matches!(step, crate::objects::Step::Emit(Command::AddItem { .. }))));
    }
}
