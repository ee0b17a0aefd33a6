use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo,
    ObjectKind, Sequence, TriggerResponse,
};

use super::{clip_for_state, floor_param, set_floor_blocked, within_reach};

const RESET_TAG: u32 = 1;
const DEFAULT_TIMED_SECONDS: f32 = 5.0;

/// Lever. A plain switch flips on once; a toggle switch flips both ways for as long as its
/// times budget lasts.
#[derive(Debug)]
pub struct Switch {
    core: ObjectCore,
    toggles: bool,
}

impl Switch {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let toggles = info.kind() == Some(ObjectKind::ToggleSwitch);
        Box::new(Self {
            core: ObjectCore::new(info, level),
            toggles,
        })
    }

    fn has_travel_left(&self) -> bool {
        self.toggles || self.core.switch_state() == 0
    }
}

impl InteractiveObject for Switch {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        self.has_travel_left() && within_reach(distance)
    }

    fn can_interact(&self, _env: &ObjectEnv<'_>) -> bool {
        self.has_travel_left()
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if !self.has_travel_left() {
            return sequence;
        }
        let state = self.core.flip_switch_state_and_persist(env);
        let ticket = self.core.play_animation(env, clip_for_state(state, "on", "off"));
        sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .run_script(self.core.script(), ctx)
            .chain(self.core.linked_object())
    }
}

/// Pressure plate. Pressed on entry; with `param[0]` non-zero it springs back on exit.
/// Elevator pedals call their elevator through the linked id.
#[derive(Debug)]
pub struct PedalSwitch {
    core: ObjectCore,
}

impl PedalSwitch {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn springs_back(&self) -> bool {
        self.core.param(0) != 0
    }
}

impl InteractiveObject for PedalSwitch {
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
        if self.core.switch_state() == 0 || self.springs_back() {
            TriggerResponse::InteractNow
        } else {
            TriggerResponse::Ignore
        }
    }

    fn on_player_exited(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        if self.springs_back() && self.core.switch_state() != 0 {
            TriggerResponse::InteractNow
        } else {
            TriggerResponse::Ignore
        }
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let state = self.core.flip_switch_state_and_persist(env);
        let ticket = self
            .core
            .play_animation(env, clip_for_state(state, "press", "release"));
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .chain(self.core.linked_object())
    }
}

/// One-shot switch that rewires walkability: `param[0]` floor opens and `param[1]` floor
/// closes once it is on.
#[derive(Debug)]
pub struct SpecialSwitch {
    core: ObjectCore,
}

impl SpecialSwitch {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn apply_floors(&self, env: &mut ObjectEnv<'_>) {
        let on = self.core.switch_state() != 0;
        set_floor_blocked(env, floor_param(&self.core, 0), !on);
        set_floor_blocked(env, floor_param(&self.core, 1), on);
    }
}

impl InteractiveObject for SpecialSwitch {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        self.apply_floors(env);
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        self.core.switch_state() == 0 && within_reach(distance)
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if self.core.switch_state() != 0 {
            return sequence;
        }
        self.core.set_switch_state_and_persist(env, 1);
        let ticket = self.core.play_animation(env, "on");
        self.apply_floors(env);
        sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .run_script(self.core.script(), ctx)
            .chain(self.core.linked_object())
    }
}

/// Switches on, drives its chain, then switches itself back off after `param[0]` tenths of a
/// second and drives the chain again.
#[derive(Debug)]
pub struct TimedSwitch {
    core: ObjectCore,
}

impl TimedSwitch {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn hold_seconds(&self) -> f32 {
        match self.core.param_seconds(0) {
            seconds if seconds > 0.0 => seconds,
            _ => DEFAULT_TIMED_SECONDS,
        }
    }
}

impl InteractiveObject for TimedSwitch {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        self.core.switch_state() == 0 && within_reach(distance)
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if self.core.switch_state() != 0 {
            return sequence;
        }
        self.core.set_switch_state_and_persist(env, 1);
        let ticket = self.core.play_animation(env, "on");
        sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .chain(self.core.linked_object())
            .wait_seconds(self.hold_seconds())
            .resume(RESET_TAG)
    }

    fn resume(&mut self, tag: u32, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if tag != RESET_TAG || self.core.switch_state() == 0 {
            return sequence;
        }
        self.core.set_switch_state_and_persist(env, 0);
        let ticket = self.core.play_animation(env, "off");
        sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .chain(self.core.linked_object())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{GridPos, WorldPos};
    use crate::objects::{Step, WaitCondition};
    use crate::testing::{ctx, info, TestWorld};
    use crate::tilemap::{FloorType, Layer, Tile, Tilemap};

    #[test]
    fn plain_switch_flips_once_toggle_switch_flips_back() {
        let mut world = TestWorld::new();
        let mut plain = world.activated(info(1, ObjectKind::Switch));
        plain.interact(&ctx(1), &mut world.env());
        assert_eq!(plain.core().switch_state(), 1);
        assert!(plain.interact(&ctx(1), &mut world.env()).is_empty());
        assert!(!plain.is_directly_interactable(1.0));

        let mut toggle = world.activated(info(2, ObjectKind::ToggleSwitch));
        toggle.interact(&ctx(2), &mut world.env());
        toggle.interact(&ctx(2), &mut world.env());
        assert_eq!(toggle.core().switch_state(), 0);
    }

    #[test]
    fn spring_pedal_releases_on_exit() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::PedalSwitch);
        authored.parameters[0] = 1;
        let mut pedal = world.activated(authored);
        assert_eq!(pedal.on_player_exited(&mut world.env()), TriggerResponse::Ignore);
        assert_eq!(pedal.on_player_entered(&mut world.env()), TriggerResponse::InteractNow);
        pedal.interact(&ctx(1), &mut world.env());
        assert_eq!(pedal.on_player_exited(&mut world.env()), TriggerResponse::InteractNow);

        let mut latch = world.activated(info(2, ObjectKind::PedalSwitch));
        latch.interact(&ctx(2), &mut world.env());
        assert_eq!(latch.on_player_entered(&mut world.env()), TriggerResponse::Ignore);
        assert_eq!(latch.on_player_exited(&mut world.env()), TriggerResponse::Ignore);
    }

    #[test]
    fn special_switch_swaps_floor_walkability() {
        let mut tiles = vec![Tile::new(0.0, FloorType(0), true, 4); 4];
        tiles[0] = Tile::new(0.0, FloorType(5), true, 4);
        tiles[1] = Tile::new(0.0, FloorType(6), true, 4);
        let layer = Layer::new(2, 2, WorldPos::default(), tiles, Vec::new()).expect("layer");
        let mut world = TestWorld::with_tilemap(Tilemap::new(vec![layer]).expect("tilemap"));
        let mut authored = info(1, ObjectKind::SpecialSwitch);
        authored.parameters = [5, 6, 0, 0, 0, 0];
        let mut switch = world.activated(authored);
        assert!(!world.tilemap.is_walkable(GridPos::new(0, 0), 0));
        assert!(world.tilemap.is_walkable(GridPos::new(1, 0), 0));

        switch.interact(&ctx(1), &mut world.env());
        assert!(world.tilemap.is_walkable(GridPos::new(0, 0), 0));
        assert!(!world.tilemap.is_walkable(GridPos::new(1, 0), 0));
    }

    #[test]
    fn timed_switch_schedules_its_own_reset() {
        let mut world = TestWorld::new();
        let mut authored = info(1, ObjectKind::TimedSwitch);
        authored.parameters[0] = 25;
        authored.linked_object_id = 2;
        let mut switch = world.activated(authored);
        let steps: Vec<Step> = switch
            .interact(&ctx(1), &mut world.env())
            .into_steps()
            .into_iter()
            .collect();
        let tail = &steps[steps.len() - 2..];
        assert_eq!(tail[0], Step::Wait(WaitCondition::Seconds(2.5)));
        assert_eq!(
            tail[1],
            Step::Resume {
                object: switch.core().id(),
                tag: RESET_TAG
            }
        );

        let reset = switch.resume(RESET_TAG, &ctx(1), &mut world.env());
        assert_eq!(switch.core().switch_state(), 0);
        assert!(reset.has_chain());
    }
}
