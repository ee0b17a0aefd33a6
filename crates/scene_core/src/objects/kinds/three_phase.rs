use crate::bus::Command;
use crate::collab::PersistedField;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo, Sequence,
};

use super::{floor_param, set_floor_blocked, within_reach};

const PHASE_COUNT: u8 = 3;
const PHASE_CLIPS: [&str; PHASE_COUNT as usize] = ["phase_0", "phase_1", "phase_2"];

fn restored_phase(core: &ObjectCore) -> u8 {
    core.restored()
        .three_phase_state
        .unwrap_or(core.switch_state())
        % PHASE_COUNT
}

/// Cycles 0 -> 1 -> 2 -> 0 and broadcasts every change.
#[derive(Debug)]
pub struct ThreePhaseSwitch {
    core: ObjectCore,
    phase: u8,
}

impl ThreePhaseSwitch {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
            phase: 0,
        })
    }

    pub fn phase(&self) -> u8 {
        self.phase
    }
}

impl InteractiveObject for ThreePhaseSwitch {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, _env: &mut ObjectEnv<'_>) {
        self.phase = restored_phase(&self.core);
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        within_reach(distance)
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let previous = self.phase;
        self.phase = (previous + 1) % PHASE_COUNT;
        self.core
            .persist(env, PersistedField::ThreePhaseState(self.phase));
        let ticket = self
            .core
            .play_animation(env, PHASE_CLIPS[self.phase as usize]);
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .emit(Command::ThreePhaseStateChanged {
                previous,
                current: self.phase,
            })
    }
}

/// Turns to follow the three-phase switches. `param[0..=2]` floor type that is walkable in
/// phase 0, 1 and 2; the other two are blocked.
#[derive(Debug)]
pub struct ThreePhaseBridge {
    core: ObjectCore,
    phase: u8,
    target_phase: u8,
}

impl ThreePhaseBridge {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
            phase: 0,
            target_phase: 0,
        })
    }

    fn apply_floors(&self, env: &mut ObjectEnv<'_>) {
        for phase in 0..PHASE_COUNT {
            let floor = floor_param(&self.core, phase as usize);
            set_floor_blocked(env, floor, phase != self.phase);
        }
    }

    fn rotation_for(phase: u8) -> f32 {
        f32::from(phase) * 120.0
    }
}

impl InteractiveObject for ThreePhaseBridge {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        self.phase = restored_phase(&self.core);
        self.target_phase = self.phase;
        self.core.set_rotation(env, Self::rotation_for(self.phase));
        self.apply_floors(env);
    }

    fn on_three_phase_changed(
        &mut self,
        _previous: u8,
        current: u8,
        _env: &mut ObjectEnv<'_>,
    ) -> bool {
        self.target_phase = current % PHASE_COUNT;
        self.target_phase != self.phase
    }

    fn interact(&mut self, _ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let sequence = Sequence::new(self.core.id());
        if self.target_phase == self.phase {
            return sequence;
        }
        self.phase = self.target_phase;
        self.core
            .persist(env, PersistedField::ThreePhaseState(self.phase));
        self.core.set_rotation(env, Self::rotation_for(self.phase));
        let ticket = self
            .core
            .play_animation(env, PHASE_CLIPS[self.phase as usize]);
        self.apply_floors(env);
        let sequence = if self.core.tweak().skip_camera_focus {
            sequence
        } else {
            sequence.focus_camera(self.core.position(), 0.6)
        };
        let sequence = sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket);
        if self.core.tweak().skip_camera_focus {
            sequence
        } else {
            sequence.reset_camera()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{SaveStateStore, PersistedField};
    use crate::math::{GridPos, WorldPos};
    use crate::objects::{ObjectKind, Step};
    use crate::testing::{ctx, info, TestWorld};
    use crate::tilemap::{FloorType, Layer, Tile, Tilemap};

    #[test]
    fn switch_cycles_through_three_phases_and_broadcasts() {
        let mut world = TestWorld::new();
        let mut switch = world.activated(info(1, ObjectKind::ThreePhaseSwitch));
        let mut seen = Vec::new();
        for _ in 0..4 {
            let sequence = switch.interact(&ctx(1), &mut world.env());
            for step in sequence.steps() {
                if let Step::Emit(Command::ThreePhaseStateChanged { previous, current }) = step {
                    seen.push((*previous, *current));
                }
            }
        }
        assert_eq!(seen, vec![(0, 1), (1, 2), (2, 0), (0, 1)]);
    }

    #[test]
    fn switch_resumes_from_persisted_phase() {
        let mut world = TestWorld::new();
        let level = world.level.id.clone();
        let authored = info(1, ObjectKind::ThreePhaseSwitch);
        world
            .save
            .persist(&level, authored.id, PersistedField::ThreePhaseState(2));
        let mut switch = world.activated(authored);
        let sequence = switch.interact(&ctx(1), &mut world.env());
        assert!(sequence.steps().any(|step| *step
            == Step::Emit(Command::ThreePhaseStateChanged {
                previous: 2,
                current: 0
            })));
    }

    #[test]
    fn bridge_follows_phase_and_opens_matching_floor() {
        let tiles = vec![
            Tile::new(0.0, FloorType(1), true, 4),
            Tile::new(0.0, FloorType(2), true, 4),
            Tile::new(0.0, FloorType(3), true, 4),
            Tile::new(0.0, FloorType(0), true, 4),
        ];
        let layer = Layer::new(4, 1, WorldPos::default(), tiles, Vec::new()).expect("layer");
        let mut world = TestWorld::with_tilemap(Tilemap::new(vec![layer]).expect("tilemap"));
        let mut authored = info(1, ObjectKind::ThreePhaseBridge);
        authored.parameters = [1, 2, 3, 0, 0, 0];
        let mut bridge = world.activated(authored);
        let walkable = |world: &TestWorld| {
            (0..3)
                .map(|x| world.tilemap.is_walkable(GridPos::new(x, 0), 0))
                .collect::<Vec<_>>()
        };
        assert_eq!(walkable(&world), vec![true, false, false]);

        assert!(!bridge.on_three_phase_changed(2, 0, &mut world.env()));
        assert!(bridge.on_three_phase_changed(0, 2, &mut world.env()));
        bridge.interact(&ctx(1), &mut world.env());
        assert_eq!(walkable(&world), vec![false, false, true]);
        assert!(bridge.interact(&ctx(1), &mut world.env()).is_empty());
    }
}
