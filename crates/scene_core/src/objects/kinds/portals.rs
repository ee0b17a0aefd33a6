use crate::bus::Command;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo,
    ObjectKind, Sequence, TriggerResponse,
};

use super::within_reach;

/// Leaves the scene for scene `param[0]`, entry point `param[1]`. Transition triggers fire on
/// entry; tree portals wait for the player to step up and use them.
#[derive(Debug)]
pub struct ScenePortal {
    core: ObjectCore,
    on_entry: bool,
}

impl ScenePortal {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        let on_entry = info.kind() == Some(ObjectKind::SceneTransitionTrigger);
        Box::new(Self {
            core: ObjectCore::new(info, level),
            on_entry,
        })
    }
}

impl InteractiveObject for ScenePortal {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        !self.on_entry && within_reach(distance)
    }

    fn on_player_entered(&mut self, _env: &mut ObjectEnv<'_>) -> TriggerResponse {
        if self.on_entry {
            TriggerResponse::InteractNow
        } else {
            TriggerResponse::Ignore
        }
    }

    fn interact(&mut self, ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        let slot = |index: usize| u32::try_from(self.core.param(index)).unwrap_or(0);
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .run_script(self.core.script(), ctx)
            .emit(Command::ChangeScene {
                scene_index: slot(0),
                entry_point: slot(1),
            })
    }
}

/// Flower on the divine tree. Blooming is permanent and passes the chain on, usually to the
/// tree portal.
#[derive(Debug)]
pub struct BloomingFlower {
    core: ObjectCore,
}

impl BloomingFlower {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }

    fn has_bloomed(&self) -> bool {
        self.core.switch_state() != 0
    }
}

impl InteractiveObject for BloomingFlower {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn on_activated(&mut self, env: &mut ObjectEnv<'_>) {
        if self.has_bloomed() {
            self.core.play_animation(env, "bloomed");
        }
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        !self.has_bloomed() && within_reach(distance)
    }

    fn interact(&mut self, ctx: &InteractionContext, env: &mut ObjectEnv<'_>) -> Sequence {
        let mut sequence = Sequence::new(self.core.id());
        if self.has_bloomed() {
            return sequence;
        }
        let framed = !self.core.tweak().skip_camera_focus;
        if framed {
            sequence = sequence.focus_camera(self.core.position(), 1.0);
        }
        self.core.set_switch_state_and_persist(env, 1);
        let ticket = self.core.play_animation(env, "bloom");
        sequence = sequence
            .play_sfx(self.core.sfx())
            .wait_animation(ticket)
            .run_script(self.core.script(), ctx)
            .chain(self.core.linked_object());
        if framed {
            sequence = sequence.reset_camera();
        }
        sequence
    }
}
