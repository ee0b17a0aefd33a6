use crate::bus::Command;
use crate::objects::{
    InteractionContext, InteractiveObject, LevelInfo, ObjectCore, ObjectEnv, ObjectInfo, Sequence,
};

use super::within_reach;

#[derive(Debug)]
pub struct SavingPoint {
    core: ObjectCore,
}

impl SavingPoint {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for SavingPoint {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        within_reach(distance)
    }

    fn interact(&mut self, _ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        Sequence::new(self.core.id())
            .play_sfx(self.core.sfx())
            .emit(Command::OpenSaveMenu)
    }
}

/// Something to look at. `param[0]` notice text id shown after the script, if non-zero.
#[derive(Debug)]
pub struct InvestigationPoint {
    core: ObjectCore,
}

impl InvestigationPoint {
    pub fn build(info: ObjectInfo, level: &LevelInfo) -> Box<dyn InteractiveObject> {
        Box::new(Self {
            core: ObjectCore::new(info, level),
        })
    }
}

impl InteractiveObject for InvestigationPoint {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn is_directly_interactable(&self, distance: f32) -> bool {
        within_reach(distance)
    }

    fn interact(&mut self, ctx: &InteractionContext, _env: &mut ObjectEnv<'_>) -> Sequence {
        let mut sequence = Sequence::new(self.core.id()).run_script(self.core.script(), ctx);
        if let Ok(text_id) = u32::try_from(self.core.param(0)) {
            if text_id > 0 {
                sequence = sequence.emit(Command::ShowNotice { text_id });
            }
        }
        sequence.chain(self.core.linked_object())
    }
}
