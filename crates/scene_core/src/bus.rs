use crate::collab::{ActorId, AnimationTicket, MoveTicket, ScriptId};
use crate::math::{GridPos, WorldPos};
use crate::objects::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub u64);

/// Requests leaving the session. Some are addressed back to the session itself; see
/// [`Command::to_session_command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RequestInteraction {
        object: ObjectId,
        started_by_player: bool,
    },
    SetObjectActivation {
        object: ObjectId,
        active: bool,
    },
    PlaySfx {
        name: String,
    },
    FocusCamera {
        target: WorldPos,
        duration_seconds: f32,
    },
    ResetCamera,
    ShakeCamera {
        duration_seconds: f32,
    },
    RunScript {
        script_id: ScriptId,
        correlation_id: CorrelationId,
    },
    AddItem {
        item_id: u32,
        count: u32,
    },
    BeginCutscene {
        correlation_id: CorrelationId,
    },
    EndCutscene {
        correlation_id: CorrelationId,
    },
    ThreePhaseStateChanged {
        previous: u8,
        current: u8,
    },
    ChangeScene {
        scene_index: u32,
        entry_point: u32,
    },
    OpenSaveMenu,
    ShowNotice {
        text_id: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    RequestInteraction,
    SetObjectActivation,
    PlaySfx,
    FocusCamera,
    ResetCamera,
    ShakeCamera,
    RunScript,
    AddItem,
    BeginCutscene,
    EndCutscene,
    ThreePhaseStateChanged,
    ChangeScene,
    OpenSaveMenu,
    ShowNotice,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::RequestInteraction { .. } => CommandKind::RequestInteraction,
            Self::SetObjectActivation { .. } => CommandKind::SetObjectActivation,
            Self::PlaySfx { .. } => CommandKind::PlaySfx,
            Self::FocusCamera { .. } => CommandKind::FocusCamera,
            Self::ResetCamera => CommandKind::ResetCamera,
            Self::ShakeCamera { .. } => CommandKind::ShakeCamera,
            Self::RunScript { .. } => CommandKind::RunScript,
            Self::AddItem { .. } => CommandKind::AddItem,
            Self::BeginCutscene { .. } => CommandKind::BeginCutscene,
            Self::EndCutscene { .. } => CommandKind::EndCutscene,
            Self::ThreePhaseStateChanged { .. } => CommandKind::ThreePhaseStateChanged,
            Self::ChangeScene { .. } => CommandKind::ChangeScene,
            Self::OpenSaveMenu => CommandKind::OpenSaveMenu,
            Self::ShowNotice { .. } => CommandKind::ShowNotice,
        }
    }

    /// The session-addressed subset, ready to feed back into `LevelSession::handle`.
    pub fn to_session_command(&self) -> Option<SessionCommand> {
        match *self {
            Self::RequestInteraction {
                object,
                started_by_player,
            } => Some(SessionCommand::RequestInteraction {
                object,
                started_by_player,
            }),
            Self::SetObjectActivation { object, active } => {
                Some(SessionCommand::SetObjectActivation { object, active })
            }
            Self::ThreePhaseStateChanged { previous, current } => {
                Some(SessionCommand::ThreePhaseStateChanged { previous, current })
            }
            _ => None,
        }
    }
}

/// Commands and completion notices entering the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SetObjectActivation { object: ObjectId, active: bool },
    RequestInteraction { object: ObjectId, started_by_player: bool },
    PlayerEnteredTrigger { object: ObjectId },
    PlayerExitedTrigger { object: ObjectId },
    PlayerEnteredTile { tile: GridPos, layer: usize },
    ThreePhaseStateChanged { previous: u8, current: u8 },
    SetActorActive { actor: ActorId, active: bool },
    AnimationFinished { ticket: AnimationTicket },
    CameraMoveFinished,
    ScriptFinished { script_id: ScriptId },
    MovementFinished { ticket: MoveTicket },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandCounts {
    pub total: u32,
    pub interaction_requests: u32,
    pub activation_changes: u32,
    pub camera: u32,
    pub scripts: u32,
    pub cutscene: u32,
    pub other: u32,
}

impl CommandCounts {
    fn record(&mut self, kind: CommandKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            CommandKind::RequestInteraction => {
                self.interaction_requests = self.interaction_requests.saturating_add(1)
            }
            CommandKind::SetObjectActivation => {
                self.activation_changes = self.activation_changes.saturating_add(1)
            }
            CommandKind::FocusCamera | CommandKind::ResetCamera | CommandKind::ShakeCamera => {
                self.camera = self.camera.saturating_add(1)
            }
            CommandKind::RunScript => self.scripts = self.scripts.saturating_add(1),
            CommandKind::BeginCutscene | CommandKind::EndCutscene => {
                self.cutscene = self.cutscene.saturating_add(1)
            }
            _ => self.other = self.other.saturating_add(1),
        }
    }
}

#[derive(Debug, Default)]
pub struct CommandOutbox {
    commands: Vec<Command>,
    last_drain_counts: CommandCounts,
}

impl CommandOutbox {
    pub fn emit(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn pending(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Command> {
        let mut counts = CommandCounts::default();
        for command in &self.commands {
            counts.record(command.kind());
        }
        self.last_drain_counts = counts;
        std::mem::take(&mut self.commands)
    }

    pub fn last_drain_counts(&self) -> CommandCounts {
        self.last_drain_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_outbox_and_records_counts() {
        let mut outbox = CommandOutbox::default();
        outbox.emit(Command::ResetCamera);
        outbox.emit(Command::RunScript {
            script_id: ScriptId(4),
            correlation_id: CorrelationId(1),
        });
        outbox.emit(Command::OpenSaveMenu);

        let drained = outbox.drain();
        assert_eq!(drained.len(), 3);
        assert!(outbox.is_empty());
        let counts = outbox.last_drain_counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.camera, 1);
        assert_eq!(counts.scripts, 1);
        assert_eq!(counts.other, 1);
    }

    #[test]
    fn only_session_addressed_commands_route_back() {
        let request = Command::RequestInteraction {
            object: ObjectId(3),
            started_by_player: false,
        };
        assert_eq!(
            request.to_session_command(),
            Some(SessionCommand::RequestInteraction {
                object: ObjectId(3),
                started_by_player: false
            })
        );
        assert_eq!(Command::PlaySfx { name: "bell".into() }.to_session_command(), None);
    }
}
