use std::fs;
use std::path::{Path, PathBuf};

use scene_core::{
    HeadlessSession, LevelId, MemorySaveState, ObjectRegistry, RegistryError, SessionCommand,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::bootstrap::RunnerConfig;
use super::level_file::{load_level_file, LevelFileError};
use super::save_file::{read_save_file, save_path_for, write_save_file, SaveFile, SaveFileError};
use super::script::{parse_script, ScriptCommand, ScriptError, ScriptLine};
use crate::AppPaths;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Level(#[from] LevelFileError),
    #[error(transparent)]
    Save(#[from] SaveFileError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("object registry is invalid: {0}")]
    Registry(#[from] RegistryError),
    #[error("failed to read script {path}: {source}")]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_executed: u32,
    pub external_commands: u32,
    pub completions_delivered: u32,
    pub saves_written: u32,
    pub saved: bool,
}

impl RunSummary {
    fn record_line(&mut self) {
        self.lines_executed = self.lines_executed.saturating_add(1);
    }

    fn record_external(&mut self, count: usize) {
        self.external_commands = self
            .external_commands
            .saturating_add(u32::try_from(count).unwrap_or(u32::MAX));
    }

    fn record_completions(&mut self, count: usize) {
        self.completions_delivered = self
            .completions_delivered
            .saturating_add(u32::try_from(count).unwrap_or(u32::MAX));
    }

    fn record_save(&mut self) {
        self.saves_written = self.saves_written.saturating_add(1);
        self.saved = true;
    }
}

/// Where `save` lines write, and what the save is pinned to.
struct SaveTarget {
    path: PathBuf,
    level: LevelId,
    level_sha256: String,
}

impl SaveTarget {
    fn write(&self, state: &MemorySaveState) -> Result<(), SaveFileError> {
        let save = SaveFile::new(&self.level, &self.level_sha256, state.clone());
        write_save_file(&self.path, &save)?;
        info!(
            path = %self.path.display(),
            overrides = state.override_count(),
            "save_written"
        );
        Ok(())
    }
}

pub fn run(config: &RunnerConfig, paths: &AppPaths) -> Result<RunSummary, RunnerError> {
    let loaded = load_level_file(&config.level_path)?;
    let level = loaded.data.info.id.clone();
    let target = SaveTarget {
        path: save_path_for(&paths.saves_dir, &level),
        level,
        level_sha256: loaded.sha256_hex,
    };
    let state = restore_save_state(&target)?;

    let lines = match &config.script_path {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };

    let registry = ObjectRegistry::with_default_kinds()?;
    let mut session = HeadlessSession::headless(loaded.data, &registry, state);
    let report = session.load_report();
    info!(
        level = %target.level.key(),
        objects = session.object_count(),
        activated = report.activated,
        failed = report.failed,
        script_lines = lines.len(),
        "runner_ready"
    );

    let mut summary = execute_script(&mut session, &lines, config.tick_seconds, Some(&target))?;
    if config.autosave {
        target.write(session.save_state())?;
        summary.record_save();
    }
    session.unload();
    Ok(summary)
}

fn restore_save_state(target: &SaveTarget) -> Result<MemorySaveState, RunnerError> {
    let Some(save) = read_save_file(&target.path)? else {
        return Ok(MemorySaveState::default());
    };
    match save.validate(&target.level, &target.level_sha256) {
        Ok(()) => {
            info!(
                path = %target.path.display(),
                overrides = save.state.override_count(),
                "save_restored"
            );
            Ok(save.state)
        }
        Err(err) => {
            warn!(path = %target.path.display(), error = %err, "stale_save_ignored");
            Ok(MemorySaveState::default())
        }
    }
}

fn load_script(path: &Path) -> Result<Vec<ScriptLine>, RunnerError> {
    let source = fs::read_to_string(path).map_err(|source| RunnerError::ReadScript {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_script(&source)?)
}

/// Runs each line against the session, then routes what the session emitted. Commands meant
/// for other systems are logged and counted.
fn execute_script(
    session: &mut HeadlessSession,
    lines: &[ScriptLine],
    tick_seconds: f32,
    save: Option<&SaveTarget>,
) -> Result<RunSummary, RunnerError> {
    let mut summary = RunSummary::default();
    for line in lines {
        debug!(line = line.line, command = ?line.command, "script_line");
        match line.command {
            ScriptCommand::Activate(object) => session.handle(SessionCommand::SetObjectActivation {
                object,
                active: true,
            }),
            ScriptCommand::Deactivate(object) => {
                session.handle(SessionCommand::SetObjectActivation {
                    object,
                    active: false,
                })
            }
            ScriptCommand::Interact(object) => {
                if !session.activate_or_interact(object, true) {
                    warn!(line = line.line, object_id = object.0, "interaction_refused");
                }
            }
            ScriptCommand::Enter(object) => {
                session.handle(SessionCommand::PlayerEnteredTrigger { object })
            }
            ScriptCommand::Exit(object) => {
                session.handle(SessionCommand::PlayerExitedTrigger { object })
            }
            ScriptCommand::Tile { tile, layer } => session.place_player(tile, layer),
            ScriptCommand::Tick(seconds) => session.tick(seconds.unwrap_or(tick_seconds)),
            ScriptCommand::Path { layer, from, to } => {
                let transient = session.blocking_tiles_for_layer(layer, session.player());
                let path = scene_core::find_path(session.tilemap(), layer, from, to, &transient);
                info!(
                    line = line.line,
                    layer,
                    steps = path.len(),
                    end = ?path.last(),
                    "path_found"
                );
            }
            ScriptCommand::FinishAll => {
                let delivered = session.complete_all_pending();
                summary.record_completions(delivered);
            }
            ScriptCommand::Save => match save {
                Some(target) => {
                    target.write(session.save_state())?;
                    summary.record_save();
                }
                None => warn!(line = line.line, "save_without_target"),
            },
        }

        let external = session.route_commands();
        for command in &external {
            info!(line = line.line, kind = ?command.kind(), command = ?command, "external_command");
        }
        summary.record_external(external.len());
        summary.record_line();
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::level_file::tests::sample_level_json;
    use crate::app::level_file::LevelFile;
    use scene_core::{GridPos, LevelData, ObjectId, SaveStateStore};

    fn sample_session(state: MemorySaveState) -> HeadlessSession {
        let file: LevelFile = serde_json::from_value(sample_level_json()).expect("decode");
        let data: LevelData = file.into_level_data().expect("level data");
        let registry = ObjectRegistry::with_default_kinds().expect("registry");
        HeadlessSession::headless(data, &registry, state)
    }

    fn script(source: &str) -> Vec<ScriptLine> {
        parse_script(source).expect("script")
    }

    #[test]
    fn switch_interaction_chains_into_the_door_and_persists() {
        let mut session = sample_session(MemorySaveState::default());
        let summary = execute_script(
            &mut session,
            &script("interact 1\nfinish-all\ntick"),
            0.1,
            None,
        )
        .expect("run");

        assert_eq!(summary.lines_executed, 3);
        assert!(summary.completions_delivered >= 2);
        assert!(summary.external_commands >= 2, "cutscene begin and end");
        assert_eq!(session.running_sequence_count(), 0);

        let level = session.level().id.clone();
        let switch = session
            .save_state()
            .object_override(&level, ObjectId(1))
            .expect("switch override");
        assert_eq!(switch.switch_state, Some(1));
        assert_eq!(switch.times, Some(0));
        let door = session
            .save_state()
            .object_override(&level, ObjectId(2))
            .expect("door override");
        assert_eq!(door.switch_state, Some(1));
    }

    #[test]
    fn exhausted_switch_refuses_a_second_interaction() {
        let mut session = sample_session(MemorySaveState::default());
        execute_script(&mut session, &script("interact 1\nfinish-all"), 0.1, None).expect("run");
        let summary = execute_script(&mut session, &script("interact 1"), 0.1, None).expect("run");

        assert_eq!(summary.external_commands, 0);
        assert_eq!(session.running_sequence_count(), 0);
    }

    #[test]
    fn save_line_writes_a_save_that_restores_on_the_next_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = sample_session(MemorySaveState::default());
        let target = SaveTarget {
            path: dir.path().join("save.json"),
            level: session.level().id.clone(),
            level_sha256: "feed".to_string(),
        };
        let summary = execute_script(
            &mut session,
            &script("interact 1\nfinish-all\nsave"),
            0.1,
            Some(&target),
        )
        .expect("run");
        assert_eq!(summary.saves_written, 1);

        let restored = restore_save_state(&target).expect("restore");
        assert_eq!(&restored, session.save_state());

        let stale = SaveTarget {
            level_sha256: "beef".to_string(),
            ..target
        };
        let ignored = restore_save_state(&stale).expect("restore");
        assert_eq!(ignored.override_count(), 0);
    }

    #[test]
    fn path_and_tile_lines_run_without_touching_objects() {
        let mut session = sample_session(MemorySaveState::default());
        let summary = execute_script(
            &mut session,
            &script("path 0 2 2 6 6\ntile 3 2 0\ntick 0.5"),
            0.1,
            None,
        )
        .expect("run");

        assert_eq!(summary.lines_executed, 3);
        assert_eq!(summary.external_commands, 0);
        let player = session.player().expect("player");
        assert_eq!(
            session.find_path_for_actor(player, GridPos::new(6, 6)).last(),
            Some(GridPos::new(6, 6))
        );
        assert!(session
            .find_path_for_actor(player, GridPos::new(3, 2))
            .is_empty());
    }

    #[test]
    fn run_reads_level_and_script_from_disk_and_autosaves() {
        let dir = tempfile::tempdir().expect("tempdir");
        let level_path = dir.path().join("level.json");
        let script_path = dir.path().join("script.txt");
        fs::write(
            &level_path,
            serde_json::to_string(&sample_level_json()).expect("json"),
        )
        .expect("level");
        fs::write(&script_path, "# open the door\ninteract 1\nfinish-all\n").expect("script");

        let paths = AppPaths {
            root: dir.path().to_path_buf(),
            levels_dir: dir.path().to_path_buf(),
            cache_dir: dir.path().join("cache"),
            saves_dir: dir.path().join("cache").join("saves"),
        };
        let config = RunnerConfig {
            level_path,
            script_path: Some(script_path),
            autosave: true,
            ..RunnerConfig::default()
        };

        let summary = run(&config, &paths).expect("run");
        assert_eq!(summary.lines_executed, 2);
        assert!(summary.saved);

        let save_path = save_path_for(&paths.saves_dir, &LevelId::new(2, 5));
        let save = read_save_file(&save_path).expect("read").expect("present");
        assert_eq!(save.level_key, "2:5");
        assert!(save.state.override_count() >= 2);
    }
}
