mod atomic_io;
mod bootstrap;
mod level_file;
mod runner;
mod save_file;
mod script;

pub use bootstrap::{init_tracing, ConfigError, RunnerConfig};
pub use level_file::{load_level_file, LevelFile, LevelFileError, LoadedLevel};
pub use runner::{run, RunSummary, RunnerError};
pub use save_file::{read_save_file, write_save_file, SaveFile, SaveFileError};
pub use script::{parse_script, ScriptCommand, ScriptError, ScriptLine};
