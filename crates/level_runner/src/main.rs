use level_runner::{init_tracing, resolve_app_paths, run, RunnerConfig};
use tracing::{error, info};

fn main() {
    init_tracing();
    info!("=== Wayfarer Level Runner ===");

    let config = match RunnerConfig::from_env_and_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "startup_failed");
            std::process::exit(2);
        }
    };
    let paths = match resolve_app_paths() {
        Ok(paths) => paths,
        Err(err) => {
            error!(error = %err, "startup_failed");
            std::process::exit(1);
        }
    };

    match run(&config, &paths) {
        Ok(summary) => info!(
            lines = summary.lines_executed,
            external_commands = summary.external_commands,
            saved = summary.saved,
            "run_finished"
        ),
        Err(err) => {
            error!(error = %err, "run_failed");
            std::process::exit(1);
        }
    }
}
