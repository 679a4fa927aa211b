//! `nightfog [config.json] [--constrained]`
//!
//! Opens the night scene. A JSON file overrides the defaults; without one
//! the desktop profile is used, or the low-power profile with
//! `--constrained`.

use std::process::ExitCode;

use nightfog::SceneConfig;

fn main() -> ExitCode {
    let _ = env_logger::try_init();

    let mut path = None;
    let mut constrained = false;
    for arg in std::env::args().skip(1) {
        if arg == "--constrained" {
            constrained = true;
        } else {
            path = Some(arg);
        }
    }

    let config = match path {
        Some(path) => match SceneConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("failed to read {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None if constrained => SceneConfig::constrained(),
        None => SceneConfig::default(),
    };

    nightfog::show_with_config(config);
    ExitCode::SUCCESS
}
