//! Shell scripts standing in for the engine in unit tests

use std::{
    path::Path,
    time::{Duration, Instant},
};

use narrate_config::EngineConfig;

/// Engine settings that run `body` with `/bin/sh`
///
/// The engine is invoked as `sh <script> <input> --output <output> --voice=.. --rate=.. --pitch=..`,
/// so inside the script `$1` is the input path and `$3` the output path.
/// The script is read by the shell instead of being executed itself, which
/// keeps a fork in a concurrent test from failing the spawn with
/// "text file busy".
pub fn fake_engine(dir: &Path, body: &str) -> EngineConfig {
    let script = dir.join("engine.sh");
    std::fs::write(&script, format!("{body}\n")).unwrap();

    EngineConfig {
        program: "/bin/sh".to_string(),
        script: Some(script),
        timeout: "5s".to_string(),
        ..EngineConfig::default()
    }
}

/// Pid written by a fake engine into `file`
pub fn read_pid(file: &Path) -> String {
    std::fs::read_to_string(file).unwrap().trim().to_string()
}

/// Whether `pid` is still running; zombies waiting to be reaped count as gone
pub fn is_running(pid: &str) -> bool {
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        return stat
            .rsplit(')')
            .next()
            .is_some_and(|state| !state.trim_start().starts_with('Z'));
    }

    std::process::Command::new("kill")
        .args(["-0", pid])
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Wait for `pid` to exit, returning false if it is still running after a few seconds
pub async fn exits_soon(pid: &str) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while is_running(pid) {
        if Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}
