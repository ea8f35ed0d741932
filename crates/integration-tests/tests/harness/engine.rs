//! Shell scripts standing in for the synthesis engine
//!
//! The engine is invoked as `sh <script> <input> --output <output> --voice=.. --rate=.. --pitch=..`,
//! so inside the script `$1` is the input path and `$3` the output path.
//! Scripts are read by the shell rather than executed, so a concurrent
//! fork elsewhere in the test binary cannot fail the spawn with
//! "text file busy".

use std::path::{Path, PathBuf};

/// Writes `ID3:` followed by the input text, so each response identifies its job
pub const ECHO: &str = r#"printf 'ID3:%s' "$(cat "$1")" > "$3""#;

/// Fails the way the real engine does when the voice service is unreachable
pub const FAILING: &str = r#"echo "Error: No audio was received" >&2; exit 1"#;

/// Exits successfully without writing anything
pub const SILENT: &str = "exit 0";

/// Install an engine script into `dir`
pub fn install(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("engine.sh");
    std::fs::write(&path, format!("{body}\n")).expect("write engine script");
    path
}

/// Engine that records its pid in `pid_file` and then never finishes
pub fn hanging(pid_file: &Path) -> String {
    format!("echo $$ > '{}'; exec sleep 60", pid_file.display())
}

/// Whether the process with the pid recorded in `pid_file` is still running
pub fn is_alive(pid_file: &Path) -> bool {
    let pid = std::fs::read_to_string(pid_file).expect("engine recorded its pid");

    std::process::Command::new("kill")
        .args(["-0", pid.trim()])
        .status()
        .is_ok_and(|status| status.success())
}

/// Files left in a directory, empty if it does not exist
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).map(|entry| entry.path()).collect())
        .unwrap_or_default()
}
