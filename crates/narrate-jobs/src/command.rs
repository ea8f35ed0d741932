//! Engine invocation: voice parameter normalization and argument lists

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    sync::OnceLock,
};

use narrate_config::{EngineConfig, VoiceDefaults};
use regex::Regex;

/// Voice parameters after defaults and normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceParams {
    pub voice: String,
    pub rate: String,
    pub pitch: String,
}

impl VoiceParams {
    /// Apply defaults to the caller's parameters
    ///
    /// Missing, blank and malformed values all fall back to the default for
    /// that parameter; nothing is rejected here.
    pub fn resolve(voice: Option<&str>, rate: Option<&str>, pitch: Option<&str>, defaults: &VoiceDefaults) -> Self {
        Self {
            voice: pick("voice", voice, &defaults.voice, is_valid_voice),
            rate: pick("rate", rate, &defaults.rate, is_valid_rate),
            pitch: pick("pitch", pitch, &defaults.pitch, is_valid_pitch),
        }
    }

    /// Check that configured defaults are themselves well-formed
    ///
    /// # Errors
    ///
    /// Returns a message naming the first malformed default
    pub fn check_defaults(defaults: &VoiceDefaults) -> Result<(), String> {
        let checks: [(&str, &str, fn(&str) -> bool); 3] = [
            ("voice", &defaults.voice, is_valid_voice),
            ("rate", &defaults.rate, is_valid_rate),
            ("pitch", &defaults.pitch, is_valid_pitch),
        ];

        match checks.into_iter().find(|(_, value, valid)| !valid(value)) {
            Some((name, value, _)) => Err(format!("default {name} '{value}' is malformed")),
            None => Ok(()),
        }
    }
}

fn pick(name: &str, requested: Option<&str>, default: &str, valid: fn(&str) -> bool) -> String {
    match requested.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) if valid(value) => value.to_string(),
        Some(value) => {
            tracing::debug!(parameter = name, value, default, "malformed voice parameter replaced by default");
            default.to_string()
        }
        None => default.to_string(),
    }
}

/// Locale-prefixed voice name such as `en-US-ChristopherNeural`
fn is_valid_voice(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]+){1,4}$").expect("voice pattern is valid"))
        .is_match(value)
}

/// Signed percentage such as `+10%` or `-25%`
fn is_valid_rate(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-][0-9]{1,3}%$").expect("rate pattern is valid"))
        .is_match(value)
}

/// Signed frequency offset such as `-2Hz` or `+15Hz`
fn is_valid_pitch(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-][0-9]{1,4}Hz$").expect("pitch pattern is valid"))
        .is_match(value)
}

/// A fully resolved engine invocation: program plus ordered arguments
///
/// Never passes through a shell. The text itself is not on the command
/// line; the engine reads it from the input artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl EngineCommand {
    /// Lay out `program [script] [args..] <input> --output <output> --voice=.. --rate=.. --pitch=..`
    ///
    /// Voice parameters use the `--name=value` form so that signed values
    /// like `-2Hz` reach the engine as values rather than as flags.
    pub fn build(engine: &EngineConfig, input: &Path, output: &Path, params: &VoiceParams) -> Self {
        let mut args: Vec<OsString> = Vec::with_capacity(engine.args.len() + 7);

        if let Some(ref script) = engine.script {
            args.push(script.as_os_str().to_owned());
        }
        args.extend(engine.args.iter().map(OsString::from));
        args.push(input.as_os_str().to_owned());
        args.push("--output".into());
        args.push(output.as_os_str().to_owned());
        args.push(format!("--voice={}", params.voice).into());
        args.push(format!("--rate={}", params.rate).into());
        args.push(format!("--pitch={}", params.pitch).into());

        Self {
            program: OsString::from(&engine.program),
            args,
        }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Process builder for this invocation
    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn engine() -> EngineConfig {
        EngineConfig {
            program: "python3".to_string(),
            script: Some(PathBuf::from("backend/generate_audio.py")),
            args: Vec::new(),
            timeout: "60s".to_string(),
        }
    }

    fn rendered(command: &EngineCommand) -> String {
        std::iter::once(command.program())
            .chain(command.args().iter().map(OsString::as_os_str))
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn omitted_parameters_take_defaults() {
        let params = VoiceParams::resolve(None, None, None, &VoiceDefaults::default());
        let command = EngineCommand::build(
            &engine(),
            Path::new("/work/abc.txt"),
            Path::new("/work/abc.mp3"),
            &params,
        );

        insta::assert_snapshot!(rendered(&command), @r"
        python3
        backend/generate_audio.py
        /work/abc.txt
        --output
        /work/abc.mp3
        --voice=en-US-ChristopherNeural
        --rate=+0%
        --pitch=-2Hz
        ");
    }

    #[test]
    fn each_parameter_appears_exactly_once() {
        let params = VoiceParams::resolve(
            Some("pt-BR-AntonioNeural"),
            Some("+10%"),
            Some("+5Hz"),
            &VoiceDefaults::default(),
        );
        let command = EngineCommand::build(&engine(), Path::new("in.txt"), Path::new("out.mp3"), &params);
        let args: Vec<String> = command.args().iter().map(|a| a.to_string_lossy().into_owned()).collect();

        for prefix in ["--voice=", "--rate=", "--pitch=", "--output"] {
            assert_eq!(args.iter().filter(|a| a.starts_with(prefix)).count(), 1, "{prefix}");
        }
        assert!(args.contains(&"--voice=pt-BR-AntonioNeural".to_string()));
        assert!(args.contains(&"--rate=+10%".to_string()));
        assert!(args.contains(&"--pitch=+5Hz".to_string()));
    }

    #[test]
    fn hostile_values_are_normalized_not_interpolated() {
        let params = VoiceParams::resolve(
            Some("en-US\"; rm -rf / #"),
            Some("$(reboot)"),
            Some("-2Hz --output /etc/passwd"),
            &VoiceDefaults::default(),
        );

        assert_eq!(params, VoiceParams::resolve(None, None, None, &VoiceDefaults::default()));
    }

    #[test]
    fn blank_values_count_as_absent() {
        let params = VoiceParams::resolve(Some("  "), Some(""), None, &VoiceDefaults::default());
        assert_eq!(params.voice, "en-US-ChristopherNeural");
        assert_eq!(params.rate, "+0%");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let params = VoiceParams::resolve(Some(" en-GB-SoniaNeural "), Some(" -20% "), None, &VoiceDefaults::default());
        assert_eq!(params.voice, "en-GB-SoniaNeural");
        assert_eq!(params.rate, "-20%");
    }

    #[test]
    fn leading_engine_args_follow_the_script() {
        let mut engine = engine();
        engine.args = vec!["-u".to_string()];
        let params = VoiceParams::resolve(None, None, None, &VoiceDefaults::default());
        let command = EngineCommand::build(&engine, Path::new("a.txt"), Path::new("a.mp3"), &params);

        assert_eq!(command.args()[0], OsString::from("backend/generate_audio.py"));
        assert_eq!(command.args()[1], OsString::from("-u"));
        assert_eq!(command.args()[2], OsString::from("a.txt"));
    }

    #[test]
    fn malformed_default_is_reported() {
        let defaults = VoiceDefaults {
            rate: "fast".to_string(),
            ..VoiceDefaults::default()
        };
        let err = VoiceParams::check_defaults(&defaults).unwrap_err();
        assert!(err.contains("rate"));
        assert!(VoiceParams::check_defaults(&VoiceDefaults::default()).is_ok());
    }
}
