use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// `{{ env.VAR | default("value") }}` falls back to `value` when `VAR` is
/// unset. Comment lines are copied through untouched so commented-out
/// settings never require their variables to exist.
pub fn expand_env(input: &str) -> Result<String, String> {
    fn placeholder() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| {
            Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
                .expect("placeholder pattern is valid")
        })
    }

    let expanded: Vec<String> = input
        .split('\n')
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return Ok(line.to_string());
            }

            let mut failure = None;
            let replaced = placeholder().replace_all(line, |caps: &Captures<'_>| {
                match resolve(&caps[1], caps.get(2).map(|m| m.as_str())) {
                    Ok(value) => value,
                    Err(e) => {
                        failure.get_or_insert(e);
                        String::new()
                    }
                }
            });

            match failure {
                Some(e) => Err(e),
                None => Ok(replaced.into_owned()),
            }
        })
        .collect::<Result<_, _>>()?;

    Ok(expanded.join("\n"))
}

fn resolve(key: &str, default: Option<&str>) -> Result<String, String> {
    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    match (std::env::var(var_name), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_string()),
        (Err(_), None) => Err(format!("environment variable not found: `{var_name}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "[engine]\nprogram = \"python3\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn substitutes_variable() {
        temp_env::with_var("NARRATE_TEST_PROGRAM", Some("/opt/tts/bin/python"), || {
            let result = expand_env("program = \"{{ env.NARRATE_TEST_PROGRAM }}\"").unwrap();
            assert_eq!(result, "program = \"/opt/tts/bin/python\"");
        });
    }

    #[test]
    fn substitutes_several_variables_on_one_line() {
        let vars = [("NARRATE_TEST_HOST", Some("127.0.0.1")), ("NARRATE_TEST_PORT", Some("8080"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("listen_address = \"{{ env.NARRATE_TEST_HOST }}:{{env.NARRATE_TEST_PORT}}\"").unwrap();
            assert_eq!(result, "listen_address = \"127.0.0.1:8080\"");
        });
    }

    #[test]
    fn missing_variable_is_an_error() {
        temp_env::with_var_unset("NARRATE_TEST_MISSING", || {
            let err = expand_env("script = \"{{ env.NARRATE_TEST_MISSING }}\"").unwrap_err();
            assert!(err.contains("NARRATE_TEST_MISSING"));
        });
    }

    #[test]
    fn default_covers_missing_variable() {
        temp_env::with_var_unset("NARRATE_TEST_MISSING", || {
            let result = expand_env("timeout = \"{{ env.NARRATE_TEST_MISSING | default(\"90s\") }}\"").unwrap();
            assert_eq!(result, "timeout = \"90s\"");
        });
    }

    #[test]
    fn variable_wins_over_default() {
        temp_env::with_var("NARRATE_TEST_TIMEOUT", Some("5s"), || {
            let result = expand_env("timeout = \"{{ env.NARRATE_TEST_TIMEOUT | default(\"90s\") }}\"").unwrap();
            assert_eq!(result, "timeout = \"5s\"");
        });
    }

    #[test]
    fn non_env_scope_is_rejected() {
        let err = expand_env("key = \"{{ secrets.TOKEN }}\"").unwrap_err();
        assert!(err.contains("only variables scoped with 'env.'"));
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("NARRATE_TEST_MISSING", || {
            let input = "  # script = \"{{ env.NARRATE_TEST_MISSING }}\"\nprogram = \"sh\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
