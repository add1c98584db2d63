use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    /// Commit backend: "echo", "direct" or "clipboard"
    #[serde(default = "default_method")]
    pub method: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
        }
    }
}

fn default_method() -> String {
    "echo".into()
}

#[derive(Debug, Deserialize)]
pub struct ReplayConfig {
    /// Transcript lines the replay recognizer speaks, one per attempt
    #[serde(default = "default_lines")]
    pub lines: Vec<String>,
    /// Pacing between replayed events
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            lines: default_lines(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_lines() -> Vec<String> {
    vec![
        "hello world".into(),
        "voice input makes typing optional".into(),
    ]
}

fn default_delay_ms() -> u64 {
    250
}

impl Config {
    pub fn load() -> Self {
        let path = Path::new("voxkey.toml");
        if path.exists() {
            fs::read_to_string(path)
                .ok()
                .and_then(|s| toml::from_str(&s).ok())
                .unwrap_or_default()
        } else {
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.input.method, "echo");
        assert!(!config.replay.lines.is_empty());
        assert_eq!(config.replay.delay_ms, 250);
    }

    #[test]
    fn sections_override_defaults() {
        let config: Config = toml::from_str(
            r#"
[input]
method = "clipboard"

[replay]
lines = ["one", "two"]
delay_ms = 10
"#,
        )
        .unwrap();
        assert_eq!(config.input.method, "clipboard");
        assert_eq!(config.replay.lines, ["one", "two"]);
        assert_eq!(config.replay.delay_ms, 10);
    }
}
