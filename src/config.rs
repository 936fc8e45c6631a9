use crate::ai_provider::AiProvider;
use crate::error::{GraderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const DEBUG_LOG_FILE_NAME: &str = "debug.log";

/// Overrides the settings file location.
pub const CONFIG_PATH_ENV: &str = "ESSAY_GRADER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub prompt: PromptSettings,
    pub ocr: OcrSettings,
    pub annotate: AnnotateSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub provider: AiProvider,
    pub key: String,
    pub deep_think: bool,
    /// Defer batches to the off-peak window.
    pub cost_saving: bool,
}

/// Free text is written on one line; see [`escape_newlines`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    #[serde(with = "escaped")]
    pub title: String,
    #[serde(with = "escaped")]
    pub rubric: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<PathBuf>,
    /// Roots walked as a last resort when looking for the Tesseract binary.
    pub search_roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnnotateSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            provider: AiProvider::Deepseek,
            key: String::new(),
            deep_think: true,
            cost_saving: false,
        }
    }
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_roots: default_search_roots(),
        }
    }
}

impl Settings {
    /// Strict load; any read or parse failure is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load, or replace a missing/corrupt file with the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("Settings at {} unusable, resetting to defaults: {err}", path.display());
                let settings = Self::default();
                if let Err(err) = settings.save(path) {
                    warn!("Could not write default settings: {err}");
                }
                settings
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Environment variable of the selected provider wins over the stored key.
    pub fn effective_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(self.api.provider.api_key_env()) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
        let key = self.api.key.trim();
        (!key.is_empty()).then(|| key.to_string())
    }
}

pub fn default_settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let base = dirs::config_dir()
        .ok_or_else(|| GraderError::Config("no configuration directory on this platform".into()))?;
    Ok(base.join("essay-grader").join(SETTINGS_FILE_NAME))
}

/// `debug.log` lives next to the settings file.
pub fn debug_log_path(settings_path: &Path) -> PathBuf {
    settings_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEBUG_LOG_FILE_NAME)
}

fn default_search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if cfg!(windows) {
        roots.push(PathBuf::from(r"C:\Program Files"));
        roots.push(PathBuf::from(r"C:\Program Files (x86)"));
        if let Some(local) = dirs::data_local_dir() {
            roots.push(local.join("Programs"));
        }
    } else if cfg!(target_os = "macos") {
        roots.push(PathBuf::from("/opt"));
        roots.push(PathBuf::from("/Applications"));
    } else {
        roots.push(PathBuf::from("/opt"));
    }
    roots
}

/// Newlines become a literal `\n`, backslashes `\\`, so multi-line text
/// round-trips through a single line exactly.
pub fn escape_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

mod escaped {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::escape_newlines(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(super::unescape_newlines(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip() {
        let cases = [
            "",
            "one line",
            "Content 10\nLanguage 5\n",
            "literal \\n stays literal",
            "windows\r\nline",
            "trailing backslash \\",
        ];
        for case in cases {
            let escaped = escape_newlines(case);
            assert!(!escaped.contains('\n'));
            assert_eq!(unescape_newlines(&escaped), case);
        }
    }

    #[test]
    fn test_unescape_unknown_sequence_kept() {
        assert_eq!(unescape_newlines(r"a\tb"), r"a\tb");
    }

    #[test]
    fn test_rubric_written_on_one_line() {
        let mut settings = Settings::default();
        settings.prompt.rubric = "A\nB".into();
        let content = toml::to_string_pretty(&settings).unwrap();
        let line = content
            .lines()
            .find(|l| l.starts_with("rubric"))
            .expect("rubric line");
        assert!(line.contains('A') && line.contains('B'));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api.provider, AiProvider::Deepseek);
        assert!(settings.api.key.is_empty());
        assert!(settings.api.deep_think);
        assert!(!settings.api.cost_saving);
        assert!(settings.prompt.rubric.is_empty());
        assert!(settings.ocr.binary_path.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings = toml::from_str("[api]\nkey = \"sk-1\"\n").unwrap();
        assert_eq!(settings.api.key, "sk-1");
        assert!(settings.api.deep_think);
        assert_eq!(settings.api.provider, AiProvider::Deepseek);
    }

    #[test]
    fn test_debug_log_path_next_to_settings() {
        let path = debug_log_path(Path::new("/tmp/essay-grader/settings.toml"));
        assert_eq!(path, Path::new("/tmp/essay-grader/debug.log"));
    }
}
