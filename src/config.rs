use crate::error::{Result, SubtransError};
use crate::subtitle::DEFAULT_CHUNK_SIZE;
use crate::translate::client::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use crate::translate::openai::DEFAULT_API_BASE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "subtrans.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    #[default]
    Informal,
}

impl Tone {
    /// Directive appended to the translation instruction. Informal adds nothing.
    pub fn instruction(&self) -> &'static str {
        match self {
            Tone::Formal => "using a formal tone",
            Tone::Informal => "",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tone::Formal => write!(f, "formal"),
            Tone::Informal => write!(f, "informal"),
        }
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "formal" => Ok(Tone::Formal),
            "informal" => Ok(Tone::Informal),
            _ => Err(format!(
                "Unknown tone: {}. Use 'formal' or 'informal'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    /// Human-readable language name used in the prompt, e.g. "French".
    pub target_language: String,
    pub model: String,
    pub api_base: String,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            target_language: "English".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(SubtransError::FileNotFound(path.display().to_string()));
                }
                Self::from_file(path)?
            }
            None => match Self::candidate_paths().into_iter().find(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str::<Config>(&contents).map_err(|e| {
            SubtransError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Ok(language) = std::env::var("SUBTRANS_TARGET_LANGUAGE") {
            self.target_language = language;
        }
        if let Ok(model) = std::env::var("SUBTRANS_MODEL") {
            self.model = model;
        }
        if let Ok(base) = std::env::var("SUBTRANS_API_BASE") {
            self.api_base = base;
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.openai_api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => {
                return Err(SubtransError::Config(
                    "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-..."
                        .to_string(),
                ))
            }
        }

        if self.target_language.trim().is_empty() {
            return Err(SubtransError::Config(
                "target_language must not be empty".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(SubtransError::Config(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(SubtransError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("subtrans").join("config.toml"));
        }
        paths
    }
}
