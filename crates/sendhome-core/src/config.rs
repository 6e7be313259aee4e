//! Game configuration: built-in defaults, optional TOML file, `SENDHOME_*` environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/sendhome.toml";

/// How the decision engine treats a resolution for a case that is not at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Any case in the session may be resolved; the cursor still advances by one.
    #[default]
    Lenient,
    /// Only the case at the cursor may be resolved.
    Strict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrativeConfig {
    pub api_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub api_url: String,
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub port: u16,
    pub storage_path: String,
    pub default_num_cases: usize,
    pub max_num_cases: usize,
    pub secondary_checks_quota: u32,
    pub audio_concurrency: usize,
    pub resolution_policy: ResolutionPolicy,
    pub game_year_offset: u32,
    /// Comma separated.
    pub cors_origins: String,
    #[serde(default)]
    pub public_dir: Option<String>,
    pub narrative: NarrativeConfig,
    pub voice: VoiceConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            storage_path: "./data/sessions".to_string(),
            default_num_cases: 15,
            max_num_cases: 50,
            secondary_checks_quota: 3,
            audio_concurrency: 6,
            resolution_policy: ResolutionPolicy::Lenient,
            game_year_offset: 100,
            cors_origins: "http://localhost:3000,http://localhost:3001,http://localhost:5173"
                .to_string(),
            public_dir: None,
            narrative: NarrativeConfig {
                api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
                model: "google/gemini-2.0-flash-001".to_string(),
                api_key: None,
            },
            voice: VoiceConfig {
                api_url: "https://api.elevenlabs.io/v1".to_string(),
                model_id: "eleven_turbo_v2_5".to_string(),
                api_key: None,
            },
        }
    }
}

impl GameConfig {
    /// Load from `SENDHOME_CONFIG` (or `config/sendhome.toml` when present) and
    /// `SENDHOME_*` environment variables (`__` separates nested keys).
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("SENDHOME_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let d = Self::default();
        let builder = config::Config::builder()
            .set_default("port", d.port as i64)?
            .set_default("storage_path", d.storage_path)?
            .set_default("default_num_cases", d.default_num_cases as i64)?
            .set_default("max_num_cases", d.max_num_cases as i64)?
            .set_default("secondary_checks_quota", d.secondary_checks_quota as i64)?
            .set_default("audio_concurrency", d.audio_concurrency as i64)?
            .set_default("resolution_policy", "lenient")?
            .set_default("game_year_offset", d.game_year_offset as i64)?
            .set_default("cors_origins", d.cors_origins)?
            .set_default("narrative.api_url", d.narrative.api_url)?
            .set_default("narrative.model", d.narrative.model)?
            .set_default("voice.api_url", d.voice.api_url)?
            .set_default("voice.model_id", d.voice.model_id)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("SENDHOME")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut cfg: GameConfig = built.try_deserialize()?;
        cfg.apply_conventional_env();
        cfg.audio_concurrency = cfg.audio_concurrency.clamp(1, 16);
        Ok(cfg)
    }

    /// Secrets under their conventional names, used only when the
    /// namespaced keys are absent.
    fn apply_conventional_env(&mut self) {
        if is_blank(&self.narrative.api_key) {
            self.narrative.api_key = env_non_empty("OPENROUTER_API_KEY")
                .or_else(|| env_non_empty("NARRATIVE_API_KEY"));
        }
        if let Some(model) = env_non_empty("NARRATIVE_MODEL") {
            self.narrative.model = model;
        }
        if is_blank(&self.voice.api_key) {
            self.voice.api_key = env_non_empty("ELEVENLABS_API_KEY");
        }
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Validated case count for a new session. `requested <= 0` selects the
    /// default, capped at `max_num_cases`.
    pub fn case_count(&self, requested: i64) -> Result<usize, String> {
        if requested <= 0 {
            return Ok(self.default_num_cases.min(self.max_num_cases).max(1));
        }
        let n = usize::try_from(requested)
            .map_err(|_| format!("numCases {} out of range", requested))?;
        if n > self.max_num_cases {
            return Err(format!("numCases {} exceeds maximum {}", n, self.max_num_cases));
        }
        Ok(n)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
