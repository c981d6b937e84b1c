use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    // World server transport
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    // Completion service (Ollama-compatible generate endpoint)
    #[serde(default = "default_llm_url")]
    pub llm_api_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    // Persistent world state
    #[serde(default = "default_database_path")]
    pub database_path: String,

    // Short-term memory store; unset means process-local memory
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_memory_ttl_secs")]
    pub memory_ttl_secs: u64,

    // Persona resources, one JSON file per bot id
    #[serde(default = "default_persona_dir")]
    pub persona_dir: String,

    // The whole transport retry policy: fixed delay, no ceiling
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:30001".to_string()
}

fn default_llm_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.2".to_string()
}

fn default_database_path() -> String {
    "bellhop.db".to_string()
}

fn default_memory_ttl_secs() -> u64 {
    3600
}

fn default_persona_dir() -> String {
    "personas".to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            llm_api_url: default_llm_url(),
            llm_model: default_llm_model(),
            database_path: default_database_path(),
            redis_url: None,
            memory_ttl_secs: default_memory_ttl_secs(),
            persona_dir: default_persona_dir(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

impl BotConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Path to the config file (next to the executable)
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("bellhop_config.toml")
    }

    /// Load config from bellhop_config.toml, falling back to env vars + defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if let Ok(contents) = fs::read_to_string(&path) {
            match toml::from_str::<BotConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                }
            }
        }
        tracing::warn!("No config file found, using defaults + env vars");
        Self::from_env()
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("BELLHOP_WS_URL") {
            config.ws_url = url;
        }
        if let Ok(url) = env::var("BELLHOP_LLM_API_URL") {
            config.llm_api_url = url;
        }
        if let Ok(model) = env::var("BELLHOP_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(path) = env::var("BELLHOP_DATABASE_PATH") {
            config.database_path = path;
        }
        if let Ok(url) = env::var("BELLHOP_REDIS_URL") {
            if !url.trim().is_empty() {
                config.redis_url = Some(url);
            }
        }
        if let Ok(ttl) = env::var("BELLHOP_MEMORY_TTL_SECS") {
            if let Ok(seconds) = ttl.parse() {
                config.memory_ttl_secs = seconds;
            }
        }
        if let Ok(dir) = env::var("BELLHOP_PERSONA_DIR") {
            config.persona_dir = dir;
        }
        if let Ok(delay) = env::var("BELLHOP_RECONNECT_DELAY_SECS") {
            if let Ok(seconds) = delay.parse() {
                config.reconnect_delay_secs = seconds;
            }
        }
        config
    }
}
