use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A bot's conversational style, read from an external JSON resource.
///
/// `name` and `tone` are required; everything else has a quiet default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersonaProfile {
    pub name: String,
    pub tone: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub can_emote: bool,
    #[serde(default)]
    pub routine: HashMap<String, String>,
}

impl PersonaProfile {
    /// Profile used when a bot has no readable persona file
    pub fn fallback() -> Self {
        Self {
            name: "Lobby Bot".to_string(),
            tone: "friendly".to_string(),
            interests: vec!["the hotel".to_string(), "its guests".to_string()],
            can_emote: false,
            routine: HashMap::new(),
        }
    }
}

/// Loads persona files from the configured directory, caching good parses.
pub struct PersonaLibrary {
    dir: PathBuf,
    cache: Mutex<HashMap<i64, PersonaProfile>>,
}

impl PersonaLibrary {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Profile for a bot; the fallback profile when its file is absent or bad.
    ///
    /// Successful parses are cached for the life of the process. Failures are
    /// not, so dropping a persona file in later takes effect on next contact.
    pub fn profile_for(&self, bot_id: i64) -> PersonaProfile {
        {
            let cache = self.lock_cache();
            if let Some(profile) = cache.get(&bot_id) {
                return profile.clone();
            }
        }

        match self.read_profile(bot_id) {
            Ok(profile) => {
                self.lock_cache().insert(bot_id, profile.clone());
                profile
            }
            Err(e) => {
                tracing::debug!("No persona for bot {}: {:#}", bot_id, e);
                PersonaProfile::fallback()
            }
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<i64, PersonaProfile>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_profile(&self, bot_id: i64) -> Result<PersonaProfile> {
        let path = self.dir.join(format!("{}.json", bot_id));
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read persona file {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse persona file {:?}", path))
    }
}
