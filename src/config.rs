use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use crate::utils::paths::get_config_path;

/// Keyword lists feeding the local priority heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    #[serde(default = "default_urgent_keywords")]
    pub urgent: Vec<String>,

    #[serde(default = "default_impact_keywords")]
    pub impact: Vec<String>,

    #[serde(default = "default_errand_keywords")]
    pub errand: Vec<String>,

    #[serde(default = "default_recurrence_keywords")]
    pub recurrence: Vec<String>,
}

fn default_urgent_keywords() -> Vec<String> {
    ["urgent", "asap", "immediately", "right away", "critical", "emergency"]
        .map(String::from)
        .to_vec()
}

fn default_impact_keywords() -> Vec<String> {
    ["tax", "rent", "bill", "deadline", "payment", "fine", "due", "submit", "application"]
        .map(String::from)
        .to_vec()
}

fn default_errand_keywords() -> Vec<String> {
    ["nearby", "supermarket", "grocery"].map(String::from).to_vec()
}

fn default_recurrence_keywords() -> Vec<String> {
    ["every", "daily", "weekly"].map(String::from).to_vec()
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            urgent: default_urgent_keywords(),
            impact: default_impact_keywords(),
            errand: default_errand_keywords(),
            recurrence: default_recurrence_keywords(),
        }
    }
}

/// Topic synonym groups for the resolver's fuzzy fallback.
/// Key is the group name; a topic matching the key (or containing it)
/// also matches tasks containing any listed word.
pub type SynonymGroups = BTreeMap<String, Vec<String>>;

fn default_synonyms() -> SynonymGroups {
    let mut groups = BTreeMap::new();
    groups.insert(
        "groceries".to_string(),
        ["milk", "bread", "eggs", "shopping", "supermarket", "store"]
            .map(String::from)
            .to_vec(),
    );
    groups.insert(
        "workout".to_string(),
        ["gym", "exercise", "run", "training"].map(String::from).to_vec(),
    );
    groups.insert(
        "call".to_string(),
        ["phone", "ring", "dial"].map(String::from).to_vec(),
    );
    groups.insert(
        "doctor".to_string(),
        ["dentist", "clinic", "appointment", "checkup"]
            .map(String::from)
            .to_vec(),
    );
    groups.insert(
        "cleaning".to_string(),
        ["laundry", "dishes", "vacuum", "tidy"].map(String::from).to_vec(),
    );
    groups
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds the undo slot stays live after a mutation.
    #[serde(default = "default_undo_ttl_secs")]
    pub undo_ttl_secs: u64,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Endpoint of the external intent-extraction service, if configured.
    #[serde(default)]
    pub intent_endpoint: Option<String>,

    #[serde(default)]
    pub keywords: KeywordsConfig,

    #[serde(default = "default_synonyms")]
    pub synonyms: SynonymGroups,
}

fn default_undo_ttl_secs() -> u64 {
    10
}

fn default_api_port() -> u16 {
    48391
}

impl Default for Config {
    fn default() -> Self {
        Self {
            undo_ttl_secs: default_undo_ttl_secs(),
            api_port: default_api_port(),
            intent_endpoint: None,
            keywords: KeywordsConfig::default(),
            synonyms: default_synonyms(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(())
    }
}
