//! Language configuration for execution strategy selection

use std::collections::HashMap;

use anyhow::Context;
use serde::Deserialize;

/// How a language is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Evaluated in-process by the embedded script engine
    Local,
    /// Submitted to the remote judge under the given judge language id
    Remote { judge_language_id: u32 },
}

/// Configuration for a supported programming language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Canonical language name (e.g., "cpp")
    pub name: String,
    pub strategy: Strategy,
    /// File extension used for new untitled files (e.g., "cpp")
    pub extension: String,
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    strategy: String,
    judge_language_id: Option<u32>,
    extension: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Lookup table from language name or alias to its configuration
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    languages: HashMap<String, LanguageConfig>,
}

impl LanguageTable {
    /// Parse the language table bundled with the binary
    pub fn embedded() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml(content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> =
            toml::from_str(content).context("Invalid language table")?;

        let mut languages = HashMap::new();

        for (name, raw) in raw_configs {
            let strategy = match raw.strategy.as_str() {
                "local" => Strategy::Local,
                "remote" => {
                    let judge_language_id = raw.judge_language_id.with_context(|| {
                        format!("Remote language {} needs judge_language_id", name)
                    })?;
                    Strategy::Remote { judge_language_id }
                }
                other => anyhow::bail!("Invalid strategy for {}: {}", name, other),
            };

            let config = LanguageConfig {
                name: name.to_lowercase(),
                strategy,
                extension: raw.extension,
            };

            // Add main language name
            languages.insert(name.to_lowercase(), config.clone());

            // Add aliases
            for alias in raw.aliases {
                languages.insert(alias.to_lowercase(), config.clone());
            }
        }

        Ok(Self { languages })
    }

    /// Get language configuration by language name or alias
    pub fn get(&self, language: &str) -> Option<&LanguageConfig> {
        self.languages.get(&language.to_lowercase())
    }

    /// File extension for a language; unknown languages get "txt"
    pub fn extension_for(&self, language: &str) -> &str {
        self.get(language)
            .map(|config| config.extension.as_str())
            .unwrap_or("txt")
    }

    /// Canonical names of all supported languages, sorted
    pub fn supported_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .languages
            .values()
            .map(|config| config.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
