use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

/// Rule toggles plus the settings individual rules read at construction time.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub rules: HashMap<String, bool>,
    pub forbidden_types: ForbiddenTypesConfig,
    pub public_properties: PublicPropertiesConfig,
    pub readonly_classes: ReadonlyClassesConfig,
}

impl AnalyzerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Looks up `rule_name`, falling back to its groups (`classes/readonly_class` → `classes`).
    pub fn enabled(&self, rule_name: &str) -> bool {
        let mut candidate = rule_name;
        loop {
            if let Some(enabled) = self.rules.get(candidate) {
                return *enabled;
            }

            if let Some(idx) = candidate.rfind('/') {
                candidate = &candidate[..idx];
                continue;
            }

            break;
        }

        true
    }

    pub fn find_config(path: Option<PathBuf>, root: &Path) -> Option<PathBuf> {
        if let Some(path) = path {
            return Some(path);
        }

        let candidates = ["php_sniffs.yaml", "php_sniffs.yml"];
        for candidate in &candidates {
            let candidate_path = root.join(candidate);
            if candidate_path.is_file() {
                return Some(candidate_path);
            }
        }

        None
    }
}

/// Type names that may not appear in declarations, each with an optional message.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct ForbiddenTypesConfig {
    pub types: BTreeMap<String, Option<String>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PublicPropertiesConfig {
    /// Accept `public readonly` properties.
    pub allow_readonly: bool,
}

impl Default for PublicPropertiesConfig {
    fn default() -> Self {
        Self {
            allow_readonly: true,
        }
    }
}

/// Readonly classes need PHP 8.2, so promotion can be switched off.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReadonlyClassesConfig {
    pub promote: bool,
}

impl Default for ReadonlyClassesConfig {
    fn default() -> Self {
        Self { promote: true }
    }
}
