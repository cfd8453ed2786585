use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::transform::spec_to_ir::BuildOptions;

/// Top-level project configuration loaded from `.oir.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OirConfig {
    pub input: String,
    pub build: BuildConfig,
}

impl Default for OirConfig {
    fn default() -> Self {
        Self {
            input: "openapi.yaml".to_string(),
            build: BuildConfig::default(),
        }
    }
}

impl OirConfig {
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            default_status_behavior: self.build.default_status_behavior,
            complexity_threshold: self.build.complexity_threshold,
            infer_all_of_inheritance: self.build.infer_all_of_inheritance,
            naming_strategy: self.build.naming_strategy,
            aliases: self.build.aliases.clone(),
        }
    }
}

/// Options for the IR build.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub default_status_behavior: DefaultStatusBehavior,
    pub complexity_threshold: u32,
    pub infer_all_of_inheritance: bool,
    pub naming_strategy: NamingStrategy,
    /// Map from resolved operation name (operationId or route-derived) to custom alias.
    pub aliases: IndexMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            default_status_behavior: DefaultStatusBehavior::SpecCompliant,
            complexity_threshold: DEFAULT_COMPLEXITY_THRESHOLD,
            infer_all_of_inheritance: true,
            naming_strategy: NamingStrategy::UseOperationId,
            aliases: IndexMap::new(),
        }
    }
}

/// Score at or above which a schema is emitted as a named variable.
pub const DEFAULT_COMPLEXITY_THRESHOLD: u32 = 4;

/// How a `default` response is categorized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultStatusBehavior {
    /// `default` is never the main response nor an error entry.
    #[default]
    SpecCompliant,
    /// `default` becomes the main response when no 2xx exists, else an error entry.
    AutoCorrect,
}

impl DefaultStatusBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultStatusBehavior::SpecCompliant => "spec-compliant",
            DefaultStatusBehavior::AutoCorrect => "auto-correct",
        }
    }
}

/// How operation names are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    #[default]
    UseOperationId,
    UseRouteBased,
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".oir.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<OirConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: OirConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# oir configuration
input: openapi.yaml

build:
  default_status_behavior: spec-compliant   # spec-compliant | auto-correct
  complexity_threshold: 4                   # extract schemas scoring at or above this
  infer_all_of_inheritance: true
  naming_strategy: use_operation_id         # use_operation_id | use_route_based
  aliases: {}
    # createChatCompletion: chat            # operation name → custom name
"#
}
