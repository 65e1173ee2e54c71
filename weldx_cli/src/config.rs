// weldx_cli/src/config.rs

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use weldx_core::prelude::{BuiltinSchemas, SchemaValidator};

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # WeldxConfig
/// Everything the CLI reads from `weldx.toml`, with `WELDX_` environment
/// overrides (`WELDX_VALIDATION__STRICT_TAGS=true`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct WeldxConfig {
    #[serde(default)] // Use default if the [validation] section is missing
    pub validation: ValidationConfig,

    #[serde(default)]
    pub interpolation: InterpolationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Check every tagged entry against its schema on load.
    pub enabled: bool,
    /// Report weldx tags that have no registered schema.
    #[serde(default)]
    pub strict_tags: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_tags: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InterpolationConfig {
    /// Hold boundary values instead of failing for times outside the data.
    pub extrapolate: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl WeldxConfig {
    /// Defaults, then the TOML file (if present), then `WELDX_` variables.
    pub fn load(path: &Path) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(WeldxConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("WELDX_").split("__"))
    }

    /// The validator matching the `[validation]` section.
    pub fn validator(&self) -> Option<Box<dyn SchemaValidator>> {
        self.validation.enabled.then(|| {
            Box::new(BuiltinSchemas {
                strict_tags: self.validation.strict_tags,
            }) as Box<dyn SchemaValidator>
        })
    }
}
