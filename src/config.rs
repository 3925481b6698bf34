//! Configuration: the settings file, the property map that all invocation parameters are read
//!  from, and the evaluator for `${...}` parameter expressions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{EvaluationError, GetError};
use crate::maven::coordinates::CoordinateArgs;

pub const PROP_ARTIFACT: &str = "artifact";
pub const PROP_GROUP_ID: &str = "groupId";
pub const PROP_ARTIFACT_ID: &str = "artifactId";
pub const PROP_VERSION: &str = "version";
pub const PROP_CLASSIFIER: &str = "classifier";
pub const PROP_PACKAGING: &str = "packaging";
pub const PROP_REMOTE_REPOSITORIES: &str = "remoteRepositories";
pub const PROP_TRANSITIVE: &str = "transitive";
pub const PROP_SKIP: &str = "mdep.skip";

pub type Properties = BTreeMap<String, Value>;

/// Contents of the settings file, e.g.
///
/// ```json
/// {
///   "localRepository": "/var/cache/m2",
///   "offline": false,
///   "properties": { "remoteRepositories": "central::default::https://repo1.maven.org/maven2" }
/// }
/// ```
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub local_repository: Option<PathBuf>,
    pub offline: bool,
    pub user_agent: Option<String>,
    pub properties: Properties,
}

impl Settings {
    /// `~/.arti-get/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".arti-get").join("settings.json"))
    }

    /// Reads an explicitly given settings file, or the default one if it exists
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Settings> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    debug!("no settings file, using defaults");
                    return Ok(Settings::default());
                }
            },
        };

        debug!("reading settings from {}", path.display());
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::parse(&json)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }

    pub fn parse(json: &str) -> anyhow::Result<Settings> {
        Ok(serde_json::from_str(json)?)
    }

    /// `~/.m2/repository` unless configured otherwise
    pub fn local_repository(&self) -> PathBuf {
        match &self.local_repository {
            Some(path) => path.clone(),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".m2")
                .join("repository"),
        }
    }

    pub fn user_agent(&self) -> String {
        self.user_agent.clone()
            .unwrap_or_else(|| format!("arti-get/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Resolves parameter expressions like `${remoteRepositories}`
pub trait ExpressionEvaluator: Send + Sync {
    /// `None` if the expression refers to something that is not defined. Values are returned as
    ///  they are, it is up to the caller to check their type.
    fn evaluate(&self, expression: &str) -> Result<Option<Value>, EvaluationError>;
}

/// Evaluates expressions against a property map
pub struct PropertiesEvaluator {
    properties: Properties,
}
impl PropertiesEvaluator {
    pub fn new(properties: Properties) -> PropertiesEvaluator {
        PropertiesEvaluator { properties }
    }
}

impl ExpressionEvaluator for PropertiesEvaluator {
    fn evaluate(&self, expression: &str) -> Result<Option<Value>, EvaluationError> {
        if !expression.contains("${") {
            return Ok(Some(Value::String(expression.to_string())));
        }

        // a single reference yields the referenced value with its type intact
        if let Some(name) = expression.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            if !name.contains("${") && !name.contains('}') {
                return Ok(match self.properties.get(name) {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(value.clone()),
                });
            }
        }

        // embedded references are rendered into the surrounding string
        let mut result = String::new();
        let mut rest = expression;
        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}')
                .ok_or_else(|| EvaluationError::Expression { expression: expression.to_string() })?;
            let name = &after[..end];
            match self.properties.get(name) {
                Some(Value::String(s)) => result.push_str(s),
                None | Some(Value::Null) => result.push_str(&rest[start..start + 2 + end + 1]),
                Some(other) => result.push_str(&other.to_string()),
            }
            rest = &after[end + 1..];
        }
        result.push_str(rest);
        Ok(Some(Value::String(result)))
    }
}

/// The invocation parameters of a `get`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetConfig {
    pub coordinate: CoordinateArgs,
    pub transitive: bool,
    pub skip: bool,
}

impl Default for GetConfig {
    fn default() -> Self {
        GetConfig {
            coordinate: CoordinateArgs::default(),
            transitive: true,
            skip: false,
        }
    }
}

impl GetConfig {
    /// Reads the parameters from properties. If `mdep.skip` is set, nothing else is looked at:
    ///  a skipped invocation never fails.
    pub fn from_properties(properties: &Properties) -> Result<GetConfig, GetError> {
        if bool_property(properties, PROP_SKIP, false)? {
            return Ok(GetConfig {
                skip: true,
                ..GetConfig::default()
            });
        }

        Ok(GetConfig {
            coordinate: CoordinateArgs {
                artifact: string_property(properties, PROP_ARTIFACT)?,
                group_id: string_property(properties, PROP_GROUP_ID)?,
                artifact_id: string_property(properties, PROP_ARTIFACT_ID)?,
                version: string_property(properties, PROP_VERSION)?,
                classifier: string_property(properties, PROP_CLASSIFIER)?,
                packaging: string_property(properties, PROP_PACKAGING)?,
            },
            transitive: bool_property(properties, PROP_TRANSITIVE, true)?,
            skip: false,
        })
    }
}

/// numbers and booleans are accepted in their textual form, e.g. `"version": 1.0`
fn string_property(properties: &Properties, key: &str) -> Result<Option<String>, GetError> {
    match properties.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ Value::Number(_)) | Some(v @ Value::Bool(_)) => Ok(Some(v.to_string())),
        Some(other) => Err(GetError::bad_usage(format!("'{}' must be a string, was {}", key, other))),
    }
}

fn bool_property(properties: &Properties, key: &str, default: bool) -> Result<bool, GetError> {
    match properties.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim() {
            "" => Ok(default),
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(GetError::bad_usage(format!("'{}' must be true or false, was {:?}", key, s))),
        },
        Some(other) => Err(GetError::bad_usage(format!("'{}' must be true or false, was {}", key, other))),
    }
}
