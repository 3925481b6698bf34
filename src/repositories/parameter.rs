use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::ExpressionEvaluator;
use crate::error::{EvaluationError, GetError};
use crate::maven::paths::RepositoryLayouts;
use crate::maven::repository::{ArtifactRepository, RepositoryPolicy};
use crate::repositories::RepositoryResolver;
use crate::repositories::spec::parse_repository;

pub const REMOTE_REPOSITORIES_EXPRESSION: &str = "${remoteRepositories}";

/// Resolves repositories from the `remoteRepositories` parameter: a comma separated list of
///  `id::[layout]::url` or plain URLs, e.g.
///  `central::default::https://repo1.maven.org/maven2,myrepo::::https://repo.acme.com,https://repo.acme2.com`
///
/// These repositories are always checked for updates, and checksum mismatches are reported as
///  warnings.
pub struct ParameterRepositoryResolver {
    evaluator: Arc<dyn ExpressionEvaluator>,
    layouts: RepositoryLayouts,
}

impl ParameterRepositoryResolver {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>, layouts: RepositoryLayouts) -> ParameterRepositoryResolver {
        ParameterRepositoryResolver {
            evaluator,
            layouts,
        }
    }

    fn remote_repositories_parameter(&self) -> Result<Option<String>, GetError> {
        let value = self.evaluator.evaluate(REMOTE_REPOSITORIES_EXPRESSION)
            .map_err(|cause| GetError::ParamResolution { cause })?;

        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(GetError::ParamResolution {
                cause: EvaluationError::NotAString {
                    expression: REMOTE_REPOSITORIES_EXPRESSION.to_string(),
                    found: json_type_name(&other).to_string(),
                },
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl RepositoryResolver for ParameterRepositoryResolver {
    fn name(&self) -> &str {
        "ParameterRepositoryResolver"
    }

    fn resolve_repositories(&self) -> Result<Vec<ArtifactRepository>, GetError> {
        let remote_repositories = self.remote_repositories_parameter()?;

        info!("remoteRepositories: {:?}", remote_repositories);
        info!("repositoryLayouts: {:?}", self.layouts.keys());

        match remote_repositories {
            None => Ok(vec![]),
            Some(remote_repositories) => {
                // NB: an empty string is a single empty spec, not 'no repositories'
                let resolved = remote_repositories.split(',')
                    .map(|spec| parse_repository(spec, RepositoryPolicy::ALWAYS_WARN, &self.layouts))
                    .collect::<Result<Vec<_>, _>>()?;

                info!("resolvedRepositories: {:?}", resolved);
                Ok(resolved)
            }
        }
    }
}
