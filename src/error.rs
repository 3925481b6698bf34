//! Error types for arti-get
//!
//! Everything except [`GetError::FetchFailed`] is a configuration failure: it is raised before any
//!  repository is contacted and can be fixed by the operator.

use thiserror::Error;

/// Failure of a `get` invocation
#[derive(Error, Debug)]
pub enum GetError {
    /// Required coordinate fields missing, or a coordinate string with the wrong number of tokens
    #[error("{summary}")]
    BadUsage { summary: String },

    /// An extended repository spec that does not match `id::layout::url`
    #[error("Invalid syntax for repository: {spec}")]
    BadRepoSyntax { spec: String },

    /// A repository layout that is not registered
    #[error("Invalid repository layout: {key}")]
    UnknownLayout { key: String },

    /// The remote repositories parameter could not be evaluated to a string
    #[error("Failed to resolve remote repositories: {cause}")]
    ParamResolution {
        #[source]
        cause: EvaluationError,
    },

    /// The artifact or dependency resolver reported a failure
    #[error("Couldn't download artifact: {message}")]
    FetchFailed {
        message: String,
        #[source]
        cause: ResolutionError,
    },
}

impl GetError {
    pub fn bad_usage(summary: impl Into<String>) -> GetError {
        GetError::BadUsage { summary: summary.into() }
    }

    pub fn fetch_failed(cause: ResolutionError) -> GetError {
        GetError::FetchFailed {
            message: cause.message.clone(),
            cause,
        }
    }

    /// The longer explanation printed below the one-line summary
    pub fn long_message(&self) -> String {
        match self {
            GetError::BadUsage { summary } => format!(
                "{}. Specify the artifact as groupId:artifactId:version[:packaging[:classifier]], \
                 e.g. --artifact org.apache.maven.plugins:maven-downloader-plugin:1.0",
                summary,
            ),
            GetError::BadRepoSyntax { .. } => {
                "Invalid syntax for repository. Use \"id::layout::url\" or \"URL\".".to_string()
            }
            GetError::UnknownLayout { key } => format!(
                "Invalid repository layout: {}. Use one of the registered layouts, e.g. \"default\" or \"legacy\".",
                key,
            ),
            GetError::ParamResolution { cause } => {
                format!("Failed to resolve remote repositories: {}", cause)
            }
            GetError::FetchFailed { message, .. } => format!("Couldn't download artifact: {}", message),
        }
    }

    /// false only for failures that happen after repositories were contacted
    pub fn is_configuration_failure(&self) -> bool {
        !matches!(self, GetError::FetchFailed { .. })
    }
}

/// Failure to evaluate a parameter expression
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("malformed expression {expression:?}")]
    Expression { expression: String },

    #[error("expression {expression:?} evaluated to a {found}, expected a string")]
    NotAString { expression: String, found: String },
}

/// Failure reported by an artifact or dependency resolver
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ResolutionError {
    pub message: String,
}

impl ResolutionError {
    pub fn new(message: impl Into<String>) -> ResolutionError {
        ResolutionError { message: message.into() }
    }
}

impl From<anyhow::Error> for ResolutionError {
    fn from(e: anyhow::Error) -> Self {
        ResolutionError {
            message: format!("{:#}", e),
        }
    }
}
