//! Assembly of the ordered list of remote repositories a `get` resolves against.
//!
//! Repositories come from the current project and from the `remoteRepositories` parameter. The
//!  [`composite::CompositeRepositoryResolver`] combines them, project repositories first.

pub mod composite;
pub mod parameter;
pub mod project;
pub mod spec;

use crate::error::GetError;
use crate::maven::repository::ArtifactRepository;

/// A source of remote repositories
pub trait RepositoryResolver: Send + Sync {
    /// used in log output
    fn name(&self) -> &str;

    /// The repositories to be used, possibly none
    fn resolve_repositories(&self) -> Result<Vec<ArtifactRepository>, GetError>;
}
