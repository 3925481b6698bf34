//! The resolvers that do the actual fetching. `get` only talks to them through the
//!  [`ArtifactResolver`] and [`DependencyResolver`] traits.

pub mod http_artifact_resolver;
pub mod transitive;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ResolutionError;
use crate::maven::coordinates::{DependableCoordinate, MavenArtifactRef};
use crate::maven::local_repo::LocalRepository;
use crate::maven::repository::ArtifactRepository;

/// Everything a resolver needs to know besides the coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingRequest {
    pub local_repository: LocalRepository,
    /// tried in order
    pub remote_repositories: Vec<ArtifactRepository>,
    /// only use what is in the local repository
    pub offline: bool,
}

impl BuildingRequest {
    pub fn new(local_repository: LocalRepository) -> BuildingRequest {
        BuildingRequest {
            local_repository,
            remote_repositories: vec![],
            offline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub artifact: MavenArtifactRef,
    pub file: PathBuf,
    /// id of the repository the file was downloaded from, `None` if it was taken from the local
    ///  repository
    pub repository: Option<String>,
}

/// Fetches a single file
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve_artifact(&self, request: &BuildingRequest, artifact: &MavenArtifactRef) -> Result<ResolvedArtifact, ResolutionError>;
}

/// Decides which nodes of a dependency graph are followed
pub trait DependencyFilter: Send + Sync {
    fn accept(&self, coordinate: &DependableCoordinate) -> bool;
}

impl<F> DependencyFilter for F where F: Fn(&DependableCoordinate) -> bool + Send + Sync {
    fn accept(&self, coordinate: &DependableCoordinate) -> bool {
        self(coordinate)
    }
}

/// Fetches an artifact together with its transitive dependencies
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    async fn resolve_dependencies(
        &self,
        request: &BuildingRequest,
        coordinate: &DependableCoordinate,
        filter: Option<&dyn DependencyFilter>,
    ) -> Result<Vec<ResolvedArtifact>, ResolutionError>;
}
