//! The `get` operation: turns the configured coordinate into a resolver call against the
//!  assembled repository list.

use std::sync::Arc;

use tracing::info;

use crate::config::GetConfig;
use crate::error::GetError;
use crate::maven::artifact_handler::ArtifactHandlerManager;
use crate::maven::coordinates::{DependableCoordinate, MavenArtifactRef};
use crate::maven::pom::Project;
use crate::repositories::RepositoryResolver;
use crate::resolver::{ArtifactResolver, BuildingRequest, DependencyResolver, ResolvedArtifact};

/// The host state a `get` runs in. It is only read; the request handed to resolvers is a copy.
#[derive(Debug, Clone)]
pub struct Session {
    pub building_request: BuildingRequest,
    pub current_project: Option<Project>,
}

impl Session {
    pub fn new(building_request: BuildingRequest, current_project: Option<Project>) -> Session {
        Session {
            building_request,
            current_project,
        }
    }
}

/// Fetches a single artifact, optionally with its transitive dependencies.
///
/// The command owns no mutable state, so one instance can serve several sessions concurrently.
pub struct GetCommand {
    config: GetConfig,
    repository_resolver: Box<dyn RepositoryResolver>,
    artifact_resolver: Arc<dyn ArtifactResolver>,
    dependency_resolver: Arc<dyn DependencyResolver>,
    handlers: Arc<dyn ArtifactHandlerManager>,
}

impl GetCommand {
    pub fn new(
        config: GetConfig,
        repository_resolver: Box<dyn RepositoryResolver>,
        artifact_resolver: Arc<dyn ArtifactResolver>,
        dependency_resolver: Arc<dyn DependencyResolver>,
        handlers: Arc<dyn ArtifactHandlerManager>,
    ) -> GetCommand {
        GetCommand {
            config,
            repository_resolver,
            artifact_resolver,
            dependency_resolver,
            handlers,
        }
    }

    /// Returns the files that were resolved, which is empty if the invocation is skipped.
    pub async fn execute(&self, session: &Session) -> Result<Vec<ResolvedArtifact>, GetError> {
        if self.config.skip {
            info!("Skipping artifact retrieval");
            return Ok(vec![]);
        }

        let coordinate = self.config.coordinate.to_coordinate()?;

        let mut request = session.building_request.clone();
        request.remote_repositories = self.repository_resolver.resolve_repositories()?;

        if self.config.transitive {
            info!("Resolving {} with transitive dependencies", coordinate);
            self.dependency_resolver.resolve_dependencies(&request, &coordinate, None).await
                .map_err(GetError::fetch_failed)
        }
        else {
            info!("Resolving {}", coordinate);
            let artifact = self.flat_artifact(&coordinate);
            let resolved = self.artifact_resolver.resolve_artifact(&request, &artifact).await
                .map_err(GetError::fetch_failed)?;
            Ok(vec![resolved])
        }
    }

    /// the coordinate with its type replaced by the type's file extension
    fn flat_artifact(&self, coordinate: &DependableCoordinate) -> MavenArtifactRef {
        MavenArtifactRef {
            coordinates: coordinate.coordinates.clone(),
            classifier: coordinate.classifier.clone(),
            file_extension: self.handlers.handler_for(&coordinate.artifact_type).extension,
        }
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use rstest::*;

    use super::*;
    use crate::error::ResolutionError;
    use crate::maven::artifact_handler::DefaultArtifactHandlers;
    use crate::maven::coordinates::{parse_artifact_string, CoordinateArgs, MavenClassifier};
    use crate::maven::local_repo::LocalRepository;
    use crate::maven::repository::ArtifactRepository;
    use crate::resolver::DependencyFilter;

    struct NoRepositories;
    impl RepositoryResolver for NoRepositories {
        fn name(&self) -> &str { "NoRepositories" }
        fn resolve_repositories(&self) -> Result<Vec<ArtifactRepository>, GetError> {
            Ok(vec![])
        }
    }

    struct Unreachable;
    #[async_trait]
    impl ArtifactResolver for Unreachable {
        async fn resolve_artifact(&self, _: &BuildingRequest, _: &MavenArtifactRef) -> Result<ResolvedArtifact, ResolutionError> {
            Err(ResolutionError::new("connection refused"))
        }
    }
    #[async_trait]
    impl DependencyResolver for Unreachable {
        async fn resolve_dependencies(&self, _: &BuildingRequest, _: &DependableCoordinate, _: Option<&dyn DependencyFilter>) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
            Err(ResolutionError::new("connection refused"))
        }
    }

    fn command(artifact: &str, transitive: bool) -> GetCommand {
        GetCommand::new(
            GetConfig {
                coordinate: CoordinateArgs {
                    artifact: Some(artifact.to_string()),
                    ..CoordinateArgs::default()
                },
                transitive,
                skip: false,
            },
            Box::new(NoRepositories),
            Arc::new(Unreachable),
            Arc::new(Unreachable),
            Arc::new(DefaultArtifactHandlers::new()),
        )
    }

    #[rstest]
    #[case::jar("g:a:1.0", "jar", None)]
    #[case::war("g:a:1.0:war", "war", None)]
    #[case::test_jar("g:a:1.0:test-jar", "jar", None)]
    #[case::explicit_classifier("g:a:1.0:test-jar:sources", "jar", Some("sources"))]
    #[case::unknown_type("g:a:1.0:zip", "zip", None)]
    #[case::maven_plugin("g:a:1.0:maven-plugin", "jar", None)]
    fn test_flat_artifact(#[case] artifact: &str, #[case] extension: &str, #[case] classifier: Option<&str>) {
        let command = command(artifact, false);
        let flat = command.flat_artifact(&parse_artifact_string(artifact).unwrap());

        assert_eq!(flat.file_extension, extension);
        assert_eq!(flat.classifier, MavenClassifier::from_option(classifier));
        assert_eq!(flat.coordinates.version.0, "1.0");
    }

    #[rstest]
    #[case::transitive(true)]
    #[case::single(false)]
    #[tokio::test]
    async fn test_resolver_failure_is_fetch_failed(#[case] transitive: bool) {
        let session = Session::new(BuildingRequest::new(LocalRepository::new("/tmp/none")), None);

        match command("g:a:1.0", transitive).execute(&session).await {
            Err(GetError::FetchFailed { message, cause }) => {
                assert_eq!(message, "connection refused");
                assert_eq!(cause.message, "connection refused");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
