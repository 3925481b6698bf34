use crate::error::GetError;
use crate::maven::pom::Project;
use crate::maven::repository::ArtifactRepository;
use crate::repositories::RepositoryResolver;

/// Resolves the repositories declared by the project the invocation runs in. They are captured
///  when the resolver is created.
pub struct ProjectRepositoryResolver {
    remote_repositories: Vec<ArtifactRepository>,
}

impl ProjectRepositoryResolver {
    pub fn new(project: Option<&Project>) -> ProjectRepositoryResolver {
        ProjectRepositoryResolver {
            remote_repositories: project
                .map(|p| p.remote_repositories.clone())
                .unwrap_or_default(),
        }
    }
}

impl RepositoryResolver for ProjectRepositoryResolver {
    fn name(&self) -> &str {
        "ProjectRepositoryResolver"
    }

    fn resolve_repositories(&self) -> Result<Vec<ArtifactRepository>, GetError> {
        Ok(self.remote_repositories.clone())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::maven::paths::DefaultLayout;
    use crate::maven::repository::RepositoryPolicy;

    fn repo(id: &str) -> ArtifactRepository {
        ArtifactRepository {
            id: id.to_string(),
            url: format!("http://{}/", id),
            layout: Arc::new(DefaultLayout),
            releases: RepositoryPolicy::default(),
            snapshots: RepositoryPolicy::default(),
        }
    }

    #[test]
    fn test_no_project() {
        assert!(ProjectRepositoryResolver::new(None).resolve_repositories().unwrap().is_empty());
    }

    #[test]
    fn test_project_without_repositories() {
        let project = Project::with_repositories(vec![]);
        assert!(ProjectRepositoryResolver::new(Some(&project)).resolve_repositories().unwrap().is_empty());
    }

    #[test]
    fn test_captured_at_construction() {
        let mut project = Project::with_repositories(vec![repo("p1"), repo("p2")]);
        let resolver = ProjectRepositoryResolver::new(Some(&project));
        project.remote_repositories.clear();

        assert_eq!(resolver.resolve_repositories().unwrap(), vec![repo("p1"), repo("p2")]);
    }
}
