use tracing::info;

use crate::error::GetError;
use crate::maven::repository::ArtifactRepository;
use crate::repositories::RepositoryResolver;
use crate::repositories::parameter::ParameterRepositoryResolver;
use crate::repositories::project::ProjectRepositoryResolver;

/// Concatenates the repositories of several sources, in the order of the sources. Duplicates are
///  kept; the first failing source fails the whole resolution.
pub struct CompositeRepositoryResolver {
    resolvers: Vec<Box<dyn RepositoryResolver>>,
}

impl CompositeRepositoryResolver {
    pub fn new(resolvers: Vec<Box<dyn RepositoryResolver>>) -> CompositeRepositoryResolver {
        CompositeRepositoryResolver { resolvers }
    }

    /// project repositories first, then the ones from the `remoteRepositories` parameter
    pub fn project_then_parameter(project: ProjectRepositoryResolver, parameter: ParameterRepositoryResolver) -> CompositeRepositoryResolver {
        CompositeRepositoryResolver::new(vec![Box::new(project), Box::new(parameter)])
    }
}

impl RepositoryResolver for CompositeRepositoryResolver {
    fn name(&self) -> &str {
        "CompositeRepositoryResolver"
    }

    fn resolve_repositories(&self) -> Result<Vec<ArtifactRepository>, GetError> {
        let mut resolved_repositories = Vec::new();

        for resolver in &self.resolvers {
            let resolved = resolver.resolve_repositories()?;
            info!("{} resolved {:?}", resolver.name(), resolved);
            resolved_repositories.extend(resolved);
        }

        Ok(resolved_repositories)
    }
}
