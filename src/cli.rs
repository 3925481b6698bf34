//! Command line parsing and the wiring of a `get` invocation

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use serde_json::Value;
use tracing::debug;

use crate::config::*;
use crate::get::{GetCommand, Session};
use crate::maven::artifact_handler::DefaultArtifactHandlers;
use crate::maven::local_repo::LocalRepository;
use crate::maven::paths::RepositoryLayouts;
use crate::maven::pom::Project;
use crate::repositories::composite::CompositeRepositoryResolver;
use crate::repositories::parameter::ParameterRepositoryResolver;
use crate::repositories::project::ProjectRepositoryResolver;
use crate::resolver::http_artifact_resolver::HttpArtifactResolver;
use crate::resolver::transitive::TransitiveDependencyResolver;
use crate::resolver::BuildingRequest;
use crate::util::validating_http_downloader::ValidatingHttpDownloader;

/// Downloads an artifact, and by default its transitive dependencies, into the local repository
#[derive(Parser, Debug, Default)]
#[command(name = "arti-get")]
pub struct Cli {
    /// groupId:artifactId:version[:packaging[:classifier]]
    #[arg(long)]
    pub artifact: Option<String>,

    #[arg(long)]
    pub group_id: Option<String>,

    #[arg(long)]
    pub artifact_id: Option<String>,

    #[arg(long)]
    pub version: Option<String>,

    #[arg(long)]
    pub classifier: Option<String>,

    /// the artifact type, "jar" if omitted
    #[arg(long)]
    pub packaging: Option<String>,

    /// comma separated list of id::[layout]::url or plain URLs
    #[arg(long, value_name = "REPOS")]
    pub remote_repositories: Option<String>,

    /// fetch dependencies too (default: true)
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub transitive: Option<bool>,

    #[arg(long)]
    pub skip: bool,

    /// sets a property, e.g. -Dartifact=g:a:1.0
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_definition)]
    pub definitions: Vec<(String, String)>,

    /// defaults to ~/.arti-get/settings.json
    #[arg(long, env = "ARTI_GET_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// the POM of the current project, defaults to ./pom.xml if it exists
    #[arg(long)]
    pub project: Option<PathBuf>,

    #[arg(long)]
    pub local_repository: Option<PathBuf>,

    /// work with the local repository only
    #[arg(long)]
    pub offline: bool,

    /// -v for debug output, -vv for trace output
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// `-Dkey` without a value sets `key` to "true"
fn parse_definition(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, _)) if key.is_empty() => Err(format!("missing property name in {:?}", s)),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Ok((s.to_string(), "true".to_string())),
    }
}

impl Cli {
    /// settings file properties, overridden by -D definitions, overridden by dedicated flags
    pub fn properties(&self, settings: &Settings) -> Properties {
        let mut result = settings.properties.clone();

        for (key, value) in &self.definitions {
            result.insert(key.clone(), Value::String(value.clone()));
        }

        let flags = [
            (PROP_ARTIFACT, &self.artifact),
            (PROP_GROUP_ID, &self.group_id),
            (PROP_ARTIFACT_ID, &self.artifact_id),
            (PROP_VERSION, &self.version),
            (PROP_CLASSIFIER, &self.classifier),
            (PROP_PACKAGING, &self.packaging),
            (PROP_REMOTE_REPOSITORIES, &self.remote_repositories),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                result.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        if let Some(transitive) = self.transitive {
            result.insert(PROP_TRANSITIVE.to_string(), Value::Bool(transitive));
        }
        if self.skip {
            result.insert(PROP_SKIP.to_string(), Value::Bool(true));
        }

        result
    }

    fn load_project(&self, layouts: &RepositoryLayouts) -> anyhow::Result<Option<Project>> {
        let pom_file = match &self.project {
            Some(explicit) => explicit.clone(),
            None => {
                let default = PathBuf::from("pom.xml");
                if !default.is_file() {
                    debug!("no pom.xml in the working directory, running without a project");
                    return Ok(None);
                }
                default
            }
        };

        debug!("loading project from {}", pom_file.display());
        Ok(Some(Project::load(&pom_file, layouts)?))
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let settings = Settings::load(self.settings.as_deref())?;
        let properties = self.properties(&settings);
        let config = GetConfig::from_properties(&properties)?;
        let layouts = RepositoryLayouts::default();

        let building_request = BuildingRequest {
            local_repository: LocalRepository::new(self.local_repository.clone()
                .unwrap_or_else(|| settings.local_repository())),
            remote_repositories: vec![],
            offline: self.offline || settings.offline,
        };
        // a skipped invocation must not fail, not even on a broken project
        let current_project = if config.skip {
            None
        }
        else {
            self.load_project(&layouts)?
        };
        let session = Session::new(building_request, current_project);

        let repository_resolver = CompositeRepositoryResolver::project_then_parameter(
            ProjectRepositoryResolver::new(session.current_project.as_ref()),
            ParameterRepositoryResolver::new(Arc::new(PropertiesEvaluator::new(properties)), layouts),
        );

        let handlers = Arc::new(DefaultArtifactHandlers::new());
        let artifact_resolver = Arc::new(HttpArtifactResolver::new(ValidatingHttpDownloader::new(settings.user_agent())));
        let dependency_resolver = Arc::new(TransitiveDependencyResolver::new(artifact_resolver.clone(), handlers.clone()));

        let command = GetCommand::new(
            config,
            Box::new(repository_resolver),
            artifact_resolver,
            dependency_resolver,
            handlers,
        );

        for resolved in command.execute(&session).await? {
            println!("{}", resolved.file.display());
        }
        Ok(())
    }
}
