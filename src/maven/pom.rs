//! The parts of a POM that matter for fetching artifacts: identity, parent, properties, declared
//!  repositories and dependencies.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::error::GetError;
use crate::maven::paths::RepositoryLayouts;
use crate::maven::repository::{ArtifactRepository, ChecksumPolicy, RepositoryPolicy, UpdatePolicy};

lazy_static! {
    static ref PROPERTY_REGEX: Regex = Regex::new(r"\$\{([^}]+)\}").unwrap();
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub dependency_management: DependencyManagement,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub repositories: Repositories,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct DependencyManagement {
    #[serde(default)]
    pub dependencies: Dependencies,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Dependencies {
    #[serde(default)]
    pub dependency: Vec<Dependency>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub artifact_type: Option<String>,
    pub classifier: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<String>,
    #[serde(default)]
    pub exclusions: Exclusions,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Exclusions {
    #[serde(default)]
    pub exclusion: Vec<Exclusion>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}
impl Exclusion {
    /// `*` matches anything
    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        (self.group_id == "*" || self.group_id == group_id)
            && (self.artifact_id == "*" || self.artifact_id == artifact_id)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Repositories {
    #[serde(default)]
    pub repository: Vec<PomRepository>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PomRepository {
    pub id: String,
    pub url: String,
    pub layout: Option<String>,
    pub releases: Option<PomRepositoryPolicy>,
    pub snapshots: Option<PomRepositoryPolicy>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PomRepositoryPolicy {
    pub enabled: Option<String>,
    pub update_policy: Option<String>,
    pub checksum_policy: Option<String>,
}
impl PomRepositoryPolicy {
    fn to_policy(&self) -> anyhow::Result<RepositoryPolicy> {
        let defaults = RepositoryPolicy::default();
        Ok(RepositoryPolicy {
            enabled: match self.enabled.as_deref() {
                None => defaults.enabled,
                Some(s) => s.trim().parse().with_context(|| format!("invalid 'enabled' flag: {:?}", s))?,
            },
            update_policy: match self.update_policy.as_deref() {
                None => defaults.update_policy,
                Some(s) => UpdatePolicy::parse(s)?,
            },
            checksum_policy: match self.checksum_policy.as_deref() {
                None => defaults.checksum_policy,
                Some(s) => ChecksumPolicy::parse(s)?,
            },
        })
    }
}

impl Pom {
    pub fn parse(xml: &str) -> anyhow::Result<Pom> {
        Ok(serde_xml_rs::from_str(xml)?)
    }

    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    pub fn effective_version(&self) -> Option<&str> {
        self.version.as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()))
    }

    pub fn packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or("jar")
    }

    /// The properties that `${...}` expressions in this POM can refer to, not including inherited
    ///  ones
    pub fn own_properties(&self) -> BTreeMap<String, String> {
        let mut result = self.properties.clone();
        if let Some(group_id) = self.effective_group_id() {
            result.insert("project.groupId".to_string(), group_id.to_string());
            result.insert("pom.groupId".to_string(), group_id.to_string());
        }
        if let Some(artifact_id) = &self.artifact_id {
            result.insert("project.artifactId".to_string(), artifact_id.clone());
            result.insert("pom.artifactId".to_string(), artifact_id.clone());
        }
        if let Some(version) = self.effective_version() {
            result.insert("project.version".to_string(), version.to_string());
            result.insert("pom.version".to_string(), version.to_string());
            result.insert("version".to_string(), version.to_string());
        }
        if let Some(parent) = &self.parent {
            result.insert("project.parent.groupId".to_string(), parent.group_id.clone());
            result.insert("project.parent.version".to_string(), parent.version.clone());
        }
        result
    }

    /// The POM's remote repositories, with layouts looked up in `layouts`
    pub fn remote_repositories(&self, layouts: &RepositoryLayouts) -> anyhow::Result<Vec<ArtifactRepository>> {
        let properties = self.own_properties();

        self.repositories.repository.iter()
            .map(|r| {
                let layout_key = r.layout.as_deref().map(str::trim).unwrap_or("default");
                let layout = layouts.layout_for(layout_key)
                    .ok_or_else(|| GetError::UnknownLayout { key: layout_key.to_string() })?;
                Ok(ArtifactRepository {
                    id: r.id.trim().to_string(),
                    url: interpolate(r.url.trim(), &properties),
                    layout,
                    releases: policy_or_default(&r.releases)?,
                    snapshots: policy_or_default(&r.snapshots)?,
                })
            })
            .collect()
    }
}

fn policy_or_default(policy: &Option<PomRepositoryPolicy>) -> anyhow::Result<RepositoryPolicy> {
    match policy {
        Some(p) => p.to_policy(),
        None => Ok(RepositoryPolicy::default()),
    }
}

/// Replaces `${key}` with the property's value. Unknown keys are left as they are.
pub fn interpolate(value: &str, properties: &BTreeMap<String, String>) -> String {
    // properties may refer to other properties, so repeat until nothing changes (bounded to
    //  avoid looping on cyclic definitions)
    let mut result = value.to_string();
    for _ in 0..8 {
        let replaced = PROPERTY_REGEX.replace_all(&result, |caps: &Captures| {
            properties.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        }).into_owned();
        if replaced == result {
            break;
        }
        result = replaced;
    }
    result
}

/// The project the invocation runs in, if any
#[derive(Debug, Clone)]
pub struct Project {
    pub pom_file: PathBuf,
    pub pom: Pom,
    pub remote_repositories: Vec<ArtifactRepository>,
}
impl Project {
    pub fn load(pom_file: &Path, layouts: &RepositoryLayouts) -> anyhow::Result<Project> {
        let xml = std::fs::read_to_string(pom_file)
            .with_context(|| format!("failed to read {}", pom_file.display()))?;
        let pom = Pom::parse(&xml)
            .with_context(|| format!("failed to parse {}", pom_file.display()))?;
        let remote_repositories = pom.remote_repositories(layouts)?;

        Ok(Project {
            pom_file: pom_file.to_path_buf(),
            pom,
            remote_repositories,
        })
    }

    pub fn with_repositories(remote_repositories: Vec<ArtifactRepository>) -> Project {
        Project {
            pom_file: PathBuf::new(),
            pom: Pom::default(),
            remote_repositories,
        }
    }
}
