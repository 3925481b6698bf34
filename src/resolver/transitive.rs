use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_recursion::async_recursion;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ResolutionError;
use crate::maven::artifact_handler::ArtifactHandlerManager;
use crate::maven::coordinates::*;
use crate::maven::pom::{interpolate, Dependency, Exclusion, Pom};
use crate::resolver::{ArtifactResolver, BuildingRequest, DependencyFilter, DependencyResolver, ResolvedArtifact};

const MAX_PARENT_DEPTH: usize = 16;

/// Walks the dependency graph of a coordinate breadth first and resolves every node with an
///  [`ArtifactResolver`].
///
/// Only `compile` and `runtime` dependencies that are not optional are followed. If the same
///  artifact is reachable with different versions, the one closest to the root wins.
pub struct TransitiveDependencyResolver {
    artifact_resolver: Arc<dyn ArtifactResolver>,
    handlers: Arc<dyn ArtifactHandlerManager>,
}

/// A POM with its parent chain and dependency management applied
#[derive(Debug, Clone)]
struct EffectivePom {
    resolved: ResolvedArtifact,
    packaging: String,
    properties: BTreeMap<String, String>,
    managed: Vec<Dependency>,
    dependencies: Vec<Dependency>,
}

struct Node {
    coordinate: DependableCoordinate,
    exclusions: Vec<Exclusion>,
}

#[derive(PartialEq, Eq, Hash)]
struct NodeKey {
    group_id: String,
    artifact_id: String,
    artifact_type: String,
    classifier: MavenClassifier,
}
impl NodeKey {
    fn of(coordinate: &DependableCoordinate) -> NodeKey {
        NodeKey {
            group_id: coordinate.coordinates.group_id.0.clone(),
            artifact_id: coordinate.coordinates.artifact_id.0.clone(),
            artifact_type: coordinate.artifact_type.clone(),
            classifier: coordinate.classifier.clone(),
        }
    }
}

impl TransitiveDependencyResolver {
    pub fn new(artifact_resolver: Arc<dyn ArtifactResolver>, handlers: Arc<dyn ArtifactHandlerManager>) -> TransitiveDependencyResolver {
        TransitiveDependencyResolver {
            artifact_resolver,
            handlers,
        }
    }

    fn artifact_ref_for(&self, coordinate: &DependableCoordinate) -> MavenArtifactRef {
        let handler = self.handlers.handler_for(&coordinate.artifact_type);
        let classifier = match &coordinate.classifier {
            MavenClassifier::Unclassified => MavenClassifier::from_option(handler.classifier.as_deref()),
            classified => classified.clone(),
        };

        MavenArtifactRef {
            coordinates: coordinate.coordinates.clone(),
            classifier,
            file_extension: handler.extension,
        }
    }

    async fn resolve(&self, request: &BuildingRequest, root: &DependableCoordinate, filter: Option<&dyn DependencyFilter>) -> anyhow::Result<Vec<ResolvedArtifact>> {
        let mut result = Vec::new();
        let mut poms = HashMap::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        seen.insert(NodeKey::of(root));
        queue.push_back(Node {
            coordinate: root.clone(),
            exclusions: vec![],
        });

        while let Some(node) = queue.pop_front() {
            debug!("resolving dependency graph node {}", node.coordinate);

            let pom = match self.effective_pom(request, &node.coordinate.coordinates, &mut poms, 0).await {
                Ok(pom) => Some(pom),
                Err(e) => {
                    warn!("The POM for {} is not available, no dependency information available: {:#}", node.coordinate, e);
                    None
                }
            };

            let is_pom_only = node.coordinate.artifact_type == "pom"
                || pom.as_ref().map(|p| p.packaging == "pom").unwrap_or(false);
            if is_pom_only {
                match &pom {
                    Some(pom) => result.push(pom.resolved.clone()),
                    None => return Err(anyhow!("failed to resolve the POM of {}", node.coordinate)),
                }
            }
            else {
                let artifact_ref = self.artifact_ref_for(&node.coordinate);
                let resolved = self.artifact_resolver.resolve_artifact(request, &artifact_ref).await
                    .with_context(|| format!("failed to resolve {}", artifact_ref))?;
                result.push(resolved);
            }

            let pom = match pom {
                None => continue,
                Some(pom) => pom,
            };

            for dependency in &pom.dependencies {
                if !is_followed(dependency) {
                    continue;
                }
                if node.exclusions.iter().any(|e| e.matches(&dependency.group_id, &dependency.artifact_id)) {
                    debug!("{}:{} is excluded", dependency.group_id, dependency.artifact_id);
                    continue;
                }

                let version = match &dependency.version {
                    Some(version) => version,
                    None => {
                        warn!("no version for {}:{} in the POM of {}, skipping it", dependency.group_id, dependency.artifact_id, node.coordinate);
                        continue;
                    }
                };

                let coordinate = DependableCoordinate {
                    coordinates: MavenCoordinates {
                        group_id: MavenGroupId(dependency.group_id.clone()),
                        artifact_id: MavenArtifactId(dependency.artifact_id.clone()),
                        version: MavenVersion(version.clone()),
                    },
                    artifact_type: dependency.artifact_type.clone().unwrap_or_else(|| DEFAULT_TYPE.to_string()),
                    classifier: MavenClassifier::from_option(dependency.classifier.as_deref()),
                };

                let key = NodeKey::of(&coordinate);
                if seen.contains(&key) {
                    continue;
                }
                if let Some(filter) = filter {
                    if !filter.accept(&coordinate) {
                        debug!("{} is filtered out", coordinate);
                        continue;
                    }
                }
                seen.insert(key);

                let mut exclusions = node.exclusions.clone();
                exclusions.extend(dependency.exclusions.exclusion.iter().cloned());
                queue.push_back(Node {
                    coordinate,
                    exclusions,
                });
            }
        }

        Ok(result)
    }

    #[async_recursion]
    async fn effective_pom(
        &self,
        request: &BuildingRequest,
        coordinates: &MavenCoordinates,
        cache: &mut HashMap<MavenCoordinates, EffectivePom>,
        depth: usize,
    ) -> anyhow::Result<EffectivePom> {
        if let Some(pom) = cache.get(coordinates) {
            return Ok(pom.clone());
        }
        if depth > MAX_PARENT_DEPTH {
            return Err(anyhow!("the parent chain of {}:{} is too deep", coordinates.group_id.0, coordinates.artifact_id.0));
        }

        let resolved = self.artifact_resolver.resolve_artifact(request, &MavenArtifactRef::pom(coordinates)).await?;
        let xml = tokio::fs::read_to_string(&resolved.file).await?;
        let pom = Pom::parse(&xml)
            .with_context(|| format!("failed to parse {}", resolved.file.display()))?;

        let parent = match &pom.parent {
            None => None,
            Some(parent) => {
                let parent_coordinates = MavenCoordinates {
                    group_id: MavenGroupId(parent.group_id.clone()),
                    artifact_id: MavenArtifactId(parent.artifact_id.clone()),
                    version: MavenVersion(parent.version.clone()),
                };
                Some(self.effective_pom(request, &parent_coordinates, cache, depth + 1).await?)
            }
        };

        let effective = EffectivePom::merge(resolved, &pom, parent.as_ref());
        cache.insert(coordinates.clone(), effective.clone());
        Ok(effective)
    }
}

impl EffectivePom {
    fn merge(resolved: ResolvedArtifact, pom: &Pom, parent: Option<&EffectivePom>) -> EffectivePom {
        let mut properties = parent
            .map(|p| p.properties.clone())
            .unwrap_or_default();
        properties.extend(pom.own_properties());

        // own entries come first so they take precedence over inherited ones
        let mut managed = pom.dependency_management.dependencies.dependency.iter()
            .map(|d| interpolate_dependency(d, &properties))
            .collect::<Vec<_>>();
        if let Some(parent) = parent {
            managed.extend(parent.managed.iter().cloned());
        }

        let mut dependencies = pom.dependencies.dependency.iter()
            .map(|d| interpolate_dependency(d, &properties))
            .collect::<Vec<_>>();
        if let Some(parent) = parent {
            for inherited in &parent.dependencies {
                if !dependencies.iter().any(|d| is_same_artifact(d, inherited)) {
                    dependencies.push(inherited.clone());
                }
            }
        }

        for dependency in dependencies.iter_mut() {
            if let Some(management) = managed.iter().find(|m| is_same_artifact(m, dependency)) {
                if dependency.version.is_none() {
                    dependency.version = management.version.clone();
                }
                if dependency.scope.is_none() {
                    dependency.scope = management.scope.clone();
                }
                if dependency.exclusions.exclusion.is_empty() {
                    dependency.exclusions = management.exclusions.clone();
                }
            }
        }

        EffectivePom {
            resolved,
            packaging: pom.packaging().to_string(),
            properties,
            managed,
            dependencies,
        }
    }
}

fn interpolate_dependency(dependency: &Dependency, properties: &BTreeMap<String, String>) -> Dependency {
    let interpolate_opt = |s: &Option<String>| s.as_ref().map(|s| interpolate(s.trim(), properties));

    Dependency {
        group_id: interpolate(dependency.group_id.trim(), properties),
        artifact_id: interpolate(dependency.artifact_id.trim(), properties),
        version: interpolate_opt(&dependency.version),
        artifact_type: interpolate_opt(&dependency.artifact_type),
        classifier: interpolate_opt(&dependency.classifier),
        scope: interpolate_opt(&dependency.scope),
        optional: interpolate_opt(&dependency.optional),
        exclusions: dependency.exclusions.clone(),
    }
}

fn is_same_artifact(a: &Dependency, b: &Dependency) -> bool {
    a.group_id == b.group_id
        && a.artifact_id == b.artifact_id
        && a.artifact_type.as_deref().unwrap_or(DEFAULT_TYPE) == b.artifact_type.as_deref().unwrap_or(DEFAULT_TYPE)
        && a.classifier.as_deref().unwrap_or("") == b.classifier.as_deref().unwrap_or("")
}

/// compile and runtime scope, not optional
fn is_followed(dependency: &Dependency) -> bool {
    let scope_is_followed = matches!(dependency.scope.as_deref(), None | Some("compile") | Some("runtime"));
    let is_optional = dependency.optional.as_deref() == Some("true");
    scope_is_followed && !is_optional
}

#[async_trait]
impl DependencyResolver for TransitiveDependencyResolver {
    async fn resolve_dependencies(
        &self,
        request: &BuildingRequest,
        coordinate: &DependableCoordinate,
        filter: Option<&dyn DependencyFilter>,
    ) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
        Ok(self.resolve(request, coordinate, filter).await?)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::maven::artifact_handler::DefaultArtifactHandlers;
    use crate::maven::local_repo::LocalRepository;

    /// Serves files from memory, keyed by `g:a:ext[:classifier]:v`
    struct InMemoryResolver {
        files: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }
    impl InMemoryResolver {
        fn new(files: &[(&str, &str)]) -> InMemoryResolver {
            InMemoryResolver {
                files: files.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                requested: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl ArtifactResolver for InMemoryResolver {
        async fn resolve_artifact(&self, request: &BuildingRequest, artifact: &MavenArtifactRef) -> Result<ResolvedArtifact, ResolutionError> {
            let key = artifact.to_string();
            self.requested.lock().unwrap().push(key.clone());

            let content = self.files.get(&key)
                .ok_or_else(|| ResolutionError::new(format!("Could not find artifact {}", key)))?;
            let file = request.local_repository.path_of(artifact)?;
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, content).unwrap();

            Ok(ResolvedArtifact {
                artifact: artifact.clone(),
                file,
                repository: Some("memory".to_string()),
            })
        }
    }

    fn pom(group_id: &str, artifact_id: &str, version: &str, rest: &str) -> String {
        format!(
            "<project><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>{}</project>",
            group_id, artifact_id, version, rest,
        )
    }

    fn dependency(artifact_id: &str, version: &str, extra: &str) -> String {
        format!(
            "<dependency><groupId>g</groupId><artifactId>{}</artifactId>{}{}</dependency>",
            artifact_id,
            if version.is_empty() { "".to_string() } else { format!("<version>{}</version>", version) },
            extra,
        )
    }

    fn coordinate(s: &str) -> DependableCoordinate {
        parse_artifact_string(s).unwrap()
    }

    fn resolved_keys(resolved: &[ResolvedArtifact]) -> Vec<String> {
        resolved.iter().map(|r| r.artifact.to_string()).collect()
    }

    fn graph() -> Vec<(String, String)> {
        let parent = pom("g", "parent", "1", &format!(
            "<packaging>pom</packaging><properties><lib.version>2.0</lib.version></properties>\
             <dependencyManagement><dependencies>{}</dependencies></dependencyManagement>",
            dependency("managed", "3.0", ""),
        ));
        let app = format!(
            "<project><parent><groupId>g</groupId><artifactId>parent</artifactId><version>1</version></parent>\
             <artifactId>app</artifactId><dependencies>{}{}{}{}{}</dependencies></project>",
            dependency("lib", "${lib.version}", ""),
            dependency("test-only", "1", "<scope>test</scope>"),
            dependency("opt", "1", "<optional>true</optional>"),
            dependency("managed", "", ""),
            dependency("lib2", "1", "<exclusions><exclusion><groupId>g</groupId><artifactId>excluded</artifactId></exclusion></exclusions>"),
        );
        let lib = pom("g", "lib", "2.0", &format!(
            "<dependencies>{}{}</dependencies>",
            dependency("deep", "1.0", "<scope>runtime</scope>"),
            dependency("lib2", "9.9", ""),
        ));
        let lib2 = pom("g", "lib2", "1", &format!(
            "<dependencies>{}{}</dependencies>",
            dependency("excluded", "1", ""),
            dependency("other", "${project.version}", ""),
        ));

        vec![
            ("g:parent:pom:1".to_string(), parent),
            ("g:app:pom:1".to_string(), app),
            ("g:app:jar:1".to_string(), "app".to_string()),
            ("g:lib:pom:2.0".to_string(), lib),
            ("g:lib:jar:2.0".to_string(), "lib".to_string()),
            ("g:managed:jar:3.0".to_string(), "managed".to_string()),
            ("g:lib2:pom:1".to_string(), lib2),
            ("g:lib2:jar:1".to_string(), "lib2".to_string()),
            ("g:deep:pom:1.0".to_string(), pom("g", "deep", "1.0", "")),
            ("g:deep:jar:1.0".to_string(), "deep".to_string()),
            ("g:other:pom:1".to_string(), pom("g", "other", "1", "")),
            ("g:other:jar:1".to_string(), "other".to_string()),
            ("g:excluded:jar:1".to_string(), "excluded".to_string()),
            ("g:test-only:jar:1".to_string(), "test-only".to_string()),
            ("g:opt:jar:1".to_string(), "opt".to_string()),
        ]
    }

    fn transitive_resolver(files: &[(String, String)]) -> (TransitiveDependencyResolver, Arc<InMemoryResolver>) {
        let files = files.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<Vec<_>>();
        let artifact_resolver = Arc::new(InMemoryResolver::new(&files));
        (
            TransitiveDependencyResolver::new(artifact_resolver.clone(), Arc::new(DefaultArtifactHandlers::new())),
            artifact_resolver,
        )
    }

    #[tokio::test]
    async fn test_walks_graph() {
        let local = tempfile::tempdir().unwrap();
        let request = BuildingRequest::new(LocalRepository::new(local.path()));
        let (resolver, _) = transitive_resolver(&graph());

        let resolved = resolver.resolve_dependencies(&request, &coordinate("g:app:1"), None).await.unwrap();

        assert_eq!(resolved_keys(&resolved), vec![
            "g:app:jar:1",
            "g:lib:jar:2.0",
            "g:managed:jar:3.0",
            "g:lib2:jar:1",
            "g:deep:jar:1.0",
            "g:other:jar:1",
        ]);
        assert_eq!(std::fs::read_to_string(&resolved[1].file).unwrap(), "lib");
    }

    #[tokio::test]
    async fn test_filter() {
        let local = tempfile::tempdir().unwrap();
        let request = BuildingRequest::new(LocalRepository::new(local.path()));
        let (resolver, _) = transitive_resolver(&graph());

        let no_lib = |c: &DependableCoordinate| c.coordinates.artifact_id.0 != "lib";
        let resolved = resolver.resolve_dependencies(&request, &coordinate("g:app:1"), Some(&no_lib)).await.unwrap();

        assert_eq!(resolved_keys(&resolved), vec![
            "g:app:jar:1",
            "g:managed:jar:3.0",
            "g:lib2:jar:1",
            "g:other:jar:1",
        ]);
    }

    #[tokio::test]
    async fn test_pom_type_root() {
        let local = tempfile::tempdir().unwrap();
        let request = BuildingRequest::new(LocalRepository::new(local.path()));
        let (resolver, requested) = transitive_resolver(&graph());

        let resolved = resolver.resolve_dependencies(&request, &coordinate("g:parent:1:pom"), None).await.unwrap();

        assert_eq!(resolved_keys(&resolved), vec!["g:parent:pom:1"]);
        assert_eq!(*requested.requested.lock().unwrap(), vec!["g:parent:pom:1"]);
    }

    #[tokio::test]
    async fn test_pom_packaging() {
        let local = tempfile::tempdir().unwrap();
        let request = BuildingRequest::new(LocalRepository::new(local.path()));
        let (resolver, requested) = transitive_resolver(&graph());

        let resolved = resolver.resolve_dependencies(&request, &coordinate("g:parent:1"), None).await.unwrap();

        assert_eq!(resolved_keys(&resolved), vec!["g:parent:pom:1"]);
        assert!(!requested.requested.lock().unwrap().contains(&"g:parent:jar:1".to_string()));
    }

    #[tokio::test]
    async fn test_missing_root_artifact() {
        let local = tempfile::tempdir().unwrap();
        let request = BuildingRequest::new(LocalRepository::new(local.path()));
        let (resolver, _) = transitive_resolver(&graph());

        let err = resolver.resolve_dependencies(&request, &coordinate("g:nothing:1"), None).await.unwrap_err();
        assert!(err.message.contains("g:nothing:jar:1"));
    }

    #[tokio::test]
    async fn test_dependency_outside_local_repository_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request = BuildingRequest::new(LocalRepository::new(dir.path().join("m2")));
        let files = vec![
            ("g:app:pom:1".to_string(), pom("g", "app", "1", &format!("<dependencies>{}</dependencies>", dependency("../../../escaped", "1", "")))),
            ("g:app:jar:1".to_string(), "app".to_string()),
            ("g:../../../escaped:jar:1".to_string(), "escaped".to_string()),
        ];
        let (resolver, _) = transitive_resolver(&files);

        let err = resolver.resolve_dependencies(&request, &coordinate("g:app:1"), None).await.unwrap_err();

        assert!(err.message.contains("invalid artifactId"), "{}", err.message);
        assert!(!dir.path().parent().unwrap().join("escaped").exists());
        assert!(!dir.path().join("escaped").exists());
    }

    #[tokio::test]
    async fn test_handler_classifier() {
        let local = tempfile::tempdir().unwrap();
        let request = BuildingRequest::new(LocalRepository::new(local.path()));
        let files = vec![("g:lib:jar:tests:2.0".to_string(), "tests".to_string())];
        let (resolver, _) = transitive_resolver(&files);

        let resolved = resolver.resolve_dependencies(&request, &coordinate("g:lib:2.0:test-jar"), None).await.unwrap();
        assert_eq!(resolved_keys(&resolved), vec!["g:lib:jar:tests:2.0"]);
    }

    #[test]
    fn test_is_followed() {
        let d = |scope: Option<&str>, optional: Option<&str>| Dependency {
            group_id: "g".to_string(),
            artifact_id: "a".to_string(),
            version: None,
            artifact_type: None,
            classifier: None,
            scope: scope.map(str::to_string),
            optional: optional.map(str::to_string),
            exclusions: Default::default(),
        };
        assert!(is_followed(&d(None, None)));
        assert!(is_followed(&d(Some("compile"), Some("false"))));
        assert!(is_followed(&d(Some("runtime"), None)));
        assert!(!is_followed(&d(Some("test"), None)));
        assert!(!is_followed(&d(Some("provided"), None)));
        assert!(!is_followed(&d(Some("system"), None)));
        assert!(!is_followed(&d(None, Some("true"))));
    }
}
