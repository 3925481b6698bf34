use std::collections::BTreeMap;
use std::sync::Arc;

use crate::maven::coordinates::*;

/// Maps coordinates to paths relative to a repository's base URL
pub trait RepositoryLayout: Send + Sync {
    fn id(&self) -> &str;

    /// `file_version` is the version as it appears in the file name. It differs from the
    ///  coordinates' version for timestamped snapshots, e.g. "1.0-20240101.120000-3" for "1.0-SNAPSHOT".
    fn path_of(&self, artifact_ref: &MavenArtifactRef, file_version: &str) -> String;

    /// path of the version level `maven-metadata.xml`, if the layout has one
    fn metadata_path(&self, coordinates: &MavenCoordinates) -> Option<String>;
}

/// The Maven 2+ layout: `org/example/artifact/1.0/artifact-1.0-classifier.jar`
pub struct DefaultLayout;

impl RepositoryLayout for DefaultLayout {
    fn id(&self) -> &str {
        "default"
    }

    fn path_of(&self, artifact_ref: &MavenArtifactRef, file_version: &str) -> String {
        format!(
            "{}/{}",
            version_directory(&artifact_ref.coordinates),
            maven_file_name(artifact_ref, file_version),
        )
    }

    fn metadata_path(&self, coordinates: &MavenCoordinates) -> Option<String> {
        Some(format!("{}/maven-metadata.xml", version_directory(coordinates)))
    }
}

/// The Maven 1 layout: `org.example/jars/artifact-1.0.jar`
pub struct LegacyLayout;

impl RepositoryLayout for LegacyLayout {
    fn id(&self) -> &str {
        "legacy"
    }

    fn path_of(&self, artifact_ref: &MavenArtifactRef, file_version: &str) -> String {
        format!(
            "{}/{}s/{}",
            artifact_ref.coordinates.group_id.0,
            artifact_ref.file_extension,
            maven_file_name(artifact_ref, file_version),
        )
    }

    fn metadata_path(&self, _coordinates: &MavenCoordinates) -> Option<String> {
        None
    }
}

/// path of an artifact in the default layout, which is also the layout of the local repository
pub fn as_maven_path(artifact_ref: &MavenArtifactRef) -> String {
    DefaultLayout.path_of(artifact_ref, &artifact_ref.coordinates.version.0)
}

fn version_directory(coordinates: &MavenCoordinates) -> String {
    format!(
        "{}/{}/{}",
        coordinates.group_id.0.replace('.', "/"),
        coordinates.artifact_id.0,
        coordinates.version.0,
    )
}

fn maven_file_name(artifact_ref: &MavenArtifactRef, file_version: &str) -> String {
    let classifier_string = match &artifact_ref.classifier {
        MavenClassifier::Unclassified => "".to_string(),
        MavenClassifier::Classified(c) => format!("-{}", c),
    };

    let extension_string = if artifact_ref.file_extension.is_empty() {
        "".to_string()
    }
    else {
        format!(".{}", artifact_ref.file_extension)
    };

    format!("{}-{}{}{}",
            artifact_ref.coordinates.artifact_id.0,
            file_version,
            classifier_string,
            extension_string,
    )
}

/// The layouts a repository can refer to by name
#[derive(Clone)]
pub struct RepositoryLayouts {
    layouts: BTreeMap<String, Arc<dyn RepositoryLayout>>,
}
impl RepositoryLayouts {
    pub fn empty() -> RepositoryLayouts {
        RepositoryLayouts {
            layouts: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, layout: Arc<dyn RepositoryLayout>) {
        self.layouts.insert(layout.id().to_string(), layout);
    }

    pub fn layout_for(&self, key: &str) -> Option<Arc<dyn RepositoryLayout>> {
        self.layouts.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.layouts.keys().map(|k| k.as_str()).collect()
    }
}
impl Default for RepositoryLayouts {
    /// `default` and `legacy`
    fn default() -> Self {
        let mut result = RepositoryLayouts::empty();
        result.register(Arc::new(DefaultLayout));
        result.register(Arc::new(LegacyLayout));
        result
    }
}
