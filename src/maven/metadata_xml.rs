//! The subset of the version level `maven-metadata.xml` format that is needed to find the file
//!  name of a timestamped snapshot, see
//!  https://maven.apache.org/ref/3.9.5/maven-repository-metadata/repository-metadata.html

use serde::Deserialize;

use crate::maven::coordinates::MavenArtifactRef;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub versioning: Versioning,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Versioning {
    pub snapshot: Option<Snapshot>,
    pub last_updated: Option<String>,
    #[serde(default)]
    pub snapshot_versions: SnapshotVersions,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: Option<String>,
    pub build_number: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotVersions {
    #[serde(default)]
    pub snapshot_version: Vec<SnapshotVersion>,
}

#[derive(Deserialize, Debug)]
pub struct SnapshotVersion {
    pub classifier: Option<String>,
    pub extension: String,
    pub value: String,
}

impl Metadata {
    pub fn parse(xml: &str) -> anyhow::Result<Metadata> {
        Ok(serde_xml_rs::from_str(xml)?)
    }

    /// The version string used in the remote file name of a snapshot artifact, e.g.
    ///  "1.0-20240101.120000-3". Falls back to the unqualified version if the metadata has no
    ///  timestamp for it.
    pub fn snapshot_file_version(&self, artifact_ref: &MavenArtifactRef) -> String {
        let classifier = artifact_ref.classifier.as_option().unwrap_or("");

        let explicit = self.versioning.snapshot_versions.snapshot_version.iter()
            .find(|v| v.extension == artifact_ref.file_extension && v.classifier.as_deref().unwrap_or("") == classifier);
        if let Some(v) = explicit {
            return v.value.clone();
        }

        let version = &artifact_ref.coordinates.version.0;
        match &self.versioning.snapshot {
            Some(Snapshot { timestamp: Some(timestamp), build_number: Some(build_number) }) => {
                format!("{}-{}-{}", version.trim_end_matches("-SNAPSHOT"), timestamp, build_number)
            }
            _ => version.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::maven::coordinates::*;

    fn snapshot_ref(classifier: Option<&str>, extension: &str) -> MavenArtifactRef {
        MavenArtifactRef {
            coordinates: MavenCoordinates {
                group_id: MavenGroupId("g".to_string()),
                artifact_id: MavenArtifactId("a".to_string()),
                version: MavenVersion("1.0-SNAPSHOT".to_string()),
            },
            classifier: MavenClassifier::from_option(classifier),
            file_extension: extension.to_string(),
        }
    }

    const WITH_SNAPSHOT_VERSIONS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>g</groupId>
  <artifactId>a</artifactId>
  <version>1.0-SNAPSHOT</version>
  <versioning>
    <snapshot>
      <timestamp>20240101.120000</timestamp>
      <buildNumber>3</buildNumber>
    </snapshot>
    <lastUpdated>20240101120000</lastUpdated>
    <snapshotVersions>
      <snapshotVersion>
        <extension>jar</extension>
        <value>1.0-20240101.120000-3</value>
        <updated>20240101120000</updated>
      </snapshotVersion>
      <snapshotVersion>
        <classifier>tests</classifier>
        <extension>jar</extension>
        <value>1.0-20231231.235959-2</value>
        <updated>20231231235959</updated>
      </snapshotVersion>
    </snapshotVersions>
  </versioning>
</metadata>"#;

    #[test]
    fn test_snapshot_versions() {
        let metadata = Metadata::parse(WITH_SNAPSHOT_VERSIONS).unwrap();
        assert_eq!(metadata.snapshot_file_version(&snapshot_ref(None, "jar")), "1.0-20240101.120000-3");
        assert_eq!(metadata.snapshot_file_version(&snapshot_ref(Some("tests"), "jar")), "1.0-20231231.235959-2");
        // no explicit entry -> falls back to the snapshot element
        assert_eq!(metadata.snapshot_file_version(&snapshot_ref(None, "pom")), "1.0-20240101.120000-3");
    }

    #[test]
    fn test_without_timestamp() {
        let metadata = Metadata::parse("<metadata><version>1.0-SNAPSHOT</version></metadata>").unwrap();
        assert_eq!(metadata.snapshot_file_version(&snapshot_ref(None, "jar")), "1.0-SNAPSHOT");
    }
}
