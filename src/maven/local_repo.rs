use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::anyhow;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::{create_dir_all, metadata, remove_file, rename, try_exists, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, trace, warn};
use uuid::Uuid;

use crate::maven::coordinates::MavenArtifactRef;
use crate::maven::paths::as_maven_path;
use crate::maven::repository::ChecksumPolicy;
use crate::util::checksum::ChecksumValidator;

/// The local artifact cache. Files are stored in the default layout below `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    root: PathBuf,
}
impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> LocalRepository {
        LocalRepository {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fails for coordinates that would address a file outside of `root`, e.g. an artifactId of
    ///  `../../x` in a downloaded POM
    pub fn path_of(&self, artifact_ref: &MavenArtifactRef) -> anyhow::Result<PathBuf> {
        let coordinates = &artifact_ref.coordinates;
        let mut fields = vec![
            ("groupId", coordinates.group_id.0.as_str()),
            ("artifactId", coordinates.artifact_id.0.as_str()),
            ("version", coordinates.version.0.as_str()),
            ("extension", artifact_ref.file_extension.as_str()),
        ];
        if let Some(classifier) = artifact_ref.classifier.as_option() {
            fields.push(("classifier", classifier));
        }
        for (name, value) in fields {
            if value == "." || value == ".." || value.contains(['/', '\\']) {
                return Err(anyhow!("invalid {} {:?} in {}", name, value, artifact_ref));
            }
        }

        let relative = as_maven_path(artifact_ref);
        if !Path::new(&relative).components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(anyhow!("{} does not map to a path inside the local repository", artifact_ref));
        }
        Ok(self.root.join(relative))
    }

    /// true if the file exists and is younger than `max_age`. A `max_age` of `None` means the
    ///  file never goes stale.
    pub async fn is_fresh(&self, path: &Path, max_age: Option<Duration>) -> anyhow::Result<bool> {
        if !try_exists(path).await? {
            return Ok(false);
        }

        let max_age = match max_age {
            None => return Ok(true),
            Some(max_age) => max_age,
        };
        if max_age.is_zero() {
            return Ok(false);
        }

        let modified = metadata(path).await?.modified()?;
        let age = SystemTime::now().duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(age < max_age)
    }

    /// Writes `data` to `target`, checking it against `validators` on the way. The data goes to a
    ///  temporary file in the same directory first and is renamed once it is complete and
    ///  accepted, so `target` never contains partial data.
    pub async fn install(
        &self,
        target: &Path,
        data: impl Stream<Item=anyhow::Result<Bytes>> + Send,
        validators: Vec<Box<dyn ChecksumValidator>>,
        checksum_policy: ChecksumPolicy,
        source: &str,
    ) -> anyhow::Result<()> {
        let directory = target.parent()
            .ok_or_else(|| anyhow!("not a file path: {}", target.display()))?;
        create_dir_all(directory).await?;

        let file_name = target.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let temp_path = directory.join(format!("{}.{}.part", file_name, Uuid::new_v4().as_hyphenated()));

        trace!("installing {} via temporary file {}", target.display(), temp_path.display());

        let result = match Self::do_install(&temp_path, data, validators, checksum_policy, source).await {
            Ok(()) => {
                rename(&temp_path, target).await?;
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup_error) = remove_file(&temp_path).await {
                    error!("error cleaning up {} after failed attempt to install: {}", temp_path.display(), cleanup_error);
                }
                Err(e)
            }
        };
        result
    }

    async fn do_install(
        temp_path: &Path,
        data: impl Stream<Item=anyhow::Result<Bytes>> + Send,
        mut validators: Vec<Box<dyn ChecksumValidator>>,
        checksum_policy: ChecksumPolicy,
        source: &str,
    ) -> anyhow::Result<()> {
        let mut data = Box::pin(data);

        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(temp_path)
            .await?;

        while let Some(bytes) = data.next().await {
            let bytes = bytes?;
            for validator in validators.iter_mut() {
                validator.add_data(&bytes);
            }
            file.write_all(&bytes).await?;
        }
        file.flush().await?;

        if checksum_policy == ChecksumPolicy::Ignore {
            return Ok(());
        }

        if validators.is_empty() {
            match checksum_policy {
                ChecksumPolicy::Fail => return Err(anyhow!("no checksum available for {}", source)),
                _ => warn!("no checksum available for {}", source),
            }
        }

        for validator in &validators {
            if !validator.do_validate() {
                match checksum_policy {
                    ChecksumPolicy::Fail => {
                        return Err(anyhow!("{} checksum validation failed for {}", validator.algorithm(), source));
                    }
                    _ => warn!("{} checksum validation failed for {}", validator.algorithm(), source),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use hex::FromHex;
    use rstest::*;
    use super::*;
    use crate::maven::coordinates::*;
    use crate::util::checksum::Sha1Validator;

    const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    fn data(chunks: &[&'static str]) -> impl Stream<Item=anyhow::Result<Bytes>> + Send {
        let chunks = chunks.iter()
            .map(|c| Ok::<_, anyhow::Error>(Bytes::from_static(c.as_bytes())))
            .collect::<Vec<_>>();
        futures::stream::iter(chunks)
    }

    fn sha1_validator(hex: &str) -> Vec<Box<dyn ChecksumValidator>> {
        vec![Box::new(Sha1Validator::new(<[u8; 20]>::from_hex(hex).unwrap()))]
    }

    #[test]
    fn test_path_of() {
        let repo = LocalRepository::new("/home/x/.m2/repository");
        let artifact_ref = MavenArtifactRef {
            coordinates: MavenCoordinates {
                group_id: MavenGroupId("org.example".to_string()),
                artifact_id: MavenArtifactId("a".to_string()),
                version: MavenVersion("1.0".to_string()),
            },
            classifier: MavenClassifier::Unclassified,
            file_extension: "jar".to_string(),
        };
        assert_eq!(repo.path_of(&artifact_ref).unwrap(), PathBuf::from("/home/x/.m2/repository/org/example/a/1.0/a-1.0.jar"));
    }

    #[rstest]
    #[case::parent_artifact("org.example", "../../../escaped", "1", None, "jar")]
    #[case::dot_artifact("org.example", "..", "1", None, "jar")]
    #[case::absolute_artifact("org.example", "/etc/passwd", "1", None, "jar")]
    #[case::backslash_artifact("org.example", "..\\..\\x", "1", None, "jar")]
    #[case::leading_dot_group(".hidden", "a", "1", None, "jar")]
    #[case::dots_group("..", "a", "1", None, "jar")]
    #[case::slash_group("org/../..", "a", "1", None, "jar")]
    #[case::parent_version("org.example", "a", "../1", None, "jar")]
    #[case::dot_version("org.example", "a", ".", None, "jar")]
    #[case::slash_classifier("org.example", "a", "1", Some("x/../../y"), "jar")]
    #[case::slash_extension("org.example", "a", "1", None, "jar/../../x")]
    fn test_path_of_rejects_escaping_coordinates(#[case] group_id: &str, #[case] artifact_id: &str, #[case] version: &str, #[case] classifier: Option<&str>, #[case] extension: &str) {
        let repo = LocalRepository::new("/home/x/.m2/repository");
        let artifact_ref = MavenArtifactRef {
            coordinates: MavenCoordinates {
                group_id: MavenGroupId(group_id.to_string()),
                artifact_id: MavenArtifactId(artifact_id.to_string()),
                version: MavenVersion(version.to_string()),
            },
            classifier: MavenClassifier::from_option(classifier),
            file_extension: extension.to_string(),
        };
        assert!(repo.path_of(&artifact_ref).is_err());
    }

    #[rstest]
    #[case::dots_inside_names("org.example.sub", "a.b", "1.0..2", Some("x.y"), "tar.gz")]
    #[case::no_extension("org.example", "a", "1", None, "")]
    fn test_path_of_accepts_dotted_names(#[case] group_id: &str, #[case] artifact_id: &str, #[case] version: &str, #[case] classifier: Option<&str>, #[case] extension: &str) {
        let repo = LocalRepository::new("/home/x/.m2/repository");
        let artifact_ref = MavenArtifactRef {
            coordinates: MavenCoordinates {
                group_id: MavenGroupId(group_id.to_string()),
                artifact_id: MavenArtifactId(artifact_id.to_string()),
                version: MavenVersion(version.to_string()),
            },
            classifier: MavenClassifier::from_option(classifier),
            file_extension: extension.to_string(),
        };
        assert!(repo.path_of(&artifact_ref).unwrap().starts_with("/home/x/.m2/repository"));
    }

    #[tokio::test]
    async fn test_install_valid() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let target = dir.path().join("g/a/1/a-1.jar");

        repo.install(&target, data(&["a", "bc"]), sha1_validator(ABC_SHA1), ChecksumPolicy::Fail, "test").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"abc");
        // no temporary files left behind
        assert_eq!(std::fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_install_mismatch_fail() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let target = dir.path().join("g/a/1/a-1.jar");

        let result = repo.install(&target, data(&["abd"]), sha1_validator(ABC_SHA1), ChecksumPolicy::Fail, "test").await;

        assert!(result.unwrap_err().to_string().contains("SHA-1"));
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(target.parent().unwrap()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_install_mismatch_warn() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let target = dir.path().join("a.jar");

        repo.install(&target, data(&["abd"]), sha1_validator(ABC_SHA1), ChecksumPolicy::Warn, "test").await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"abd");
    }

    #[tokio::test]
    async fn test_install_missing_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let target = dir.path().join("a.jar");

        assert!(repo.install(&target, data(&["x"]), vec![], ChecksumPolicy::Fail, "test").await.is_err());
        repo.install(&target, data(&["x"]), vec![], ChecksumPolicy::Ignore, "test").await.unwrap();
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_install_stream_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let target = dir.path().join("a.jar");

        let failing = futures::stream::iter(vec![Ok(Bytes::from_static(b"x")), Err(anyhow!("connection reset"))]);
        assert!(repo.install(&target, failing, vec![], ChecksumPolicy::Ignore, "test").await.is_err());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let repo = LocalRepository::new(dir.path());
        let path = dir.path().join("a.jar");

        assert!(!repo.is_fresh(&path, None).await.unwrap());

        std::fs::write(&path, b"x").unwrap();
        assert!(repo.is_fresh(&path, None).await.unwrap());
        assert!(repo.is_fresh(&path, Some(Duration::from_secs(3600))).await.unwrap());
        assert!(!repo.is_fresh(&path, Some(Duration::ZERO)).await.unwrap());
    }
}
