use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::ResolutionError;
use crate::maven::coordinates::MavenArtifactRef;
use crate::maven::metadata_xml::Metadata;
use crate::maven::repository::{ArtifactRepository, ChecksumPolicy};
use crate::resolver::{ArtifactResolver, BuildingRequest, ResolvedArtifact};
use crate::util::checksum::{parse_sha1_file, ChecksumValidator, Sha1Validator};
use crate::util::validating_http_downloader::ValidatingHttpDownloader;

/// Resolves single files from the remote repositories of a request into its local repository.
///
/// A file in the local repository is used as long as it is fresh according to the update policies
///  of the repositories; otherwise the repositories are tried in order and the first one that
///  has the file wins.
pub struct HttpArtifactResolver {
    downloader: ValidatingHttpDownloader,
}

impl HttpArtifactResolver {
    pub fn new(downloader: ValidatingHttpDownloader) -> HttpArtifactResolver {
        HttpArtifactResolver { downloader }
    }

    async fn resolve(&self, request: &BuildingRequest, artifact_ref: &MavenArtifactRef) -> anyhow::Result<ResolvedArtifact> {
        let local_repository = &request.local_repository;
        let target = local_repository.path_of(artifact_ref)?;
        let version = &artifact_ref.coordinates.version;

        let candidates = request.remote_repositories.iter()
            .filter(|r| r.policy_for(version).enabled)
            .collect::<Vec<_>>();

        let cached = ResolvedArtifact {
            artifact: artifact_ref.clone(),
            file: target.clone(),
            repository: None,
        };

        if request.offline || candidates.is_empty() {
            return if local_repository.is_fresh(&target, None).await? {
                debug!("using {} from the local repository", target.display());
                Ok(cached)
            }
            else if request.offline {
                Err(anyhow!("{} is not available in the local repository and the request is offline", artifact_ref))
            }
            else {
                Err(anyhow!("{} is not available in the local repository and there are no remote repositories", artifact_ref))
            };
        }

        let max_age = strictest_max_age(&candidates, artifact_ref);
        if local_repository.is_fresh(&target, max_age).await? {
            debug!("{} is up to date in the local repository", target.display());
            return Ok(cached);
        }

        let mut failures = Vec::new();
        for repository in &candidates {
            match self.fetch_from(request, repository, artifact_ref).await {
                Ok(true) => {
                    info!("Downloaded {} from {} ({})", artifact_ref, repository.id, repository.url);
                    return Ok(ResolvedArtifact {
                        artifact: artifact_ref.clone(),
                        file: target,
                        repository: Some(repository.id.clone()),
                    });
                }
                Ok(false) => {
                    debug!("{} not found in {}", artifact_ref, repository.id);
                    failures.push(format!("{} ({}): not found", repository.id, repository.url));
                }
                Err(e) => {
                    warn!("failed to download {} from {}: {:#}", artifact_ref, repository.id, e);
                    failures.push(format!("{} ({}): {:#}", repository.id, repository.url, e));
                }
            }
        }

        // an outdated copy is better than nothing
        if local_repository.is_fresh(&target, None).await? {
            warn!("could not update {}, using the copy in the local repository", artifact_ref);
            return Ok(cached);
        }

        Err(anyhow!("Could not find artifact {} in [{}]", artifact_ref, failures.join(", ")))
    }

    /// `false` if the repository does not have the file
    async fn fetch_from(&self, request: &BuildingRequest, repository: &ArtifactRepository, artifact_ref: &MavenArtifactRef) -> anyhow::Result<bool> {
        let policy = repository.policy_for(&artifact_ref.coordinates.version);

        let file_version = if artifact_ref.coordinates.version.is_snapshot() {
            self.snapshot_file_version(repository, artifact_ref).await?
        }
        else {
            artifact_ref.coordinates.version.0.clone()
        };

        let url = format!("{}{}", repository.base_url(), repository.layout.path_of(artifact_ref, &file_version));
        let download = match self.downloader.get(&url).await? {
            None => return Ok(false),
            Some(download) => download,
        };

        let validators = if policy.checksum_policy == ChecksumPolicy::Ignore {
            vec![]
        }
        else {
            self.validators_for(download.announced_validators(), &url).await
        };

        let target = request.local_repository.path_of(artifact_ref)?;
        request.local_repository.install(&target, download.body, validators, policy.checksum_policy, &url).await?;
        Ok(true)
    }

    /// Checksums announced in response headers, or the remote `.sha1` file if there are none
    async fn validators_for(&self, announced: Vec<Box<dyn ChecksumValidator>>, url: &str) -> Vec<Box<dyn ChecksumValidator>> {
        let mut validators = announced;
        if !validators.is_empty() {
            return validators;
        }

        match self.downloader.get_text(&format!("{}.sha1", url)).await {
            Ok(Some(content)) => match parse_sha1_file(&content) {
                Ok(sha1) => validators.push(Box::new(Sha1Validator::new(sha1))),
                Err(e) => warn!("invalid checksum file {}.sha1: {}", url, e),
            },
            Ok(None) => {}
            Err(e) => warn!("failed to get checksum file {}.sha1: {:#}", url, e),
        }
        validators
    }

    /// The version as it appears in the remote file name, which may be a timestamped version for
    ///  snapshots
    async fn snapshot_file_version(&self, repository: &ArtifactRepository, artifact_ref: &MavenArtifactRef) -> anyhow::Result<String> {
        let unqualified = artifact_ref.coordinates.version.0.clone();

        let metadata_path = match repository.layout.metadata_path(&artifact_ref.coordinates) {
            None => return Ok(unqualified),
            Some(path) => path,
        };

        match self.downloader.get_text(&format!("{}{}", repository.base_url(), metadata_path)).await? {
            None => Ok(unqualified),
            Some(xml) => Ok(Metadata::parse(&xml)?.snapshot_file_version(artifact_ref)),
        }
    }
}

/// The smallest maximum age of all repositories' update policies; `None` if no policy ever
///  considers a file stale
fn strictest_max_age(repositories: &[&ArtifactRepository], artifact_ref: &MavenArtifactRef) -> Option<Duration> {
    repositories.iter()
        .filter_map(|r| r.policy_for(&artifact_ref.coordinates.version).update_policy.max_age())
        .min()
}

#[async_trait]
impl ArtifactResolver for HttpArtifactResolver {
    async fn resolve_artifact(&self, request: &BuildingRequest, artifact: &MavenArtifactRef) -> Result<ResolvedArtifact, ResolutionError> {
        Ok(self.resolve(request, artifact).await?)
    }
}
