use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;

use crate::maven::coordinates::MavenVersion;
use crate::maven::paths::RepositoryLayout;

/// How often a locally cached artifact is checked against the remote repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    Always,
    Daily,
    /// in minutes
    Interval(u32),
    Never,
}
impl UpdatePolicy {
    /// Maximum age of a cached file before it must be fetched again; `None` means 'never stale'
    pub fn max_age(&self) -> Option<Duration> {
        match self {
            UpdatePolicy::Always => Some(Duration::ZERO),
            UpdatePolicy::Daily => Some(Duration::from_secs(24 * 60 * 60)),
            UpdatePolicy::Interval(minutes) => Some(Duration::from_secs(*minutes as u64 * 60)),
            UpdatePolicy::Never => None,
        }
    }

    /// `always`, `daily`, `never` or `interval:<minutes>`
    pub fn parse(s: &str) -> anyhow::Result<UpdatePolicy> {
        match s.trim() {
            "always" => Ok(UpdatePolicy::Always),
            "daily" => Ok(UpdatePolicy::Daily),
            "never" => Ok(UpdatePolicy::Never),
            other => match other.strip_prefix("interval:") {
                Some(minutes) => Ok(UpdatePolicy::Interval(minutes.parse()?)),
                None => Err(anyhow!("invalid update policy: {:?}", s)),
            },
        }
    }
}

/// What to do when a downloaded file's checksum does not match, or no checksum is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumPolicy {
    Fail,
    Warn,
    Ignore,
}
impl ChecksumPolicy {
    pub fn parse(s: &str) -> anyhow::Result<ChecksumPolicy> {
        match s.trim() {
            "fail" => Ok(ChecksumPolicy::Fail),
            "warn" => Ok(ChecksumPolicy::Warn),
            "ignore" => Ok(ChecksumPolicy::Ignore),
            _ => Err(anyhow!("invalid checksum policy: {:?}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryPolicy {
    pub enabled: bool,
    pub update_policy: UpdatePolicy,
    pub checksum_policy: ChecksumPolicy,
}
impl RepositoryPolicy {
    /// the policy for repositories given on the command line
    pub const ALWAYS_WARN: RepositoryPolicy = RepositoryPolicy {
        enabled: true,
        update_policy: UpdatePolicy::Always,
        checksum_policy: ChecksumPolicy::Warn,
    };
}
impl Default for RepositoryPolicy {
    fn default() -> Self {
        RepositoryPolicy {
            enabled: true,
            update_policy: UpdatePolicy::Daily,
            checksum_policy: ChecksumPolicy::Warn,
        }
    }
}

/// A remote repository as seen by the resolvers: where it is, how its paths are laid out, and
///  how cached files from it are treated.
#[derive(Clone)]
pub struct ArtifactRepository {
    pub id: String,
    pub url: String,
    pub layout: Arc<dyn RepositoryLayout>,
    pub releases: RepositoryPolicy,
    pub snapshots: RepositoryPolicy,
}
impl ArtifactRepository {
    pub fn policy_for(&self, version: &MavenVersion) -> &RepositoryPolicy {
        if version.is_snapshot() {
            &self.snapshots
        }
        else {
            &self.releases
        }
    }

    /// base URL with trailing '/'
    pub fn base_url(&self) -> String {
        let mut result = self.url.clone();
        if !result.ends_with('/') {
            result.push('/');
        }
        result
    }
}

impl PartialEq for ArtifactRepository {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.url == other.url
            && self.layout.id() == other.layout.id()
            && self.releases == other.releases
            && self.snapshots == other.snapshots
    }
}

impl Debug for ArtifactRepository {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.url, self.layout.id())
    }
}
