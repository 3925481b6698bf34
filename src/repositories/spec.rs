use lazy_static::lazy_static;
use regex::Regex;

use crate::error::GetError;
use crate::maven::paths::RepositoryLayouts;
use crate::maven::repository::{ArtifactRepository, RepositoryPolicy};

pub const TEMP_REPOSITORY_ID: &str = "temp";
pub const DEFAULT_LAYOUT: &str = "default";

lazy_static! {
    static ref REPO_SYNTAX_REGEX: Regex = Regex::new(r"^(.+)::(.*)::(.+)$").unwrap();
}

/// Parses a single repository spec, either `id::[layout]::url` or a plain URL. The policy is
///  applied to both releases and snapshots.
///
/// Whitespace around the fields of the extended form is trimmed; a plain URL is taken verbatim.
pub fn parse_repository(spec: &str, policy: RepositoryPolicy, layouts: &RepositoryLayouts) -> Result<ArtifactRepository, GetError> {
    let (id, url, layout_key) = if spec.contains("::") {
        let captures = REPO_SYNTAX_REGEX.captures(spec)
            .ok_or_else(|| GetError::BadRepoSyntax { spec: spec.to_string() })?;

        let layout_key = captures.get(2).map_or("", |m| m.as_str()).trim();
        (
            captures[1].trim().to_string(),
            captures[3].trim().to_string(),
            if layout_key.is_empty() { None } else { Some(layout_key) },
        )
    }
    else {
        (TEMP_REPOSITORY_ID.to_string(), spec.to_string(), None)
    };

    let layout_key = layout_key.unwrap_or(DEFAULT_LAYOUT);
    let layout = layouts.layout_for(layout_key)
        .ok_or_else(|| GetError::UnknownLayout { key: layout_key.to_string() })?;

    Ok(ArtifactRepository {
        id,
        url,
        layout,
        releases: policy,
        snapshots: policy,
    })
}
