use std::fmt::{Display, Formatter};

use crate::error::GetError;

pub const DEFAULT_TYPE: &str = "jar";

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct MavenGroupId(pub String);

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct MavenArtifactId(pub String);

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct MavenVersion(pub String);
impl MavenVersion {
    pub fn is_snapshot(&self) -> bool {
        self.0.ends_with("-SNAPSHOT")
    }
}

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct MavenCoordinates {
    pub group_id: MavenGroupId,
    pub artifact_id: MavenArtifactId,
    pub version: MavenVersion,
}

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum MavenClassifier {
    Unclassified,
    Classified(String),
}
impl MavenClassifier {
    /// empty strings count as 'no classifier'
    pub fn from_option(classifier: Option<&str>) -> MavenClassifier {
        match classifier {
            Some(c) if !c.is_empty() => MavenClassifier::Classified(c.to_string()),
            _ => MavenClassifier::Unclassified,
        }
    }

    pub fn as_option(&self) -> Option<&str> {
        match self {
            MavenClassifier::Unclassified => None,
            MavenClassifier::Classified(c) => Some(c),
        }
    }
}

/// A coordinate that names an artifact by its *type* (e.g. "jar", "test-jar", "maven-plugin"). This
///  is what dependency resolution works with; the file extension is derived from the type by an
///  artifact handler.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct DependableCoordinate {
    pub coordinates: MavenCoordinates,
    pub artifact_type: String,
    pub classifier: MavenClassifier,
}

impl Display for DependableCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.coordinates.group_id.0, self.coordinates.artifact_id.0, self.artifact_type)?;
        if let MavenClassifier::Classified(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        write!(f, ":{}", self.coordinates.version.0)
    }
}

/// A coordinate that names a single file in a repository, i.e. with the file extension already
///  resolved (no leading '.', e.g. "jar")
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct MavenArtifactRef {
    pub coordinates: MavenCoordinates,
    pub classifier: MavenClassifier,
    pub file_extension: String,
}

impl MavenArtifactRef {
    /// The POM that describes the same coordinates
    pub fn pom(coordinates: &MavenCoordinates) -> MavenArtifactRef {
        MavenArtifactRef {
            coordinates: coordinates.clone(),
            classifier: MavenClassifier::Unclassified,
            file_extension: "pom".to_string(),
        }
    }
}

impl Display for MavenArtifactRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.coordinates.group_id.0, self.coordinates.artifact_id.0, self.file_extension)?;
        if let MavenClassifier::Classified(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        write!(f, ":{}", self.coordinates.version.0)
    }
}

/// The operator's view of a coordinate: either a `groupId:artifactId:version[:type[:classifier]]`
///  string, or the individual fields. If `artifact` is set, the individual fields are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordinateArgs {
    pub artifact: Option<String>,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub packaging: Option<String>,
}

impl CoordinateArgs {
    pub fn to_coordinate(&self) -> Result<DependableCoordinate, GetError> {
        if self.artifact.is_none() && self.artifact_id.is_none() {
            return Err(GetError::bad_usage(
                "You must specify an artifact, e.g. --artifact org.apache.maven.plugins:maven-downloader-plugin:1.0"
            ));
        }

        match &self.artifact {
            Some(artifact) => parse_artifact_string(artifact),
            None => Ok(DependableCoordinate {
                coordinates: MavenCoordinates {
                    group_id: MavenGroupId(required_field("groupId", &self.group_id)?),
                    artifact_id: MavenArtifactId(required_field("artifactId", &self.artifact_id)?),
                    version: MavenVersion(required_field("version", &self.version)?),
                },
                artifact_type: match self.packaging.as_deref() {
                    Some(p) if !p.is_empty() => p.to_string(),
                    _ => DEFAULT_TYPE.to_string(),
                },
                classifier: MavenClassifier::from_option(self.classifier.as_deref()),
            }),
        }
    }
}

fn required_field(name: &str, value: &Option<String>) -> Result<String, GetError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(GetError::bad_usage(format!("You must specify the {} of the artifact", name))),
    }
}

/// `groupId:artifactId:version[:type[:classifier]]`. Empty tokens are dropped before the tokens
///  are counted, so `g::a:1.0` is `g:a:1.0` and `g:a:1.0::sources` has the type `sources`.
pub fn parse_artifact_string(artifact: &str) -> Result<DependableCoordinate, GetError> {
    let tokens = artifact.split(':')
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();
    if tokens.len() < 3 || tokens.len() > 5 {
        return Err(GetError::bad_usage(format!(
            "Invalid artifact, you must specify groupId:artifactId:version[:packaging[:classifier]] {}",
            artifact,
        )));
    }

    let artifact_type = tokens.get(3)
        .map(|t| t.to_string())
        .unwrap_or_else(|| DEFAULT_TYPE.to_string());

    Ok(DependableCoordinate {
        coordinates: MavenCoordinates {
            group_id: MavenGroupId(tokens[0].to_string()),
            artifact_id: MavenArtifactId(tokens[1].to_string()),
            version: MavenVersion(tokens[2].to_string()),
        },
        artifact_type,
        classifier: MavenClassifier::from_option(tokens.get(4).copied()),
    })
}
