use std::collections::HashMap;

/// What the artifact handler registry knows about an artifact type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandler {
    pub artifact_type: String,
    pub extension: String,
    /// the classifier implied by the type, e.g. "tests" for "test-jar"
    pub classifier: Option<String>,
}

/// Maps artifact type names (e.g. "jar", "maven-plugin") to file extensions. Lookups never fail:
///  unknown types get a handler whose extension is the type name itself.
pub trait ArtifactHandlerManager: Send + Sync {
    fn handler_for(&self, artifact_type: &str) -> ArtifactHandler;
}

pub struct DefaultArtifactHandlers {
    handlers: HashMap<String, ArtifactHandler>,
}
impl DefaultArtifactHandlers {
    pub fn new() -> DefaultArtifactHandlers {
        let mut handlers = HashMap::new();
        for (artifact_type, extension, classifier) in [
            ("pom", "pom", None),
            ("jar", "jar", None),
            ("test-jar", "jar", Some("tests")),
            ("maven-plugin", "jar", None),
            ("ejb", "jar", None),
            ("ejb-client", "jar", Some("client")),
            ("war", "war", None),
            ("ear", "ear", None),
            ("rar", "rar", None),
            ("par", "par", None),
            ("java-source", "jar", Some("sources")),
            ("javadoc", "jar", Some("javadoc")),
            ("bundle", "jar", None),
        ] {
            handlers.insert(artifact_type.to_string(), ArtifactHandler {
                artifact_type: artifact_type.to_string(),
                extension: extension.to_string(),
                classifier: classifier.map(str::to_string),
            });
        }

        DefaultArtifactHandlers { handlers }
    }

    pub fn register(&mut self, handler: ArtifactHandler) {
        self.handlers.insert(handler.artifact_type.clone(), handler);
    }
}
impl Default for DefaultArtifactHandlers {
    fn default() -> Self {
        DefaultArtifactHandlers::new()
    }
}

impl ArtifactHandlerManager for DefaultArtifactHandlers {
    fn handler_for(&self, artifact_type: &str) -> ArtifactHandler {
        self.handlers.get(artifact_type)
            .cloned()
            .unwrap_or_else(|| ArtifactHandler {
                artifact_type: artifact_type.to_string(),
                extension: artifact_type.to_string(),
                classifier: None,
            })
    }
}
