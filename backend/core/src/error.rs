use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No addons found for {killer} (power {power})")]
    MissingAddons { killer: String, power: String },

    #[error("Segment {segment} has an unexpected shape: {source}")]
    Shape {
        segment: &'static str,
        source: serde_json::Error,
    },

    #[error("Catalog was already initialized")]
    AlreadyInitialized,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Could not parse {segment}: {source}")]
    Parse {
        segment: &'static str,
        source: serde_json::Error,
    },

    #[error("Request for {segment} failed: {source}")]
    Http {
        segment: &'static str,
        source: reqwest::Error,
    },

    #[error("{segment} could not be retrieved from any of these sources: {tried}")]
    Exhausted { segment: &'static str, tried: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Payload does not have the shape of a build at all. Usually a client bug.
    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Game data is not loaded yet, please try again later")]
    CatalogNotReady,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("You do not have the permissions to perform this action")]
    InsufficientRole,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error(
        "According to current configuration settings, you do not have permission to set the build for {channel_id}"
    )]
    Unauthorized { channel_id: String },

    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Game data is not loaded yet, please try again later")]
    CatalogNotReady,
}

impl From<BuildError> for MutationError {
    fn from(error: BuildError) -> Self {
        match error {
            BuildError::Malformed(message) => MutationError::Malformed(message),
            BuildError::Invalid(message) => MutationError::Invalid(message),
            BuildError::CatalogNotReady => MutationError::CatalogNotReady,
        }
    }
}
