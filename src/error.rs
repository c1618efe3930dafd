use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no content found: {reason}")]
    NoContentFound { reason: String },

    #[error("content provider error while {context}: {source}")]
    Provider {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("tts backend `{backend}` failed for chunk {chunk}: {source}")]
    Synthesis {
        chunk: usize,
        backend: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("rendering chunk {chunk} failed: {source}")]
    Render {
        chunk: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("video assembly failed: {reason}")]
    Assembly { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn no_content(reason: impl Into<String>) -> Self {
        Self::NoContentFound {
            reason: reason.into(),
        }
    }

    pub fn provider(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Provider {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn assembly(reason: impl Into<String>) -> Self {
        Self::Assembly {
            reason: reason.into(),
        }
    }

    /// Recoverable by relaxing filters or retrying later.
    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContentFound { .. })
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
