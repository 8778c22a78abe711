use courtside_core::{
    ConfigError, HttpError, IngestError, PipelineError, ValidationError, WarehouseError,
};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] HttpError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<PipelineError> for CliError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Ingest(error) => Self::Ingest(error),
            PipelineError::Warehouse(error) => Self::Warehouse(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::Ingest(IngestError::Schema { .. }) => 4,
            Self::Ingest(IngestError::Warehouse(_)) | Self::Warehouse(_) => 5,
            Self::Ingest(_) | Self::Http(_) => 3,
            Self::Serialization(_) => 6,
            Self::Io(_) => 10,
        }
    }
}
