use thiserror::Error;

use crate::version::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("No project identifiers given")]
    Empty,

    #[error("Line {line}: {value:?} is not a valid project id, slug or URL")]
    InvalidIdentifier { line: usize, value: String },
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Version store error: {0}")]
    Store(#[from] StoreError),
}
