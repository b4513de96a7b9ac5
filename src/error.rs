/// Fatal conditions that callers may want to tell apart.
///
/// Everything else (unreadable files, I/O failures while training) travels as
/// a plain `anyhow::Error` with context attached where it happened.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("empty vocabulary; check the input file or try a smaller --min-count value")]
    EmptyVocabulary,

    #[error("encountered NaN")]
    Numeric,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid matrix data: {0}")]
    MatrixShape(String),
}
