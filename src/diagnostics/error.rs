use thiserror::Error;

/// Errors raised while translating toolchain output
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("parse line go build error {text}: {source}")]
    InvalidLine {
        text: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("parse column go build error {text}: {source}")]
    InvalidColumn {
        text: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("invalid diagnostic pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, TranslateError>;
