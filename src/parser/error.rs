use thiserror::Error;

use crate::core::Position;

/// Parser-specific errors
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to set language: {0}")]
    LanguageSetupFailed(String),

    #[error("{file}: failed to parse source code")]
    ParseFailed { file: String },

    #[error("{file}:{position}: {message}")]
    SyntaxError {
        file: String,
        position: Position,
        message: String,
    },
}

impl ParseError {
    pub fn syntax(file: impl Into<String>, position: Position, message: impl Into<String>) -> Self {
        ParseError::SyntaxError {
            file: file.into(),
            position,
            message: message.into(),
        }
    }

    /// Position of the error, when the parser got far enough to have one
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::SyntaxError { position, .. } => Some(*position),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
