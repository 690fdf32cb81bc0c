//! Error types for the SCSS compiler

use crate::types::SourcePosition;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {file} at line {line}, column {column}: {message}")]
    Parse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Compile error in {file} at line {line}, column {column}: {message}")]
    Compile {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Import error: {message}")]
    Import { message: String },

    #[error("Maximum limit exceeded: {limit_type} (limit: {limit})")]
    LimitExceeded { limit_type: String, limit: usize },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn parse(position: &SourcePosition, message: impl Into<String>) -> Self {
        Self::Parse {
            file: position.uri.clone(),
            line: position.line,
            column: position.column,
            message: message.into(),
        }
    }

    pub fn compile(position: &SourcePosition, message: impl Into<String>) -> Self {
        Self::Compile {
            file: position.uri.clone(),
            line: position.line,
            column: position.column,
            message: message.into(),
        }
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::Import {
            message: message.into(),
        }
    }

    pub fn limit(limit_type: impl Into<String>, limit: usize) -> Self {
        Self::LimitExceeded {
            limit_type: limit_type.into(),
            limit,
        }
    }

    /// Source position carried by the error, if any
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Self::Parse { file, line, column, .. } | Self::Compile { file, line, column, .. } => {
                Some(SourcePosition::new(file.clone(), *line, *column))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_position() {
        let pos = SourcePosition::new("a.scss", 4, 2);
        let err = CompilerError::compile(&pos, "Incompatible units: 'px' and 'em'");
        assert_eq!(
            err.to_string(),
            "Compile error in a.scss at line 4, column 2: Incompatible units: 'px' and 'em'"
        );
        assert_eq!(err.position(), Some(pos));
        assert!(CompilerError::import("missing").position().is_none());
    }
}
