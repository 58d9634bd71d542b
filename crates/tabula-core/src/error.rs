//! Error types for Tabula core.

use thiserror::Error;

use tabula_engine::engine::EvalError;

/// Errors that can occur while loading, rendering or saving a workbook.
#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Sheet {sheet}, row {row}: {message}")]
    Structural {
        sheet: String,
        row: usize,
        message: String,
    },

    #[error("Sheet {sheet}: unbalanced blocks, `{marker}` opened at row {row} is never closed")]
    Unbalanced {
        sheet: String,
        row: usize,
        marker: String,
    },

    #[error("Sheet {sheet}, cell {cell}: {source}")]
    Expression {
        sheet: String,
        cell: String,
        #[source]
        source: EvalError,
    },

    #[error("Sheet {sheet}, template row {row}: {source}")]
    Render {
        sheet: String,
        row: usize,
        #[source]
        source: EvalError,
    },

    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("CSV file is empty")]
    EmptyCsv,
}

impl TabulaError {
    /// The engine error behind a render or expression failure, if any.
    pub fn eval_error(&self) -> Option<&EvalError> {
        match self {
            TabulaError::Expression { source, .. } | TabulaError::Render { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TabulaError>;
