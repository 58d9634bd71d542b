//! tabula-core - document model, storage and the spreadsheet template engine.

pub mod document;
pub mod error;
pub mod storage;
pub mod template;

pub use document::{Cell, DocumentStore, Sheet, Workbook};
pub use error::{Result, TabulaError};
pub use template::{Template, TemplateOptions, write_results};

pub use tabula_engine::engine::{CellRef, MergeRange, Value};
