//! Workbook persistence: the .grid text format, CSV and markdown export.

mod csv;
mod md;
mod parser;
mod writer;

pub use csv::{csv_content, parse_csv_content, write_csv};
pub use md::{markdown_content, write_markdown};
pub use parser::parse_grid_content;
pub use writer::{write_grid, write_grid_content};
