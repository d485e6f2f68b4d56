// Library exports for graphcomp

pub mod aggregate;
pub mod binding;
pub mod color;
pub mod columns;
pub mod config;
pub mod csv_reader;
pub mod editor;
pub mod error;
pub mod format;
pub mod graph;
pub mod palette;
pub mod render;
pub mod scale;
pub mod series;
pub mod value;

pub use error::{GraphError, Result};
