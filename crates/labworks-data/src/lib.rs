//! Loading lab manager configuration from RON, TOML or JSON data files.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, load_lab_config, load_lab_config_file};
