pub mod chunk_map;
pub mod config;
pub mod doctor;
pub mod engine;
pub mod error;
pub mod growth;
pub mod io;
pub mod paths;
pub mod prompt;
pub mod provider;
pub mod skeleton;
pub mod state;
pub mod types;

pub use error::{PrdError, Result};
