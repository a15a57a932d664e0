pub mod config;
pub mod error;
pub mod models;

pub use config::{PipelineConfig, ResolveOptions, ResolverConfig, ValidatorsConfig};
pub use error::{CoreError, Result};
pub use models::*;
