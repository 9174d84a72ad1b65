pub mod config;
pub mod error;

pub use config::{
    load_dotenv, ArtifactConfig, AuthPreference, Config, MemoryConfig, RouterConfig,
};
pub use error::ConfigError;
