pub mod backend;
pub mod config;
pub mod error;
pub mod state_format;

pub use backend::Backend;
pub use config::{ProviderConfig, TlsConfig};
pub use error::*;
pub use state_format::StateFormat;
