mod config;
mod remote;
mod table;

pub use config::Config;
pub use remote::RemoteConfig;
pub use table::{ResourceConfig, ResourcesConfig, TableConfig};
