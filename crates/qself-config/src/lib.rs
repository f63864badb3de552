pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{default_scheduler_config, Config, GoodreadsConfig, SchedulerConfig, TwitterConfig};
pub use credentials::CredentialStore;
pub use paths::{base_path_override, PathManager};
