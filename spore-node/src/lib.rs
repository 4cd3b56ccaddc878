pub mod cli;
pub mod config;
pub mod dispatch;
pub mod runtime;
pub mod setup;

pub use config::Config;
pub use dispatch::Node;
pub use runtime::builder::NodeRuntime;
