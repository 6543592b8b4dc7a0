mod application;
pub mod data;
mod runtime_config;
mod state_store;

pub use application::{Application, ApplicationError};
pub use runtime_config::{RuntimeConfig, SeedSource};
pub use state_store::{StateStore, StateStoreError};
