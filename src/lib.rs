pub mod apis;
pub mod brand;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod quota;
pub mod reconcile;
pub mod storage;
pub mod types;
