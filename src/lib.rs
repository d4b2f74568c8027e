// Library surface for the terminal front-end and integration tests.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod courses;
pub mod discovery;
pub mod error;
pub mod export;
pub mod geo;
pub mod manual;
pub mod route;
pub mod runtime;
pub mod session;
pub mod store;
pub mod summary;
pub mod tracker;

pub use error::{Result, TrackerError};
