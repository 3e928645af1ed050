//! drivetrain-core - Core library for Drivetrain
//!
//! Record store, provider adapters (Google Drive, OpenAI), the folder-to-index
//! sync reconciler, the assistant chat relay and the learning tracker.

pub mod artifacts;
pub mod db;
pub mod departments;
pub mod error;
pub mod models;
pub mod openai;
pub mod poll;
pub mod relay;
pub mod services;
pub mod source;
pub mod sync;
pub mod tracking;
pub mod util;

pub use error::{Error, Result};
