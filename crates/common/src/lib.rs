//! Common utilities and shared types for pickup.
//!
//! This crate provides foundational components used across all pickup crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers and invite codes via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use pickup_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
