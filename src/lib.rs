//! # bioknowledge
//!
//! Space Biology Knowledge Engine - Research Discovery Microservice
//!
//! ## Modules
//!
//! - [`journal`] - Journal CSV source adapter
//! - [`osdr`] - NASA OSDR source adapter and relay client
//! - [`merge`] - Dataset merger
//! - [`filter`] - Filter/search engine
//! - [`engine`] - Session state and incremental reveal controller
//! - [`relay`] - CORS proxy relay for the OSDR REST API
//! - [`details`] - Single-study metadata and file listing
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bioknowledge::{engine::EngineState, journal};
//!
//! fn main() -> anyhow::Result<()> {
//!     let records = journal::load_file(std::path::Path::new("data/journals.csv"))?;
//!     let mut state = EngineState::new();
//!     state.load_batch(records);
//!     state.set_query("microgravity");
//!     println!("{} results", state.total_results());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod debounce;
pub mod details;
pub mod engine;
pub mod error;
pub mod filter;
pub mod journal;
pub mod merge;
pub mod osdr;
pub mod record;
pub mod relay;

pub use error::{EngineError, Result};
