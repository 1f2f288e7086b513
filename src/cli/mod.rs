//! CLI module for toolmatrix
//!
//! This module provides:
//! - Command implementations (import, regenerate, harmony, hubs, etc.)
//! - Output handlers (console, JSON, quiet)
//!
//! # Example
//!
//! ```ignore
//! use toolmatrix::cli::{commands, output};
//!
//! let handler = output::create_handler(output::OutputMode::Console, false);
//! let exit_code = commands::regenerate(&mut catalog, &pruner, &*handler)?;
//! ```

pub mod commands;
pub mod output;

pub use commands::LinkRequest;
pub use output::{OutputEvent, OutputHandler, OutputMode, create_handler};
