//! # Engine Module
//!
//! Turns resolved protocol parameters into external program invocations and handles
//! what those programs leave behind.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed protocol configurations and their builders
//! - **Command Lines** ([`command`]) - Ordered token sequences and program invocations
//! - **Command Builders** ([`builders`]) - Pure mapping from configurations to RELION arguments
//! - **Volume Headers** ([`header`]) - MRC header normalisation of produced volumes
//! - **Program Runner** ([`runner`]) - The seam through which RELION binaries are launched
//! - **Progress Monitoring** ([`progress`]) - Phase reporting for front-ends
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod builders;
pub mod command;
pub mod config;
pub mod error;
pub mod header;
pub mod progress;
pub mod runner;
