//! # reliontomo Core Library
//!
//! Parameter schemas, command builders and output assembly for the RELION tomography
//! protocols. The numerical work (CTF correction, refinement, back-projection) is done
//! by the external RELION binaries; this library only prepares their arguments and
//! harvests what they write.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless declarations and data: the form schemas of
//!   every protocol, the domain objects exchanged with the host framework, shared
//!   constants and small path/geometry utilities.
//!
//! - **[`engine`]: The Logic Core.** Typed configurations, the pure command builders,
//!   MRC header normalisation and the [`engine::runner::ProgramRunner`] seam through
//!   which external programs are launched.
//!
//! - **[`workflows`]: The Public API.** One entry point per protocol that builds the
//!   command, invokes the runner and assembles the resulting output objects.

pub mod core;
pub mod engine;
pub mod workflows;
