//! # Workflows Module
//!
//! Top-level entry points, one per protocol. Each workflow builds the RELION command
//! from its configuration, launches it through the injected
//! [`ProgramRunner`](crate::engine::runner::ProgramRunner) and assembles the objects
//! the run produced.
//!
//! - **De Novo Initial Model** ([`de_novo`]) - `relion_refine --denovo_3dref` over pseudo-subtomograms
//! - **Tomogram Reconstruction** ([`reconstruct`]) - Single-tomogram reconstruction and its output object

pub mod de_novo;
pub mod reconstruct;
