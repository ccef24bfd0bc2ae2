//! Pure mapping from protocol configurations to RELION command lines.
//!
//! Nothing here validates values: an out-of-range or nonsensical option is passed
//! through as given and reported by the RELION program itself. The only combination
//! handled here is gradient-based optimisation, which RELION refuses to run under MPI.

use super::command::{CommandLine, Invocation};
use super::config::{DeNovoConfig, ReconstructConfig};
use crate::core::models::RunDirectory;
use crate::core::utils::program::program_name;
use tracing::{debug, warn};

pub const REFINE_PROGRAM: &str = "relion_refine";
pub const RECONSTRUCT_TOMOGRAM_PROGRAM: &str = "relion_tomo_reconstruct_tomogram";

/// Number of MPI processes the de novo model is generated with.
pub fn de_novo_mpi(config: &DeNovoConfig) -> usize {
    if config.optimisation.grad_based_opt {
        1
    } else {
        config.parallel.mpi
    }
}

pub fn de_novo_command(config: &DeNovoConfig, run_dir: &RunDirectory) -> CommandLine {
    let ctf = &config.ctf;
    let opt = &config.optimisation;
    let compute = &config.compute;
    let additional = &config.additional;

    let mut cmd = CommandLine::new();
    cmd.arg("--i", config.input.particles_star().display())
        .arg("--o", run_dir.extra_dir().display())
        .flag("--denovo_3dref")
        .arg("--j", config.parallel.threads);

    cmd.flag_if(ctf.do_ctf, "--ctf")
        .flag_if(ctf.ignore_until_first_peak, "--ctf_intact_first_peak")
        .flag_if(ctf.phase_flipped, "--ctf_phase_flipped")
        .flag_if(ctf.pad_ctf, "--pad_ctf")
        .flag_if(ctf.uncorrected_ref, "--ctf_uncorrected_ref");

    cmd.arg("--iter", opt.max_iterations)
        .arg("--K", opt.number_of_classes)
        .arg("--particle_diameter", opt.mask_diameter)
        .flag_if(opt.zero_mask, "--zero_mask")
        .flag_if(opt.flatten_solvent, "--flatten_solvent")
        .flag_if(opt.grad_based_opt, "--grad");
    // Written whenever set, independently of --grad.
    if opt.grad_write_iter != 0 {
        cmd.arg("--grad_write_iter", opt.grad_write_iter);
    }
    cmd.flag_if(opt.no_init_blobs, "--no_init_blobs")
        .arg("--sym", &opt.symmetry)
        .arg("--healpix_order", opt.healpix_order)
        .arg("--offset_step", opt.offset_step)
        .arg("--offset_range", opt.offset_range);

    cmd.flag_if(compute.no_parallel_disc_io, "--no_parallel_disc_io")
        .arg("--pool", compute.pooled_subtomos)
        .flag_if(compute.all_particles_ram, "--preread_images")
        .flag_if(!compute.combine_iters_disc, "--dont_combine_weights_via_disc");
    if let Some(scratch) = &compute.scratch_dir {
        cmd.arg("--scratch_dir", scratch.display());
    }
    if compute.do_gpu {
        cmd.arg("--gpu", &compute.gpus_to_use);
    }

    cmd.arg("--oversampling", additional.oversampling);
    if let Some(extra) = &additional.extra_params {
        cmd.raw(extra);
    }
    cmd
}

pub fn de_novo_invocation(config: &DeNovoConfig, run_dir: &RunDirectory) -> Invocation {
    let mpi = de_novo_mpi(config);
    if mpi != config.parallel.mpi {
        warn!(
            "Gradient based optimisation cannot run with MPI; using 1 process instead of {}.",
            config.parallel.mpi
        );
    }
    let invocation = Invocation {
        program: program_name(REFINE_PROGRAM, mpi),
        args: de_novo_command(config, run_dir),
        mpi,
    };
    debug!("De novo command: {}", invocation);
    invocation
}

pub fn reconstruct_command(config: &ReconstructConfig, run_dir: &RunDirectory) -> CommandLine {
    let mut cmd = CommandLine::new();
    cmd.arg("--t", config.common.particles.tomograms().display())
        .arg("--tn", &config.tomo_id)
        .arg(
            "--o",
            run_dir.extra_path(&config.output_file_name()).display(),
        )
        .arg("--bin", format!("{:.1}", config.bin_factor))
        .arg("--w", config.shape.width)
        .arg("--h", config.shape.height)
        .arg("--d", config.shape.thickness)
        .arg("--j", config.parallel.threads);
    cmd
}

pub fn reconstruct_invocation(config: &ReconstructConfig, run_dir: &RunDirectory) -> Invocation {
    let invocation = Invocation {
        program: RECONSTRUCT_TOMOGRAM_PROGRAM.to_string(),
        args: reconstruct_command(config, run_dir),
        mpi: 1,
    };
    debug!("Reconstruction command: {}", invocation);
    invocation
}
