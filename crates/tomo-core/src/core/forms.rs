//! Form declarations of the RELION tomography protocols.
//!
//! Every protocol exposes its options as a [`FormSchema`]. Options shared by all the
//! protocols that consume RELION particles are declared once in
//! [`common_input_params`] and embedded by each protocol, and every protocol ends with
//! its own [`parallel_section`] defaults.

use super::constants::{ANGULAR_SAMPLING_LIST, symmetry_table};
use super::params::{FormSchema, FormSection, ParamKind, ParamSpec, ParamValue};

/// Parameter names, shared by the form declarations and the typed configurations.
pub mod names {
    pub const NUMBER_OF_THREADS: &str = "number_of_threads";
    pub const NUMBER_OF_MPI: &str = "number_of_mpi";

    pub const IN_RE_PARTICLES: &str = "in_re_particles";

    pub const INPUT_PSEUDO_SUBTOMOS_PROT: &str = "input_pseudo_subtomos_prot";
    pub const DO_CTF: &str = "do_ctf";
    pub const IGNORE_CTF_UNTIL_FIRST_PEAK: &str = "ignore_ctf_until_first_peak";
    pub const CTF_PHASE_FLIPPED: &str = "ctf_phase_flipped";
    pub const PAD_CTF: &str = "pad_ctf";
    pub const CTF_UNCORRECTED_REF: &str = "ctf_uncorrected_ref";
    pub const MAX_NUMBER_OF_ITERATIONS: &str = "max_number_of_iterations";
    pub const NUMBER_OF_CLASSES: &str = "number_of_classes";
    pub const MASK_DIAMETER: &str = "mask_diameter";
    pub const ZERO_MASK: &str = "zero_mask";
    pub const GRAD_BASED_OPT: &str = "grad_based_opt";
    pub const GRAD_WRITE_ITER: &str = "grad_write_iter";
    pub const NO_INIT_BLOBS: &str = "no_init_blobs";
    pub const FLATTEN_SOLVENT: &str = "flatten_solvent";
    pub const SYMMETRY: &str = "symmetry";
    pub const ANGULAR_SAMPLING_DEG: &str = "angular_sampling_deg";
    pub const OFFSET_SEARCH_RANGE_PIX: &str = "offset_search_range_pix";
    pub const OFFSET_SEARCH_STEP_PIX: &str = "offset_search_step_pix";
    pub const NO_PARALLEL_DISC_IO: &str = "no_parallel_disc_io";
    pub const POOLED_SUBTOMOS: &str = "pooled_subtomos";
    pub const ALL_PARTICLES_RAM: &str = "all_particles_ram";
    pub const COMBINE_ITERS_DISC: &str = "combine_iters_disc";
    pub const SCRATCH_DIR: &str = "scratch_dir";
    pub const DO_GPU: &str = "do_gpu";
    pub const GPUS_TO_USE: &str = "gpus_to_use";
    pub const KEEP_ONLY_LAST_ITER_FILES: &str = "keep_only_last_iter_files";
    pub const OVERSAMPLING: &str = "oversampling";
    pub const EXTRA_PARAMS: &str = "extra_params";

    pub const TOMO_ID: &str = "tomo_id";
    pub const BIN_FACTOR: &str = "bin_factor";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const THICKNESS: &str = "thickness";
}

use names::*;

pub const DE_NOVO_PROTOCOL: &str = "ProtRelionDeNovoInitialModel";
pub const RECONSTRUCT_PROTOCOL: &str = "ProtRelionTomoReconstruct";

/// Sentinel for shape overrides meaning "derive from the source tilt series".
pub const DERIVE_FROM_SOURCE: i64 = -1;

/// Options shared by every protocol that consumes a RELION pseudo-subtomogram set.
pub fn common_input_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::new(
            IN_RE_PARTICLES,
            ParamKind::Pointer {
                class: "RelionSetOfPseudoSubtomograms",
            },
            "Input pseudo-subtomograms",
        )
        .required()
        .important(),
    ]
}

pub fn parallel_section(threads: i64, mpi: i64) -> FormSection {
    FormSection::new(
        "Parallelization",
        vec![
            ParamSpec::integer(NUMBER_OF_THREADS, "Threads", threads),
            ParamSpec::integer(NUMBER_OF_MPI, "MPI processes", mpi),
        ],
    )
}

pub fn de_novo_form() -> FormSchema {
    let input = FormSection::new(
        "Input",
        vec![
            ParamSpec::new(
                INPUT_PSEUDO_SUBTOMOS_PROT,
                ParamKind::Pointer {
                    class: "ProtRelionMakePseudoSubtomograms",
                },
                "Data preparation protocol",
            )
            .required()
            .important(),
        ],
    );

    let ctf = FormSection::new(
        "CTF",
        vec![
            ParamSpec::boolean(DO_CTF, "Do CTF-correction?", true).help(
                "If set to Yes, CTFs will be corrected inside the MAP refinement. The resulting \
                 algorithm intrinsically implements the optimal linear, or Wiener filter. Note \
                 that input particles should contain CTF parameters.",
            ),
            ParamSpec::boolean(IGNORE_CTF_UNTIL_FIRST_PEAK, "Ignore CTFs until first peak?", false)
                .help(
                    "If set to Yes, then CTF-amplitude correction will only be performed from \
                     the first peak of each CTF onward. This can be useful if the CTF model is \
                     inadequate at the lowest resolution.",
                ),
            ParamSpec::boolean(CTF_PHASE_FLIPPED, "Has the data been CTF phase-flipped?", false)
                .advanced(),
            ParamSpec::boolean(
                PAD_CTF,
                "Perform CTF padding to treat CTF aliaising better?",
                false,
            )
            .advanced(),
            ParamSpec::boolean(
                CTF_UNCORRECTED_REF,
                "Have the input references not been CTF-amplitude corrected?",
                false,
            )
            .advanced(),
        ],
    );

    let optimisation = FormSection::new(
        "Optimisation",
        vec![
            ParamSpec::integer(MAX_NUMBER_OF_ITERATIONS, "Number of iterations", 25)
                .help("Maximum number of iterations to be performed."),
            ParamSpec::integer(NUMBER_OF_CLASSES, "Number of classes to be defined.", 1),
            ParamSpec::new(MASK_DIAMETER, ParamKind::Integer, "Circular mask diameter (Å)")
                .required()
                .help(
                    "Diameter of the circular mask that will be applied to the experimental \
                     images (in Angstroms)",
                ),
            ParamSpec::boolean(ZERO_MASK, "Mask surrounding background in particles to zero?", false)
                .required()
                .advanced(),
            ParamSpec::boolean(GRAD_BASED_OPT, "Perform gradient based optimisation", false)
                .advanced()
                .help(
                    "Perform gradient based optimisation (instead of default \
                     expectation-maximization). Forces a single MPI process.",
                ),
            ParamSpec::integer(GRAD_WRITE_ITER, "Write out model every number of iterations", 10)
                .advanced()
                .help("Write out model every so many iterations during gradient refinement"),
            ParamSpec::boolean(
                NO_INIT_BLOBS,
                "Switch off initializing models with random Gaussians?",
                false,
            )
            .advanced(),
            ParamSpec::boolean(FLATTEN_SOLVENT, "Flatten and enforce non-negative solvent?", false),
            ParamSpec::string(SYMMETRY, "Symmetry group", "C1").help(format!(
                "Symmetry libraries have been copied from XMIPP. Possible values [notation label]:\n{}",
                symmetry_table()
            )),
            ParamSpec::new(
                ANGULAR_SAMPLING_DEG,
                ParamKind::Enum {
                    choices: ANGULAR_SAMPLING_LIST,
                },
                "Angular sampling interval (deg)",
            )
            .default(ParamValue::Int(2))
            .help(
                "There are only a few discrete angular samplings possible because the HealPix \
                 library generates the sampling of the first two Euler angles on the sphere.",
            ),
            ParamSpec::integer(OFFSET_SEARCH_RANGE_PIX, "Offset search range (pix.)", 6).help(
                "Probabilities will be calculated only for translations in a circle with this \
                 radius (in pixels).",
            ),
            ParamSpec::integer(OFFSET_SEARCH_STEP_PIX, "Offset search step (pix.)", 2)
                .help("Translations will be sampled with this step-size (in pixels)."),
        ],
    );

    let compute = FormSection::new(
        "Compute",
        vec![
            ParamSpec::boolean(
                NO_PARALLEL_DISC_IO,
                "Do not let MPI processes access the disc simultaneously",
                false,
            )
            .help("Use this option with NFS."),
            ParamSpec::integer(POOLED_SUBTOMOS, "Number of pooled particles", 1)
                .help("Number of images to pool for each thread task."),
            ParamSpec::boolean(ALL_PARTICLES_RAM, "Pre-read all particles into RAM?", false),
            ParamSpec::boolean(COMBINE_ITERS_DISC, "Combine iterations through disc?", false).help(
                "If set to No, the large arrays of summed weights will be sent through the MPI \
                 network instead of writing large files to disc.",
            ),
            ParamSpec::new(SCRATCH_DIR, ParamKind::Path, "Copy particles to scratch directory")
                .help(
                    "If provided, particle stacks will be copied to this local scratch disk \
                     prior to refinement.",
                ),
            ParamSpec::boolean(DO_GPU, "Use GPU acceleration?", false),
            ParamSpec::string(GPUS_TO_USE, "GPUs to use:", "0")
                .only_if(DO_GPU)
                .help(
                    "MPI-processes are separated by ':', threads by ','. \
                     For example: '0,0:1,1:0,0:1,1'",
                ),
        ],
    );

    let additional = FormSection::new(
        "Additional",
        vec![
            ParamSpec::boolean(
                KEEP_ONLY_LAST_ITER_FILES,
                "Keep only files from last iteration?",
                false,
            )
            .advanced(),
            ParamSpec::integer(OVERSAMPLING, "Over-sampling", 1)
                .advanced()
                .help("Adaptive oversampling order (0=no oversampling, 1=2x, 2=4x, etc)"),
            ParamSpec::new(EXTRA_PARAMS, ParamKind::String, "Additional arguments").help(
                "Command-line arguments that are not generated by the form, \
                 e.g. '--verb 1 --pad 2'.",
            ),
        ],
    );

    FormSchema {
        protocol: DE_NOVO_PROTOCOL,
        label: "Generate a de novo 3D initial model from the pseudo-subtomograms",
        sections: vec![
            input,
            ctf,
            optimisation,
            compute,
            additional,
            parallel_section(1, 1),
        ],
    }
}

pub fn reconstruct_form() -> FormSchema {
    let shape_group = "Tomogram shape (pix.)";
    let mut input = common_input_params();
    input.extend([
        ParamSpec::new(TOMO_ID, ParamKind::String, "Tomogram to be reconstructed").required(),
        ParamSpec::float(BIN_FACTOR, "Binning factor", 8.0).help(
            "The binning will be applied concerning the size of the tomograms used for the picking.",
        ),
        ParamSpec::integer(WIDTH, "Width", DERIVE_FROM_SOURCE)
            .in_group(shape_group)
            .help("If -1, the width of the original tilt series after binning is used."),
        ParamSpec::integer(HEIGHT, "Height", DERIVE_FROM_SOURCE)
            .in_group(shape_group)
            .help("If -1, the height of the original tilt series after binning is used."),
        ParamSpec::integer(THICKNESS, "Thickness", DERIVE_FROM_SOURCE)
            .in_group(shape_group)
            .help("If -1, the thickness of the original tilt series after binning is used."),
    ]);

    FormSchema {
        protocol: RECONSTRUCT_PROTOCOL,
        label: "Reconstruct tomogram",
        sections: vec![FormSection::new("Input", input), parallel_section(4, 0)],
    }
}
