use crate::core::forms::{DERIVE_FROM_SOURCE, names::*};
use crate::core::models::{DataPreparation, PseudoSubtomogramSet, RunDirectory};
use crate::core::params::{ParamError, ParamValues};
use crate::core::utils::paths::resolve_star_relative;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("Parameter '{name}' must not be negative, got {value}")]
    Negative { name: &'static str, value: i64 },

    #[error("Cannot resolve object reference '{reference}': {reason}")]
    Reference { reference: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    pub threads: usize,
    pub mpi: usize,
}

impl ParallelConfig {
    fn from_params(values: &ParamValues) -> Result<Self, ConfigError> {
        Ok(Self {
            threads: non_negative(NUMBER_OF_THREADS, values.int(NUMBER_OF_THREADS)?)?,
            mpi: non_negative(NUMBER_OF_MPI, values.int(NUMBER_OF_MPI)?)?,
        })
    }
}

fn non_negative(name: &'static str, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::Negative { name, value })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtfConfig {
    pub do_ctf: bool,
    pub ignore_until_first_peak: bool,
    pub phase_flipped: bool,
    pub pad_ctf: bool,
    pub uncorrected_ref: bool,
}

impl Default for CtfConfig {
    fn default() -> Self {
        Self {
            do_ctf: true,
            ignore_until_first_peak: false,
            phase_flipped: false,
            pad_ctf: false,
            uncorrected_ref: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimisationConfig {
    pub max_iterations: i64,
    pub number_of_classes: i64,
    pub mask_diameter: i64,
    pub zero_mask: bool,
    pub grad_based_opt: bool,
    pub grad_write_iter: i64,
    pub no_init_blobs: bool,
    pub flatten_solvent: bool,
    pub symmetry: String,
    /// Index into the HEALPix angular sampling list.
    pub healpix_order: i64,
    pub offset_range: i64,
    pub offset_step: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeConfig {
    pub no_parallel_disc_io: bool,
    pub pooled_subtomos: i64,
    pub all_particles_ram: bool,
    pub combine_iters_disc: bool,
    pub scratch_dir: Option<PathBuf>,
    pub do_gpu: bool,
    /// Only used when `do_gpu` is set.
    pub gpus_to_use: String,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            no_parallel_disc_io: false,
            pooled_subtomos: 1,
            all_particles_ram: false,
            combine_iters_disc: false,
            scratch_dir: None,
            do_gpu: false,
            gpus_to_use: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalConfig {
    pub keep_only_last_iter_files: bool,
    pub oversampling: i64,
    pub extra_params: Option<String>,
}

impl Default for AdditionalConfig {
    fn default() -> Self {
        Self {
            keep_only_last_iter_files: false,
            oversampling: 1,
            extra_params: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeNovoConfig {
    pub input: DataPreparation,
    pub ctf: CtfConfig,
    pub optimisation: OptimisationConfig,
    pub compute: ComputeConfig,
    pub additional: AdditionalConfig,
    pub parallel: ParallelConfig,
}

impl DeNovoConfig {
    /// Builds the configuration from values already resolved against
    /// [`crate::core::forms::de_novo_form`].
    ///
    /// The data preparation reference is the run directory of that protocol.
    pub fn from_params(values: &ParamValues) -> Result<Self, ConfigError> {
        let input = DataPreparation::new(RunDirectory::new(
            values.text(INPUT_PSEUDO_SUBTOMOS_PROT)?,
        ));
        Ok(Self {
            input,
            ctf: CtfConfig {
                do_ctf: values.bool(DO_CTF)?,
                ignore_until_first_peak: values.bool(IGNORE_CTF_UNTIL_FIRST_PEAK)?,
                phase_flipped: values.bool(CTF_PHASE_FLIPPED)?,
                pad_ctf: values.bool(PAD_CTF)?,
                uncorrected_ref: values.bool(CTF_UNCORRECTED_REF)?,
            },
            optimisation: OptimisationConfig {
                max_iterations: values.int(MAX_NUMBER_OF_ITERATIONS)?,
                number_of_classes: values.int(NUMBER_OF_CLASSES)?,
                mask_diameter: values.int(MASK_DIAMETER)?,
                zero_mask: values.bool(ZERO_MASK)?,
                grad_based_opt: values.bool(GRAD_BASED_OPT)?,
                grad_write_iter: values.int(GRAD_WRITE_ITER)?,
                no_init_blobs: values.bool(NO_INIT_BLOBS)?,
                flatten_solvent: values.bool(FLATTEN_SOLVENT)?,
                symmetry: values.text(SYMMETRY)?.to_string(),
                healpix_order: values.int(ANGULAR_SAMPLING_DEG)?,
                offset_range: values.int(OFFSET_SEARCH_RANGE_PIX)?,
                offset_step: values.int(OFFSET_SEARCH_STEP_PIX)?,
            },
            compute: ComputeConfig {
                no_parallel_disc_io: values.bool(NO_PARALLEL_DISC_IO)?,
                pooled_subtomos: values.int(POOLED_SUBTOMOS)?,
                all_particles_ram: values.bool(ALL_PARTICLES_RAM)?,
                combine_iters_disc: values.bool(COMBINE_ITERS_DISC)?,
                scratch_dir: values.opt_text(SCRATCH_DIR)?.map(PathBuf::from),
                do_gpu: values.bool(DO_GPU)?,
                gpus_to_use: values.text(GPUS_TO_USE)?.to_string(),
            },
            additional: AdditionalConfig {
                keep_only_last_iter_files: values.bool(KEEP_ONLY_LAST_ITER_FILES)?,
                oversampling: values.int(OVERSAMPLING)?,
                extra_params: values.opt_text(EXTRA_PARAMS)?.map(str::to_string),
            },
            parallel: ParallelConfig::from_params(values)?,
        })
    }
}

#[derive(Default)]
pub struct DeNovoConfigBuilder {
    input: Option<DataPreparation>,
    ctf: Option<CtfConfig>,
    max_iterations: Option<i64>,
    number_of_classes: Option<i64>,
    mask_diameter: Option<i64>,
    zero_mask: Option<bool>,
    grad_based_opt: Option<bool>,
    grad_write_iter: Option<i64>,
    no_init_blobs: Option<bool>,
    flatten_solvent: Option<bool>,
    symmetry: Option<String>,
    healpix_order: Option<i64>,
    offset_range: Option<i64>,
    offset_step: Option<i64>,
    compute: Option<ComputeConfig>,
    additional: Option<AdditionalConfig>,
    threads: Option<usize>,
    mpi: Option<usize>,
}

impl DeNovoConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, prep: DataPreparation) -> Self {
        self.input = Some(prep);
        self
    }
    pub fn ctf(mut self, ctf: CtfConfig) -> Self {
        self.ctf = Some(ctf);
        self
    }
    pub fn max_iterations(mut self, iterations: i64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn number_of_classes(mut self, classes: i64) -> Self {
        self.number_of_classes = Some(classes);
        self
    }
    pub fn mask_diameter(mut self, diameter: i64) -> Self {
        self.mask_diameter = Some(diameter);
        self
    }
    pub fn zero_mask(mut self, enabled: bool) -> Self {
        self.zero_mask = Some(enabled);
        self
    }
    pub fn grad_based_opt(mut self, enabled: bool) -> Self {
        self.grad_based_opt = Some(enabled);
        self
    }
    pub fn grad_write_iter(mut self, every: i64) -> Self {
        self.grad_write_iter = Some(every);
        self
    }
    pub fn no_init_blobs(mut self, enabled: bool) -> Self {
        self.no_init_blobs = Some(enabled);
        self
    }
    pub fn flatten_solvent(mut self, enabled: bool) -> Self {
        self.flatten_solvent = Some(enabled);
        self
    }
    pub fn symmetry(mut self, group: impl Into<String>) -> Self {
        self.symmetry = Some(group.into());
        self
    }
    pub fn healpix_order(mut self, order: i64) -> Self {
        self.healpix_order = Some(order);
        self
    }
    pub fn offset_range(mut self, pixels: i64) -> Self {
        self.offset_range = Some(pixels);
        self
    }
    pub fn offset_step(mut self, pixels: i64) -> Self {
        self.offset_step = Some(pixels);
        self
    }
    pub fn compute(mut self, compute: ComputeConfig) -> Self {
        self.compute = Some(compute);
        self
    }
    pub fn additional(mut self, additional: AdditionalConfig) -> Self {
        self.additional = Some(additional);
        self
    }
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
    pub fn mpi(mut self, mpi: usize) -> Self {
        self.mpi = Some(mpi);
        self
    }

    pub fn build(self) -> Result<DeNovoConfig, ConfigError> {
        let optimisation = OptimisationConfig {
            max_iterations: self.max_iterations.unwrap_or(25),
            number_of_classes: self.number_of_classes.unwrap_or(1),
            mask_diameter: self
                .mask_diameter
                .ok_or(ConfigError::MissingParameter(MASK_DIAMETER))?,
            zero_mask: self.zero_mask.unwrap_or(false),
            grad_based_opt: self.grad_based_opt.unwrap_or(false),
            grad_write_iter: self.grad_write_iter.unwrap_or(10),
            no_init_blobs: self.no_init_blobs.unwrap_or(false),
            flatten_solvent: self.flatten_solvent.unwrap_or(false),
            symmetry: self.symmetry.unwrap_or_else(|| "C1".to_string()),
            healpix_order: self.healpix_order.unwrap_or(2),
            offset_range: self.offset_range.unwrap_or(6),
            offset_step: self.offset_step.unwrap_or(2),
        };
        Ok(DeNovoConfig {
            input: self
                .input
                .ok_or(ConfigError::MissingParameter(INPUT_PSEUDO_SUBTOMOS_PROT))?,
            ctf: self.ctf.unwrap_or_default(),
            optimisation,
            compute: self.compute.unwrap_or_default(),
            additional: self.additional.unwrap_or_default(),
            parallel: ParallelConfig {
                threads: self.threads.unwrap_or(1),
                mpi: self.mpi.unwrap_or(1),
            },
        })
    }
}

/// Options shared by every protocol that consumes a RELION pseudo-subtomogram set.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonInput {
    pub particles: PseudoSubtomogramSet,
}

impl CommonInput {
    /// Resolves the particle set reference, the path of a TOML manifest describing the set.
    pub fn from_params(values: &ParamValues) -> Result<Self, ConfigError> {
        let reference = values.text(IN_RE_PARTICLES)?;
        Ok(Self {
            particles: load_particle_set(Path::new(reference))?,
        })
    }
}

pub fn load_particle_set(path: &Path) -> Result<PseudoSubtomogramSet, ConfigError> {
    let reference_error = |reason: String| ConfigError::Reference {
        reference: path.display().to_string(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| reference_error(e.to_string()))?;
    let mut set: PseudoSubtomogramSet =
        toml::from_str(&content).map_err(|e| reference_error(e.to_string()))?;

    // Star files listed in the manifest are relative to the manifest itself.
    let base_dir = path.parent().unwrap_or(Path::new(""));
    set.particles_star = resolve_star_relative(base_dir, &set.particles_star);
    set.tomograms_star = resolve_star_relative(base_dir, &set.tomograms_star);
    Ok(set)
}

/// Output shape overrides in pixels; [`DERIVE_FROM_SOURCE`] keeps the binned tilt-series size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TomogramShape {
    pub width: i64,
    pub height: i64,
    pub thickness: i64,
}

impl Default for TomogramShape {
    fn default() -> Self {
        Self {
            width: DERIVE_FROM_SOURCE,
            height: DERIVE_FROM_SOURCE,
            thickness: DERIVE_FROM_SOURCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructConfig {
    pub common: CommonInput,
    pub tomo_id: String,
    pub bin_factor: f64,
    pub shape: TomogramShape,
    pub parallel: ParallelConfig,
}

impl ReconstructConfig {
    /// Builds the configuration from values already resolved against
    /// [`crate::core::forms::reconstruct_form`].
    pub fn from_params(values: &ParamValues) -> Result<Self, ConfigError> {
        Ok(Self {
            common: CommonInput::from_params(values)?,
            tomo_id: values.text(TOMO_ID)?.to_string(),
            bin_factor: values.float(BIN_FACTOR)?,
            shape: TomogramShape {
                width: values.int(WIDTH)?,
                height: values.int(HEIGHT)?,
                thickness: values.int(THICKNESS)?,
            },
            parallel: ParallelConfig::from_params(values)?,
        })
    }

    /// Name of the reconstructed volume inside the run's extra directory.
    pub fn output_file_name(&self) -> String {
        format!("{}.mrc", self.tomo_id)
    }
}

#[derive(Default)]
pub struct ReconstructConfigBuilder {
    particles: Option<PseudoSubtomogramSet>,
    tomo_id: Option<String>,
    bin_factor: Option<f64>,
    shape: Option<TomogramShape>,
    threads: Option<usize>,
}

impl ReconstructConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn particles(mut self, particles: PseudoSubtomogramSet) -> Self {
        self.particles = Some(particles);
        self
    }
    pub fn tomo_id(mut self, tomo_id: impl Into<String>) -> Self {
        self.tomo_id = Some(tomo_id.into());
        self
    }
    pub fn bin_factor(mut self, factor: f64) -> Self {
        self.bin_factor = Some(factor);
        self
    }
    pub fn shape(mut self, shape: TomogramShape) -> Self {
        self.shape = Some(shape);
        self
    }
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn build(self) -> Result<ReconstructConfig, ConfigError> {
        Ok(ReconstructConfig {
            common: CommonInput {
                particles: self
                    .particles
                    .ok_or(ConfigError::MissingParameter(IN_RE_PARTICLES))?,
            },
            tomo_id: self.tomo_id.ok_or(ConfigError::MissingParameter(TOMO_ID))?,
            bin_factor: self.bin_factor.unwrap_or(8.0),
            shape: self.shape.unwrap_or_default(),
            parallel: ParallelConfig {
                threads: self.threads.unwrap_or(4),
                mpi: 0,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forms::{de_novo_form, reconstruct_form};
    use crate::core::params::ParamValue;
    use std::fs;

    fn particles() -> PseudoSubtomogramSet {
        PseudoSubtomogramSet {
            name: "subtomos".to_string(),
            particles_star: PathBuf::from("prep/extra/particles.star"),
            tomograms_star: PathBuf::from("prep/extra/tomograms.star"),
            ts_sampling_rate: 1.35,
            sampling_rate: 5.4,
        }
    }

    #[test]
    fn de_novo_builder_requires_mask_diameter() {
        let result = DeNovoConfigBuilder::new()
            .input(DataPreparation::new(RunDirectory::new("prep")))
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter(MASK_DIAMETER)));
    }

    #[test]
    fn de_novo_builder_requires_input() {
        let result = DeNovoConfigBuilder::new().mask_diameter(200).build();
        assert_eq!(
            result,
            Err(ConfigError::MissingParameter(INPUT_PSEUDO_SUBTOMOS_PROT))
        );
    }

    #[test]
    fn de_novo_builder_defaults_match_form() {
        let built = DeNovoConfigBuilder::new()
            .input(DataPreparation::new(RunDirectory::new("prep")))
            .mask_diameter(200)
            .build()
            .unwrap();

        let values = de_novo_form()
            .resolve(
                &ParamValues::new()
                    .with(INPUT_PSEUDO_SUBTOMOS_PROT, ParamValue::Text("prep".into()))
                    .with(MASK_DIAMETER, ParamValue::Int(200)),
            )
            .unwrap();
        let from_form = DeNovoConfig::from_params(&values).unwrap();

        assert_eq!(built, from_form);
    }

    #[test]
    fn from_params_reads_overrides() {
        let values = de_novo_form()
            .resolve(
                &ParamValues::new()
                    .with(INPUT_PSEUDO_SUBTOMOS_PROT, ParamValue::Text("prep".into()))
                    .with(MASK_DIAMETER, ParamValue::Int(180))
                    .with(DO_GPU, ParamValue::Bool(true))
                    .with(GPUS_TO_USE, ParamValue::Text("0:1".into()))
                    .with(SCRATCH_DIR, ParamValue::Text("/scratch".into()))
                    .with(NUMBER_OF_MPI, ParamValue::Int(4)),
            )
            .unwrap();
        let config = DeNovoConfig::from_params(&values).unwrap();
        assert!(config.compute.do_gpu);
        assert_eq!(config.compute.gpus_to_use, "0:1");
        assert_eq!(config.compute.scratch_dir, Some(PathBuf::from("/scratch")));
        assert_eq!(config.parallel.mpi, 4);
        assert_eq!(config.additional.extra_params, None);
    }

    #[test]
    fn negative_process_count_is_rejected() {
        let values = de_novo_form()
            .resolve(
                &ParamValues::new()
                    .with(INPUT_PSEUDO_SUBTOMOS_PROT, ParamValue::Text("prep".into()))
                    .with(MASK_DIAMETER, ParamValue::Int(180))
                    .with(NUMBER_OF_MPI, ParamValue::Int(-2)),
            )
            .unwrap();
        assert_eq!(
            DeNovoConfig::from_params(&values),
            Err(ConfigError::Negative {
                name: NUMBER_OF_MPI,
                value: -2
            })
        );
    }

    #[test]
    fn reconstruct_from_params_loads_particle_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("subtomos.toml");
        fs::write(&manifest, toml::to_string(&particles()).unwrap()).unwrap();

        let values = reconstruct_form()
            .resolve(
                &ParamValues::new()
                    .with(
                        IN_RE_PARTICLES,
                        ParamValue::Text(manifest.display().to_string()),
                    )
                    .with(TOMO_ID, ParamValue::Text("TS_01".into()))
                    .with(BIN_FACTOR, ParamValue::Int(4)),
            )
            .unwrap();
        let config = ReconstructConfig::from_params(&values).unwrap();

        let expected = PseudoSubtomogramSet {
            particles_star: dir.path().join("prep/extra/particles.star"),
            tomograms_star: dir.path().join("prep/extra/tomograms.star"),
            ..particles()
        };
        assert_eq!(config.common.particles, expected);
        assert_eq!(config.bin_factor, 4.0);
        assert_eq!(config.shape, TomogramShape::default());
        assert_eq!(config.parallel, ParallelConfig { threads: 4, mpi: 0 });
        assert_eq!(config.output_file_name(), "TS_01.mrc");
    }

    #[test]
    fn manifest_star_files_resolve_against_manifest_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let manifest = project.join("subtomos.toml");
        let set = PseudoSubtomogramSet {
            particles_star: PathBuf::from("/data/prep/extra/particles.star"),
            ..particles()
        };
        fs::write(&manifest, toml::to_string(&set).unwrap()).unwrap();

        let loaded = load_particle_set(&manifest).unwrap();
        assert_eq!(
            loaded.tomograms(),
            project.join("prep/extra/tomograms.star").as_path()
        );
        assert_eq!(
            loaded.particles_star,
            PathBuf::from("/data/prep/extra/particles.star")
        );
    }

    #[test]
    fn missing_particle_manifest_is_a_reference_error() {
        let values = ParamValues::new().with(
            IN_RE_PARTICLES,
            ParamValue::Text("/nonexistent/subtomos.toml".into()),
        );
        assert!(matches!(
            CommonInput::from_params(&values),
            Err(ConfigError::Reference { .. })
        ));
    }

    #[test]
    fn reconstruct_builder_requires_tomo_id() {
        let result = ReconstructConfigBuilder::new().particles(particles()).build();
        assert_eq!(result, Err(ConfigError::MissingParameter(TOMO_ID)));
    }
}
