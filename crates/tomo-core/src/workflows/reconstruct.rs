use crate::core::models::{Origin, RunDirectory, SourceRelation, Tomogram};
use crate::engine::builders;
use crate::engine::config::ReconstructConfig;
use crate::engine::error::EngineError;
use crate::engine::header::fix_volume;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::ProgramRunner;
use serde::Serialize;
use std::fs;
use tracing::{info, instrument};

/// Name under which the reconstructed tomogram is registered as a protocol output.
pub const OUTPUT_NAME: &str = "tomogram";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructResult {
    pub tomogram: Tomogram,
    pub relation: SourceRelation,
}

#[instrument(skip_all, name = "reconstruct_workflow", fields(tomo_id = %config.tomo_id))]
pub fn run(
    config: &ReconstructConfig,
    run_dir: &RunDirectory,
    runner: &dyn ProgramRunner,
    reporter: &ProgressReporter,
) -> Result<ReconstructResult, EngineError> {
    fs::create_dir_all(run_dir.extra_dir())?;

    let invocation = builders::reconstruct_invocation(config, run_dir);
    reporter.phase("Reconstructing tomogram", || {
        reporter.report(Progress::ProgramStart {
            command: invocation.to_string(),
        });
        runner.run(&invocation)?;
        reporter.report(Progress::ProgramFinish);
        Ok::<_, EngineError>(())
    })?;

    let result = reporter.phase("Creating output", || create_output(config, run_dir))?;
    info!(
        "Tomogram {} registered at {:?}.",
        config.tomo_id,
        result.tomogram.location()
    );
    Ok(result)
}

/// Wraps the volume written by RELION into a [`Tomogram`] and links it to its input set.
pub fn create_output(
    config: &ReconstructConfig,
    run_dir: &RunDirectory,
) -> Result<ReconstructResult, EngineError> {
    let out_file = run_dir.extra_path(&config.output_file_name());
    let dims = fix_volume(&out_file).map_err(|source| EngineError::Header {
        path: out_file.clone(),
        source,
    })?;

    let particles = &config.common.particles;
    let sampling_rate = particles.ts_sampling_rate() * config.bin_factor;

    let mut tomogram = Tomogram::new();
    tomogram.set_location(&out_file);
    tomogram.set_sampling_rate(sampling_rate);
    if let Some(dims) = dims {
        tomogram.set_origin(Origin::centered(dims, sampling_rate));
    }
    tomogram.set_ts_id(config.tomo_id.as_str());

    Ok(ReconstructResult {
        tomogram,
        relation: SourceRelation {
            source: particles.name.clone(),
            target: OUTPUT_NAME.to_string(),
        },
    })
}

pub fn summary(config: &ReconstructConfig, finished: bool) -> Vec<String> {
    let mut summary = Vec::new();
    if finished {
        summary.push(format!("The selected tomogram was *{}*.", config.tomo_id));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::PseudoSubtomogramSet;
    use crate::engine::command::Invocation;
    use crate::engine::config::ReconstructConfigBuilder;
    use crate::engine::header::tests::write_mrc;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    /// Stands in for RELION: records the call and writes the volume it was asked for.
    #[derive(Default)]
    struct FakeRelion {
        calls: RefCell<Vec<Invocation>>,
        skip_output: bool,
    }

    impl ProgramRunner for FakeRelion {
        fn run(&self, invocation: &Invocation) -> Result<(), EngineError> {
            self.calls.borrow_mut().push(invocation.clone());
            if !self.skip_output {
                let out = invocation.args.value_of("--o").unwrap();
                write_mrc(Path::new(out), [232, 240, 60], false, 16);
            }
            Ok(())
        }
    }

    fn config() -> ReconstructConfig {
        ReconstructConfigBuilder::new()
            .particles(PseudoSubtomogramSet {
                name: "pseudosubtomograms".to_string(),
                particles_star: PathBuf::from("prep/extra/particles.star"),
                tomograms_star: PathBuf::from("prep/extra/tomograms.star"),
                ts_sampling_rate: 1.35,
                sampling_rate: 5.4,
            })
            .tomo_id("TS_03")
            .bin_factor(8.0)
            .build()
            .unwrap()
    }

    #[test]
    fn reconstruction_produces_tomogram_with_binned_sampling() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDirectory::new(dir.path());
        let runner = FakeRelion::default();

        let result = run(&config(), &run_dir, &runner, &ProgressReporter::new()).unwrap();

        let tomo = &result.tomogram;
        assert_eq!(tomo.location(), Some(run_dir.extra_path("TS_03.mrc").as_path()));
        assert!((tomo.sampling_rate().unwrap() - 10.8).abs() < 1e-9);
        assert_eq!(tomo.ts_id(), Some("TS_03"));
        let origin = tomo.origin().unwrap();
        assert!((origin.x + 116.0 * 10.8).abs() < 1e-9);
        assert!((origin.z + 30.0 * 10.8).abs() < 1e-9);

        assert_eq!(
            result.relation,
            SourceRelation {
                source: "pseudosubtomograms".to_string(),
                target: OUTPUT_NAME.to_string(),
            }
        );

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "relion_tomo_reconstruct_tomogram");
    }

    #[test]
    fn missing_output_volume_is_a_header_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRelion {
            skip_output: true,
            ..FakeRelion::default()
        };
        let result = run(
            &config(),
            &RunDirectory::new(dir.path()),
            &runner,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Header { .. })));
    }

    #[test]
    fn summary_names_tomogram_once_finished() {
        assert!(summary(&config(), false).is_empty());
        assert_eq!(
            summary(&config(), true),
            ["The selected tomogram was *TS_03*."]
        );
    }
}
