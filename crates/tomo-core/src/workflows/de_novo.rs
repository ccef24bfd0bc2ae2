use crate::core::constants::symmetry_label;
use crate::core::models::RunDirectory;
use crate::engine::builders;
use crate::engine::command::Invocation;
use crate::engine::config::DeNovoConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::ProgramRunner;
use std::fs;
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct DeNovoResult {
    pub invocation: Invocation,
    /// Directory RELION wrote the iteration files and the initial model into.
    pub output_dir: PathBuf,
}

#[instrument(skip_all, name = "de_novo_workflow")]
pub fn run(
    config: &DeNovoConfig,
    run_dir: &RunDirectory,
    runner: &dyn ProgramRunner,
    reporter: &ProgressReporter,
) -> Result<DeNovoResult, EngineError> {
    let output_dir = run_dir.extra_dir();
    fs::create_dir_all(&output_dir)?;
    info!(
        "Generating de novo initial model from {:?} into {:?}.",
        config.input.particles_star(),
        output_dir
    );
    let symmetry = &config.optimisation.symmetry;
    let family = symmetry_label(symmetry).unwrap_or("unrecognised notation");
    info!("Imposing symmetry {} ({}).", symmetry, family);
    reporter.report(Progress::Message(format!("Symmetry {}: {}", symmetry, family)));

    let invocation = builders::de_novo_invocation(config, run_dir);
    reporter.phase("Generating de novo initial model", || {
        reporter.report(Progress::ProgramStart {
            command: invocation.to_string(),
        });
        runner.run(&invocation)?;
        reporter.report(Progress::ProgramFinish);
        Ok::<_, EngineError>(())
    })?;

    info!("De novo initial model generation finished.");
    Ok(DeNovoResult {
        invocation,
        output_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::DataPreparation;
    use crate::engine::config::DeNovoConfigBuilder;
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Invocation>>,
        fail: bool,
    }

    impl ProgramRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> Result<(), EngineError> {
            self.calls.borrow_mut().push(invocation.clone());
            if self.fail {
                Err(EngineError::ProgramFailed {
                    program: invocation.program.clone(),
                    status: "exit status: 1".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn config(grad: bool, mpi: usize) -> DeNovoConfig {
        DeNovoConfigBuilder::new()
            .input(DataPreparation::new(RunDirectory::new("prep")))
            .mask_diameter(200)
            .grad_based_opt(grad)
            .mpi(mpi)
            .build()
            .unwrap()
    }

    #[test]
    fn runs_refine_once_and_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDirectory::new(dir.path());
        let runner = RecordingRunner::default();

        let result = run(&config(false, 3), &run_dir, &runner, &ProgressReporter::new()).unwrap();

        assert!(result.output_dir.is_dir());
        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "relion_refine_mpi");
        assert_eq!(calls[0].mpi, 3);
        assert!(calls[0].args.contains("--denovo_3dref"));
        assert_eq!(result.invocation, calls[0]);
    }

    #[test]
    fn gradient_optimisation_downgrades_to_single_process() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::default();

        run(
            &config(true, 6),
            &RunDirectory::new(dir.path()),
            &runner,
            &ProgressReporter::new(),
        )
        .unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].program, "relion_refine");
        assert_eq!(calls[0].mpi, 1);
    }

    #[test]
    fn chosen_symmetry_is_reported_with_its_family() {
        let dir = tempfile::tempdir().unwrap();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let reporter = ProgressReporter::with_callback(Box::new(move |p: Progress| {
            if let Progress::Message(msg) = p {
                sink.lock().unwrap().push(msg);
            }
        }));
        let config = DeNovoConfigBuilder::new()
            .input(DataPreparation::new(RunDirectory::new("prep")))
            .mask_diameter(200)
            .symmetry("C6")
            .build()
            .unwrap();

        run(
            &config,
            &RunDirectory::new(dir.path()),
            &RecordingRunner::default(),
            &reporter,
        )
        .unwrap();

        assert_eq!(*messages.lock().unwrap(), ["Symmetry C6: Cyclic"]);
    }

    #[test]
    fn program_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner {
            fail: true,
            ..RecordingRunner::default()
        };
        let result = run(
            &config(false, 1),
            &RunDirectory::new(dir.path()),
            &runner,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::ProgramFailed { .. })));
    }
}
