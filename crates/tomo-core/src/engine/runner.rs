use super::command::Invocation;
use super::error::EngineError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{error, info};

/// Launches external programs on behalf of the workflows.
pub trait ProgramRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), EngineError>;
}

/// Where the RELION binaries live and how MPI jobs are launched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RelionEnvironment {
    /// Directory holding the RELION binaries; `None` resolves programs through `PATH`.
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,
    #[serde(default = "default_mpi_launcher")]
    pub mpi_launcher: String,
    /// Arguments placed between the launcher and the process count.
    #[serde(default = "default_mpi_flags")]
    pub mpi_flags: Vec<String>,
    /// Extra environment variables for every launched program.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_mpi_launcher() -> String {
    "mpirun".to_string()
}

fn default_mpi_flags() -> Vec<String> {
    vec!["-np".to_string()]
}

impl Default for RelionEnvironment {
    fn default() -> Self {
        Self {
            bin_dir: None,
            mpi_launcher: default_mpi_launcher(),
            mpi_flags: default_mpi_flags(),
            env: BTreeMap::new(),
        }
    }
}

impl RelionEnvironment {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path).map_err(|e| EngineError::Environment {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| EngineError::Environment {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn program_path(&self, program: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        }
    }

    /// Builds the process for an invocation, wrapping it in the MPI launcher when more
    /// than one process is requested.
    pub fn command(&self, invocation: &Invocation) -> Command {
        let program = self.program_path(&invocation.program);
        let mut cmd = if invocation.mpi > 1 {
            let mut launcher = Command::new(&self.mpi_launcher);
            launcher
                .args(&self.mpi_flags)
                .arg(invocation.mpi.to_string())
                .arg(program);
            launcher
        } else {
            Command::new(program)
        };
        cmd.args(invocation.args.tokens());
        cmd.envs(&self.env);
        cmd
    }
}

/// Runs programs as child processes and waits for them to finish.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    environment: RelionEnvironment,
    log_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(environment: RelionEnvironment) -> Self {
        Self {
            environment,
            log_dir: None,
        }
    }

    /// Redirects the program's output to `run.stdout` and `run.stderr` inside `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

impl ProgramRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), EngineError> {
        let mut cmd = self.environment.command(invocation);
        if let Some(dir) = &self.log_dir {
            fs::create_dir_all(dir)?;
            cmd.stdout(File::create(dir.join("run.stdout"))?);
            cmd.stderr(File::create(dir.join("run.stderr"))?);
        }

        info!("Launching: {}", invocation);
        let status = cmd.status().map_err(|source| EngineError::Launch {
            program: invocation.program.clone(),
            source,
        })?;

        if !status.success() {
            error!("{} finished with {}", invocation.program, status);
            return Err(EngineError::ProgramFailed {
                program: invocation.program.clone(),
                status: status.to_string(),
            });
        }
        info!("{} finished successfully.", invocation.program);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command::CommandLine;
    use std::ffi::OsStr;

    fn invocation(program: &str, mpi: usize) -> Invocation {
        let mut args = CommandLine::new();
        args.arg("--j", 2).flag("--ctf");
        Invocation {
            program: program.to_string(),
            args,
            mpi,
        }
    }

    fn args_of(cmd: &Command) -> Vec<&OsStr> {
        cmd.get_args().collect()
    }

    #[test]
    fn single_process_runs_program_directly() {
        let env = RelionEnvironment {
            bin_dir: Some(PathBuf::from("/opt/relion/bin")),
            ..RelionEnvironment::default()
        };
        let cmd = env.command(&invocation("relion_refine", 1));
        assert_eq!(cmd.get_program(), "/opt/relion/bin/relion_refine");
        assert_eq!(args_of(&cmd), ["--j", "2", "--ctf"]);
    }

    #[test]
    fn mpi_jobs_are_wrapped_in_launcher() {
        let env = RelionEnvironment::default();
        let cmd = env.command(&invocation("relion_refine_mpi", 4));
        assert_eq!(cmd.get_program(), "mpirun");
        assert_eq!(
            args_of(&cmd),
            ["-np", "4", "relion_refine_mpi", "--j", "2", "--ctf"]
        );
    }

    #[test]
    fn environment_loads_from_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relion.toml");
        fs::write(
            &path,
            r#"
            bin-dir = "/opt/relion/bin"

            [env]
            RELION_SCRATCH_DIR = "/scratch"
            "#,
        )
        .unwrap();

        let env = RelionEnvironment::load(&path).unwrap();
        assert_eq!(env.bin_dir, Some(PathBuf::from("/opt/relion/bin")));
        assert_eq!(env.mpi_launcher, "mpirun");
        assert_eq!(env.mpi_flags, ["-np"]);
        assert_eq!(env.env.get("RELION_SCRATCH_DIR").map(String::as_str), Some("/scratch"));
    }

    #[test]
    fn unknown_environment_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relion.toml");
        fs::write(&path, "relion-home = \"/opt\"\n").unwrap();
        assert!(matches!(
            RelionEnvironment::load(&path),
            Err(EngineError::Environment { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_is_reported() {
        let runner = ProcessRunner::default();
        let result = runner.run(&Invocation {
            program: "false".to_string(),
            args: CommandLine::new(),
            mpi: 1,
        });
        assert!(matches!(result, Err(EngineError::ProgramFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn successful_program_output_goes_to_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = CommandLine::new();
        args.flag("hello");
        let runner = ProcessRunner::default().with_log_dir(dir.path().join("logs"));
        runner
            .run(&Invocation {
                program: "echo".to_string(),
                args,
                mpi: 1,
            })
            .unwrap();
        let stdout = fs::read_to_string(dir.path().join("logs/run.stdout")).unwrap();
        assert_eq!(stdout.trim(), "hello");
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let runner = ProcessRunner::default();
        let result = runner.run(&invocation("relion_program_that_does_not_exist", 1));
        assert!(matches!(result, Err(EngineError::Launch { .. })));
    }
}
