pub mod denovo;
pub mod reconstruct;
pub mod schema;

use reliontomo::engine::command::Invocation;
use reliontomo::engine::runner::RelionEnvironment;
use std::process::Command;

/// The full command line a run would launch, MPI launcher and binary directory included.
pub fn render_command(environment: &RelionEnvironment, invocation: &Invocation) -> String {
    let cmd: Command = environment.command(invocation);
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
