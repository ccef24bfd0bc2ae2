const MPI_SUFFIX: &str = "_mpi";

/// Returns the RELION program to launch for the given number of MPI processes.
///
/// RELION ships a separate `_mpi` binary for every program that supports MPI, which must
/// be used whenever more than one process is requested.
pub fn program_name(program: &str, n_mpi: usize) -> String {
    if n_mpi > 1 {
        format!("{}{}", program, MPI_SUFFIX)
    } else {
        program.to_string()
    }
}
