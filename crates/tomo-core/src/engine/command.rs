use std::fmt;

/// Ordered command-line tokens passed to an external program.
///
/// The order never changes the meaning for RELION's argument parser but is kept stable so
/// that generated commands are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine {
    tokens: Vec<String>,
}

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&mut self, flag: &str) -> &mut Self {
        self.tokens.push(flag.to_string());
        self
    }

    pub fn flag_if(&mut self, enabled: bool, flag: &str) -> &mut Self {
        if enabled {
            self.flag(flag);
        }
        self
    }

    pub fn arg(&mut self, flag: &str, value: impl fmt::Display) -> &mut Self {
        self.tokens.push(flag.to_string());
        self.tokens.push(value.to_string());
        self
    }

    /// Appends user-supplied arguments verbatim, split on whitespace.
    pub fn raw(&mut self, extra: &str) -> &mut Self {
        self.tokens
            .extend(extra.split_whitespace().map(str::to_string));
        self
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn position(&self, token: &str) -> Option<usize> {
        self.tokens.iter().position(|t| t == token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.position(token).is_some()
    }

    /// Value following `flag`, if the flag is present and has one.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.position(flag)
            .and_then(|i| self.tokens.get(i + 1))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// A program to launch, its arguments and the number of MPI processes to launch it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: CommandLine,
    pub mpi: usize,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.program)
        } else {
            write!(f, "{} {}", self.program, self.args)
        }
    }
}
