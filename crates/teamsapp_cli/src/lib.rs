//! Process wrappers around the TeamsFx command line.
//!
//! [`executor`] runs arbitrary shell command lines with captured output,
//! optional timeouts and bounded retries. [`TeamsAppCli`] builds the
//! `teamsapp` / `teamsfx` invocations the E2E scenarios need on top of it.

pub mod errors;
pub mod executor;
pub mod teamsapp;

pub use errors::Error;
pub use executor::{exec, exec_with_retry, CommandOutput, ExecOptions};
pub use teamsapp::{Capability, CliFlavour, ProgrammingLanguage, TeamsAppCli, DEFAULT_TIMEOUT};

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;
