pub mod error;
pub mod locator;
pub mod process;

pub use error::{Result, RunnerError};
pub use locator::{InterpreterLocator, DEFAULT_CANDIDATES};
pub use process::{excerpt, ProcessOutput, ProcessRunner, ProcessSpec, DEFAULT_STDERR_EXCERPT_CHARS};
