use std::io::{self, IsTerminal};

/// Reports whether the process streams are attached to a terminal.
///
/// Injected into command runners so tests can force plain output.
pub trait TerminalClient {
    /// `true` when stdout is interactive.
    fn stdout_is_terminal(&self) -> bool;
    /// `true` when stderr is interactive.
    fn stderr_is_terminal(&self) -> bool;
}

/// [`TerminalClient`] backed by the real process streams.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SystemTerminalClient;

impl TerminalClient for SystemTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn stderr_is_terminal(&self) -> bool {
        io::stderr().is_terminal()
    }
}
