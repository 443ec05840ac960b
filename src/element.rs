//! Element existence checks through BuildStream.
//!
//! A missing element is an expected answer, not an operational error, so the
//! query is run as a non-fatal command and a failure only logs a warning.

use std::path::Path;

use crate::shell::ShellCommand;

/// Trait for element lookups - allows mocking in tests
pub trait ElementOperations {
    /// Whether the build element `element` exists in the checkout at `checkout`.
    fn element_exists(&self, element: &str, checkout: &Path) -> bool;
}

/// Queries the `bst` command line tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultElementOperations;

/// The `bst` invocation that resolves `element` without its dependencies.
pub fn show_command(element: &str, checkout: &Path) -> ShellCommand {
    ShellCommand::new("bst")
        .args([
            "--no-interactive",
            "show",
            "--deps",
            "none",
            "-f",
            "%{name}",
            element,
        ])
        .current_dir(checkout)
}

impl ElementOperations for DefaultElementOperations {
    fn element_exists(&self, element: &str, checkout: &Path) -> bool {
        show_command(element, checkout)
            .capture_output()
            .context(format!("Did not find element: {}", element))
            .non_fatal()
            .run()
            .is_ok()
    }
}
