//! Entry point for the `pogod` daemon.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use pogod::{StructuredHealthReporter, SystemConfigLoader, SystemShutdownSignal};

fn main() -> ExitCode {
    let reporter = Arc::new(StructuredHealthReporter::new());
    match pogod::run(&SystemConfigLoader, reporter, &SystemShutdownSignal) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            drop(writeln!(io::stderr().lock(), "pogod: {err}"));
            ExitCode::FAILURE
        }
    }
}
