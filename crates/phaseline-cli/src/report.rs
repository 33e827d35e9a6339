//! Exit codes and error reporting for the terminal
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success |
//! | 1 | Failure: a fatal load error or an invalid invocation |
//!
//! Fatal load errors (nothing configured, missing normalizer, every source
//! failed) are printed as one line followed by a hint to fix and re-run.
//! Failures of individual sources are only logged, since a later source in
//! the chain may still succeed.

use std::process;

use phaseline_source::LoadError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code())
    }
}

/// Hint shown under a fatal load error
pub fn hint_for(error: &LoadError) -> Option<&'static str> {
    match error {
        LoadError::Misconfiguration(_) => Some(
            "set a source in phaseline.toml or pass --csv-json/--data, then re-run",
        ),
        LoadError::MissingDependency(_) => {
            Some("point --data at a normalized bundle, then re-run")
        }
        LoadError::AllSourcesFailed(_) => {
            Some("check that the sources are reachable, then re-run")
        }
        _ => None,
    }
}

/// Render an error for stderr: the message chain on one line, plus a hint
/// when the root cause is a fatal load error
pub fn format_error(error: &anyhow::Error) -> String {
    let mut message = format!("error: {:#}", error);
    let hint = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<LoadError>())
        .filter(|load| load.fatal())
        .and_then(hint_for);
    if let Some(hint) = hint {
        message.push_str("\n  hint: ");
        message.push_str(hint);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Failure.code(), 1);
    }

    #[test]
    fn fatal_load_errors_get_a_rerun_hint() {
        let error = anyhow::Error::new(LoadError::Misconfiguration("nothing set".into()));
        let text = format_error(&error);
        assert!(text.starts_with("error: No data source configured: nothing set"));
        assert!(text.contains("hint: set a source"));
        assert!(text.contains("re-run"));
    }

    #[test]
    fn hint_found_through_context() {
        let result: Result<(), LoadError> = Err(LoadError::AllSourcesFailed(Vec::new()));
        let error = result.context("Failed to load portfolio").unwrap_err();
        let text = format_error(&error);
        assert!(text.starts_with("error: Failed to load portfolio: All data sources failed"));
        assert!(text.contains("hint: check that the sources are reachable"));
    }

    #[test]
    fn other_errors_have_no_hint() {
        let error = anyhow::anyhow!("bad range");
        assert_eq!(format_error(&error), "error: bad range");
    }
}
