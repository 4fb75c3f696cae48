use std::path::{Path, PathBuf};
use std::process::Command;

use hlscan_core::config::OnboardSettings;
use hlscan_core::error::HlError;
use hlscan_core::models::application::Application;

/// Name of the log the scanner writes into its working directory.
pub const SCANNER_LOG: &str = "HLAutomation.log";

/// Reason strings for the scanner's documented exit codes.
const EXIT_REASONS: [&str; 10] = [
    "Error Code-0 : Ok",
    "Error Code-1 : Command Line general failure",
    "Error Code-2 : Command Line options parse error",
    "Error Code-3 : Command Line techno discovery error",
    "Error Code-4 : Command Line analysis error",
    "Error Code-5 : Command Line result upload error",
    "Error Code-6 : Command Line source dir or output dir validation error",
    "Error Code-7 : Command Line result saving to zip file error",
    "Error Code-8 : Command Line upload from zip file error",
    "Error Code-9 : Command Line unziping jars or zip error",
];

/// How the scanner process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanExit {
    Code(i32),
    /// Killed by a signal; no exit code.
    Signal,
}

/// Map an exit code to the ledger reason.
pub fn reason_for(code: i32) -> String {
    usize::try_from(code)
        .ok()
        .and_then(|i| EXIT_REASONS.get(i))
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Unknown return code: {code}"))
}

/// Working directory of one application's scan.
pub fn working_dir(settings: &OnboardSettings, app: &Application) -> PathBuf {
    settings.results.join(&app.name)
}

/// `<working dir>/HLAutomation.log`.
pub fn log_path(settings: &OnboardSettings, app: &Application) -> PathBuf {
    working_dir(settings, app).join(SCANNER_LOG)
}

/// Build `<java> -jar <HIGHLIGHT_EXE> --flag=value ...` for one application.
pub fn scanner_command(settings: &OnboardSettings, app: &Application, source: &Path) -> Command {
    let mut cmd = Command::new(&settings.java);
    cmd.arg("-jar").arg(&settings.highlight_exe).args([
        format!("--workingDir={}", working_dir(settings, app).display()),
        format!("--sourceDir={}", source.display()),
        format!("--analyzerDir={}", settings.analyzer_dir.display()),
        format!("--perlInstallDir={}", settings.perl_dir.display()),
        format!("--serverUrl={}", settings.server_url.as_str().trim_end_matches('/')),
        format!("--tokenAuth={}", settings.token),
        format!("--applicationId={}", app.id),
        format!("--companyId={}", settings.company_id),
        format!("--ignoreDirectories={}", settings.ignored_dirs),
        format!("--ignorePaths={}", settings.ignored_paths),
        format!("--ignoreFiles={}", settings.ignored_files),
    ]);
    cmd
}

/// Run the scanner to completion. Only a failure to start the process is an
/// error; any exit status is returned.
pub fn run_scanner(mut cmd: Command) -> Result<ScanExit, HlError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let output = cmd.output().map_err(|e| HlError::Scanner {
        message: format!("failed to run {program}: {e}"),
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        tracing::debug!("scanner stderr: {}", stderr.trim());
    }

    Ok(match output.status.code() {
        Some(code) => ScanExit::Code(code),
        None => ScanExit::Signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_for_known_and_unknown_codes() {
        assert_eq!(reason_for(4), "Error Code-4 : Command Line analysis error");
        assert_eq!(
            reason_for(9),
            "Error Code-9 : Command Line unziping jars or zip error"
        );
        assert_eq!(reason_for(42), "Unknown return code: 42");
        assert_eq!(reason_for(-1), "Unknown return code: -1");
    }

    #[test]
    fn test_launch_failure_is_an_error() {
        let cmd = Command::new("/nonexistent/hlscan-test-java");
        assert!(matches!(run_scanner(cmd), Err(HlError::Scanner { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_captured() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 6"]);
        assert_eq!(run_scanner(cmd).unwrap(), ScanExit::Code(6));
    }
}
