use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use hlscan_core::clock::run_stamp;
use hlscan_core::config::OnboardSettings;
use hlscan_core::error::HlError;
use hlscan_core::models::application::Application;
use hlscan_core::models::processing::{ProcessingRecord, ProcessingStatus, ScanTiming};

use crate::applications::{check_duplicates, read_applications};
use crate::batch::plan_batches;
use crate::ledger::Ledger;
use crate::scanner::{self, ScanExit};
use crate::timing::timing_or_unknown;

pub const REASON_PASSED: &str = "Application processed successfully";
pub const REASON_NO_SOURCE: &str = "Source code not present";
pub const REASON_SIGNAL: &str = "Scanner terminated by signal";

/// Result of a full onboarding run.
#[derive(Debug)]
pub struct RunSummary {
    pub batches: usize,
    pub records: Vec<ProcessingRecord>,
    /// Records that could not be written to the ledger.
    pub unrecorded: usize,
    /// Batches whose thread could not run to completion.
    pub failed_batches: usize,
    pub csv_ledger: PathBuf,
    pub txt_ledger: PathBuf,
}

impl RunSummary {
    pub fn count(&self, status: ProcessingStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// Read the application list, reject duplicate IDs, then scan every
/// application with one thread per batch.
pub fn run(settings: &OnboardSettings) -> Result<RunSummary, HlError> {
    tracing::info!("applications config path: {}", settings.applications_file.display());
    let apps = read_applications(&settings.applications_file)?;
    check_duplicates(&apps)?;

    let stamp = run_stamp(&Local::now());
    let ledger = Ledger::create(&settings.log_folder, &stamp)?;
    let batches = plan_batches(apps, settings.batch_size, settings.max_batches);
    for (i, batch) in batches.iter().enumerate() {
        let names: Vec<&str> = batch.iter().map(|a| a.name.as_str()).collect();
        tracing::info!("batch {}: {}", i + 1, names.join(", "));
    }

    let started = Local::now();
    let results = run_batches(settings, &batches, &ledger, &stamp);
    tracing::info!(
        "onboarding finished in {}s",
        (Local::now() - started).num_seconds()
    );

    Ok(RunSummary {
        batches: batches.len(),
        records: results.records,
        unrecorded: results.unrecorded,
        failed_batches: results.failed_batches,
        csv_ledger: ledger.csv_path.clone(),
        txt_ledger: ledger.txt_path.clone(),
    })
}

/// Records gathered from all batch threads.
#[derive(Debug, Default)]
pub struct BatchResults {
    pub records: Vec<ProcessingRecord>,
    pub unrecorded: usize,
    pub failed_batches: usize,
}

/// Records produced by one batch thread.
#[derive(Debug, Default)]
struct BatchOutcome {
    records: Vec<ProcessingRecord>,
    unrecorded: usize,
}

/// Run each batch on its own OS thread and wait for all of them. Records
/// come back in batch order. A batch that fails does not affect the others.
pub fn run_batches(
    settings: &OnboardSettings,
    batches: &[Vec<Application>],
    ledger: &Ledger,
    stamp: &str,
) -> BatchResults {
    let multi = MultiProgress::new();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let results: Vec<Result<BatchOutcome, HlError>> = std::thread::scope(|s| {
        let handles: Vec<_> = batches
            .iter()
            .enumerate()
            .map(|(i, batch)| {
                let id = i + 1;
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(style.clone());
                pb.set_message(format!("batch {id}: waiting"));
                s.spawn(move || {
                    let log = settings.log_folder.join(format!("thread_{id}_{stamp}.log"));
                    let result = with_thread_log(&log, || {
                        Ok(process_batch(settings, id, batch, |r| ledger.append(r), &pb))
                    });
                    pb.finish_with_message(match &result {
                        Ok(outcome) => format!("batch {id}: {} done", outcome.records.len()),
                        Err(e) => format!("batch {id}: {e}"),
                    });
                    result
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(HlError::Other("batch thread panicked".into())))
            })
            .collect()
    });

    let mut merged = BatchResults::default();
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(outcome) => {
                merged.records.extend(outcome.records);
                merged.unrecorded += outcome.unrecorded;
            }
            Err(e) => {
                tracing::error!("batch {} did not complete: {e}", i + 1);
                merged.failed_batches += 1;
            }
        }
    }
    merged
}

/// Run `f` with a thread-local subscriber writing to `log` and, for
/// warnings and errors, to stderr.
fn with_thread_log<T>(
    log: &Path,
    f: impl FnOnce() -> Result<T, HlError>,
) -> Result<T, HlError> {
    let file = File::create(log)?;
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(
            Mutex::new(file).and(std::io::stderr.with_max_level(Level::WARN)),
        )
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

/// Process every application of a batch in order, handing each record to
/// `append`. An append failure is logged and the batch carries on.
fn process_batch(
    settings: &OnboardSettings,
    id: usize,
    batch: &[Application],
    append: impl Fn(&ProcessingRecord) -> Result<(), HlError>,
    pb: &ProgressBar,
) -> BatchOutcome {
    tracing::info!("thread {id} started");
    let names: Vec<String> = batch.iter().map(Application::to_string).collect();
    tracing::info!("thread {id} processing applications: {}", names.join(", "));

    let mut outcome = BatchOutcome {
        records: Vec::with_capacity(batch.len()),
        unrecorded: 0,
    };
    for app in batch {
        pb.set_message(format!("batch {id}: {}", app.name));
        let record = process_application(settings, app);
        if let Err(e) = append(&record) {
            tracing::error!("could not write ledger record for {}: {e}", app.name);
            outcome.unrecorded += 1;
        }
        outcome.records.push(record);
    }

    tracing::info!("thread {id} finished");
    outcome
}

/// Scan one application and build its ledger record. Never fails: every
/// problem becomes a `Failed` record with a reason.
pub fn process_application(settings: &OnboardSettings, app: &Application) -> ProcessingRecord {
    let source = settings.sources.join(&app.name);
    let log_path = scanner::log_path(settings, app);

    if !has_source(&source) {
        tracing::error!(
            "analysis for application {} failed: source code not present",
            app.name
        );
        return ProcessingRecord {
            name: app.name.clone(),
            status: ProcessingStatus::Failed,
            reason: REASON_NO_SOURCE.into(),
            log_path,
            timing: ScanTiming::not_applicable(),
        };
    }

    if log_path.exists() {
        if let Err(e) = std::fs::remove_file(&log_path) {
            tracing::warn!("could not remove stale log {}: {e}", log_path.display());
        }
    }
    if let Err(e) = std::fs::create_dir_all(scanner::working_dir(settings, app)) {
        tracing::warn!("could not create working dir for {}: {e}", app.name);
    }

    tracing::info!("analysing application: {}", app.name);
    let cmd = scanner::scanner_command(settings, app, &source);
    let (status, reason, timing) = match scanner::run_scanner(cmd) {
        Ok(ScanExit::Code(0)) => {
            tracing::info!("analysed application: {}", app.name);
            (
                ProcessingStatus::Passed,
                REASON_PASSED.to_string(),
                timing_or_unknown(&log_path),
            )
        }
        Ok(ScanExit::Code(code)) => (
            ProcessingStatus::Failed,
            scanner::reason_for(code),
            timing_or_unknown(&log_path),
        ),
        Ok(ScanExit::Signal) => (
            ProcessingStatus::Failed,
            REASON_SIGNAL.to_string(),
            timing_or_unknown(&log_path),
        ),
        Err(e) => (ProcessingStatus::Failed, e.to_string(), ScanTiming::unknown()),
    };
    if status == ProcessingStatus::Failed {
        tracing::error!(
            "analysis for application {} failed with the reason -> {reason}",
            app.name
        );
    }

    ProcessingRecord {
        name: app.name.clone(),
        status,
        reason,
        log_path,
        timing,
    }
}

/// A source folder counts only when it exists and holds at least one entry.
fn has_source(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    use crate::ledger::read_ledger;

    /// A stand-in for `java`: writes a scanner log into `--workingDir` and
    /// exits with the code stored in `<sources>/<app>/exit_code`, counting
    /// calls in `calls.txt` next to the script.
    const FAKE_JAVA: &str = r#"#!/bin/sh
here=$(dirname "$0")
echo "$@" >> "$here/calls.txt"
for arg in "$@"; do
  case "$arg" in
    --workingDir=*) work="${arg#--workingDir=}" ;;
    --sourceDir=*) src="${arg#--sourceDir=}" ;;
  esac
done
mkdir -p "$work"
printf '2024-05-01 10:00:00,000 INFO start\n2024-05-01 10:03:00,000 INFO end\n' > "$work/HLAutomation.log"
code=0
[ -f "$src/exit_code" ] && code=$(cat "$src/exit_code")
exit "$code"
"#;

    fn settings(root: &Path, batch_size: usize) -> OnboardSettings {
        for dir in ["perl", "analyzer", "sources", "results", "logs", "config", "bin"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        let java = root.join("bin/java");
        std::fs::write(&java, FAKE_JAVA).unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(root.join("Highlight.jar"), b"").unwrap();

        OnboardSettings {
            java: java.to_string_lossy().to_string(),
            highlight_exe: root.join("Highlight.jar"),
            perl_dir: root.join("perl"),
            analyzer_dir: root.join("analyzer"),
            sources: root.join("sources"),
            results: root.join("results"),
            log_folder: root.join("logs"),
            config_dir: root.join("config"),
            applications_file: root.join("apps.txt"),
            server_url: url::Url::parse("https://rpa.casthighlight.com").unwrap(),
            token: "hl-token".into(),
            company_id: "1234".into(),
            ignored_dirs: "test".into(),
            ignored_paths: String::new(),
            ignored_files: String::new(),
            batch_size,
            max_batches: None,
        }
    }

    fn add_source(settings: &OnboardSettings, name: &str, exit_code: Option<i32>) {
        let dir = settings.sources.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("main.c"), "int main;").unwrap();
        if let Some(code) = exit_code {
            std::fs::write(dir.join("exit_code"), code.to_string()).unwrap();
        }
    }

    fn calls(root: &Path) -> usize {
        std::fs::read_to_string(root.join("bin/calls.txt"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[test]
    fn test_passed_application_gets_log_timing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 1);
        add_source(&settings, "Billing", None);

        let record = process_application(&settings, &Application::new("Billing", "101"));
        assert_eq!(record.status, ProcessingStatus::Passed);
        assert_eq!(record.reason, REASON_PASSED);
        assert_eq!(record.timing.elapsed_minutes, "3.0");
        assert_eq!(record.log_path, settings.results.join("Billing/HLAutomation.log"));

        let args = std::fs::read_to_string(dir.path().join("bin/calls.txt")).unwrap();
        assert!(args.contains("--applicationId=101"));
        assert!(args.contains("--serverUrl=https://rpa.casthighlight.com "));
    }

    #[test]
    fn test_exit_code_maps_to_reason() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 1);
        add_source(&settings, "Claims", Some(4));

        let record = process_application(&settings, &Application::new("Claims", "102"));
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert_eq!(record.reason, "Error Code-4 : Command Line analysis error");
        assert_eq!(record.timing.start, "2024-05-01 10:00:00.000");
    }

    #[test]
    fn test_missing_or_empty_source_never_invokes_scanner() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 1);
        std::fs::create_dir_all(settings.sources.join("Empty")).unwrap();

        for name in ["Absent", "Empty"] {
            let record = process_application(&settings, &Application::new(name, "1"));
            assert_eq!(record.status, ProcessingStatus::Failed);
            assert_eq!(record.reason, REASON_NO_SOURCE);
            assert_eq!(record.timing, ScanTiming::not_applicable());
        }
        assert_eq!(calls(dir.path()), 0);
    }

    #[test]
    fn test_unlaunchable_scanner_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path(), 1);
        settings.java = dir.path().join("bin/no-such-java").to_string_lossy().to_string();
        add_source(&settings, "Billing", None);

        let record = process_application(&settings, &Application::new("Billing", "101"));
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert!(record.reason.contains("no-such-java"));
        assert_eq!(record.timing, ScanTiming::unknown());
    }

    #[test]
    fn test_run_writes_every_record_to_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path(), 2);
        settings.max_batches = Some(2);
        std::fs::write(
            &settings.applications_file,
            "Application;ID\nA;1\nB;2\nC;3\nD;4\nE;5\n",
        )
        .unwrap();
        for name in ["A", "B", "D", "E"] {
            add_source(&settings, name, None);
        }
        add_source(&settings, "E", Some(7));

        let summary = run(&settings).unwrap();
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.records.len(), 5);
        assert_eq!(summary.count(ProcessingStatus::Passed), 3);
        assert_eq!(summary.count(ProcessingStatus::Failed), 2);
        assert_eq!(calls(dir.path()), 4);

        let mut names: Vec<_> = read_ledger(&summary.csv_ledger)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(
            std::fs::read_to_string(&summary.csv_ledger).unwrap(),
            std::fs::read_to_string(&summary.txt_ledger).unwrap()
        );

        let thread_logs = std::fs::read_dir(&settings.log_folder)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("thread_"))
            .count();
        assert_eq!(thread_logs, 2);
    }

    #[test]
    fn test_stale_log_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path(), 1);
        let java = dir.path().join("bin/java-fails");
        std::fs::write(&java, "#!/bin/sh\nexit 4\n").unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        settings.java = java.to_string_lossy().to_string();
        add_source(&settings, "Claims", None);

        let app = Application::new("Claims", "102");
        let stale = scanner::log_path(&settings, &app);
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(
            &stale,
            "2020-01-01 08:00:00,000 INFO old\n2020-01-01 09:00:00,000 INFO old\n",
        )
        .unwrap();

        let record = process_application(&settings, &app);
        assert_eq!(record.reason, "Error Code-4 : Command Line analysis error");
        assert_eq!(record.timing, ScanTiming::unknown());
        assert!(!stale.exists());
    }

    #[test]
    fn test_append_failure_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 1);
        for name in ["A", "B", "C"] {
            add_source(&settings, name, None);
        }
        let batch: Vec<_> = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, name)| Application::new(*name, (i + 1).to_string()))
            .collect();

        let outcome = process_batch(
            &settings,
            1,
            &batch,
            |r| {
                if r.name == "A" {
                    Err(HlError::Other("disk full".into()))
                } else {
                    Ok(())
                }
            },
            &ProgressBar::hidden(),
        );
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.unrecorded, 1);
        assert_eq!(calls(dir.path()), 3);
    }

    #[test]
    fn test_failed_batch_keeps_other_batches() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 1);
        add_source(&settings, "A", None);
        add_source(&settings, "B", None);
        let ledger = Ledger::create(&settings.log_folder, "stamp").unwrap();
        // The first thread cannot create its log file.
        std::fs::create_dir_all(settings.log_folder.join("thread_1_stamp.log")).unwrap();

        let batches = vec![
            vec![Application::new("A", "1")],
            vec![Application::new("B", "2")],
        ];
        let results = run_batches(&settings, &batches, &ledger, "stamp");
        assert_eq!(results.failed_batches, 1);
        assert_eq!(results.records.len(), 1);
        assert_eq!(results.records[0].name, "B");
        assert_eq!(read_ledger(&ledger.csv_path).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_ids_stop_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), 1);
        std::fs::write(&settings.applications_file, "Application;ID\nA;1\nB;1\n").unwrap();
        add_source(&settings, "A", None);

        assert!(matches!(run(&settings), Err(HlError::DuplicateAppIds { .. })));
        assert_eq!(calls(dir.path()), 0);
        assert_eq!(std::fs::read_dir(&settings.log_folder).unwrap().count(), 0);
    }
}
