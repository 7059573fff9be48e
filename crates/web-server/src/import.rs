use chrono::{DateTime, Utc};
use configuration::ImportSettings;
use database::BillingStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Succeeded,
    Failed,
}

/// The observable outcome of one import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub status: ImportStatus,
    /// The progress lines on success, the error output on failure.
    pub output: String,
    /// `None` for in-process runs and for commands that could not be launched.
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    fn failed(output: String, started_at: DateTime<Utc>) -> Self {
        Self {
            status: ImportStatus::Failed,
            output,
            exit_code: None,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// What one import run does.
enum ImportJob {
    /// Launch the `billing-import` binary, or another configured command.
    Command { program: PathBuf, args: Vec<String> },
    /// Parse the CSV files here and write them into the store the server is
    /// using. Needed when that store only exists inside this process.
    InProcess {
        store: Arc<dyn BillingStore>,
        data_dir: PathBuf,
    },
}

/// Runs the CSV import on behalf of `POST /api/import-data`.
///
/// Each run executes on its own tokio task, so it completes and is recorded
/// even if the HTTP request that started it goes away. Runs never overlap: a
/// second request waits until the first one has finished.
pub struct ImportRunner {
    job: ImportJob,
    running: Mutex<()>,
    last: RwLock<Option<ImportReport>>,
}

impl ImportRunner {
    fn with_job(job: ImportJob) -> Self {
        Self {
            job,
            running: Mutex::new(()),
            last: RwLock::new(None),
        }
    }

    /// Runs `program` with `args` as a child process.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self::with_job(ImportJob::Command {
            program: program.into(),
            args,
        })
    }

    /// Imports `data_dir` directly into `store`, without a child process.
    pub fn in_process(store: Arc<dyn BillingStore>, data_dir: impl Into<PathBuf>) -> Self {
        Self::with_job(ImportJob::InProcess {
            store,
            data_dir: data_dir.into(),
        })
    }

    /// Uses the configured command, falling back to the `billing-import`
    /// binary installed next to the running executable.
    pub fn from_settings(settings: &ImportSettings) -> Self {
        let program = settings
            .command
            .clone()
            .unwrap_or_else(default_import_command);
        let args = if settings.args.is_empty() {
            vec![
                "--data-dir".to_string(),
                settings.data_dir.display().to_string(),
            ]
        } else {
            settings.args.clone()
        };
        Self::new(program, args)
    }

    /// Runs the import to completion and returns its outcome.
    pub async fn run(self: &Arc<Self>) -> ImportReport {
        let runner = Arc::clone(self);
        let started_at = Utc::now();
        tokio::spawn(async move { runner.execute().await })
            .await
            .unwrap_or_else(|e| {
                ImportReport::failed(format!("The import task was aborted: {e}"), started_at)
            })
    }

    /// The outcome of the most recent run, if any.
    pub async fn last_report(&self) -> Option<ImportReport> {
        self.last.read().await.clone()
    }

    async fn execute(&self) -> ImportReport {
        let _running = self.running.lock().await;
        let started_at = Utc::now();

        let report = match &self.job {
            ImportJob::Command { program, args } => {
                tracing::info!(program = %program.display(), ?args, "Starting import.");
                run_command(program, args, started_at).await
            }
            ImportJob::InProcess { store, data_dir } => {
                tracing::info!(data_dir = %data_dir.display(), "Starting in-process import.");
                run_in_process(store.as_ref(), data_dir, started_at).await
            }
        };

        match report.status {
            ImportStatus::Succeeded => tracing::info!(output = %report.output, "Import succeeded."),
            ImportStatus::Failed => {
                tracing::warn!(
                    exit_code = ?report.exit_code,
                    output = %report.output,
                    "Import failed."
                )
            }
        }

        *self.last.write().await = Some(report.clone());
        report
    }
}

async fn run_command(program: &Path, args: &[String], started_at: DateTime<Utc>) -> ImportReport {
    match Command::new(program).args(args).output().await {
        Ok(output) => {
            let succeeded = output.status.success();
            let captured = if succeeded {
                &output.stdout
            } else {
                &output.stderr
            };
            ImportReport {
                status: if succeeded {
                    ImportStatus::Succeeded
                } else {
                    ImportStatus::Failed
                },
                output: String::from_utf8_lossy(captured).into_owned(),
                exit_code: output.status.code(),
                started_at,
                finished_at: Utc::now(),
            }
        }
        Err(e) => ImportReport::failed(
            format!("Failed to launch {}: {e}", program.display()),
            started_at,
        ),
    }
}

async fn run_in_process(
    store: &dyn BillingStore,
    data_dir: &Path,
    started_at: DateTime<Utc>,
) -> ImportReport {
    match importer::run_import(store, data_dir).await {
        Ok(summary) => ImportReport {
            status: ImportStatus::Succeeded,
            output: importer::summary_lines(&summary),
            exit_code: None,
            started_at,
            finished_at: Utc::now(),
        },
        Err(e) => ImportReport::failed(format!("{e}\n"), started_at),
    }
}

fn default_import_command() -> PathBuf {
    let binary = format!("billing-import{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&binary)))
        .unwrap_or_else(|| PathBuf::from(binary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::InMemoryStore;

    #[cfg(unix)]
    fn shell(script: &str) -> Arc<ImportRunner> {
        Arc::new(ImportRunner::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
        ))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_captures_stdout() {
        let runner = shell("echo '3 customers imported'");
        let report = runner.run().await;
        assert_eq!(report.status, ImportStatus::Succeeded);
        assert_eq!(report.output, "3 customers imported\n");
        assert_eq!(report.exit_code, Some(0));
        assert_eq!(
            runner.last_report().await.map(|r| r.status),
            Some(ImportStatus::Succeeded)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_captures_stderr_and_exit_code() {
        let report = shell("echo partial; echo 'bad row' >&2; exit 3").run().await;
        assert_eq!(report.status, ImportStatus::Failed);
        assert_eq!(report.output, "bad row\n");
        assert_eq!(report.exit_code, Some(3));
    }

    #[tokio::test]
    async fn missing_program_is_a_failed_run() {
        let runner = Arc::new(ImportRunner::new("/nonexistent/billing-import", Vec::new()));
        let report = runner.run().await;
        assert_eq!(report.status, ImportStatus::Failed);
        assert!(report.output.contains("Failed to launch"));
        assert!(runner.last_report().await.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn concurrent_runs_do_not_overlap() {
        // Each run appends start/end markers; overlapping runs would interleave them.
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("runs.log");
        let script = format!(
            "echo start >> {0}; sleep 0.2; echo end >> {0}",
            log.display()
        );
        let runner = shell(&script);
        let (a, b) = tokio::join!(runner.run(), runner.run());
        assert_eq!(a.status, ImportStatus::Succeeded);
        assert_eq!(b.status, ImportStatus::Succeeded);
        let contents = std::fs::read_to_string(&log).unwrap();
        assert_eq!(contents, "start\nend\nstart\nend\n");
    }

    #[tokio::test]
    async fn in_process_failure_names_the_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let store: Arc<dyn BillingStore> = Arc::new(InMemoryStore::new());
        let runner = Arc::new(ImportRunner::in_process(store, dir.path()));

        let report = runner.run().await;
        assert_eq!(report.status, ImportStatus::Failed);
        assert!(report.output.contains("platforms.csv"));
        assert_eq!(report.exit_code, None);
    }

    #[test]
    fn default_args_point_at_data_dir() {
        let settings = ImportSettings {
            command: Some(PathBuf::from("/usr/local/bin/billing-import")),
            args: Vec::new(),
            data_dir: PathBuf::from("/srv/csv"),
        };
        let runner = ImportRunner::from_settings(&settings);
        match &runner.job {
            ImportJob::Command { program, args } => {
                assert_eq!(program, &PathBuf::from("/usr/local/bin/billing-import"));
                assert_eq!(args, &vec!["--data-dir", "/srv/csv"]);
            }
            ImportJob::InProcess { .. } => panic!("expected a command job"),
        }
    }
}
