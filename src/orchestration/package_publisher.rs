//! Package Publisher - Main orchestrator for package publishing
//!
//! Runs the publish pipeline for a Python project:
//! - Manifest precondition check
//! - Clean (unchecked), build, check
//! - Operator confirmation
//! - Upload
//!
//! Each command runs at most once and the first checked failure aborts the
//! run. Nothing is rolled back: archives built before a failed upload stay in
//! the dist directory.

use crate::core::config::PublishConfig;
use crate::core::error::PublishError;
use crate::core::traits::{CommandResult, CommandRunner, PublishStep, Prompter, StepCommand};
use crate::validation::manifest_validator::{ManifestMetadata, ManifestValidator};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// How a publish run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Archives were uploaded
    Published,
    /// The operator declined the upload
    Cancelled,
}

/// Publishing report returned after publish operation
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub outcome: PublishOutcome,
    pub registry: String,
    pub package_name: Option<String>,
    pub version: Option<String>,
    /// Results of the commands that ran, in order
    pub steps: Vec<CommandResult>,
    pub published_at: Option<DateTime<Utc>>,
    /// Wall time in milliseconds
    pub duration: u64,
}

impl PublishReport {
    /// Suggested command to install the published package
    pub fn install_command(&self) -> Option<String> {
        let name = self.package_name.as_deref()?;
        if self.registry.eq_ignore_ascii_case("testpypi") {
            Some(format!(
                "pip install -i https://test.pypi.org/simple/ {}",
                name
            ))
        } else {
            Some(format!("pip install {}", name))
        }
    }
}

/// Main package publisher orchestrator
pub struct PackagePublisher<R, P> {
    project_path: PathBuf,
    config: PublishConfig,
    runner: R,
    prompter: P,
}

impl<R, P> PackagePublisher<R, P>
where
    R: CommandRunner,
    P: Prompter,
{
    /// Create a new PackagePublisher
    ///
    /// # Arguments
    ///
    /// * `project_path` - Project root; commands run here and the manifest is looked up here
    /// * `config` - Fully merged configuration
    /// * `runner` - Executes step commands
    /// * `prompter` - Asks for upload confirmation
    pub fn new<T: AsRef<Path>>(project_path: T, config: PublishConfig, runner: R, prompter: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            config,
            runner,
            prompter,
        }
    }

    /// Run the publish pipeline
    ///
    /// # Returns
    ///
    /// A report for a completed upload or a declined confirmation. Every
    /// other way the pipeline stops is an error.
    pub async fn publish(&self) -> Result<PublishReport, PublishError> {
        let start_time = Instant::now();
        let registry = self.config.registry_name().to_string();
        let mut steps = Vec::new();

        // 0. Precondition
        let manifest = self.project_path.join(self.config.manifest());
        if !tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
            return Err(PublishError::ManifestNotFound {
                manifest: PathBuf::from(self.config.manifest()),
            });
        }

        let metadata = self.read_manifest(&manifest).await;
        let package_name = self.config.package_name.clone().or(metadata.name);

        println!(
            "📦 Building and publishing {}...",
            package_name.as_deref().unwrap_or("package")
        );

        // 1. Clean
        println!("\n1. Cleaning previous builds...");
        self.run_step(
            PublishStep::Clean,
            &self.config.command(PublishStep::Clean),
            &mut steps,
        )
        .await?;

        // 2. Build
        println!("\n2. Building package...");
        self.run_step(
            PublishStep::Build,
            &self.config.command(PublishStep::Build),
            &mut steps,
        )
        .await?;

        let archives = self.collect_archives();

        // 3. Check
        println!("\n3. Checking package...");
        self.run_step(
            PublishStep::Check,
            &self.config.command(PublishStep::Check).with_args(archives.iter().cloned()),
            &mut steps,
        )
        .await?;

        // 4. Confirm
        println!("\n4. Ready to upload to {}", registry);
        if self.config.confirm() {
            let question = format!("Do you want to upload to {}?", registry);
            let confirmed = self
                .prompter
                .confirm(&question)
                .await
                .map_err(|e| PublishError::PromptFailed(e.to_string()))?;

            if !confirmed {
                println!("Upload cancelled.");
                return Ok(PublishReport {
                    outcome: PublishOutcome::Cancelled,
                    registry,
                    package_name,
                    version: metadata.version,
                    steps,
                    published_at: None,
                    duration: start_time.elapsed().as_millis() as u64,
                });
            }
        } else {
            println!("Confirmation skipped (non-interactive)");
        }

        // 5. Upload
        println!("\n5. Uploading to {}...", registry);
        let mut upload = self.config.command(PublishStep::Upload);
        if let Some(repository) = &self.config.repository {
            upload = upload.with_args(["--repository", repository.as_str()]);
        }
        self.run_step(PublishStep::Upload, &upload.with_args(archives), &mut steps)
            .await?;

        Ok(PublishReport {
            outcome: PublishOutcome::Published,
            registry,
            package_name,
            version: metadata.version,
            steps,
            published_at: Some(Utc::now()),
            duration: start_time.elapsed().as_millis() as u64,
        })
    }

    /// Run one step's command
    ///
    /// Failures of unchecked steps are logged and swallowed; failures of
    /// checked steps become the step's error.
    async fn run_step(
        &self,
        step: PublishStep,
        command: &StepCommand,
        steps: &mut Vec<CommandResult>,
    ) -> Result<(), PublishError> {
        println!("🔧 Running: {}", command);

        let detail = match self.runner.run(command).await {
            Ok(result) if result.success => {
                steps.push(result);
                return Ok(());
            }
            Ok(result) => {
                let detail = result.status_detail();
                steps.push(result);
                detail
            }
            Err(e) => e.to_string(),
        };

        if !step.is_checked() {
            tracing::debug!(
                step = step.as_str(),
                command = %command,
                %detail,
                "ignoring failure of unchecked step"
            );
            return Ok(());
        }

        match step {
            PublishStep::Build => Err(PublishError::BuildFailed { detail }),
            PublishStep::Check => Err(PublishError::CheckFailed { detail }),
            PublishStep::Upload => Err(PublishError::UploadFailed {
                registry: self.config.registry_name().to_string(),
                detail,
            }),
            PublishStep::Clean => Ok(()),
        }
    }

    /// Read name and version from the manifest, never failing
    async fn read_manifest(&self, manifest: &Path) -> ManifestMetadata {
        match ManifestValidator::new().validate(manifest).await {
            Ok(result) => {
                for warning in &result.warnings {
                    tracing::warn!(manifest = %manifest.display(), "{}", warning);
                }
                result.metadata
            }
            Err(e) => {
                tracing::warn!(manifest = %manifest.display(), error = %e, "could not read manifest");
                ManifestMetadata::default()
            }
        }
    }

    /// Archives in the dist directory, as paths relative to the project
    ///
    /// Hidden files are skipped, as a shell `*` glob skips them. An empty or missing directory yields the literal `<dist>/*` pattern,
    /// the same argument an unmatched shell glob would produce.
    fn collect_archives(&self) -> Vec<String> {
        let dist_dir = self.config.dist_dir().trim_end_matches('/');

        let archives: Vec<String> = WalkDir::new(self.project_path.join(dist_dir))
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .map(|entry| format!("{}/{}", dist_dir, entry.file_name().to_string_lossy()))
            .collect();

        if archives.is_empty() {
            tracing::debug!(dist_dir, "no archives found, passing pattern through");
            vec![format!("{}/*", dist_dir)]
        } else {
            archives
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CommandsConfig;
    use crate::security::command_executor::CommandError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every command; commands starting with a `failing` prefix exit 1,
    /// commands starting with an `erroring` prefix fail to spawn.
    #[derive(Default)]
    struct RecordingRunner {
        failing: Vec<&'static str>,
        erroring: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingRunner {
        fn failing(prefix: &'static str) -> Self {
            Self {
                failing: vec![prefix],
                ..Default::default()
            }
        }

        fn erroring(prefix: &'static str) -> Self {
            Self {
                erroring: vec![prefix],
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &StepCommand) -> Result<CommandResult, CommandError> {
            let line = command.to_string();
            self.calls.lock().unwrap().push(line.clone());

            if self.erroring.iter().any(|p| line.starts_with(p)) {
                return Err(CommandError::ExecutionFailed(format!(
                    "{}: No such file or directory",
                    command.program
                )));
            }
            let code = if self.failing.iter().any(|p| line.starts_with(p)) {
                1
            } else {
                0
            };
            Ok(CommandResult::from_exit_code(command, Some(code)))
        }
    }

    struct ScriptedPrompter {
        answer: &'static str,
        questions: Mutex<Vec<String>>,
    }

    impl ScriptedPrompter {
        fn answering(answer: &'static str) -> Self {
            Self {
                answer,
                questions: Mutex::new(Vec::new()),
            }
        }

        fn asked(&self) -> usize {
            self.questions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Prompter for ScriptedPrompter {
        async fn confirm(&self, message: &str) -> std::io::Result<bool> {
            self.questions.lock().unwrap().push(message.to_string());
            Ok(crate::orchestration::prompt::is_affirmative(self.answer))
        }
    }

    fn project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("pyproject.toml"),
            "[project]\nname = \"demo-pkg\"\nversion = \"0.3.1\"\n",
        )
        .unwrap();
        temp_dir
    }

    fn publisher(
        dir: &TempDir,
        config: PublishConfig,
        runner: RecordingRunner,
        answer: &'static str,
    ) -> PackagePublisher<RecordingRunner, ScriptedPrompter> {
        PackagePublisher::new(
            dir.path(),
            config,
            runner,
            ScriptedPrompter::answering(answer),
        )
    }

    #[tokio::test]
    async fn test_missing_manifest_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let publisher = publisher(&dir, PublishConfig::default(), RecordingRunner::default(), "y");

        let result = publisher.publish().await;

        assert!(matches!(result, Err(PublishError::ManifestNotFound { .. })));
        assert!(publisher.runner.calls().is_empty());
        assert_eq!(publisher.prompter.asked(), 0);
    }

    #[tokio::test]
    async fn test_full_pipeline_runs_four_commands_in_order() {
        let dir = project();
        let publisher = publisher(&dir, PublishConfig::default(), RecordingRunner::default(), "y");

        let report = publisher.publish().await.unwrap();

        assert_eq!(report.outcome, PublishOutcome::Published);
        assert_eq!(
            publisher.runner.calls(),
            vec![
                "rm -rf dist/ build/",
                "python -m build",
                "twine check dist/*",
                "twine upload dist/*",
            ]
        );
        assert_eq!(report.steps.len(), 4);
        assert!(report.published_at.is_some());
        assert_eq!(publisher.prompter.asked(), 1);
    }

    #[tokio::test]
    async fn test_report_carries_manifest_metadata() {
        let dir = project();
        let publisher = publisher(&dir, PublishConfig::default(), RecordingRunner::default(), "Y");

        let report = publisher.publish().await.unwrap();

        assert_eq!(report.registry, "PyPI");
        assert_eq!(report.package_name.as_deref(), Some("demo-pkg"));
        assert_eq!(report.version.as_deref(), Some("0.3.1"));
        assert_eq!(
            report.install_command().as_deref(),
            Some("pip install demo-pkg")
        );
    }

    #[tokio::test]
    async fn test_build_failure_stops_before_check() {
        let dir = project();
        let publisher = publisher(
            &dir,
            PublishConfig::default(),
            RecordingRunner::failing("python -m build"),
            "y",
        );

        let result = publisher.publish().await;

        assert!(matches!(result, Err(PublishError::BuildFailed { .. })));
        assert_eq!(
            publisher.runner.calls(),
            vec!["rm -rf dist/ build/", "python -m build"]
        );
        assert_eq!(publisher.prompter.asked(), 0);
    }

    #[tokio::test]
    async fn test_build_spawn_error_is_a_build_failure() {
        let dir = project();
        let publisher = publisher(
            &dir,
            PublishConfig::default(),
            RecordingRunner::erroring("python"),
            "y",
        );

        match publisher.publish().await {
            Err(PublishError::BuildFailed { detail }) => {
                assert!(detail.contains("No such file or directory"));
            }
            other => panic!("expected build failure, got {:?}", other),
        }
        assert_eq!(publisher.runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_check_failure_never_uploads() {
        let dir = project();
        let publisher = publisher(
            &dir,
            PublishConfig::default(),
            RecordingRunner::failing("twine check"),
            "y",
        );

        let result = publisher.publish().await;

        assert!(matches!(result, Err(PublishError::CheckFailed { .. })));
        let calls = publisher.runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(!calls.iter().any(|c| c.starts_with("twine upload")));
        assert_eq!(publisher.prompter.asked(), 0);
    }

    #[tokio::test]
    async fn test_declined_confirmation_is_a_clean_exit() {
        for answer in ["n", "", "Yes please", "yes", "N\n"] {
            let dir = project();
            let publisher = publisher(&dir, PublishConfig::default(), RecordingRunner::default(), answer);

            let report = publisher.publish().await.unwrap();

            assert_eq!(report.outcome, PublishOutcome::Cancelled, "answer {:?}", answer);
            assert!(report.published_at.is_none());
            let calls = publisher.runner.calls();
            assert_eq!(calls.len(), 3, "answer {:?}", answer);
            assert!(!calls.iter().any(|c| c.starts_with("twine upload")));
        }
    }

    #[tokio::test]
    async fn test_upload_failure_after_check() {
        let dir = project();
        let publisher = publisher(
            &dir,
            PublishConfig::default(),
            RecordingRunner::failing("twine upload"),
            "y",
        );

        let result = publisher.publish().await;

        match result {
            Err(PublishError::UploadFailed { registry, detail }) => {
                assert_eq!(registry, "PyPI");
                assert_eq!(detail, "exit status 1");
            }
            other => panic!("expected upload failure, got {:?}", other),
        }
        assert_eq!(publisher.runner.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_clean_failure_is_ignored() {
        let dir = project();
        let publisher = publisher(
            &dir,
            PublishConfig::default(),
            RecordingRunner::failing("rm"),
            "y",
        );

        let report = publisher.publish().await.unwrap();

        assert_eq!(report.outcome, PublishOutcome::Published);
        assert_eq!(publisher.runner.calls().len(), 4);
        assert!(!report.steps[0].success);
    }

    #[tokio::test]
    async fn test_clean_spawn_error_is_ignored() {
        let dir = project();
        let publisher = publisher(
            &dir,
            PublishConfig::default(),
            RecordingRunner::erroring("rm"),
            "y",
        );

        let report = publisher.publish().await.unwrap();

        assert_eq!(report.outcome, PublishOutcome::Published);
        assert_eq!(publisher.runner.calls().len(), 4);
        assert_eq!(report.steps.len(), 3);
    }

    #[tokio::test]
    async fn test_archives_are_expanded_from_dist() {
        let dir = project();
        let dist = dir.path().join("dist");
        std::fs::create_dir(&dist).unwrap();
        std::fs::write(dist.join("demo_pkg-0.3.1.tar.gz"), b"sdist").unwrap();
        std::fs::write(dist.join("demo_pkg-0.3.1-py3-none-any.whl"), b"wheel").unwrap();
        std::fs::create_dir(dist.join("nested")).unwrap();

        let publisher = publisher(&dir, PublishConfig::default(), RecordingRunner::default(), "y");
        publisher.publish().await.unwrap();

        let calls = publisher.runner.calls();
        assert_eq!(
            calls[2],
            "twine check dist/demo_pkg-0.3.1-py3-none-any.whl dist/demo_pkg-0.3.1.tar.gz"
        );
        assert_eq!(
            calls[3],
            "twine upload dist/demo_pkg-0.3.1-py3-none-any.whl dist/demo_pkg-0.3.1.tar.gz"
        );
    }

    #[tokio::test]
    async fn test_hidden_files_in_dist_are_not_archives() {
        let dir = project();
        let dist = dir.path().join("dist");
        std::fs::create_dir(&dist).unwrap();
        std::fs::write(dist.join(".gitignore"), b"*").unwrap();
        std::fs::write(dist.join("demo_pkg-0.3.1.tar.gz"), b"sdist").unwrap();

        let publisher = publisher(&dir, PublishConfig::default(), RecordingRunner::default(), "y");
        publisher.publish().await.unwrap();

        let calls = publisher.runner.calls();
        assert_eq!(calls[2], "twine check dist/demo_pkg-0.3.1.tar.gz");
        assert_eq!(calls[3], "twine upload dist/demo_pkg-0.3.1.tar.gz");
    }

    #[tokio::test]
    async fn test_only_hidden_files_passes_pattern_through() {
        let dir = project();
        let dist = dir.path().join("dist");
        std::fs::create_dir(&dist).unwrap();
        std::fs::write(dist.join(".gitignore"), b"*").unwrap();

        let publisher = publisher(&dir, PublishConfig::default(), RecordingRunner::default(), "y");
        publisher.publish().await.unwrap();

        assert_eq!(publisher.runner.calls()[2], "twine check dist/*");
    }

    #[tokio::test]
    async fn test_clean_removes_configured_dist_dir() {
        let dir = project();
        let config = PublishConfig {
            dist_dir: Some("wheelhouse".to_string()),
            ..Default::default()
        };
        let publisher = publisher(&dir, config, RecordingRunner::default(), "y");

        publisher.publish().await.unwrap();

        let calls = publisher.runner.calls();
        assert_eq!(calls[0], "rm -rf wheelhouse/ build/");
        assert_eq!(calls[2], "twine check wheelhouse/*");
    }

    #[tokio::test]
    async fn test_repository_is_passed_to_upload() {
        let dir = project();
        let config = PublishConfig {
            repository: Some("testpypi".to_string()),
            ..Default::default()
        };
        let publisher = publisher(&dir, config, RecordingRunner::default(), "y");

        let report = publisher.publish().await.unwrap();

        assert_eq!(
            publisher.runner.calls()[3],
            "twine upload --repository testpypi dist/*"
        );
        assert_eq!(
            publisher.prompter.questions.lock().unwrap()[0],
            "Do you want to upload to testpypi?"
        );
        assert_eq!(
            report.install_command().as_deref(),
            Some("pip install -i https://test.pypi.org/simple/ demo-pkg")
        );
    }

    #[tokio::test]
    async fn test_confirm_disabled_skips_prompt() {
        let dir = project();
        let config = PublishConfig {
            confirm: Some(false),
            ..Default::default()
        };
        let publisher = publisher(&dir, config, RecordingRunner::default(), "n");

        let report = publisher.publish().await.unwrap();

        assert_eq!(report.outcome, PublishOutcome::Published);
        assert_eq!(publisher.prompter.asked(), 0);
        assert_eq!(publisher.runner.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_configured_commands_and_name() {
        let dir = project();
        let config = PublishConfig {
            package_name: Some("renamed".to_string()),
            dist_dir: Some("wheelhouse/".to_string()),
            commands: Some(CommandsConfig {
                build: Some(StepCommand::new("uv", &["build", "--out-dir", "wheelhouse"])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let publisher = publisher(&dir, config, RecordingRunner::default(), "y");

        let report = publisher.publish().await.unwrap();

        let calls = publisher.runner.calls();
        assert_eq!(calls[1], "uv build --out-dir wheelhouse");
        assert_eq!(calls[2], "twine check wheelhouse/*");
        assert_eq!(report.package_name.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn test_unparseable_manifest_still_publishes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pyproject.toml"), "not [valid toml").unwrap();
        let publisher = publisher(&dir, PublishConfig::default(), RecordingRunner::default(), "y");

        let report = publisher.publish().await.unwrap();

        assert_eq!(report.outcome, PublishOutcome::Published);
        assert_eq!(report.package_name, None);
        assert_eq!(report.install_command(), None);
    }
}
