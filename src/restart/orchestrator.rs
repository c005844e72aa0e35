//! Restart orchestrator

use crate::compose::{AppConfigEditor, ManifestEditor};
use crate::config::{ConfigHandle, RestartConfig};
use crate::container::ContainerController;
use crate::error::EditError;
use crate::port;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tokio::sync::Mutex;

/// Result of one restart attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartOutcome {
    pub success: bool,
    pub message: String,
    /// Newly assigned port, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl RestartOutcome {
    fn succeeded(port: u16) -> Self {
        Self {
            success: true,
            message: format!("Pangolin restarted successfully with new port: {}", port),
            port: Some(port),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            port: None,
        }
    }
}

/// Step at which a restart attempt stopped.
///
/// The display text is the message reported to the caller.
#[derive(Debug, Error)]
enum RestartError {
    #[error("Failed to stop containers")]
    StopContainers,

    #[error("Failed to update docker-compose.yml")]
    Manifest(#[source] EditError),

    #[error("Failed to update config.yml")]
    AppConfig(#[source] EditError),

    #[error("Failed to start containers")]
    StartContainers,

    #[error("Restart failed: {0}")]
    Unexpected(String),
}

/// Runs the stop, edit, start sequence, one attempt at a time.
///
/// Nothing is rolled back: a failure after the containers are stopped leaves
/// them down, and a failure after the manifest edit leaves the new port in
/// the manifest only. The outcome message names the step that failed.
pub struct RestartOrchestrator {
    config: ConfigHandle,
    controller: ContainerController,
    lock: Mutex<()>,
}

impl RestartOrchestrator {
    pub fn new(config: ConfigHandle, controller: ContainerController) -> Self {
        Self {
            config,
            controller,
            lock: Mutex::new(()),
        }
    }

    /// Configuration handle the orchestrator reads from
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Restart using the configuration that is live once this attempt
    /// reaches the front of the queue
    pub async fn restart_current(&self) -> RestartOutcome {
        let _guard = self.lock.lock().await;
        tracing::debug!("Acquired restart lock");
        let config = self.config.restart_config().await;
        self.restart_locked(&config).await
    }

    /// Run one full restart sequence.
    ///
    /// Concurrent calls queue on an internal lock and run strictly one after
    /// another. Never panics or errors; every failure becomes an outcome.
    pub async fn restart(&self, config: &RestartConfig) -> RestartOutcome {
        let _guard = self.lock.lock().await;
        tracing::debug!("Acquired restart lock");
        self.restart_locked(config).await
    }

    /// Caller holds the restart lock
    async fn restart_locked(&self, config: &RestartConfig) -> RestartOutcome {
        let attempt = AssertUnwindSafe(self.run_sequence(config))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(RestartError::Unexpected(panic_message(&*panic))));

        match attempt {
            Ok(port) => {
                tracing::info!("Successfully restarted Pangolin with new port: {}", port);
                RestartOutcome::succeeded(port)
            }
            Err(e) => {
                match &e {
                    RestartError::Manifest(source) | RestartError::AppConfig(source) => {
                        tracing::error!("Restart aborted: {}: {}", e, source)
                    }
                    _ => tracing::error!("Restart aborted: {}", e),
                }
                RestartOutcome::failed(e.to_string())
            }
        }
    }

    async fn run_sequence(&self, config: &RestartConfig) -> Result<u16, RestartError> {
        let port = port::allocate(config.port_min, config.port_max)
            .map_err(|e| RestartError::Unexpected(e.to_string()))?;

        if !self.controller.stop(config).await {
            return Err(RestartError::StopContainers);
        }

        ManifestEditor::set_gerbil_port(&config.manifest_path(), port)
            .map_err(RestartError::Manifest)?;

        AppConfigEditor::set_gerbil_start_port(&config.app_config_path(), port)
            .map_err(RestartError::AppConfig)?;

        if !self.controller.start(config).await {
            return Err(RestartError::StartContainers);
        }

        Ok(port)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandRunner, ProcessResult};
    use crate::compose::document;
    use crate::config::ServiceConfig;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const MANIFEST: &str = r#"services:
  gerbil:
    image: fosrl/gerbil
    ports:
      - "443:443"
      - "443:443/udp"
      - "8080:8080"
"#;

    const APP_CONFIG: &str = "gerbil:\n  start_port: 51000\n  base_endpoint: example.com\n";

    /// Fails any command containing one of `fail_on`, optionally sleeping first
    #[derive(Default)]
    struct ScriptedRunner {
        fail_on: Vec<&'static str>,
        /// Panic on the first command containing this
        panic_on: Option<&'static str>,
        panicked: AtomicBool,
        delay: Duration,
        commands: StdMutex<Vec<String>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, command: &str, _dir: &Path, _timeout: Duration) -> ProcessResult {
            if self.panic_on.is_some_and(|p| command.contains(p))
                && !self.panicked.swap(true, Ordering::SeqCst)
            {
                panic!("runner exploded");
            }
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.commands.lock().unwrap().push(command.to_string());
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            ProcessResult {
                succeeded: !self.fail_on.iter().any(|f| command.contains(f)),
                ..ProcessResult::default()
            }
        }
    }

    struct Fixture {
        _temp: TempDir,
        config: RestartConfig,
        handle: ConfigHandle,
    }

    impl Fixture {
        fn new(min: u16, max: u16) -> Self {
            let temp = tempdir().unwrap();
            std::fs::create_dir_all(temp.path().join("config")).unwrap();
            std::fs::write(temp.path().join("docker-compose.yml"), MANIFEST).unwrap();
            std::fs::write(temp.path().join("config/config.yml"), APP_CONFIG).unwrap();

            let mut service = ServiceConfig::default();
            service.pangolin.directory = temp.path().to_path_buf();
            service.port_range.min = min;
            service.port_range.max = max;
            service.docker.use_sudo = false;
            let config = service.restart_config();
            let handle = ConfigHandle::new(service, temp.path().join("service_config.json"));

            Self {
                _temp: temp,
                config,
                handle,
            }
        }

        fn orchestrator(&self, runner: Arc<ScriptedRunner>) -> RestartOrchestrator {
            RestartOrchestrator::new(self.handle.clone(), ContainerController::new(runner))
        }

        fn manifest_path(&self) -> PathBuf {
            self.config.manifest_path()
        }

        fn ports(&self) -> Vec<String> {
            let doc = document::load(&self.manifest_path()).unwrap();
            doc["services"]["gerbil"]["ports"]
                .as_sequence()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect()
        }

        fn start_port(&self) -> u64 {
            let doc = document::load(&self.config.app_config_path()).unwrap();
            doc["gerbil"]["start_port"].as_u64().unwrap()
        }
    }

    #[tokio::test]
    async fn test_full_success() {
        let fixture = Fixture::new(52345, 52345);
        let runner = Arc::new(ScriptedRunner::default());
        let orchestrator = fixture.orchestrator(runner.clone());

        let outcome = orchestrator.restart(&fixture.config).await;

        assert_eq!(
            outcome,
            RestartOutcome {
                success: true,
                message: "Pangolin restarted successfully with new port: 52345".to_string(),
                port: Some(52345),
            }
        );
        assert_eq!(fixture.ports(), vec!["52345:52345", "52345:52345/udp", "8080:8080"]);
        assert_eq!(fixture.start_port(), 52345);
        assert_eq!(
            *runner.commands.lock().unwrap(),
            vec!["docker compose down", "docker compose up -d"]
        );
    }

    #[tokio::test]
    async fn test_restart_current_uses_handle() {
        let fixture = Fixture::new(52345, 52345);
        let orchestrator = fixture.orchestrator(Arc::new(ScriptedRunner::default()));

        let outcome = orchestrator.restart_current().await;

        assert!(outcome.success);
        assert_eq!(outcome.port, Some(52345));
    }

    #[tokio::test]
    async fn test_queued_restart_reads_config_after_waiting() {
        let fixture = Fixture::new(52345, 52346);
        let runner = Arc::new(ScriptedRunner {
            delay: Duration::from_millis(200),
            ..Default::default()
        });
        let orchestrator = Arc::new(fixture.orchestrator(runner.clone()));

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.restart_current().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.restart_current().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Lands while the second attempt is queued
        fixture
            .handle
            .apply_patch(serde_json::json!({"docker": {"compose_command": "podman compose"}}))
            .await
            .unwrap();

        assert!(first.await.unwrap().success);
        assert!(second.await.unwrap().success);
        assert_eq!(
            *runner.commands.lock().unwrap(),
            vec![
                "docker compose down",
                "docker compose up -d",
                "podman compose down",
                "podman compose up -d",
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_failure_leaves_files_untouched() {
        let fixture = Fixture::new(52345, 52345);
        let runner = Arc::new(ScriptedRunner {
            fail_on: vec!["down"],
            ..Default::default()
        });
        let orchestrator = fixture.orchestrator(runner.clone());

        let outcome = orchestrator.restart(&fixture.config).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Failed to stop containers");
        assert_eq!(outcome.port, None);
        assert_eq!(std::fs::read_to_string(fixture.manifest_path()).unwrap(), MANIFEST);
        assert_eq!(fixture.start_port(), 51000);
        assert_eq!(runner.commands.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manifest_failure_does_not_restart_containers() {
        let fixture = Fixture::new(52345, 52345);
        std::fs::write(fixture.manifest_path(), "services:\n  pangolin: {}\n").unwrap();
        let runner = Arc::new(ScriptedRunner::default());
        let orchestrator = fixture.orchestrator(runner.clone());

        let outcome = orchestrator.restart(&fixture.config).await;

        assert_eq!(outcome.message, "Failed to update docker-compose.yml");
        assert_eq!(fixture.start_port(), 51000);
        // Containers stay down
        assert_eq!(*runner.commands.lock().unwrap(), vec!["docker compose down"]);
    }

    #[tokio::test]
    async fn test_app_config_failure_leaves_manifest_updated() {
        let fixture = Fixture::new(52345, 52345);
        std::fs::write(fixture.config.app_config_path(), "app: {}\n").unwrap();
        let orchestrator = fixture.orchestrator(Arc::new(ScriptedRunner::default()));

        let outcome = orchestrator.restart(&fixture.config).await;

        assert_eq!(outcome.message, "Failed to update config.yml");
        assert_eq!(fixture.ports()[0], "52345:52345");
    }

    #[tokio::test]
    async fn test_start_failure_leaves_both_files_updated() {
        let fixture = Fixture::new(52345, 52345);
        let runner = Arc::new(ScriptedRunner {
            fail_on: vec!["up -d"],
            ..Default::default()
        });
        let orchestrator = fixture.orchestrator(runner);

        let outcome = orchestrator.restart(&fixture.config).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Failed to start containers");
        assert_eq!(fixture.ports()[1], "52345:52345/udp");
        assert_eq!(fixture.start_port(), 52345);
    }

    #[tokio::test]
    async fn test_invalid_range_is_reported_not_raised() {
        let fixture = Fixture::new(50000, 60000);
        let runner = Arc::new(ScriptedRunner::default());
        let orchestrator = fixture.orchestrator(runner.clone());
        let mut config = fixture.config.clone();
        config.port_min = 60000;
        config.port_max = 50000;

        let outcome = orchestrator.restart(&config).await;

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Restart failed: "));
        assert!(runner.commands.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_in_lower_layer_becomes_outcome() {
        let fixture = Fixture::new(52345, 52345);
        let runner = Arc::new(ScriptedRunner {
            panic_on: Some("down"),
            ..Default::default()
        });
        let orchestrator = fixture.orchestrator(runner);

        let outcome = orchestrator.restart(&fixture.config).await;

        assert_eq!(outcome.message, "Restart failed: runner exploded");

        // The lock is released and later attempts still run
        assert!(orchestrator.restart(&fixture.config).await.success);
    }

    #[tokio::test]
    async fn test_concurrent_restarts_run_sequentially() {
        let fixture = Fixture::new(50000, 60000);
        let runner = Arc::new(ScriptedRunner {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let orchestrator = Arc::new(fixture.orchestrator(runner.clone()));

        let (first, second) = tokio::join!(
            orchestrator.restart(&fixture.config),
            orchestrator.restart(&fixture.config)
        );

        assert!(first.success && second.success);
        assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(
            *runner.commands.lock().unwrap(),
            vec![
                "docker compose down",
                "docker compose up -d",
                "docker compose down",
                "docker compose up -d",
            ]
        );

        // The second attempt edited the files the first one wrote. Its TCP
        // mapping no longer starts with 443:443, so only UDP follows it.
        let first_port = first.port.unwrap();
        let second_port = second.port.unwrap();
        let ports = fixture.ports();
        assert_eq!(ports[0], format!("{}:{}", first_port, first_port));
        assert_eq!(ports[1], format!("{}:{}/udp", second_port, second_port));
        assert_eq!(fixture.start_port(), u64::from(second_port));
    }
}
