//! Running the external config generators.

use super::{ArtifactLayout, ArtifactLocation, GenerationRequest, VpnKind};
use crate::config::{GeneratorCommand, GeneratorConfig};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of asking a generator for one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Generator reported success; the artifact should be at this location
    Success(ArtifactLocation),
    /// Generator failed; trimmed diagnostic text
    Failure(String),
}

/// Something that turns a client name into a config artifact on disk.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome;
}

#[derive(Debug, Error)]
enum InvokeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("generator timed out after {0}s")]
    TimedOut(u64),

    #[error("failed to collect generator output: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs one executable per kind with the client name as last argument.
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    openvpn: GeneratorCommand,
    wireguard: GeneratorCommand,
    layout: ArtifactLayout,
    timeout: Option<Duration>,
}

impl ScriptGenerator {
    pub fn new(
        openvpn: GeneratorCommand,
        wireguard: GeneratorCommand,
        layout: ArtifactLayout,
    ) -> Self {
        Self {
            openvpn,
            wireguard,
            layout,
            timeout: None,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        let generator = Self::new(
            config.openvpn.clone(),
            config.wireguard.clone(),
            ArtifactLayout::from_config(config),
        );
        match config.timeout() {
            Some(limit) => generator.with_timeout(limit),
            None => generator,
        }
    }

    /// Kill generators that run longer than `limit`
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    fn command_for(&self, kind: VpnKind) -> &GeneratorCommand {
        match kind {
            VpnKind::OpenVpn => &self.openvpn,
            VpnKind::WireGuard => &self.wireguard,
        }
    }

    /// Run `command` and collect stdout and stderr as one stream.
    async fn run_combined(
        &self,
        command: &GeneratorCommand,
        client_name: &str,
    ) -> Result<(ExitStatus, Vec<u8>), InvokeError> {
        // One pipe for both streams keeps the order the process wrote in.
        let (reader, writer) = std::io::pipe()?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .arg(client_name)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| InvokeError::Spawn {
            program: command.program.display().to_string(),
            source,
        })?;
        // Close our copies of the write end so the reader sees EOF.
        drop(cmd);

        // A single deadline covers the exit and the end of output, since a
        // background process can keep the pipe open after the child is gone.
        let finished = async {
            let (status, output) = tokio::try_join!(child.wait(), collect(reader))?;
            Ok::<_, InvokeError>((status, output))
        };

        let Some(limit) = self.timeout else {
            return finished.await;
        };
        let timed = tokio::time::timeout_at(Instant::now() + limit, finished).await;
        match timed {
            Ok(result) => result,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out generator {}: {}", command.program.display(), e);
                }
                Err(InvokeError::TimedOut(limit.as_secs()))
            }
        }
    }
}

/// Read the pipe to EOF without tying up a thread.
#[cfg(unix)]
async fn collect(reader: std::io::PipeReader) -> std::io::Result<Vec<u8>> {
    use tokio::io::AsyncReadExt;

    let mut receiver = tokio::net::unix::pipe::Receiver::from_owned_fd(reader.into())?;
    let mut output = Vec::new();
    receiver.read_to_end(&mut output).await?;
    Ok(output)
}

#[cfg(not(unix))]
async fn collect(mut reader: std::io::PipeReader) -> std::io::Result<Vec<u8>> {
    use std::io::Read;

    tokio::task::spawn_blocking(move || {
        let mut output = Vec::new();
        reader.read_to_end(&mut output).map(|_| output)
    })
    .await
    .map_err(|e| std::io::Error::other(e.to_string()))?
}

#[async_trait]
impl Generator for ScriptGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let command = self.command_for(request.kind);
        info!(
            "Running {} for client {}",
            command.program.display(),
            request.client_name
        );

        let (status, output) = match self.run_combined(command, &request.client_name).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "Error executing {} for client {}: {}",
                    command.program.display(),
                    request.client_name,
                    e
                );
                return GenerationOutcome::Failure(e.to_string());
            }
        };

        let output = String::from_utf8_lossy(&output);
        if !status.success() {
            error!(
                "Error executing {} for client {}: {}\nOutput: {}",
                command.program.display(),
                request.client_name,
                status,
                output
            );
            return GenerationOutcome::Failure(output.trim().to_string());
        }

        debug!("Generator output for {}: {}", request.client_name, output.trim());
        GenerationOutcome::Success(self.layout.locate(request.kind, &request.client_name))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;

    fn shell(script: &str) -> GeneratorCommand {
        GeneratorCommand {
            program: "/bin/sh".into(),
            args: vec!["-c".to_string(), script.to_string(), "gen".to_string()],
        }
    }

    fn request(kind: VpnKind, client_name: &str) -> GenerationRequest {
        GenerationRequest {
            actor_id: 42,
            chat_id: 42,
            kind,
            client_name: client_name.to_string(),
        }
    }

    fn layout(root: &Path) -> ArtifactLayout {
        ArtifactLayout::new(root.join("openvpn"), root.join("wireguard"))
    }

    #[tokio::test]
    async fn test_success_points_at_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let wg_dir = dir.path().join("wireguard");
        let script = format!(
            "mkdir -p '{dir}' && echo '[Interface]' > '{dir}/'\"$1\".conf",
            dir = wg_dir.display()
        );
        let generator = ScriptGenerator::new(shell("exit 1"), shell(&script), layout(dir.path()));

        let outcome = generator
            .generate(&request(VpnKind::WireGuard, "user_42_wireguard_100"))
            .await;

        match outcome {
            GenerationOutcome::Success(loc) => {
                assert_eq!(loc.path, wg_dir.join("user_42_wireguard_100.conf"));
                assert!(loc.path.exists());
            }
            other => panic!("Expected Success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_captures_combined_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = "echo 'building keys'; echo 'easyrsa: not found' >&2; exit 3";
        let generator = ScriptGenerator::new(shell(script), shell("exit 0"), layout(dir.path()));

        let outcome = generator
            .generate(&request(VpnKind::OpenVpn, "user_42_openvpn_100"))
            .await;

        assert_eq!(
            outcome,
            GenerationOutcome::Failure("building keys\neasyrsa: not found".to_string())
        );
    }

    #[tokio::test]
    async fn test_client_name_is_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ScriptGenerator::new(
            shell("echo \"name=$1\"; exit 1"),
            shell("exit 0"),
            layout(dir.path()),
        );

        let outcome = generator
            .generate(&request(VpnKind::OpenVpn, "user_7_openvpn_9"))
            .await;

        assert_eq!(
            outcome,
            GenerationOutcome::Failure("name=user_7_openvpn_9".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ScriptGenerator::new(
            GeneratorCommand::new(dir.path().join("no_such_script.sh")),
            shell("exit 0"),
            layout(dir.path()),
        );

        match generator
            .generate(&request(VpnKind::OpenVpn, "user_1_openvpn_1"))
            .await
        {
            GenerationOutcome::Failure(text) => assert!(text.contains("failed to start")),
            other => panic!("Expected Failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_generator() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ScriptGenerator::new(shell("exit 0"), shell("exec sleep 30"), layout(dir.path()))
            .with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let outcome = generator
            .generate(&request(VpnKind::WireGuard, "user_1_wireguard_1"))
            .await;

        assert!(started.elapsed() < Duration::from_secs(10));
        match outcome {
            GenerationOutcome::Failure(text) => assert!(text.contains("timed out")),
            other => panic!("Expected Failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_covers_background_holders() {
        let dir = tempfile::tempdir().unwrap();
        // The script exits at once but its child keeps the output pipe open.
        let generator = ScriptGenerator::new(
            shell("exit 0"),
            shell("sleep 8 & echo started; exit 0"),
            layout(dir.path()),
        )
        .with_timeout(Duration::from_secs(1));

        let started = std::time::Instant::now();
        let outcome = generator
            .generate(&request(VpnKind::WireGuard, "user_1_wireguard_2"))
            .await;

        assert!(started.elapsed() < Duration::from_secs(3));
        match outcome {
            GenerationOutcome::Failure(text) => assert!(text.contains("timed out")),
            other => panic!("Expected Failure, got {:?}", other),
        }
    }
}
