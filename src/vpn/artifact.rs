//! Where generators leave their output, and how it is picked up and removed.

use super::VpnKind;
use crate::config::GeneratorConfig;
use crate::error::RequestError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Root directories the generator scripts write into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub openvpn_dir: PathBuf,
    pub wireguard_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(openvpn_dir: P, wireguard_dir: Q) -> Self {
        Self {
            openvpn_dir: openvpn_dir.into(),
            wireguard_dir: wireguard_dir.into(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(&config.openvpn_dir, &config.wireguard_dir)
    }

    /// Path the generator for `kind` writes to for `client_name`:
    /// - OpenVPN: `<openvpn_dir>/<name>/<name>.ovpn`
    /// - WireGuard: `<wireguard_dir>/<name>.conf`
    pub fn locate(&self, kind: VpnKind, client_name: &str) -> ArtifactLocation {
        let file_name = format!("{}.{}", client_name, kind.extension());
        match kind {
            VpnKind::OpenVpn => {
                let container = self.openvpn_dir.join(client_name);
                ArtifactLocation {
                    kind,
                    path: container.join(file_name),
                    container: Some(container),
                }
            }
            VpnKind::WireGuard => ArtifactLocation {
                kind,
                path: self.wireguard_dir.join(file_name),
                container: None,
            },
        }
    }
}

/// Expected artifact of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub kind: VpnKind,
    pub path: PathBuf,
    /// Per-request directory removed together with the file
    pub container: Option<PathBuf>,
}

/// Artifact read into memory, ready to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ArtifactLocation {
    /// Base name sent to the user
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Check the generator actually produced the file, then read it whole.
    pub async fn load(&self) -> Result<LoadedArtifact, RequestError> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| RequestError::ArtifactUnreadable {
                path: self.path.clone(),
                source,
            })?;
        if !exists {
            return Err(RequestError::ArtifactMissing {
                path: self.path.clone(),
            });
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| RequestError::ArtifactUnreadable {
                path: self.path.clone(),
                source,
            })?;

        Ok(LoadedArtifact {
            file_name: self.file_name(),
            bytes,
        })
    }

    /// Best-effort removal of the file and its container.
    ///
    /// Every removal is attempted; failures are logged and returned, never
    /// retried.
    pub async fn cleanup(&self) -> Vec<RequestError> {
        let mut failures = Vec::new();

        if let Err(source) = tokio::fs::remove_file(&self.path).await {
            failures.push(RequestError::CleanupFailed {
                path: self.path.clone(),
                source,
            });
        }

        if let Some(container) = &self.container {
            if let Err(source) = remove_container(container).await {
                failures.push(RequestError::CleanupFailed {
                    path: container.clone(),
                    source,
                });
            }
        }

        for failure in &failures {
            warn!("Cleanup failed: {}", failure);
        }
        if failures.is_empty() {
            debug!("Removed artifact {}", self.path.display());
        }

        failures
    }
}

/// The container is per-request, so anything left inside it is ours.
async fn remove_container(container: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(container).await {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openvpn_location() {
        let layout = ArtifactLayout::new("/tmp/openvpn_configs", "/tmp/wireguard_configs");
        let loc = layout.locate(VpnKind::OpenVpn, "user_42_openvpn_100");
        assert_eq!(
            loc.path,
            PathBuf::from("/tmp/openvpn_configs/user_42_openvpn_100/user_42_openvpn_100.ovpn")
        );
        assert_eq!(
            loc.container,
            Some(PathBuf::from("/tmp/openvpn_configs/user_42_openvpn_100"))
        );
        assert_eq!(loc.file_name(), "user_42_openvpn_100.ovpn");
    }

    #[test]
    fn test_wireguard_location() {
        let layout = ArtifactLayout::new("/tmp/openvpn_configs", "/tmp/wireguard_configs");
        let loc = layout.locate(VpnKind::WireGuard, "user_42_wireguard_100");
        assert_eq!(
            loc.path,
            PathBuf::from("/tmp/wireguard_configs/user_42_wireguard_100.conf")
        );
        assert_eq!(loc.container, None);
        assert_eq!(loc.file_name(), "user_42_wireguard_100.conf");
    }

    #[tokio::test]
    async fn test_load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("ovpn"), dir.path().join("wg"));
        let loc = layout.locate(VpnKind::WireGuard, "user_1_wireguard_1");

        match loc.load().await {
            Err(RequestError::ArtifactMissing { path }) => assert_eq!(path, loc.path),
            other => panic!("Expected ArtifactMissing, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_unreadable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("ovpn"), dir.path().join("wg"));
        let loc = layout.locate(VpnKind::WireGuard, "user_1_wireguard_1");
        // Exists, but reading it fails.
        std::fs::create_dir_all(&loc.path).unwrap();

        match loc.load().await {
            Err(RequestError::ArtifactUnreadable { path, .. }) => assert_eq!(path, loc.path),
            other => panic!("Expected ArtifactUnreadable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_and_cleanup_openvpn() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("ovpn"), dir.path().join("wg"));
        let loc = layout.locate(VpnKind::OpenVpn, "user_1_openvpn_1");

        let container = loc.container.clone().unwrap();
        std::fs::create_dir_all(&container).unwrap();
        std::fs::write(&loc.path, b"client\nremote vpn.example.com 1194\n").unwrap();
        std::fs::write(container.join("user_1_openvpn_1.key"), b"secret").unwrap();

        let loaded = loc.load().await.unwrap();
        assert_eq!(loaded.file_name, "user_1_openvpn_1.ovpn");
        assert!(loaded.bytes.starts_with(b"client"));

        assert!(loc.cleanup().await.is_empty());
        assert!(!loc.path.exists());
        assert!(!container.exists());
        assert!(dir.path().join("ovpn").exists());
    }

    #[tokio::test]
    async fn test_cleanup_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("ovpn"), dir.path().join("wg"));
        let loc = layout.locate(VpnKind::WireGuard, "user_1_wireguard_1");

        let failures = loc.cleanup().await;
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], RequestError::CleanupFailed { .. }));
    }
}
