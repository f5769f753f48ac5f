pub mod artifact;
pub mod generator;
pub mod naming;

pub use artifact::{ArtifactLayout, ArtifactLocation};
pub use generator::{GenerationOutcome, Generator, ScriptGenerator};
pub use naming::{derive_client_name, ClientNamer};

use std::fmt;

/// The VPN config types the bot can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VpnKind {
    OpenVpn,
    WireGuard,
}

impl VpnKind {
    /// All kinds, in menu order
    pub const ALL: [VpnKind; 2] = [VpnKind::OpenVpn, VpnKind::WireGuard];

    /// Button label, also the only text accepted as a choice
    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenVpn => "OpenVPN",
            Self::WireGuard => "WireGuard",
        }
    }

    /// Exact, case-sensitive match against the button labels
    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == text)
    }

    /// Lower-cased label used inside client names
    pub fn slug(&self) -> &'static str {
        match self {
            Self::OpenVpn => "openvpn",
            Self::WireGuard => "wireguard",
        }
    }

    /// Extension of the generated profile
    pub fn extension(&self) -> &'static str {
        match self {
            Self::OpenVpn => "ovpn",
            Self::WireGuard => "conf",
        }
    }
}

impl fmt::Display for VpnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One "give me a config" request, fixed once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub actor_id: i64,
    pub chat_id: i64,
    pub kind: VpnKind,
    pub client_name: String,
}
