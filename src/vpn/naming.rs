//! Client names: the only key tying a request to its artifact on disk.

use super::VpnKind;
use dashmap::DashMap;

/// `user_<actor>_<kind>_<unix seconds>`.
///
/// Only ASCII digits, lower-case letters, `-` and `_`, so the name is safe
/// both as a path component and as a script argument.
pub fn derive_client_name(actor_id: i64, kind: VpnKind, unix_secs: i64) -> String {
    format!("user_{}_{}_{}", actor_id, kind.slug(), unix_secs)
}

#[derive(Debug, Clone, Copy)]
struct LastIssued {
    unix_secs: i64,
    count: u32,
}

/// Hands out client names that never repeat within a process.
///
/// The first name issued in a given second for an (actor, kind) pair is
/// exactly [`derive_client_name`]; later ones in the same second get a
/// `_<n>` suffix starting at 2.
#[derive(Debug, Default)]
pub struct ClientNamer {
    issued: DashMap<(i64, VpnKind), LastIssued>,
}

impl ClientNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for a request made now
    pub fn next(&self, actor_id: i64, kind: VpnKind) -> String {
        self.next_at(actor_id, kind, chrono::Utc::now().timestamp())
    }

    /// Name for a request made at `unix_secs`
    pub fn next_at(&self, actor_id: i64, kind: VpnKind, unix_secs: i64) -> String {
        let mut entry = self
            .issued
            .entry((actor_id, kind))
            .or_insert(LastIssued {
                unix_secs,
                count: 0,
            });

        // A clock step backwards stays in the latest bucket.
        if unix_secs > entry.unix_secs {
            *entry = LastIssued {
                unix_secs,
                count: 0,
            };
        }
        entry.count += 1;

        let base = derive_client_name(actor_id, kind, entry.unix_secs);
        match entry.count {
            1 => base,
            n => format!("{}_{}", base, n),
        }
    }
}
