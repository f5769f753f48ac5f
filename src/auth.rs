//! Identity gate: the only privilege boundary of the bot.

use std::collections::HashSet;

/// Read-only set of Telegram user ids allowed to talk to the bot.
///
/// Built once at startup and shared by reference; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ids: HashSet<i64>,
}

impl AllowList {
    pub fn new<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Allow-list holding the configured operator, or nobody.
    pub fn from_operator(operator_id: Option<i64>) -> Self {
        Self::new(operator_id)
    }

    pub fn is_authorized(&self, actor_id: i64) -> bool {
        self.ids.contains(&actor_id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
