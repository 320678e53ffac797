use std::time::Duration;

use dashmap::DashMap;

/// Active-user presence: user id -> expiry (epoch ms).
///
/// An entry is live while `now < expiry`. Re-marking a live user moves its
/// expiry forward instead of adding a second entry.
pub struct SessionTracker {
    users: DashMap<String, u64>,
    expiry: Duration,
}

impl SessionTracker {
    pub fn new(expiry: Duration) -> Self {
        Self {
            users: DashMap::new(),
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn mark_active(&self, user_id: &str, now_ms: u64) {
        let expires_at = now_ms.saturating_add(self.expiry.as_millis() as u64);
        if let Some(mut e) = self.users.get_mut(user_id) {
            *e = expires_at;
            return;
        }
        self.users.insert(user_id.to_string(), expires_at);
    }

    pub fn mark_inactive(&self, user_id: &str) {
        self.users.remove(user_id);
    }

    /// Drop every entry whose expiry is at or before `now_ms`.
    /// Returns how many were removed.
    pub fn sweep_expired(&self, now_ms: u64) -> usize {
        let before = self.users.len();
        self.users.retain(|user, expires_at| {
            let live = *expires_at > now_ms;
            if !live {
                tracing::debug!(user = %user, "evicted inactive user");
            }
            live
        });
        before.saturating_sub(self.users.len())
    }

    pub fn is_active(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
