use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

/// A booked appointment, owned by the booking subsystem.
///
/// The settlement engine only reads sessions: the end time decides which
/// cycle a session settles in, and the completion flag gates confirmation
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSession {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Agreed session rate; unset sessions fall back to the configured default.
    pub rate: Option<Money>,
    pub completed: bool,
}

impl AppointmentSession {
    pub fn has_ended_by(&self, as_of: DateTime<Utc>) -> bool {
        self.ends_at <= as_of
    }
}
