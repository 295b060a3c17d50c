//! Per-recipient message delivery status values.
//!
//! Statuses are stored as text in `message_statuses.status`. The derived
//! ordering (`Sent < Delivered < Seen`) is for display only: the store does
//! not reject regressions, callers are responsible for monotonic writes.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Stored value for a status row created for the sender's own message.
pub const STATUS_SENT: &str = "sent";

/// Stored value once a recipient's session has observed the message.
pub const STATUS_DELIVERED: &str = "delivered";

/// Stored value once a recipient has viewed the group.
pub const STATUS_SEEN: &str = "seen";

const VALID_STATUSES: &[&str] = &[STATUS_SENT, STATUS_DELIVERED, STATUS_SEEN];

/// Delivery state of one message for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Seen,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => STATUS_SENT,
            Self::Delivered => STATUS_DELIVERED,
            Self::Seen => STATUS_SEEN,
        }
    }

    /// Parse a status from its stored text form.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            STATUS_SENT => Ok(Self::Sent),
            STATUS_DELIVERED => Ok(Self::Delivered),
            STATUS_SEEN => Ok(Self::Seen),
            _ => Err(CoreError::Validation(format!(
                "Invalid message status '{s}'. Must be one of: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }

    /// Whether a "double tick" should be shown for this status.
    pub fn is_delivered(&self) -> bool {
        *self >= Self::Delivered
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate indicator for a message across all of its recipients.
///
/// Returns the lowest status among the recipient rows (excluding the
/// sender's own row), or `Sent` when no recipient row exists yet.
pub fn aggregate_status<I>(recipient_statuses: I) -> DeliveryStatus
where
    I: IntoIterator<Item = DeliveryStatus>,
{
    recipient_statuses
        .into_iter()
        .min()
        .unwrap_or(DeliveryStatus::Sent)
}
