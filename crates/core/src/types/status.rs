//! Order status taxonomy.
//!
//! A static registry mapping each status identifier to display metadata and
//! to exactly one lifecycle [`Bucket`]. The bucket function is shared by
//! per-order display and by the admin statistics, so the two never diverge.
//!
//! Statuses are server-driven. Identifiers this build does not know about
//! deserialize to [`OrderStatus::Unknown`] instead of failing, and land in
//! [`Bucket::Unknown`] with a generic label.

use serde::{Deserialize, Serialize};

/// Coarse lifecycle grouping used for aggregate counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Order is still moving through the kitchen or delivery.
    Active,
    /// Order reached the customer.
    Completed,
    /// Order left the happy path (cancelled, failed, refunded).
    Exceptional,
    /// Status identifier not present in the registry.
    Unknown,
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Exceptional => write!(f, "exceptional"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Visual tone hint for status badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Info,
    Progress,
    Warning,
    Success,
    Danger,
    Neutral,
}

/// Display metadata for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusMeta {
    /// Short human label.
    pub label: &'static str,
    /// Lifecycle bucket.
    pub bucket: Bucket,
    /// Badge tone.
    pub tone: Tone,
    /// One-line description for tooltips.
    pub description: &'static str,
}

/// Fallback metadata for identifiers outside the registry.
pub const UNKNOWN_STATUS_META: StatusMeta = StatusMeta {
    label: "Unknown status",
    bucket: Bucket::Unknown,
    tone: Tone::Neutral,
    description: "The kitchen reported a status this app does not recognise yet",
};

/// Order lifecycle status.
///
/// Serialized as the snake_case identifier (`"ready_for_pickup"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Placed,
    Pending,
    Confirmed,
    Preparing,
    Delayed,
    ReadyForPickup,
    Delivering,
    Arrived,
    Delivered,
    PickedUp,
    Cancelled,
    Failed,
    Refunded,
    PartiallyRefunded,
    /// A status introduced by the backend after this build.
    Unknown(String),
}

impl OrderStatus {
    /// Every status in the registry, in lifecycle order.
    pub const KNOWN: [Self; 14] = [
        Self::Placed,
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Delayed,
        Self::ReadyForPickup,
        Self::Delivering,
        Self::Arrived,
        Self::Delivered,
        Self::PickedUp,
        Self::Cancelled,
        Self::Failed,
        Self::Refunded,
        Self::PartiallyRefunded,
    ];

    /// Wire identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Placed => "placed",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Delayed => "delayed",
            Self::ReadyForPickup => "ready_for_pickup",
            Self::Delivering => "delivering",
            Self::Arrived => "arrived",
            Self::Delivered => "delivered",
            Self::PickedUp => "picked_up",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Unknown(id) => id,
        }
    }

    /// Display metadata. Total: unknown identifiers get [`UNKNOWN_STATUS_META`].
    #[must_use]
    pub const fn meta(&self) -> StatusMeta {
        let (label, bucket, tone, description) = match self {
            Self::Placed => (
                "Order placed",
                Bucket::Active,
                Tone::Info,
                "We received your order",
            ),
            Self::Pending => (
                "Pending",
                Bucket::Active,
                Tone::Info,
                "Waiting for the restaurant to accept",
            ),
            Self::Confirmed => (
                "Confirmed",
                Bucket::Active,
                Tone::Info,
                "The restaurant accepted your order",
            ),
            Self::Preparing => (
                "Preparing",
                Bucket::Active,
                Tone::Progress,
                "Your pizza is in the oven",
            ),
            Self::Delayed => (
                "Delayed",
                Bucket::Active,
                Tone::Warning,
                "Running late, new estimate coming soon",
            ),
            Self::ReadyForPickup => (
                "Ready for pickup",
                Bucket::Active,
                Tone::Progress,
                "Your order is waiting at the counter",
            ),
            Self::Delivering => (
                "Out for delivery",
                Bucket::Active,
                Tone::Progress,
                "A driver is on the way",
            ),
            Self::Arrived => (
                "Driver arrived",
                Bucket::Active,
                Tone::Progress,
                "The driver is at your door",
            ),
            Self::Delivered => (
                "Delivered",
                Bucket::Completed,
                Tone::Success,
                "Enjoy your meal",
            ),
            Self::PickedUp => (
                "Picked up",
                Bucket::Completed,
                Tone::Success,
                "Collected at the counter",
            ),
            Self::Cancelled => (
                "Cancelled",
                Bucket::Exceptional,
                Tone::Danger,
                "This order was cancelled",
            ),
            Self::Failed => (
                "Failed",
                Bucket::Exceptional,
                Tone::Danger,
                "Something went wrong with this order",
            ),
            Self::Refunded => (
                "Refunded",
                Bucket::Exceptional,
                Tone::Neutral,
                "The order amount was refunded",
            ),
            Self::PartiallyRefunded => (
                "Partially refunded",
                Bucket::Exceptional,
                Tone::Neutral,
                "Part of the order amount was refunded",
            ),
            Self::Unknown(_) => return UNKNOWN_STATUS_META,
        };

        StatusMeta {
            label,
            bucket,
            tone,
            description,
        }
    }

    /// Lifecycle bucket. Shared by display and admin statistics.
    #[must_use]
    pub const fn bucket(&self) -> Bucket {
        self.meta().bucket
    }

    /// Human label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.meta().label
    }

    /// Whether the identifier is part of the registry.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for OrderStatus {
    fn from(id: String) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|status| status.as_str() == id)
            .unwrap_or(Self::Unknown(id))
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Unknown(id) => id,
            known => known.as_str().to_string(),
        }
    }
}
