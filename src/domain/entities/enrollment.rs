//! Enrollment entity: a user's access grant to a program.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Lifecycle state of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Expired,
    Canceled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Expired => "expired",
            EnrollmentStatus::Canceled => "canceled",
        }
    }
}

impl FromStr for EnrollmentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EnrollmentStatus::Active),
            "expired" => Ok(EnrollmentStatus::Expired),
            "canceled" => Ok(EnrollmentStatus::Canceled),
            other => Err(AppError::bad_request(
                "Unknown enrollment status",
                json!({ "status": other }),
            )),
        }
    }
}

/// A user's access grant to a program. One row exists per (user, program).
#[derive(Debug, Clone, Serialize)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: Uuid,
    pub program_id: i64,
    pub order_id: Option<i64>,
    pub status: EnrollmentStatus,
    pub starts_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// Returns true if the enrollment grants access at `now`.
    ///
    /// An enrollment past its expiry is inactive even if the sweeper has not
    /// yet flipped its status.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == EnrollmentStatus::Active && self.expires_at.is_none_or(|e| now < e)
    }

    /// Returns true for an active enrollment that never expires.
    pub fn is_lifetime(&self) -> bool {
        self.status == EnrollmentStatus::Active && self.expires_at.is_none()
    }

    /// Whole days of access left, rounded up. `None` for lifetime access.
    pub fn remaining_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|e| {
            let seconds = (e - now).num_seconds().max(0);
            (seconds + 86_399) / 86_400
        })
    }
}

/// A request to create or extend an enrollment.
#[derive(Debug, Clone)]
pub struct EnrollmentGrant {
    pub user_id: Uuid,
    pub program_id: i64,
    pub order_id: Option<i64>,
    pub access_days: Option<i32>,
}

/// Access period produced by applying a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPeriod {
    pub starts_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl EnrollmentGrant {
    /// Computes the access period after applying this grant on top of the
    /// user's current enrollment for the program, if any.
    ///
    /// - a lifetime grant always yields lifetime access
    /// - an active enrollment that is already lifetime stays lifetime
    /// - an active enrollment with a future expiry is extended from that expiry
    /// - otherwise access starts at `now`
    pub fn period(&self, current: Option<&Enrollment>, now: DateTime<Utc>) -> AccessPeriod {
        let active = current.filter(|e| e.is_active_at(now));

        let starts_at = active.map(|e| e.starts_at).unwrap_or(now);

        let Some(days) = self.access_days else {
            return AccessPeriod {
                starts_at,
                expires_at: None,
            };
        };

        let expires_at = match active {
            Some(e) if e.expires_at.is_none() => None,
            Some(e) => e.expires_at.map(|exp| exp + Duration::days(days as i64)),
            None => Some(now + Duration::days(days as i64)),
        };

        AccessPeriod {
            starts_at,
            expires_at,
        }
    }
}

/// Access one paid order added to an enrollment, recorded on the order so a
/// refund can take back exactly that much.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAccess {
    /// Days the order bought; `None` for lifetime access.
    pub access_days: Option<i32>,
    /// Expiry of the active enrollment the order extended, if it had one.
    pub prior_expires_at: Option<DateTime<Utc>>,
}

impl OrderAccess {
    /// Records what applying `grant` on top of `current` adds.
    pub fn of(grant: &EnrollmentGrant, current: Option<&Enrollment>, now: DateTime<Utc>) -> Self {
        Self {
            access_days: grant.access_days,
            prior_expires_at: current
                .filter(|e| e.is_active_at(now))
                .and_then(|e| e.expires_at),
        }
    }
}

/// Effect of revoking one order's access on an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    /// The enrollment does not depend on the order.
    Unchanged,
    /// Paid time from other grants remains until the new expiry.
    Shorten(DateTime<Utc>),
    /// No paid time remains.
    Cancel,
}

impl Enrollment {
    /// Takes back the access `order` added.
    ///
    /// - a timed order removes its days from the current expiry
    /// - a lifetime order restores the expiry it replaced
    /// - a timed order on top of lifetime access from elsewhere changes nothing
    pub fn revoke(&self, order: &OrderAccess, now: DateTime<Utc>) -> Revocation {
        if !self.is_active_at(now) {
            return Revocation::Unchanged;
        }

        let remaining = match (order.access_days, self.expires_at) {
            (Some(_), None) => return Revocation::Unchanged,
            (Some(days), Some(expires_at)) => Some(expires_at - Duration::days(days as i64)),
            (None, _) => order.prior_expires_at,
        };

        match remaining {
            Some(expires_at) if expires_at > now => Revocation::Shorten(expires_at),
            _ => Revocation::Cancel,
        }
    }
}

/// A member's enrollment as shown on their dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentOverview {
    pub enrollment: Enrollment,
    pub program_slug: String,
    pub program_title: String,
    pub thumbnail_url: Option<String>,
    pub completed_days: i64,
    pub total_days: i64,
}

/// An enrolled member as shown to the program's coach.
#[derive(Debug, Clone)]
pub struct MemberEnrollment {
    pub enrollment: Enrollment,
    pub display_name: String,
    pub email: String,
    pub completed_days: i64,
    pub total_days: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Percentage of `completed` out of `total`, rounded down; 0 for an empty plan.
pub fn completion_percent(completed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (completed.min(total) * 100) / total
}
