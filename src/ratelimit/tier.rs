//! Principal tiers and their request budgets.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::window::TimeWindow;
use crate::error::TollgateError;

/// Classification of a principal that selects its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
    Enterprise,
    Admin,
}

impl Tier {
    /// All tiers.
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Premium, Tier::Enterprise, Tier::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Enterprise => "enterprise",
            Tier::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TollgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TollgateError::UnknownTier(s.to_string()))
    }
}

/// Request budgets for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Requests allowed per minute
    pub per_minute: u64,
    /// Requests allowed per hour
    pub per_hour: u64,
    /// Requests allowed per day
    pub per_day: u64,
}

impl TierLimits {
    pub const fn new(per_minute: u64, per_hour: u64, per_day: u64) -> Self {
        Self {
            per_minute,
            per_hour,
            per_day,
        }
    }

    /// Get the budget for a window.
    pub fn for_window(&self, window: TimeWindow) -> u64 {
        match window {
            TimeWindow::Minute => self.per_minute,
            TimeWindow::Hour => self.per_hour,
            TimeWindow::Day => self.per_day,
        }
    }
}

/// Source of tier budgets.
///
/// The limiter only ever asks for the limits of a tier; whether they come
/// from a static table, environment or remote config is up to the
/// implementation. Implementations must be total over [`Tier`].
pub trait TierLimitsSource: Send + Sync {
    fn limits(&self, tier: Tier) -> TierLimits;
}

/// A static tier → limits table, one entry per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    #[serde(default = "default_free")]
    pub free: TierLimits,
    #[serde(default = "default_premium")]
    pub premium: TierLimits,
    #[serde(default = "default_enterprise")]
    pub enterprise: TierLimits,
    #[serde(default = "default_admin")]
    pub admin: TierLimits,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            free: default_free(),
            premium: default_premium(),
            enterprise: default_enterprise(),
            admin: default_admin(),
        }
    }
}

fn default_free() -> TierLimits {
    TierLimits::new(60, 1_000, 10_000)
}

fn default_premium() -> TierLimits {
    TierLimits::new(300, 10_000, 100_000)
}

fn default_enterprise() -> TierLimits {
    TierLimits::new(1_000, 50_000, 1_000_000)
}

fn default_admin() -> TierLimits {
    TierLimits::new(10_000, 1_000_000, 10_000_000)
}

impl TierTable {
    /// Get the limits for a tier.
    pub fn get(&self, tier: Tier) -> &TierLimits {
        match tier {
            Tier::Free => &self.free,
            Tier::Premium => &self.premium,
            Tier::Enterprise => &self.enterprise,
            Tier::Admin => &self.admin,
        }
    }

    /// Replace the limits for a tier.
    pub fn set(&mut self, tier: Tier, limits: TierLimits) {
        match tier {
            Tier::Free => self.free = limits,
            Tier::Premium => self.premium = limits,
            Tier::Enterprise => self.enterprise = limits,
            Tier::Admin => self.admin = limits,
        }
    }

    /// Reject any zero budget.
    pub fn validate(&self) -> crate::error::Result<()> {
        for tier in Tier::ALL {
            let limits = self.get(tier);
            for window in TimeWindow::ALL {
                if limits.for_window(window) == 0 {
                    return Err(TollgateError::Config(format!(
                        "tier '{}' has a zero per-{} limit",
                        tier, window
                    )));
                }
            }
        }
        Ok(())
    }
}

impl TierLimitsSource for TierTable {
    fn limits(&self, tier: Tier) -> TierLimits {
        *self.get(tier)
    }
}
