//! Subscriber model types.

use serde::{Deserialize, Serialize};

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub i64);

impl SubscriberId {
    /// Create a new subscriber ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription plan controlling entitlements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free tier: email notifications, basic analysis, no drafts.
    #[default]
    Free,
    /// Starter tier: adds Telegram, full analysis, one draft variant.
    Starter,
    /// Professional tier: adds SMS and three draft variants.
    Professional,
    /// Enterprise tier: same pipeline entitlements as professional.
    Enterprise,
}

impl Plan {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "starter" => Self::Starter,
            "professional" => Self::Professional,
            "enterprise" => Self::Enterprise,
            _ => Self::Free,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    /// Whether the plan runs the full analysis workflow.
    ///
    /// Free-tier accounts get preprocessing and sentiment only, with
    /// priority derived from sentiment.
    #[must_use]
    pub const fn full_analysis(self) -> bool {
        !matches!(self, Self::Free)
    }

    /// Number of response-draft variants the plan may generate.
    ///
    /// Zero means draft generation is unavailable and must be rejected
    /// before the generator is invoked.
    #[must_use]
    pub const fn draft_variant_limit(self) -> u32 {
        match self {
            Self::Free => 0,
            Self::Starter => 1,
            Self::Professional | Self::Enterprise => 3,
        }
    }
}

/// A paying (or free-tier) user owning mailbox accounts.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Unique identifier.
    pub id: SubscriberId,
    /// Login/contact email address.
    pub email: String,
    /// Current subscription plan.
    pub plan: Plan,
    /// Whether the subscriber may use the service.
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_roundtrip() {
        for plan in [
            Plan::Free,
            Plan::Starter,
            Plan::Professional,
            Plan::Enterprise,
        ] {
            assert_eq!(Plan::parse(plan.as_str()), plan);
        }
    }

    #[test]
    fn unknown_plan_defaults_to_free() {
        assert_eq!(Plan::parse("platinum"), Plan::Free);
    }

    #[test]
    fn draft_limits_follow_plan() {
        assert_eq!(Plan::Free.draft_variant_limit(), 0);
        assert_eq!(Plan::Starter.draft_variant_limit(), 1);
        assert_eq!(Plan::Professional.draft_variant_limit(), 3);
        assert_eq!(Plan::Enterprise.draft_variant_limit(), 3);
    }

    #[test]
    fn only_free_uses_basic_analysis() {
        assert!(!Plan::Free.full_analysis());
        assert!(Plan::Starter.full_analysis());
        assert!(Plan::Professional.full_analysis());
    }
}
