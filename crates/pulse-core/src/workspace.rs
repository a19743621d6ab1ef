use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PulseError;

// ---------------------------------------------------------------------------
// Billing linkage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "unpaid" => Ok(SubscriptionStatus::Unpaid),
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            _ => Err(PulseError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            _ => Err(PulseError::InvalidInput(format!("unknown plan '{s}'"))),
        }
    }
}

/// Opaque ids held by the billing provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub plan: Plan,
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    #[serde(default)]
    pub billing: BillingLink,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            invite_code: new_invite_code(),
            billing: BillingLink::default(),
            created_at: Utc::now(),
        }
    }
}

/// Short shareable code for the sign-up link.
fn new_invite_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

pub const DEFAULT_ROLE: &str = "cofounder";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub workspace_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn new(workspace_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: workspace_id.into(),
            email: email.into(),
            full_name: None,
            role: DEFAULT_ROLE.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }

    /// Two-letter avatar initials from the name, else the email.
    pub fn initials(&self) -> String {
        match self.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => name
                .split_whitespace()
                .filter_map(|part| part.chars().next())
                .take(2)
                .collect::<String>()
                .to_uppercase(),
            None => self.email.chars().take(2).collect::<String>().to_uppercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_workspace_defaults_to_free_trial() {
        let ws = Workspace::new("Acme");
        assert_eq!(ws.billing.plan, Plan::Free);
        assert_eq!(ws.billing.subscription_status, SubscriptionStatus::Trialing);
        assert!(ws.billing.customer_id.is_none());
        assert_eq!(ws.invite_code.len(), 10);
    }

    #[test]
    fn invite_codes_differ() {
        assert_ne!(Workspace::new("a").invite_code, Workspace::new("b").invite_code);
    }

    #[test]
    fn member_initials() {
        let m = Member::new("w", "ada@example.com").with_name("Ada King Lovelace");
        assert_eq!(m.initials(), "AK");
        let anon = Member::new("w", "bob@example.com");
        assert_eq!(anon.initials(), "BO");
        assert_eq!(anon.display_name(), "bob@example.com");
    }

    #[test]
    fn subscription_status_roundtrip() {
        for s in ["trialing", "active", "past_due", "canceled", "unpaid", "incomplete"] {
            let status: SubscriptionStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
    }
}
