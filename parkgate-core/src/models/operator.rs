//! Operator identity and zone scoping.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Role of the logged-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperatorRole {
    /// Attendant bound to one zone; acts on payment prompts.
    #[default]
    Operator,
    /// Supervisor seeing every zone; never prompted.
    Admin,
}

/// The user driving the desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Operator {
    /// Role.
    pub role: OperatorRole,
    /// Assigned parking zone.
    pub zone: Option<String>,
}

impl Operator {
    /// Creates a zone-scoped operator.
    pub fn for_zone(zone: impl Into<String>) -> Self {
        Self {
            role: OperatorRole::Operator,
            zone: Some(zone.into()),
        }
    }

    /// Creates an admin seeing every zone.
    pub fn admin() -> Self {
        Self {
            role: OperatorRole::Admin,
            zone: None,
        }
    }

    /// Checks the session is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingZone`] for an operator without a zone.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.role == OperatorRole::Operator && self.assigned_zone().is_none() {
            return Err(CoreError::MissingZone);
        }
        Ok(())
    }

    /// Zone assigned to this user, if any.
    pub fn assigned_zone(&self) -> Option<&str> {
        self.zone.as_deref().map(str::trim).filter(|z| !z.is_empty())
    }

    /// Zone every search and event is restricted to, if any.
    pub fn scoped_zone(&self) -> Option<&str> {
        match self.role {
            OperatorRole::Operator => self.assigned_zone(),
            OperatorRole::Admin => None,
        }
    }

    /// Returns true if events from `zone` are relevant to this user.
    pub fn accepts_zone(&self, zone: Option<&str>) -> bool {
        match self.scoped_zone() {
            Some(scoped) => zone == Some(scoped),
            None => true,
        }
    }

    /// Returns true if `Pending` vehicles should prompt this user for payment.
    pub fn requires_payment_prompts(&self) -> bool {
        self.role == OperatorRole::Operator
    }
}
