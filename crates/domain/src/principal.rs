//! The authenticated caller and the single admin predicate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use store::{Order, UserId};

use crate::DomainError;

/// What a principal may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("Unknown role '{other}'"))),
        }
    }
}

/// An authenticated caller, as issued by the session collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    /// The one admin check every admin-only operation goes through.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `NotAuthorized` unless the principal is an admin.
    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::not_authorized("Not authorized as an admin"))
        }
    }

    /// Owners and admins may read an order.
    pub fn can_view(&self, order: &Order) -> bool {
        self.is_admin() || order.is_owned_by(self.user_id)
    }
}
