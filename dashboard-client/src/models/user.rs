//! Read-only auth context shared by the workflow pages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
    Partner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Partner => "partner",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "employee" => Role::Employee,
            _ => Role::Partner,
        }
    }

    /// Role-parameterized route back to the requisition list, used as the
    /// post-submit redirect target.
    pub fn requisition_list_route(&self) -> String {
        format!("/{}/requisitions", self.as_str())
    }
}

/// The authenticated user. Read-only from the perspective of the workflow
/// components.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_route_is_role_parameterized() {
        assert_eq!(Role::Admin.requisition_list_route(), "/admin/requisitions");
        assert_eq!(
            Role::Partner.requisition_list_route(),
            "/partner/requisitions"
        );
    }
}
