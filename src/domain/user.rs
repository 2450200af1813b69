use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    MessOwner,
    Admin,
}

impl UserRole {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(Self::Customer),
            "mess_owner" => Some(Self::MessOwner),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::MessOwner => "mess_owner",
            Self::Admin => "admin",
        }
    }

    /// Static role gating table. Admins can do everything.
    pub fn allows(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Self::Admin => true,
            Self::Customer => matches!(capability, Subscribe | RequestMessCut),
            Self::MessOwner => matches!(
                capability,
                ManageMess | ManageMenu | AcknowledgeMessCut | MarkDelivered
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageMess,
    ManageMenu,
    Subscribe,
    RequestMessCut,
    AcknowledgeMessCut,
    MarkDelivered,
    ListUsers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_capabilities() {
        let role = UserRole::Customer;
        assert!(role.allows(Capability::Subscribe));
        assert!(role.allows(Capability::RequestMessCut));
        assert!(!role.allows(Capability::ManageMess));
        assert!(!role.allows(Capability::AcknowledgeMessCut));
        assert!(!role.allows(Capability::ListUsers));
    }

    #[test]
    fn owner_capabilities() {
        let role = UserRole::MessOwner;
        assert!(role.allows(Capability::ManageMess));
        assert!(role.allows(Capability::ManageMenu));
        assert!(role.allows(Capability::AcknowledgeMessCut));
        assert!(!role.allows(Capability::Subscribe));
    }

    #[test]
    fn admin_allows_everything() {
        for capability in [
            Capability::ManageMess,
            Capability::ManageMenu,
            Capability::Subscribe,
            Capability::RequestMessCut,
            Capability::AcknowledgeMessCut,
            Capability::MarkDelivered,
            Capability::ListUsers,
        ] {
            assert!(UserRole::Admin.allows(capability));
        }
    }

    #[test]
    fn role_round_trips_through_db_labels() {
        for role in [UserRole::Customer, UserRole::MessOwner, UserRole::Admin] {
            assert_eq!(UserRole::from_db(role.as_db()), Some(role));
        }
        assert_eq!(UserRole::from_db("root"), None);
    }
}
