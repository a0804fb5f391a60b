use serde::{Deserialize, Serialize};

/// An already-authenticated principal, as supplied by the request layer.
/// Authentication happens upstream; the booking engine only needs to know
/// who is acting and whether they carry staff privileges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub is_staff: bool,
}

impl Actor {
    pub fn requester(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_staff: false,
        }
    }

    pub fn staff(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_staff: true,
        }
    }

    /// Staff may act on any booking; everyone else only on their own.
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.is_staff || self.id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_staff_access() {
        let owner = Actor::requester("user-1");
        let other = Actor::requester("user-2");
        let admin = Actor::staff("ops-1");

        assert!(owner.can_manage("user-1"));
        assert!(!other.can_manage("user-1"));
        assert!(admin.can_manage("user-1"));
    }
}
