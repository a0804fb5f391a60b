use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A place trips travel to. Owned by the catalog; bookings reference it
/// only through the trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Destination {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            country: country.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_joins_name_and_country() {
        let destination = Destination::new("Marrakesh", "Morocco");
        assert_eq!(destination.display_name(), "Marrakesh, Morocco");
        assert!(destination.description.is_none());
    }
}
