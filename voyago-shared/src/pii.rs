use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps contact data so it cannot leak through Debug/Display formatting
/// (log lines, error messages). Serialization is untouched, since storage
/// and API payloads need the real value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Redacted<T>(T);

impl<T> Redacted<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Deliberate access to the wrapped value. Callers own the exposure.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Redacted<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted>")
    }
}

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted>")
    }
}

impl<T: Serialize> Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_is_masked() {
        let email = Redacted::new("traveler@example.com".to_string());
        assert_eq!(format!("{:?}", email), "<redacted>");
        assert_eq!(format!("{}", email), "<redacted>");
        assert_eq!(email.expose(), "traveler@example.com");
    }

    #[test]
    fn test_serialization_keeps_value() {
        let email = Redacted::new("traveler@example.com".to_string());
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"traveler@example.com\"");

        let back: Redacted<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_inner(), "traveler@example.com");
    }
}
