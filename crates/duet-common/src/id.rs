use serde::{Deserialize, Serialize};
use std::fmt;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(new_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type! {
    /// Identifier of an authenticated participant. Assigned once by the
    /// identity service, never reused.
    UserId
}

id_type! {
    /// Identifier of a pairing session (not the human-typed code).
    PairingId
}

id_type! {
    /// Identifier of one physical transport connection instance.
    ConnectionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn new_id_is_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }

    #[test]
    fn user_id_display_matches_as_str() {
        let uid = UserId::new();
        assert_eq!(uid.to_string(), uid.as_str());
    }

    #[test]
    fn ids_are_distinct_per_instance() {
        assert_ne!(PairingId::new(), PairingId::new());
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn id_equality_and_hash() {
        use std::collections::HashSet;
        let a = UserId::new();
        let b = a.clone();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn id_from_str_round_trips() {
        let uid = UserId::from("alice-uuid");
        assert_eq!(uid.as_str(), "alice-uuid");
    }

    #[test]
    fn id_serialization() {
        let pid = PairingId::new();
        let json = serde_json::to_string(&pid).unwrap();
        let back: PairingId = serde_json::from_str(&json).unwrap();
        assert_eq!(pid, back);
    }
}
