use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Other,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Person => write!(f, "PER"),
            EntityType::Organization => write!(f, "ORG"),
            EntityType::Location => write!(f, "LOC"),
            EntityType::Other => write!(f, "MISC"),
        }
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PER" | "PERSON" | "PESSOA" => EntityType::Person,
            "ORG" | "ORGANIZATION" | "ORGANIZAÇÃO" | "ORGANIZACAO" => EntityType::Organization,
            "LOC" | "LOCATION" | "LOCAL" | "GPE" => EntityType::Location,
            _ => EntityType::Other,
        }
    }
}

/// A typed span reported by the entity recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHit {
    pub text: String,
    pub entity_type: EntityType,
}

impl EntityHit {
    pub fn new(text: &str, entity_type: EntityType) -> Self {
        EntityHit {
            text: text.to_string(),
            entity_type,
        }
    }

    pub fn person(text: &str) -> Self {
        Self::new(text, EntityType::Person)
    }

    pub fn is_person(&self) -> bool {
        self.entity_type == EntityType::Person
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_from_tag() {
        assert_eq!(EntityType::from("PER"), EntityType::Person);
        assert_eq!(EntityType::from("person"), EntityType::Person);
        assert_eq!(EntityType::from(" Pessoa "), EntityType::Person);
        assert_eq!(EntityType::from("ORG"), EntityType::Organization);
        assert_eq!(EntityType::from("organização"), EntityType::Organization);
        assert_eq!(EntityType::from("LOC"), EntityType::Location);
        assert_eq!(EntityType::from("MISC"), EntityType::Other);
        assert_eq!(EntityType::from(""), EntityType::Other);
    }

    #[test]
    fn test_display_round_trips_through_from() {
        for entity_type in [
            EntityType::Person,
            EntityType::Organization,
            EntityType::Location,
            EntityType::Other,
        ] {
            assert_eq!(EntityType::from(entity_type.to_string().as_str()), entity_type);
        }
    }
}
