//! Turn classification output

use serde::{Deserialize, Serialize};

/// Maneuver performed by an object crossing the intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Straight,
    Left,
    Right,
}

impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Turn::Straight => write!(f, "straight"),
            Turn::Left => write!(f, "left"),
            Turn::Right => write!(f, "right"),
        }
    }
}

/// A detected turn of one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTurn {
    pub object_id: String,
    pub turn: Turn,
}

impl ObjectTurn {
    pub fn new(object_id: impl Into<String>, turn: Turn) -> Self {
        Self {
            object_id: object_id.into(),
            turn,
        }
    }

    /// Serialize to a single JSON line
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for ObjectTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Turn[{}: {}]", self.object_id, self.turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serialization() {
        let turn = ObjectTurn::new("cam1/3", Turn::Right);
        let json = turn.to_json_line().unwrap();
        assert_eq!(json, r#"{"object_id":"cam1/3","turn":"right"}"#);
    }

    #[test]
    fn test_turn_display() {
        let turn = ObjectTurn::new("cam1/3", Turn::Straight);
        assert_eq!(turn.to_string(), "Turn[cam1/3: straight]");
    }
}
