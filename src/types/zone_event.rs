//! Zone-crossing events consumed by the collector
//!
//! Events arrive as JSON lines. The object is identified either by a plain
//! `object_id` or by the `node` / `luid` pair some camera nodes publish,
//! which is folded into the `node/luid` form.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relation between a tracked object and a zone boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneRelation {
    /// The object entered the zone
    Entered,
    /// The object left the zone
    Left,
    /// The object crossed the zone without lingering in it
    Through,
    /// The tracker dropped the object for good
    Deleted,
}

impl std::fmt::Display for ZoneRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneRelation::Entered => write!(f, "ENTERED"),
            ZoneRelation::Left => write!(f, "LEFT"),
            ZoneRelation::Through => write!(f, "THROUGH"),
            ZoneRelation::Deleted => write!(f, "DELETED"),
        }
    }
}

impl FromStr for ZoneRelation {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "entered" => Ok(ZoneRelation::Entered),
            "left" => Ok(ZoneRelation::Left),
            "through" => Ok(ZoneRelation::Through),
            "deleted" => Ok(ZoneRelation::Deleted),
            _ => Err(EventParseError::UnknownRelation(s.to_string())),
        }
    }
}

/// Errors raised while decoding an input event
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown zone relation: {0}")]
    UnknownRelation(String),
    #[error("event has neither object_id nor node/luid")]
    MissingObjectId,
    #[error("{0} event without zone id")]
    MissingZone(ZoneRelation),
}

/// A single zone-crossing observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawZoneEvent")]
pub struct ZoneEvent {
    /// Tracked object identifier (partition key)
    pub object_id: String,

    /// Zone identifier, empty for `Deleted`
    #[serde(rename = "zone")]
    pub zone_id: String,

    pub relation: ZoneRelation,

    /// Event time in epoch millis
    #[serde(rename = "ts")]
    pub timestamp: i64,

    /// Index of the originating video frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<i64>,
}

/// Wire shape before validation
#[derive(Deserialize)]
struct RawZoneEvent {
    #[serde(default, alias = "track_id")]
    object_id: Option<String>,
    #[serde(default)]
    node: Option<String>,
    #[serde(default)]
    luid: Option<i64>,
    #[serde(default)]
    zone: Option<String>,
    relation: String,
    ts: i64,
    #[serde(default)]
    frame_index: Option<i64>,
}

impl TryFrom<RawZoneEvent> for ZoneEvent {
    type Error = EventParseError;

    fn try_from(raw: RawZoneEvent) -> Result<Self, Self::Error> {
        let relation: ZoneRelation = raw.relation.parse()?;
        let object_id = match (raw.object_id, raw.node, raw.luid) {
            (Some(id), _, _) if !id.is_empty() => id,
            (_, Some(node), Some(luid)) => format!("{}/{}", node, luid),
            _ => return Err(EventParseError::MissingObjectId),
        };
        let zone_id = raw.zone.unwrap_or_default();
        if zone_id.is_empty() && relation != ZoneRelation::Deleted {
            return Err(EventParseError::MissingZone(relation));
        }

        Ok(ZoneEvent {
            object_id,
            zone_id,
            relation,
            timestamp: raw.ts,
            frame_index: raw.frame_index,
        })
    }
}

impl ZoneEvent {
    pub fn new(
        object_id: impl Into<String>,
        zone_id: impl Into<String>,
        relation: ZoneRelation,
        timestamp: i64,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            zone_id: zone_id.into(),
            relation,
            timestamp,
            frame_index: None,
        }
    }

    pub fn entered(object_id: &str, zone_id: &str, timestamp: i64) -> Self {
        Self::new(object_id, zone_id, ZoneRelation::Entered, timestamp)
    }

    pub fn left(object_id: &str, zone_id: &str, timestamp: i64) -> Self {
        Self::new(object_id, zone_id, ZoneRelation::Left, timestamp)
    }

    pub fn through(object_id: &str, zone_id: &str, timestamp: i64) -> Self {
        Self::new(object_id, zone_id, ZoneRelation::Through, timestamp)
    }

    pub fn deleted(object_id: &str, timestamp: i64) -> Self {
        Self::new(object_id, "", ZoneRelation::Deleted, timestamp)
    }

    /// Set the originating frame index
    pub fn with_frame(mut self, frame_index: i64) -> Self {
        self.frame_index = Some(frame_index);
        self
    }

    /// Decode an event from a JSON line
    pub fn from_json_line(line: &str) -> Result<Self, EventParseError> {
        let raw: RawZoneEvent = serde_json::from_str(line)?;
        ZoneEvent::try_from(raw)
    }
}

impl std::fmt::Display for ZoneEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}) of {} at {}",
            self.relation, self.zone_id, self.object_id, self.timestamp
        )
    }
}
