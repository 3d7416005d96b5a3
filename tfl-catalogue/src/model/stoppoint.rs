//! TfL stop-point model.

use serde::{Deserialize, Serialize};

use super::ModelError;
use crate::store::Entity;

/// A line reference as embedded in stop-point payloads: an object of
/// which only the id matters to us.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawIdentifier {
    pub id: String,
}

/// Raw `stopPoint` entry inside a `stopPointSequence`
/// (`Tfl.Api.Presentation.Entities.MatchedStop`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawStopPoint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stop_letter: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub lines: Vec<RawIdentifier>,
    #[serde(default)]
    pub modes: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub top_most_parent_id: Option<String>,
    #[serde(default)]
    pub station_id: Option<String>,
}

/// A physical stop or station location, keyed by NaPTAN ID and shared
/// across every line that calls there.
///
/// Stop points are registered on first sighting and never mutated or
/// deleted afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPoint {
    /// NaPTAN ID, globally unique.
    pub id: String,
    pub name: String,
    /// Stop letter where one could be cleansed from the indicator, e.g. "H".
    pub stop_letter: Option<String>,
    /// WGS84 latitude.
    pub lat: f64,
    /// WGS84 longitude.
    pub lon: f64,
    /// Ids of the lines serving this stop.
    pub lines: Vec<String>,
    pub modes: Vec<String>,
    pub parent_id: Option<String>,
    pub top_most_parent_id: Option<String>,
    pub station_id: Option<String>,
}

impl StopPoint {
    /// Validate a raw payload entry into a stop point.
    pub(crate) fn from_raw(raw: RawStopPoint) -> Result<Self, ModelError> {
        if raw.id.is_empty() {
            return Err(ModelError::Invalid {
                entity: "stop point",
                reason: "empty id".to_string(),
            });
        }

        Ok(Self {
            id: raw.id,
            name: raw.name,
            stop_letter: raw.stop_letter,
            lat: raw.lat,
            lon: raw.lon,
            lines: raw.lines.into_iter().map(|line| line.id).collect(),
            modes: raw.modes,
            parent_id: raw.parent_id,
            top_most_parent_id: raw.top_most_parent_id,
            station_id: raw.station_id,
        })
    }
}

impl Entity for StopPoint {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PECKHAM: &str = r#"{
        "id": "490010877H",
        "name": "Peckham Bus Station",
        "stopLetter": "H",
        "lat": 51.473372,
        "lon": -0.067963,
        "lines": [{"id": "177"}, {"id": "381"}, {"id": "n381"}],
        "modes": ["bus"],
        "parentId": "490G00010877",
        "topMostParentId": "490G00010877",
        "stationId": "490G00010877"
    }"#;

    #[test]
    fn parses_matched_stop() {
        let raw: RawStopPoint = serde_json::from_str(PECKHAM).unwrap();
        let stop = StopPoint::from_raw(raw).unwrap();

        assert_eq!(stop.id, "490010877H");
        assert_eq!(stop.name, "Peckham Bus Station");
        assert_eq!(stop.stop_letter.as_deref(), Some("H"));
        assert_eq!(stop.lines, vec!["177", "381", "n381"]);
        assert_eq!(stop.modes, vec!["bus"]);
        assert_eq!(stop.parent_id.as_deref(), Some("490G00010877"));
    }

    #[test]
    fn line_references_reduce_to_ids() {
        // The wire form carries full identifier objects; only ids survive.
        let raw: RawStopPoint = serde_json::from_str(PECKHAM).unwrap();
        let stop = StopPoint::from_raw(raw).unwrap();
        let json = serde_json::to_value(&stop).unwrap();
        assert_eq!(json["lines"][0], "177");
    }

    #[test]
    fn optional_fields_default() {
        let raw: RawStopPoint = serde_json::from_str(
            r#"{"id": "490000177A", "name": "Somewhere", "lat": 51.0, "lon": 0.0}"#,
        )
        .unwrap();
        let stop = StopPoint::from_raw(raw).unwrap();

        assert!(stop.stop_letter.is_none());
        assert!(stop.lines.is_empty());
        assert!(stop.station_id.is_none());
    }

    #[test]
    fn empty_id_rejected() {
        let raw: RawStopPoint = serde_json::from_str(
            r#"{"id": "", "name": "Nowhere", "lat": 0.0, "lon": 0.0}"#,
        )
        .unwrap();
        assert!(matches!(
            StopPoint::from_raw(raw),
            Err(ModelError::Invalid { entity: "stop point", .. })
        ));
    }

    #[test]
    fn serde_roundtrip_uses_camel_case() {
        let raw: RawStopPoint = serde_json::from_str(PECKHAM).unwrap();
        let stop = StopPoint::from_raw(raw).unwrap();

        let json = serde_json::to_string(&stop).unwrap();
        assert!(json.contains("\"stopLetter\""));
        assert!(json.contains("\"topMostParentId\""));

        let back: StopPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stop);
    }
}
