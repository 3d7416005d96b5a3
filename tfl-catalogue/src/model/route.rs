//! TfL route sequence model.

use serde::Deserialize;

use super::ModelError;
use super::stoppoint::{RawStopPoint, StopPoint};

/// One `orderedLineRoutes` entry
/// (`Tfl.Api.Presentation.Entities.OrderedRoute`); only the stop order
/// matters to us.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderedRoute {
    #[serde(default)]
    naptan_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStopPointSequence {
    #[serde(default)]
    stop_point: Vec<RawStopPoint>,
}

/// Raw payload of `/Line/{id}/Route/Sequence/{direction}`
/// (`Tfl.Api.Presentation.Entities.RouteSequence`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRouteSequence {
    is_outbound_only: bool,
    #[serde(default)]
    line_strings: Vec<String>,
    #[serde(default)]
    ordered_line_routes: Vec<RawOrderedRoute>,
    #[serde(default)]
    stop_point_sequences: Vec<RawStopPointSequence>,
}

/// Direction-scoped route sequence, reduced to what gets merged into a
/// line's route section plus the stop points discovered along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSequence {
    pub is_outbound_only: bool,
    /// JSON-encoded linestring geometries.
    pub line_strings: Vec<String>,
    /// NaPTAN ids in order of arrival, one sequence per branch.
    pub ordered_line_routes: Vec<Vec<String>>,
    /// Every stop point embedded in the payload, flattened across
    /// branches. May contain duplicates; deduplication is the
    /// stop-point index's job.
    pub stop_points: Vec<StopPoint>,
}

impl RouteSequence {
    /// Parse and validate the raw endpoint JSON.
    pub fn parse(body: &str) -> Result<Self, ModelError> {
        let raw: RawRouteSequence =
            serde_json::from_str(body).map_err(|source| ModelError::Shape {
                endpoint_kind: "route sequence",
                source,
            })?;

        let stop_points = raw
            .stop_point_sequences
            .into_iter()
            .flat_map(|seq| seq.stop_point)
            .map(StopPoint::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            is_outbound_only: raw.is_outbound_only,
            line_strings: raw.line_strings,
            ordered_line_routes: raw
                .ordered_line_routes
                .into_iter()
                .map(|route| route.naptan_ids)
                .collect(),
            stop_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQUENCE: &str = r#"{
        "isOutboundOnly": false,
        "lineStrings": ["[[[-0.067963,51.473372],[-0.069,51.474]]]"],
        "orderedLineRoutes": [
            {"name": "Penge to Peckham", "naptanIds": ["490000177A", "490010877H"]},
            {"name": "Penge to Peckham via Dulwich", "naptanIds": ["490000177A", "490005183D", "490010877H"]}
        ],
        "stopPointSequences": [
            {"stopPoint": [
                {"id": "490000177A", "name": "Penge", "lat": 51.41, "lon": -0.05},
                {"id": "490010877H", "name": "Peckham Bus Station", "lat": 51.47, "lon": -0.07}
            ]},
            {"stopPoint": [
                {"id": "490005183D", "name": "Dulwich Library", "lat": 51.45, "lon": -0.08}
            ]}
        ]
    }"#;

    #[test]
    fn parses_sequence() {
        let seq = RouteSequence::parse(SEQUENCE).unwrap();

        assert!(!seq.is_outbound_only);
        assert_eq!(seq.line_strings.len(), 1);
        assert_eq!(
            seq.ordered_line_routes,
            vec![
                vec!["490000177A", "490010877H"],
                vec!["490000177A", "490005183D", "490010877H"],
            ]
        );
    }

    #[test]
    fn flattens_stop_points_across_branches() {
        let seq = RouteSequence::parse(SEQUENCE).unwrap();
        let ids: Vec<&str> = seq.stop_points.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["490000177A", "490010877H", "490005183D"]);
    }

    #[test]
    fn missing_collections_default_to_empty() {
        let seq = RouteSequence::parse(r#"{"isOutboundOnly": true}"#).unwrap();
        assert!(seq.is_outbound_only);
        assert!(seq.line_strings.is_empty());
        assert!(seq.ordered_line_routes.is_empty());
        assert!(seq.stop_points.is_empty());
    }

    #[test]
    fn malformed_body_is_a_shape_error() {
        let err = RouteSequence::parse("not json").unwrap_err();
        assert!(matches!(
            err,
            ModelError::Shape { endpoint_kind: "route sequence", .. }
        ));

        // isOutboundOnly is required
        let err = RouteSequence::parse(r#"{"lineStrings": []}"#).unwrap_err();
        assert!(matches!(err, ModelError::Shape { .. }));
    }

    #[test]
    fn invalid_embedded_stop_point_fails_the_parse() {
        let body = r#"{
            "isOutboundOnly": false,
            "stopPointSequences": [
                {"stopPoint": [{"id": "", "name": "Nameless", "lat": 0.0, "lon": 0.0}]}
            ]
        }"#;
        assert!(matches!(
            RouteSequence::parse(body),
            Err(ModelError::Invalid { .. })
        ));
    }
}
