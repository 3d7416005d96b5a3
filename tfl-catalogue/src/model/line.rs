//! TfL line model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ModelError;
use super::route::RouteSequence;
use crate::store::Entity;

/// One entry of `/Line/Mode/{mode}/Route` — a line as the collection
/// endpoint describes it, before any sequence data has been merged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineStub {
    pub id: String,
    pub name: String,
    pub mode_name: String,
    #[serde(default)]
    pub route_sections: Vec<RouteSectionStub>,
}

/// A route section as it appears on a line stub
/// (`Tfl.Api.Presentation.Entities.MatchedRoute`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSectionStub {
    pub name: String,
    pub direction: String,
    pub origination_name: String,
    pub destination_name: String,
    /// NaPTAN id of the origin stop point.
    pub originator: String,
    /// NaPTAN id of the destination stop point.
    pub destination: String,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
}

/// A directional route of a line with the sequence attributes merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSection {
    pub name: String,
    pub direction: String,
    pub origination_name: String,
    pub destination_name: String,
    pub originator: String,
    pub destination: String,
    pub service_type: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    /// Merged from the route sequence.
    pub is_outbound_only: bool,
    /// Merged from the route sequence: JSON-encoded linestrings.
    pub line_strings: Vec<String>,
    /// Merged from the route sequence: NaPTAN ids in order of arrival.
    pub ordered_line_routes: Vec<Vec<String>>,
}

impl RouteSection {
    /// Merge the direction-scoped sequence attributes into a stub section.
    pub fn merge(stub: RouteSectionStub, sequence: &RouteSequence) -> Self {
        Self {
            name: stub.name,
            direction: stub.direction,
            origination_name: stub.origination_name,
            destination_name: stub.destination_name,
            originator: stub.originator,
            destination: stub.destination,
            service_type: stub.service_type,
            valid_from: stub.valid_from,
            valid_to: stub.valid_to,
            is_outbound_only: sequence.is_outbound_only,
            line_strings: sequence.line_strings.clone(),
            ordered_line_routes: sequence.ordered_line_routes.clone(),
        }
    }
}

/// A named transit service with its fully merged directional routes.
///
/// Immutable once stored: a later fetch of the same id never overwrites
/// an existing catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: String,
    pub name: String,
    pub mode_name: String,
    pub route_sections: Vec<RouteSection>,
}

impl Line {
    /// Build a line from its stub and the merged route sections.
    pub fn from_parts(stub: LineStub, route_sections: Vec<RouteSection>) -> Result<Self, ModelError> {
        if stub.id.is_empty() {
            return Err(ModelError::Invalid {
                entity: "line",
                reason: "empty id".to_string(),
            });
        }

        Ok(Self {
            id: stub.id,
            name: stub.name,
            mode_name: stub.mode_name,
            route_sections,
        })
    }
}

impl Entity for Line {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Parse the collection endpoint body into line stubs, in API order.
pub fn parse_line_stubs(body: &str) -> Result<Vec<LineStub>, ModelError> {
    serde_json::from_str(body).map_err(|source| ModelError::Shape {
        endpoint_kind: "line collection",
        source,
    })
}
