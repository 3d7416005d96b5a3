//! Typed TfL payload models.
//!
//! Each endpoint's raw JSON is deserialized into a `Raw*` DTO whose
//! serde `camelCase` renaming is the single mapping between TfL's wire
//! names and our field names, then converted by an explicit validate
//! function into the type the rest of the crate uses. Validation
//! failures are fatal for the line being processed, never skipped.

mod line;
mod route;
mod stoppoint;

use std::fmt;
use std::str::FromStr;

pub use line::{Line, LineStub, RouteSection, RouteSectionStub, parse_line_stubs};
pub use route::RouteSequence;
pub use stoppoint::StopPoint;

/// Payload validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Body was not the JSON shape the endpoint is documented to return
    #[error("unexpected {endpoint_kind} payload: {source}")]
    Shape {
        endpoint_kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A required field was empty or malformed
    #[error("invalid {entity}: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },
}

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode: {0}")]
pub struct UnknownMode(String);

/// Transport modes the catalogue can be fetched for.
///
/// Matches the `modeName` values of the `/Line/Mode/{mode}/Route`
/// endpoint; the string form is also used in snapshot file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Bus,
    Tube,
    Dlr,
    Overground,
    Tram,
    ElizabethLine,
    RiverBus,
    CableCar,
    Coach,
    NationalRail,
}

impl Mode {
    /// The API's name for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Bus => "bus",
            Mode::Tube => "tube",
            Mode::Dlr => "dlr",
            Mode::Overground => "overground",
            Mode::Tram => "tram",
            Mode::ElizabethLine => "elizabeth-line",
            Mode::RiverBus => "river-bus",
            Mode::CableCar => "cable-car",
            Mode::Coach => "coach",
            Mode::NationalRail => "national-rail",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bus" => Ok(Mode::Bus),
            "tube" => Ok(Mode::Tube),
            "dlr" => Ok(Mode::Dlr),
            "overground" => Ok(Mode::Overground),
            "tram" => Ok(Mode::Tram),
            "elizabeth-line" => Ok(Mode::ElizabethLine),
            "river-bus" => Ok(Mode::RiverBus),
            "cable-car" => Ok(Mode::CableCar),
            "coach" => Ok(Mode::Coach),
            "national-rail" => Ok(Mode::NationalRail),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}
