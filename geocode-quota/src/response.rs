//! Typed form of the geocoding service's JSON response.
//!
//! Only `status` is interpreted by the client; everything else is handed
//! back to the caller. The body must be a JSON object with a `status`
//! string; every other field defaults when absent.

use serde::{Deserialize, Serialize};

use crate::OVER_QUERY_LIMIT;

/// A decoded geocoding response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeocodeResponse {
    /// Matches for the queried address
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    /// Service status, e.g. `OK`, `ZERO_RESULTS` or `OVER_QUERY_LIMIT`
    pub status: String,
    /// Human readable detail accompanying a non-`OK` status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl GeocodeResponse {
    /// Decodes a response body.
    ///
    /// Anything but a JSON object with a string `status` is an error.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(body)?;
        serde_json::from_value(serde_json::Value::Object(object))
    }

    /// Whether the service reported the daily quota as exhausted
    #[must_use]
    pub fn is_over_query_limit(&self) -> bool {
        self.status == OVER_QUERY_LIMIT
    }
}

/// A single geocoding match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeocodeResult {
    /// Components making up the matched address
    pub address_components: Vec<AddressComponent>,
    /// Full human readable address
    pub formatted_address: String,
    /// Location and viewport of the match
    pub geometry: Geometry,
    /// Unique place identifier
    pub place_id: String,
    /// Feature types of the match
    pub types: Vec<String>,
}

/// One component of a matched address, such as a street or locality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AddressComponent {
    /// Full text of the component
    pub long_name: String,
    /// Abbreviated text of the component
    pub short_name: String,
    /// Types of the component
    pub types: Vec<String>,
}

/// Geometry of a match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Geometry {
    /// Geocoded point
    pub location: LatLng,
    /// Precision of the location, e.g. `ROOFTOP`
    pub location_type: String,
    /// Recommended viewport for displaying the match
    pub viewport: Viewport,
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LatLng {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
}

/// A bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Viewport {
    /// North-east corner
    pub northeast: LatLng,
    /// South-west corner
    pub southwest: LatLng,
}
