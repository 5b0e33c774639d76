//! GeoIP location record
//!
//! Decodes the JSON returned by an ip-api.com style geolocation service:
//! - Country, region, city and postal code
//! - Latitude/longitude coordinates
//! - Timezone, ISP, organization and AS
//! - `status: "fail"` responses surfaced as errors
//!
//! # Examples
//!
//! ```
//! use ipkit_geoip::GeoLocation;
//!
//! let body = r#"{"status":"success","query":"8.8.8.8","country":"United States",
//!     "countryCode":"US","lat":39.03,"lon":-77.5}"#;
//! let location = GeoLocation::from_json(body).unwrap();
//! assert_eq!(location.country_code.as_deref(), Some("US"));
//! assert_eq!(location.coordinates(), Some((39.03, -77.5)));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status value of a successful lookup
pub const STATUS_SUCCESS: &str = "success";
/// Status value of a failed lookup
pub const STATUS_FAIL: &str = "fail";

/// GeoIP errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeoIpError {
    /// Service answered with `status: "fail"`
    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    /// Payload is not a geolocation record
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, GeoIpError>;

/// Geographic location data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    /// Address the service located
    pub query: String,
    /// `success` for every decoded record
    pub status: String,
    /// Country name
    #[serde(default)]
    pub country: Option<String>,
    /// Country code (ISO 3166-1 alpha-2)
    #[serde(default)]
    pub country_code: Option<String>,
    /// Region code
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    /// Latitude
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude
    #[serde(default)]
    pub lon: Option<f64>,
    /// Timezone
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    /// Autonomous system, e.g. "AS15169 Google LLC"
    #[serde(default, rename = "as")]
    pub autonomous_system: Option<String>,
}

/// Status envelope read before the full record
#[derive(Debug, Deserialize)]
struct Envelope {
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GeoLocation {
    /// Decode a service response body
    ///
    /// # Errors
    ///
    /// * [`GeoIpError::LookupFailed`] when the service reports `status: "fail"`
    /// * [`GeoIpError::InvalidResponse`] when the body is not a record
    pub fn from_json(body: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(body)
            .map_err(|e| GeoIpError::InvalidResponse(e.to_string()))?;

        match envelope.status.as_deref() {
            Some(STATUS_SUCCESS) => {}
            Some(STATUS_FAIL) => {
                return Err(GeoIpError::LookupFailed(
                    envelope
                        .message
                        .unwrap_or_else(|| "no reason given".to_string()),
                ))
            }
            Some(other) => {
                return Err(GeoIpError::InvalidResponse(format!(
                    "unknown status '{}'",
                    other
                )))
            }
            None => return Err(GeoIpError::InvalidResponse("missing status".to_string())),
        }

        serde_json::from_str(body).map_err(|e| GeoIpError::InvalidResponse(e.to_string()))
    }

    /// Latitude and longitude when both are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}
