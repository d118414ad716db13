use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};


pub const ATTR_LATITUDE: &str = "latitude";
pub const ATTR_LONGITUDE: &str = "longitude";
pub const ATTR_GPS_ACCURACY: &str = "gps_accuracy";
pub const ATTR_BATTERY_LEVEL: &str = "battery_level";

/// Location update published by a device as a JSON object.
///
/// Latitude and longitude are mandatory; everything else is optional and
/// unrecognized keys are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationMessage {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_accuracy: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
}

/// Why a payload did not produce a location update.
///
/// The display text is the diagnostic logged for the payload and always
/// ends with the payload exactly as received.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    /// Not parseable as JSON
    #[error("Error parsing JSON payload: {payload}")]
    Malformed { payload: String },

    /// Valid JSON, but required fields are missing or a field has the wrong type
    #[error(
        "Skipping update for following data because of missing or malformatted data: {payload}"
    )]
    Incomplete { payload: String, reason: FieldError },
}

/// Field-level detail behind [`PayloadError::Incomplete`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("required field '{0}' is missing")]
    Missing(&'static str),
    #[error("field '{field}' has invalid value {value}")]
    Invalid { field: &'static str, value: Value },
}

/// Parse a raw location payload.
///
/// Numbers may also be sent as strings (`"2.0"`); `gps_accuracy` accepts any
/// value that converts to an integer, truncating floats.
pub fn parse_location_payload(raw: &str) -> Result<LocationMessage, PayloadError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| PayloadError::Malformed {
        payload: raw.to_string(),
    })?;

    extract_location(&value).map_err(|reason| PayloadError::Incomplete {
        payload: raw.to_string(),
        reason,
    })
}

fn extract_location(value: &Value) -> Result<LocationMessage, FieldError> {
    let data = value.as_object().ok_or(FieldError::NotAnObject)?;

    let latitude = required(data, ATTR_LATITUDE, coerce_float)?;
    let longitude = required(data, ATTR_LONGITUDE, coerce_float)?;
    let gps_accuracy = optional(data, ATTR_GPS_ACCURACY, coerce_int)?;
    let battery_level = optional(data, ATTR_BATTERY_LEVEL, coerce_float)?;

    Ok(LocationMessage {
        latitude,
        longitude,
        gps_accuracy,
        battery_level,
    })
}

fn required<T>(
    data: &Map<String, Value>,
    field: &'static str,
    coerce: fn(&Value) -> Option<T>,
) -> Result<T, FieldError> {
    optional(data, field, coerce)?.ok_or(FieldError::Missing(field))
}

fn optional<T>(
    data: &Map<String, Value>,
    field: &'static str,
    coerce: fn(&Value) -> Option<T>,
) -> Result<Option<T>, FieldError> {
    match data.get(field) {
        None => Ok(None),
        Some(value) => coerce(value)
            .map(Some)
            .ok_or_else(|| FieldError::Invalid {
                field,
                value: value.clone(),
            }),
    }
}

/// Numbers and numeric strings; `null`, booleans and non-finite values are rejected.
fn coerce_float(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
