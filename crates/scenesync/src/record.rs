//! Scene record coercion
//!
//! Turns one raw CSV row plus the feed header into a typed JSON document.
//! Pure and deterministic: no network or disk access, so the whole module is
//! testable without a sink.
//!
//! # Field rules
//! - `sceneStartTime` / `sceneStopTime` use the feed's colon-delimited
//!   encoding `year:day-of-year:hour:minute:seconds[.fraction]`.
//! - `acquisitionDate` / `dateUpdated` are plain ISO dates.
//! - `row` / `path` are integers; everything else is tried as a float.
//! - A field that fails its parse keeps its original string value, never
//!   dropped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use csv_async::StringRecord;
use serde_json::{json, Map, Number, Value};
use tracing::warn;

use crate::error::{Result, SyncError};

/// Field holding the unique scene identifier, first column of every row.
pub const IDENTITY_FIELD: &str = "sceneID";

/// Key under which the derived footprint polygon is attached.
pub const GEOMETRY_FIELD: &str = "boundingBox";

/// Columns carrying the feed's colon-delimited scene timestamps.
const SCENE_TIME_FIELDS: [&str; 2] = ["sceneStartTime", "sceneStopTime"];

/// Columns carrying ISO dates.
const DATE_FIELDS: [&str; 2] = ["acquisitionDate", "dateUpdated"];

/// Columns coerced to integers.
const INTEGER_FIELDS: [&str; 2] = ["row", "path"];

/// Columns that must never be coerced to numbers even when they would parse.
const TEXT_FIELDS: [&str; 5] = [
    IDENTITY_FIELD,
    "sceneStartTime",
    "sceneStopTime",
    "acquisitionDate",
    "dateUpdated",
];

/// Corner (longitude, latitude) column pairs, in footprint ring order:
/// upper-right, upper-left, lower-left, lower-right.
const CORNER_FIELDS: [(&str, &str); 4] = [
    ("upperRightCornerLongitude", "upperRightCornerLatitude"),
    ("upperLeftCornerLongitude", "upperLeftCornerLatitude"),
    ("lowerLeftCornerLongitude", "lowerLeftCornerLatitude"),
    ("lowerRightCornerLongitude", "lowerRightCornerLatitude"),
];

/// One typed scene record: the sink identity key plus the JSON document that
/// will be written to the sink.
#[derive(Debug, Clone)]
pub struct SceneRecord {
    scene_id: String,
    document: Map<String, Value>,
}

impl SceneRecord {
    /// Build a record by zipping the header with one raw row.
    ///
    /// Fails only with `MalformedRow`: when the row's field count differs
    /// from the header's, or when the identity field is empty. Such rows are
    /// skipped by the pipeline, not fatal to the run.
    pub fn from_row(header: &[String], row: &StringRecord, line: u64) -> Result<Self> {
        if row.len() != header.len() {
            return Err(SyncError::MalformedRow {
                line,
                detail: format!("expected {} fields, got {}", header.len(), row.len()),
            });
        }

        let scene_id = row.get(0).unwrap_or("").trim().to_string();
        if scene_id.is_empty() {
            return Err(SyncError::MalformedRow {
                line,
                detail: "empty scene identifier".to_string(),
            });
        }

        let mut document = Map::with_capacity(header.len() + 1);
        for (name, raw) in header.iter().zip(row.iter()) {
            document.insert(name.clone(), coerce_field(name, raw));
        }

        // Footprint is computed exactly once here and never mutated afterward.
        match footprint(&document) {
            Some(polygon) => {
                document.insert(GEOMETRY_FIELD.to_string(), polygon);
            },
            None => {
                warn!(
                    line,
                    scene_id = %scene_id,
                    "corner coordinates missing or non-numeric, storing scene without footprint"
                );
            },
        }

        Ok(Self { scene_id, document })
    }

    /// The sink identity key (unique scene identifier).
    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    /// The JSON document written to the sink.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Consume the record, yielding the document as a JSON value.
    pub fn into_document(self) -> Value {
        Value::Object(self.document)
    }
}

/// Coerce one raw field according to its column name.
fn coerce_field(name: &str, raw: &str) -> Value {
    if SCENE_TIME_FIELDS.contains(&name) {
        return parse_scene_time(raw)
            .map(Value::String)
            .unwrap_or_else(|| Value::String(raw.to_string()));
    }

    if DATE_FIELDS.contains(&name) {
        return parse_feed_date(raw)
            .map(Value::String)
            .unwrap_or_else(|| Value::String(raw.to_string()));
    }

    if INTEGER_FIELDS.contains(&name) {
        if let Ok(value) = raw.trim().parse::<i64>() {
            return Value::Number(value.into());
        }
        return Value::String(raw.to_string());
    }

    if TEXT_FIELDS.contains(&name) {
        return Value::String(raw.to_string());
    }

    match raw.trim().parse::<f64>() {
        // NaN and infinities have no JSON representation, keep the raw string
        Ok(value) => Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Parse the feed's colon-delimited scene time into RFC 3339 UTC.
///
/// Encoding: `year:day-of-year:hour:minute:seconds[.fraction]`, e.g.
/// `2015:002:18:23:44.5577`.
fn parse_scene_time(raw: &str) -> Option<String> {
    let mut parts = raw.trim().splitn(5, ':');
    let year: i32 = parts.next()?.parse().ok()?;
    let day_of_year: u32 = parts.next()?.parse().ok()?;
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let date = NaiveDate::from_yo_opt(year, day_of_year)?;
    let millis = (seconds * 1000.0).round() as u32;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, millis / 1000, millis % 1000)?;
    Some(to_rfc3339(NaiveDateTime::new(date, time)))
}

/// Parse an ISO `YYYY-MM-DD` date into RFC 3339 UTC midnight.
fn parse_feed_date(raw: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
    Some(to_rfc3339(date.and_hms_opt(0, 0, 0)?))
}

fn to_rfc3339(datetime: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the closed footprint polygon from the four coerced corner pairs.
///
/// Returns `None` when any corner field is absent or not numeric; the record
/// is then stored without a footprint.
fn footprint(document: &Map<String, Value>) -> Option<Value> {
    let mut ring = Vec::with_capacity(5);
    for (lon_field, lat_field) in CORNER_FIELDS {
        let lon = document.get(lon_field)?.as_f64()?;
        let lat = document.get(lat_field)?.as_f64()?;
        ring.push(json!([lon, lat]));
    }
    // Close the ring: first point repeated as last
    ring.push(ring[0].clone());

    Some(json!({
        "type": "polygon",
        "coordinates": [ring],
    }))
}

// ============================================================================
// Tests
// ============================================================================
