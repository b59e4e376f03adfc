//! Structural validation of raw detection records.
//!
//! A record survives when it is a JSON object whose `box_2d` field is
//! an array of exactly four numbers. Everything else is dropped
//! silently; only the surviving count matters downstream. Coordinate
//! ranges are not checked here -- see [`crate::geometry`].

use serde_json::Value;

use crate::types::{Detection, NormalizedBox};

/// Kind assigned to records that carry no usable label.
pub const FALLBACK_KIND: &str = "sensitive";

/// Keep only the structurally valid records, converted to
/// [`Detection`]s in their original order.
#[must_use]
pub fn validate_records(records: &[Value]) -> Vec<Detection> {
    let detections: Vec<Detection> = records.iter().filter_map(to_detection).collect();

    let dropped = records.len() - detections.len();
    if dropped > 0 {
        tracing::debug!(
            kept = detections.len(),
            dropped,
            "discarded malformed detection records"
        );
    }
    detections
}

/// Convert one record, or `None` if it is malformed.
fn to_detection(record: &Value) -> Option<Detection> {
    let object = record.as_object()?;
    let normalized_box = parse_box(object.get("box_2d")?)?;

    let kind = ["label", "type"]
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(FALLBACK_KIND)
        .to_owned();

    let value = match object.get("value") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Some(Detection {
        kind,
        normalized_box,
        value,
    })
}

fn parse_box(value: &Value) -> Option<NormalizedBox> {
    let [y_min, x_min, y_max, x_max] = value.as_array()?.as_slice() else {
        return None;
    };
    Some(NormalizedBox::new(
        y_min.as_f64()?,
        x_min.as_f64()?,
        y_max.as_f64()?,
        x_max.as_f64()?,
    ))
}
