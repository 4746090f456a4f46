//! Conversion of loosely-typed raw results into canonical geometric records.
//!
//! The inference provider returns a one-entry JSON object keyed by a prompt
//! tag, with a payload whose shape depends on the task's output category.
//! This module turns that payload into a tagged [`TaskOutput`] sum, decided
//! once via the task registry instead of re-inferred from dictionary keys.
//!
//! Structural defects (a required array entirely missing) fail the call with
//! [`AnalyzeError::MalformedResult`]. Individually malformed shapes within a
//! collection are dropped with a diagnostic and never abort their siblings.

use crate::error::{AnalyzeError, VizResult};
use crate::geometry::{BoundingBox, Point, Polygon, QuadBox};
use crate::task::{OutputCategory, dir_name_from_tag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A raw inference result: a one-entry JSON object keyed by a prompt tag.
///
/// The key is not assumed to equal the caller's task tag verbatim; artifact
/// directory names are derived from the key actually present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult(Value);

impl RawResult {
    /// Wraps a JSON value as a raw result.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the `(tag, payload)` entry of the result object.
    pub fn entry(&self) -> VizResult<(&str, &Value)> {
        match &self.0 {
            Value::Object(map) => map
                .iter()
                .next()
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| AnalyzeError::malformed("empty result object")),
            _ => Err(AnalyzeError::malformed("result is not a JSON object")),
        }
    }

    /// Derives the artifact directory name from the result's own key.
    pub fn dir_name(&self) -> VizResult<String> {
        let (tag, _) = self.entry()?;
        Ok(dir_name_from_tag(tag))
    }

    /// Returns the result serialized as a JSON string, for text dumps.
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    /// Borrows the underlying JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for RawResult {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A bounding box paired with an optional label.
///
/// An empty label is permitted and means no text is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledBox {
    /// The normalized bounding box.
    pub bbox: BoundingBox,
    /// The label text; may be empty.
    pub label: String,
}

/// A label governing one or more disjoint polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonGroup {
    /// The label shared by all polygons in the group; may be empty.
    pub label: String,
    /// The polygons under this label. Degenerate entries are already dropped.
    pub polygons: Vec<Polygon>,
}

/// A quadrilateral text region paired with its transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledQuad {
    /// The four-point region.
    pub quad: QuadBox,
    /// The recognized text; may be empty.
    pub label: String,
}

/// Canonical task output, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskOutput {
    /// Decoded text, returned unchanged.
    Text(String),
    /// Labeled bounding boxes.
    Boxes(Vec<LabeledBox>),
    /// Labeled polygon groups.
    Polygons(Vec<PolygonGroup>),
    /// Labeled quadrilateral regions.
    QuadBoxes(Vec<LabeledQuad>),
}

/// A normalized result: canonical output plus its artifact directory name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Directory name derived from the raw result's key.
    pub dir_name: String,
    /// The canonical output.
    pub output: TaskOutput,
}

/// Normalizes a raw result according to its output category.
pub fn normalize(category: OutputCategory, raw: &RawResult) -> VizResult<NormalizedResult> {
    let (tag, payload) = raw.entry()?;
    let dir_name = dir_name_from_tag(tag);

    let output = match category {
        OutputCategory::PlainText => TaskOutput::Text(match payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        OutputCategory::BoxSet => {
            let bboxes = require_array(payload, "bboxes")?;
            let labels = require_array(payload, "labels")?;
            TaskOutput::Boxes(zip_boxes(bboxes, labels))
        }
        OutputCategory::PolygonSet => {
            let groups = require_array(payload, "polygons")?;
            let labels = require_array(payload, "labels")?;
            TaskOutput::Polygons(zip_polygon_groups(groups, labels))
        }
        OutputCategory::QuadBoxSet => {
            let quads = require_array(payload, "quad_boxes")?;
            let labels = require_array(payload, "labels")?;
            TaskOutput::QuadBoxes(zip_quads(quads, labels))
        }
    };

    Ok(NormalizedResult { dir_name, output })
}

/// Schema adapter for `<OPEN_VOCABULARY_DETECTION>` results.
///
/// Open-vocabulary detection names its label field `bboxes_labels` instead of
/// `labels`; this remaps it into the canonical box set. Absent fields default
/// to empty rather than erroring, unlike [`normalize`]. This adapter applies
/// to that one task only, it is not a generic fallback.
pub fn open_vocab_to_boxes(raw: &RawResult) -> VizResult<NormalizedResult> {
    let (tag, payload) = raw.entry()?;
    let empty = Vec::new();
    let bboxes = payload
        .get("bboxes")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let labels = payload
        .get("bboxes_labels")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    Ok(NormalizedResult {
        dir_name: dir_name_from_tag(tag),
        output: TaskOutput::Boxes(zip_boxes(bboxes, labels)),
    })
}

/// Requires an array field on the payload, failing with MalformedResult.
fn require_array<'a>(payload: &'a Value, key: &str) -> VizResult<&'a [Value]> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| AnalyzeError::malformed(format!("missing '{key}' array")))
}

fn as_f32(value: &Value) -> Option<f32> {
    value.as_f64().map(|f| f as f32)
}

/// Reads a label entry; non-string labels are stringified for uniformity.
fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Zips box entries with labels, truncating to the shorter sequence.
fn zip_boxes(bboxes: &[Value], labels: &[Value]) -> Vec<LabeledBox> {
    let mut out = Vec::with_capacity(bboxes.len().min(labels.len()));
    for (entry, label) in bboxes.iter().zip(labels) {
        let coords: Option<Vec<f32>> = entry
            .as_array()
            .map(|items| items.iter().filter_map(as_f32).collect());
        match coords.as_deref() {
            Some([x1, y1, x2, y2]) => out.push(LabeledBox {
                bbox: BoundingBox::from_unordered(*x1, *y1, *x2, *y2),
                label: label_text(label),
            }),
            _ => warn!(entry = %entry, "invalid bounding box, skipping"),
        }
    }
    out
}

/// Zips polygon groups with labels, truncating to the shorter sequence.
///
/// A degenerate polygon is dropped from its group without affecting
/// siblings; a group whose polygons are all invalid is kept empty.
fn zip_polygon_groups(groups: &[Value], labels: &[Value]) -> Vec<PolygonGroup> {
    let mut out = Vec::with_capacity(groups.len().min(labels.len()));
    for (group, label) in groups.iter().zip(labels) {
        let mut polygons = Vec::new();
        let Some(entries) = group.as_array() else {
            warn!(entry = %group, "polygon group is not an array, skipping");
            continue;
        };
        for entry in entries {
            match as_points(entry) {
                Some(points) if points.len() >= 3 => polygons.push(Polygon::new(points)),
                _ => warn!(entry = %entry, "invalid polygon, skipping"),
            }
        }
        out.push(PolygonGroup {
            label: label_text(label),
            polygons,
        });
    }
    out
}

/// Zips quad-box entries with labels, truncating to the shorter sequence.
fn zip_quads(quads: &[Value], labels: &[Value]) -> Vec<LabeledQuad> {
    let mut out = Vec::with_capacity(quads.len().min(labels.len()));
    for (entry, label) in quads.iter().zip(labels) {
        match as_points(entry).as_deref() {
            Some(&[a, b, c, d]) => out.push(LabeledQuad {
                quad: QuadBox::new([a, b, c, d]),
                label: label_text(label),
            }),
            _ => warn!(entry = %entry, "invalid quad box, skipping"),
        }
    }
    out
}

/// Reshapes a flat `[x, y, x, y, ..]` or nested `[[x, y], ..]` numeric
/// sequence into point pairs. Returns None for odd flat lengths or
/// non-numeric entries.
fn as_points(value: &Value) -> Option<Vec<Point>> {
    let items = value.as_array()?;
    if items.iter().all(Value::is_number) {
        if items.len() % 2 != 0 {
            return None;
        }
        let mut points = Vec::with_capacity(items.len() / 2);
        for pair in items.chunks_exact(2) {
            points.push(Point::new(as_f32(&pair[0])?, as_f32(&pair[1])?));
        }
        Some(points)
    } else {
        items
            .iter()
            .map(|entry| {
                let pair = entry.as_array()?;
                match pair.as_slice() {
                    [x, y] => Some(Point::new(as_f32(x)?, as_f32(y)?)),
                    _ => None,
                }
            })
            .collect()
    }
}
