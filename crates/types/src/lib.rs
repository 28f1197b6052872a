//! Shared value definitions for Runway model nodes.
//!
//! Every pin on a model node carries one of a small, closed set of value
//! shapes. [`SemanticType`] names the shape and [`SlotValue`] holds a value of
//! that shape. Field metadata discovered from a model's `info` document lives
//! in [`field`], and JPEG-backed images live in [`encoded_image`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub mod field;
pub mod encoded_image;

pub use field::{FieldDescriptor, QUERY_FIELD_DESCRIPTION, QUERY_FIELD_NAME, display_name};
pub use encoded_image::{EncodedImage, ImageError};

/// The closed set of value shapes a model pin can carry.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SemanticType {
    Text,
    Integer,
    Real,
    Boolean,
    /// Fixed-length list of reals.
    Vector,
    /// JPEG-backed image, possibly absent.
    ImageRef,
    ArrayOfText,
    ArrayOfReal,
    /// List of axis-aligned rectangles (bounding boxes).
    ArrayOfRect,
    /// List of point lists (landmarks).
    ArrayOfPointList,
}

impl SemanticType {
    /// Human-readable name used in diagnostics and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Boolean => "boolean",
            Self::Vector => "vector",
            Self::ImageRef => "image",
            Self::ArrayOfText => "array<text>",
            Self::ArrayOfReal => "array<real>",
            Self::ArrayOfRect => "array<rect>",
            Self::ArrayOfPointList => "array<points>",
        }
    }

    /// The empty or zero value of this type.
    pub fn default_value(&self) -> SlotValue {
        match self {
            Self::Text => SlotValue::Text(String::new()),
            Self::Integer => SlotValue::Integer(0),
            Self::Real => SlotValue::Real(0.0),
            Self::Boolean => SlotValue::Boolean(false),
            Self::Vector => SlotValue::Vector(Vec::new()),
            Self::ImageRef => SlotValue::Image(None),
            Self::ArrayOfText => SlotValue::TextList(Vec::new()),
            Self::ArrayOfReal => SlotValue::RealList(Vec::new()),
            Self::ArrayOfRect => SlotValue::RectList(Vec::new()),
            Self::ArrayOfPointList => SlotValue::PointLists(Vec::new()),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from its top-left and bottom-right corners.
    ///
    /// ```rust
    /// use runway_types::Rect;
    ///
    /// let rect = Rect::from_corners(10.0, 20.0, 30.0, 40.0);
    /// assert_eq!(rect, Rect::new(10.0, 20.0, 20.0, 20.0));
    /// ```
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// The `[x0, y0, x1, y1]` corner form used on the wire.
    pub fn corners(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A typed value held by an input or output slot.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Vector(Vec<f64>),
    Image(Option<EncodedImage>),
    TextList(Vec<String>),
    RealList(Vec<f64>),
    RectList(Vec<Rect>),
    PointLists(Vec<Vec<Point2>>),
}

impl SlotValue {
    /// The semantic type this value belongs to.
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Self::Text(_) => SemanticType::Text,
            Self::Integer(_) => SemanticType::Integer,
            Self::Real(_) => SemanticType::Real,
            Self::Boolean(_) => SemanticType::Boolean,
            Self::Vector(_) => SemanticType::Vector,
            Self::Image(_) => SemanticType::ImageRef,
            Self::TextList(_) => SemanticType::ArrayOfText,
            Self::RealList(_) => SemanticType::ArrayOfReal,
            Self::RectList(_) => SemanticType::ArrayOfRect,
            Self::PointLists(_) => SemanticType::ArrayOfPointList,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Parse user-supplied text into a value of `semantic_type`.
    ///
    /// Lists accept either a JSON array or a comma-separated sequence. Images
    /// cannot be expressed as text and are always rejected.
    ///
    /// ```rust
    /// use runway_types::{SemanticType, SlotValue};
    ///
    /// assert_eq!(SlotValue::parse(SemanticType::Integer, "42").unwrap(), SlotValue::Integer(42));
    /// assert_eq!(SlotValue::parse(SemanticType::Text, "42").unwrap(), SlotValue::Text("42".into()));
    /// assert_eq!(
    ///     SlotValue::parse(SemanticType::Vector, "0.5, 1").unwrap(),
    ///     SlotValue::Vector(vec![0.5, 1.0])
    /// );
    /// ```
    pub fn parse(semantic_type: SemanticType, raw: &str) -> Result<Self, ParseValueError> {
        let invalid = |reason: &str| ParseValueError {
            semantic_type,
            input: raw.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = raw.trim();
        match semantic_type {
            SemanticType::Text => Ok(Self::Text(raw.to_string())),
            SemanticType::Integer => i64::from_str(trimmed)
                .map(Self::Integer)
                .map_err(|error| invalid(&error.to_string())),
            SemanticType::Real => f64::from_str(trimmed)
                .map(Self::Real)
                .map_err(|error| invalid(&error.to_string())),
            SemanticType::Boolean => parse_bool(trimmed)
                .map(Self::Boolean)
                .ok_or_else(|| invalid("expected true or false")),
            SemanticType::Vector => parse_reals(trimmed).map(Self::Vector).map_err(|reason| invalid(&reason)),
            SemanticType::ArrayOfReal => parse_reals(trimmed).map(Self::RealList).map_err(|reason| invalid(&reason)),
            SemanticType::ArrayOfText => parse_texts(trimmed).map(Self::TextList).map_err(|reason| invalid(&reason)),
            SemanticType::ImageRef | SemanticType::ArrayOfRect | SemanticType::ArrayOfPointList => {
                Err(invalid("values of this type cannot be given as text"))
            }
        }
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Vector(values) | Self::RealList(values) => write!(f, "{values:?}"),
            Self::Image(Some(image)) => write!(f, "<jpeg {}x{}>", image.width(), image.height()),
            Self::Image(None) => f.write_str("<no image>"),
            Self::TextList(values) => write!(f, "{values:?}"),
            Self::RectList(rects) => write!(f, "{} rect(s)", rects.len()),
            Self::PointLists(lists) => write!(f, "{} point list(s)", lists.len()),
        }
    }
}

/// Error returned when text cannot be read as a value of a given type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot read '{input}' as {semantic_type}: {reason}")]
pub struct ParseValueError {
    pub semantic_type: SemanticType,
    pub input: String,
    pub reason: String,
}

/// Case-insensitive `true`/`false` parsing, tolerant of surrounding whitespace.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_reals(raw: &str) -> Result<Vec<f64>, String> {
    if raw.starts_with('[') {
        return serde_json::from_str::<Vec<f64>>(raw).map_err(|error| error.to_string());
    }
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| f64::from_str(part).map_err(|error| format!("'{part}': {error}")))
        .collect()
}

fn parse_texts(raw: &str) -> Result<Vec<String>, String> {
    if raw.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(raw).map_err(|error| error.to_string());
    }
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect())
}

/// Severity of a [`Diagnostic`] attached to a node description.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Warning,
    Error,
}

/// A user-facing message attached to a node description.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}
