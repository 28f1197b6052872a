//! Conversion between slot values and the JSON carried by `query` calls.
//!
//! Encoding follows each slot's semantic type, never the content of its value:
//! a text slot holding `"42"` is sent as the string `"42"`.

use runway_types::{EncodedImage, ImageError, Point2, Rect, SemanticType, SlotValue, parse_bool};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::schema::{json_kind, stringify};
use crate::slot::Slot;

/// Errors raised while building a request payload or reading a response.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("input '{field}' needs an image before the model can be queried")]
    MissingImage { field: String },

    #[error("input '{field}' holds a number JSON cannot represent")]
    NonFiniteNumber { field: String },

    #[error("model response is {0}, expected a JSON object")]
    NotAnObject(&'static str),

    #[error("model response has no field '{field}'")]
    MissingField { field: String },

    #[error("output '{field}' does not match its declared shape: {reason}")]
    SchemaMismatch { field: String, reason: String },

    #[error("output '{field}' carries an unreadable image: {source}")]
    Image {
        field: String,
        #[source]
        source: ImageError,
    },
}

/// Build the request payload from `slots`, keyed by wire name in slot order.
pub fn encode_inputs(slots: &[Slot]) -> Result<Value, CodecError> {
    let mut payload = Map::with_capacity(slots.len());
    for slot in slots {
        payload.insert(slot.original_name().to_string(), encode_value(slot.original_name(), slot.value())?);
    }
    Ok(Value::Object(payload))
}

/// Encode one value for the wire.
pub fn encode_value(field: &str, value: &SlotValue) -> Result<Value, CodecError> {
    let finite = |number: f64| {
        Number::from_f64(number)
            .map(Value::Number)
            .ok_or_else(|| CodecError::NonFiniteNumber { field: field.to_string() })
    };
    let finite_list = |numbers: &[f64]| numbers.iter().copied().map(finite).collect::<Result<Vec<_>, _>>().map(Value::Array);

    Ok(match value {
        SlotValue::Text(text) => Value::String(text.clone()),
        SlotValue::Integer(number) => Value::from(*number),
        SlotValue::Real(number) => finite(*number)?,
        SlotValue::Boolean(flag) => Value::Bool(*flag),
        SlotValue::Vector(numbers) | SlotValue::RealList(numbers) => finite_list(numbers)?,
        SlotValue::Image(Some(image)) => Value::String(image.data_uri()),
        SlotValue::Image(None) => return Err(CodecError::MissingImage { field: field.to_string() }),
        SlotValue::TextList(texts) => Value::Array(texts.iter().cloned().map(Value::String).collect()),
        SlotValue::RectList(rects) => Value::Array(
            rects
                .iter()
                .map(|rect| finite_list(&rect.corners()))
                .collect::<Result<_, _>>()?,
        ),
        SlotValue::PointLists(lists) => Value::Array(
            lists
                .iter()
                .map(|points| {
                    points
                        .iter()
                        .map(|point| finite_list(&[point.x, point.y]))
                        .collect::<Result<_, _>>()
                        .map(Value::Array)
                })
                .collect::<Result<_, _>>()?,
        ),
    })
}

/// Read every output slot's value out of a `query` response.
///
/// Returns `Ok(None)` for a `null` response. Either every slot decodes or
/// nothing is returned.
pub fn decode_outputs(slots: &[Slot], response: &Value) -> Result<Option<Vec<SlotValue>>, CodecError> {
    let fields = match response {
        Value::Null => return Ok(None),
        Value::Object(fields) => fields,
        other => return Err(CodecError::NotAnObject(json_kind(other))),
    };

    slots
        .iter()
        .map(|slot| {
            let raw = fields.get(slot.original_name()).ok_or_else(|| CodecError::MissingField {
                field: slot.original_name().to_string(),
            })?;
            decode_output(slot.original_name(), slot.semantic_type(), raw)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Convert one response value into `semantic_type`.
///
/// `null` decodes to the type's default. Rectangles arrive as
/// `[x0, y0, x1, y1]` corners, landmarks as lists of `[x, y]` pairs, images as
/// base64 after the last comma of a data URI.
pub fn decode_output(field: &str, semantic_type: SemanticType, raw: &Value) -> Result<SlotValue, CodecError> {
    if raw.is_null() {
        return Ok(semantic_type.default_value());
    }
    let mismatch = |reason: String| CodecError::SchemaMismatch {
        field: field.to_string(),
        reason,
    };

    Ok(match semantic_type {
        SemanticType::Text => SlotValue::Text(scalar_text(raw).map_err(mismatch)?),
        SemanticType::Integer => SlotValue::Integer(match raw.as_i64() {
            Some(number) => number,
            None => real(raw).map_err(mismatch)?.round() as i64,
        }),
        SemanticType::Real => SlotValue::Real(real(raw).map_err(mismatch)?),
        SemanticType::Boolean => SlotValue::Boolean(match raw {
            Value::Bool(flag) => *flag,
            Value::String(text) => parse_bool(text).ok_or_else(|| mismatch(format!("'{text}' is not a boolean")))?,
            other => return Err(mismatch(format!("expected a boolean, found {}", json_kind(other)))),
        }),
        SemanticType::Vector => SlotValue::Vector(reals(raw).map_err(mismatch)?),
        SemanticType::ArrayOfReal => SlotValue::RealList(reals(raw).map_err(mismatch)?),
        SemanticType::ArrayOfText => SlotValue::TextList(
            array(raw)
                .map_err(&mismatch)?
                .iter()
                .map(scalar_text)
                .collect::<Result<_, _>>()
                .map_err(mismatch)?,
        ),
        SemanticType::ArrayOfRect => SlotValue::RectList(
            array(raw)
                .map_err(&mismatch)?
                .iter()
                .map(rect)
                .collect::<Result<_, _>>()
                .map_err(mismatch)?,
        ),
        SemanticType::ArrayOfPointList => SlotValue::PointLists(
            array(raw)
                .map_err(&mismatch)?
                .iter()
                .map(point_list)
                .collect::<Result<_, _>>()
                .map_err(mismatch)?,
        ),
        SemanticType::ImageRef => {
            let Value::String(text) = raw else {
                return Err(mismatch(format!("expected an image data URI, found {}", json_kind(raw))));
            };
            let image = EncodedImage::from_data_uri(text).map_err(|source| CodecError::Image {
                field: field.to_string(),
                source,
            })?;
            SlotValue::Image(image)
        }
    })
}

fn scalar_text(raw: &Value) -> Result<String, String> {
    match raw {
        Value::Array(_) | Value::Object(_) => Err(format!("expected text, found {}", json_kind(raw))),
        scalar => Ok(stringify(scalar)),
    }
}

fn real(raw: &Value) -> Result<f64, String> {
    match raw {
        Value::Number(number) => number.as_f64().ok_or_else(|| format!("{number} is out of range")),
        Value::String(text) => text.trim().parse().map_err(|_| format!("'{text}' is not a number")),
        other => Err(format!("expected a number, found {}", json_kind(other))),
    }
}

fn array(raw: &Value) -> Result<&[Value], String> {
    raw.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| format!("expected a list, found {}", json_kind(raw)))
}

fn reals(raw: &Value) -> Result<Vec<f64>, String> {
    array(raw)?.iter().map(real).collect()
}

fn rect(raw: &Value) -> Result<Rect, String> {
    match reals(raw)?.as_slice() {
        [x0, y0, x1, y1, ..] => Ok(Rect::from_corners(*x0, *y0, *x1, *y1)),
        short => Err(format!("a bounding box needs 4 numbers, found {}", short.len())),
    }
}

fn point_list(raw: &Value) -> Result<Vec<Point2>, String> {
    array(raw)?
        .iter()
        .map(|pair| match reals(pair)?.as_slice() {
            [x, y, ..] => Ok(Point2::new(*x, *y)),
            short => Err(format!("a landmark needs 2 numbers, found {}", short.len())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use runway_types::FieldDescriptor;
    use serde_json::json;

    fn slot(name: &str, value: SlotValue) -> Slot {
        let semantic_type = value.semantic_type();
        Slot::from_field(&FieldDescriptor::new(name, semantic_type, value, ""))
    }

    fn output(name: &str, semantic_type: SemanticType) -> Slot {
        Slot::from_field(&FieldDescriptor::new(name, semantic_type, semantic_type.default_value(), ""))
    }

    #[test]
    fn text_slots_stay_strings_even_when_numeric() {
        let payload = encode_inputs(&[slot("prompt", SlotValue::Text("42".into()))]).expect("encodes");
        assert_eq!(payload, json!({"prompt": "42"}));
        assert_eq!(payload.to_string(), r#"{"prompt":"42"}"#);
    }

    #[test]
    fn payload_keys_follow_slot_order() {
        let payload = encode_inputs(&[
            slot("z_last", SlotValue::Boolean(true)),
            slot("a_first", SlotValue::Integer(3)),
            slot("truncation", SlotValue::Real(0.5)),
            slot("z", SlotValue::Vector(vec![0.0, 1.0])),
        ])
        .expect("encodes");
        assert_eq!(payload.to_string(), r#"{"z_last":true,"a_first":3,"truncation":0.5,"z":[0.0,1.0]}"#);
    }

    #[test]
    fn lists_encode_in_their_wire_shapes() {
        let payload = encode_inputs(&[
            slot("boxes", SlotValue::RectList(vec![Rect::new(10.0, 20.0, 20.0, 20.0)])),
            slot("points", SlotValue::PointLists(vec![vec![Point2::new(1.0, 2.0)]])),
            slot("labels", SlotValue::TextList(vec!["cat".into()])),
        ])
        .expect("encodes");
        assert_eq!(
            payload,
            json!({
                "boxes": [[10.0, 20.0, 30.0, 40.0]],
                "points": [[[1.0, 2.0]]],
                "labels": ["cat"]
            })
        );
    }

    #[test]
    fn missing_images_and_nan_are_refused() {
        let error = encode_inputs(&[slot("image", SlotValue::Image(None))]).expect_err("no image");
        assert!(matches!(error, CodecError::MissingImage { ref field } if field == "image"));

        let error = encode_inputs(&[slot("scale", SlotValue::Real(f64::NAN))]).expect_err("nan");
        assert!(matches!(error, CodecError::NonFiniteNumber { .. }));
    }

    #[test]
    fn bounding_boxes_decode_from_corners() {
        let value = decode_output("boxes", SemanticType::ArrayOfRect, &json!([[10, 20, 30, 40]])).expect("decodes");
        assert_eq!(value, SlotValue::RectList(vec![Rect::new(10.0, 20.0, 20.0, 20.0)]));

        let error = decode_output("boxes", SemanticType::ArrayOfRect, &json!([[10, 20, 30]])).expect_err("short box");
        assert!(error.to_string().contains("4 numbers"));
    }

    #[test]
    fn landmarks_decode_into_point_lists() {
        let value = decode_output("faces", SemanticType::ArrayOfPointList, &json!([[[1, 2], [3.5, 4]], []])).expect("decodes");
        assert_eq!(
            value,
            SlotValue::PointLists(vec![vec![Point2::new(1.0, 2.0), Point2::new(3.5, 4.0)], vec![]])
        );
    }

    #[test]
    fn scalars_decode_by_declared_type() {
        assert_eq!(
            decode_output("caption", SemanticType::Text, &json!("a fox")).expect("text"),
            SlotValue::Text("a fox".into())
        );
        assert_eq!(decode_output("count", SemanticType::Integer, &json!(4)).expect("int"), SlotValue::Integer(4));
        assert_eq!(decode_output("count", SemanticType::Integer, &json!(2.6)).expect("int"), SlotValue::Integer(3));
        assert_eq!(decode_output("score", SemanticType::Real, &json!(1)).expect("real"), SlotValue::Real(1.0));
        assert_eq!(
            decode_output("scores", SemanticType::ArrayOfReal, &json!([0.25, 1])).expect("reals"),
            SlotValue::RealList(vec![0.25, 1.0])
        );
        assert_eq!(
            decode_output("labels", SemanticType::ArrayOfText, &json!(["cat", 3])).expect("texts"),
            SlotValue::TextList(vec!["cat".into(), "3".into()])
        );
        assert!(decode_output("score", SemanticType::Real, &json!({"nested": true})).is_err());
    }

    #[test]
    fn image_without_comma_is_no_value() {
        let value = decode_output("image", SemanticType::ImageRef, &json!("not a data uri")).expect("lenient");
        assert_eq!(value, SlotValue::Image(None));

        let value = decode_output("image", SemanticType::ImageRef, &Value::Null).expect("null");
        assert_eq!(value, SlotValue::Image(None));
    }

    #[test]
    fn image_data_uri_decodes_to_an_image() {
        let pixels = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]));
        let encoded = EncodedImage::from_dynamic(&image::DynamicImage::ImageRgb8(pixels)).expect("encode");

        let value = decode_output("image", SemanticType::ImageRef, &json!(encoded.data_uri())).expect("decodes");
        let SlotValue::Image(Some(decoded)) = value else {
            panic!("expected an image, got {value:?}");
        };
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
        assert!(!decoded.as_bytes().is_empty());
    }

    #[test]
    fn decoding_is_all_or_nothing() {
        let slots = [output("caption", SemanticType::Text), output("boxes", SemanticType::ArrayOfRect)];

        let error = decode_outputs(&slots, &json!({"caption": "hi"})).expect_err("boxes missing");
        assert!(matches!(error, CodecError::MissingField { ref field } if field == "boxes"));

        let values = decode_outputs(&slots, &json!({"boxes": [], "caption": "hi", "extra": 1}))
            .expect("decodes")
            .expect("present");
        assert_eq!(values, vec![SlotValue::Text("hi".into()), SlotValue::RectList(vec![])]);

        assert!(decode_outputs(&slots, &Value::Null).expect("null response").is_none());
        assert!(matches!(decode_outputs(&slots, &json!([1])), Err(CodecError::NotAnObject(_))));
    }
}
