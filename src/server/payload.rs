//! Request body decoding for record and contributor writes.
//!
//! Writes arrive as JSON, urlencoded forms or multipart uploads. [`FormData`]
//! flattens all three into one field map, and the typed payloads validate it
//! into per-field messages.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Form;
use chorelog_common::{Error, FieldErrors};
use chorelog_db::models::{DEFAULT_POINTS, MAX_NAME_LEN};
use serde_json::Value;

use super::error::AppError;
use crate::images::ImageUpload;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const INVALID_INTEGER: &str = "A valid integer is required.";
pub const INVALID_STRING: &str = "Not a valid string.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";

fn name_too_long() -> String {
    format!(
        "Ensure this field has no more than {} characters.",
        MAX_NAME_LEN
    )
}

/// One submitted field value.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    Text(String),
    Json(Value),
    File(ImageUpload),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(s) => Self::Text(s),
            other => Self::Json(other),
        }
    }
}

/// Decoded request body, keyed by field name.
///
/// Repeated multipart fields keep the last value.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: HashMap<String, FieldValue>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn take(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    fn from_json(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }

        let value: Value = serde_json::from_slice(body).map_err(|e| {
            Error::field("non_field_errors", format!("JSON parse error - {}", e))
        })?;

        match value {
            Value::Object(map) => Ok(Self {
                fields: map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            }),
            other => Err(Error::field(
                "non_field_errors",
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(&other)
                ),
            )
            .into()),
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, Response> {
        let mut form = Self::new();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::debug!("Multipart parsing error: {}", e);
            multipart_rejection(e)
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(multipart_rejection)?;

                    // Browsers send an unnamed empty part for an untouched file input.
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }

                    form.fields.insert(
                        name,
                        FieldValue::File(ImageUpload {
                            file_name: Some(file_name).filter(|n| !n.is_empty()),
                            content_type,
                            data,
                        }),
                    );
                }
                None => {
                    let text = field.text().await.map_err(multipart_rejection)?;
                    form.fields.insert(name, FieldValue::Text(text));
                }
            }
        }

        Ok(form)
    }
}

fn multipart_rejection(err: MultipartError) -> Response {
    (err.status(), err.body_text()).into_response()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Self::from_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(map) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self {
                fields: map
                    .into_iter()
                    .map(|(k, v)| (k, FieldValue::Text(v)))
                    .collect(),
            });
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Self::from_json(&body).map_err(IntoResponse::into_response)
    }
}

/// How the `image` field of a record write should be applied.
#[derive(Debug, Clone, Default)]
pub enum ImageField {
    /// Not submitted: keep whatever is stored.
    #[default]
    Absent,
    /// Explicit null or empty string: remove the reference.
    Clear,
    /// A reference string stored as-is.
    Reference(String),
    /// A file to normalize and upload.
    Upload(ImageUpload),
}

/// Validated body of a record create or update.
#[derive(Debug, Clone)]
pub struct RecordPayload {
    pub contributor_name: Option<String>,
    pub points: Option<i64>,
    pub note: Option<String>,
    pub image: ImageField,
}

impl RecordPayload {
    /// Validate a record create. `contributor_name` is required; `points`
    /// and `note` fall back to their defaults.
    pub fn for_create(form: FormData) -> Result<Self, Error> {
        let mut payload = Self::parse(form, true)?;
        payload.points.get_or_insert(DEFAULT_POINTS);
        payload.note.get_or_insert_with(String::new);
        Ok(payload)
    }

    /// Validate a partial update; every field is optional.
    pub fn for_update(form: FormData) -> Result<Self, Error> {
        Self::parse(form, false)
    }

    fn parse(mut form: FormData, require_name: bool) -> Result<Self, Error> {
        let mut errors = FieldErrors::new();

        let contributor_name =
            name_field(&mut form, "contributor_name", require_name, &mut errors);
        let points = integer_field(&mut form, "points", &mut errors);
        let note = text_field(&mut form, "note", &mut errors);
        let image = image_field(&mut form, "image", &mut errors);

        errors.into_result()?;

        Ok(Self {
            contributor_name,
            points,
            note,
            image,
        })
    }
}

/// Validated body of a contributor write.
#[derive(Debug, Clone)]
pub struct ContributorPayload {
    pub name: Option<String>,
}

impl ContributorPayload {
    /// Validate a write; `required` is false only for PATCH.
    pub fn parse(mut form: FormData, required: bool) -> Result<Self, Error> {
        let mut errors = FieldErrors::new();
        let name = name_field(&mut form, "name", required, &mut errors);
        errors.into_result()?;
        Ok(Self { name })
    }
}

/// A trimmed, non-blank name of at most [`MAX_NAME_LEN`] characters.
fn name_field(
    form: &mut FormData,
    field: &str,
    required: bool,
    errors: &mut FieldErrors,
) -> Option<String> {
    let value = match form.take(field) {
        None => {
            if required {
                errors.add(field, REQUIRED);
            }
            return None;
        }
        Some(value) => value,
    };

    let text = match string_value(value) {
        Ok(text) => text.trim().to_string(),
        Err(message) => {
            errors.add(field, message);
            return None;
        }
    };

    if text.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if text.chars().count() > MAX_NAME_LEN {
        errors.add(field, name_too_long());
        return None;
    }
    Some(text)
}

fn text_field(form: &mut FormData, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match string_value(form.take(field)?) {
        Ok(text) => Some(text.trim().to_string()),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

fn string_value(value: FieldValue) -> Result<String, String> {
    match value {
        FieldValue::Text(text) => Ok(text),
        FieldValue::Null => Err(NULL.to_string()),
        FieldValue::Json(Value::Number(n)) => Ok(n.to_string()),
        FieldValue::Json(Value::Bool(b)) => Ok(if b { "True" } else { "False" }.to_string()),
        FieldValue::Json(_) | FieldValue::File(_) => Err(INVALID_STRING.to_string()),
    }
}

fn integer_field(form: &mut FormData, field: &str, errors: &mut FieldErrors) -> Option<i64> {
    let parsed = match form.take(field)? {
        FieldValue::Null => Err(NULL),
        FieldValue::Text(text) => parse_integer(&text).ok_or(INVALID_INTEGER),
        FieldValue::Json(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole_number))
            .ok_or(INVALID_INTEGER),
        FieldValue::Json(_) | FieldValue::File(_) => Err(INVALID_INTEGER),
    };

    match parsed {
        Ok(value) => Some(value),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

/// Parse an integer sent as text; `"4"`, `" 4 "` and `"4.0"` are accepted.
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(whole_number))
}

fn whole_number(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn image_field(form: &mut FormData, field: &str, errors: &mut FieldErrors) -> ImageField {
    match form.take(field) {
        None => ImageField::Absent,
        Some(FieldValue::Null) => ImageField::Clear,
        Some(FieldValue::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                ImageField::Clear
            } else {
                ImageField::Reference(text.to_string())
            }
        }
        Some(FieldValue::File(upload)) => {
            if upload.data.is_empty() {
                errors.add(field, EMPTY_FILE);
                ImageField::Absent
            } else {
                ImageField::Upload(upload)
            }
        }
        Some(FieldValue::Json(_)) => {
            errors.add(
                field,
                "The submitted data was not a file. Check the encoding type on the form.",
            );
            ImageField::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_form(value: Value) -> FormData {
        FormData::from_json(value.to_string().as_bytes()).unwrap()
    }

    fn messages(err: Error, field: &str) -> Vec<String> {
        err.field_errors()
            .and_then(|f| f.get(field).map(<[String]>::to_vec))
            .unwrap_or_default()
    }

    #[test]
    fn create_applies_defaults() {
        let payload = RecordPayload::for_create(json_form(json!({"contributor_name": "Ann"}))).unwrap();
        assert_eq!(payload.contributor_name.as_deref(), Some("Ann"));
        assert_eq!(payload.points, Some(DEFAULT_POINTS));
        assert_eq!(payload.note.as_deref(), Some(""));
        assert!(matches!(payload.image, ImageField::Absent));
    }

    #[test]
    fn create_requires_contributor_name() {
        let err = RecordPayload::for_create(json_form(json!({"points": 2}))).unwrap_err();
        assert_eq!(messages(err, "contributor_name"), [REQUIRED]);
    }

    #[test]
    fn blank_and_long_names_are_rejected() {
        let err =
            RecordPayload::for_create(json_form(json!({"contributor_name": "   "}))).unwrap_err();
        assert_eq!(messages(err, "contributor_name"), [BLANK]);

        let long = "x".repeat(MAX_NAME_LEN + 1);
        let err = ContributorPayload::parse(json_form(json!({ "name": long })), true).unwrap_err();
        assert_eq!(messages(err, "name"), [name_too_long()]);
    }

    #[test]
    fn invalid_points_reported_with_other_errors() {
        let err = RecordPayload::for_create(json_form(json!({"points": "invalid"}))).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert_eq!(fields.get("points").unwrap(), [INVALID_INTEGER.to_string()]);
        assert_eq!(fields.get("contributor_name").unwrap(), [REQUIRED.to_string()]);
    }

    #[test]
    fn points_accept_numeric_strings() {
        let form = FormData::new()
            .with("contributor_name", FieldValue::Text("Ann".into()))
            .with("points", FieldValue::Text(" 5 ".into()));
        let payload = RecordPayload::for_create(form).unwrap();
        assert_eq!(payload.points, Some(5));
    }

    #[test]
    fn fractional_points_are_invalid() {
        let err = RecordPayload::for_update(json_form(json!({"points": 2.5}))).unwrap_err();
        assert_eq!(messages(err, "points"), [INVALID_INTEGER]);
    }

    #[test]
    fn update_leaves_absent_fields_unset() {
        let payload = RecordPayload::for_update(json_form(json!({"note": "mopped"}))).unwrap();
        assert!(payload.contributor_name.is_none());
        assert!(payload.points.is_none());
        assert_eq!(payload.note.as_deref(), Some("mopped"));
        assert!(matches!(payload.image, ImageField::Absent));
    }

    #[test]
    fn image_field_variants() {
        let payload = RecordPayload::for_update(json_form(json!({"image": null}))).unwrap();
        assert!(matches!(payload.image, ImageField::Clear));

        let payload = RecordPayload::for_update(json_form(json!({"image": ""}))).unwrap();
        assert!(matches!(payload.image, ImageField::Clear));

        let payload =
            RecordPayload::for_update(json_form(json!({"image": "housework/a.jpg"}))).unwrap();
        assert!(matches!(payload.image, ImageField::Reference(ref r) if r == "housework/a.jpg"));
    }

    #[test]
    fn empty_upload_is_rejected() {
        let form = FormData::new().with(
            "image",
            FieldValue::File(ImageUpload {
                file_name: Some("a.png".into()),
                content_type: Some("image/png".into()),
                data: Bytes::new(),
            }),
        );
        let err = RecordPayload::for_update(form).unwrap_err();
        assert_eq!(messages(err, "image"), [EMPTY_FILE]);
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = FormData::from_json(b"[1, 2]").unwrap_err();
        let fields = err.inner().field_errors().unwrap();
        assert_eq!(
            fields.get("non_field_errors").unwrap(),
            ["Invalid data. Expected a dictionary, but got list.".to_string()]
        );
    }

    #[test]
    fn empty_body_is_empty_form() {
        let mut form = FormData::from_json(b"").unwrap();
        assert!(form.take("name").is_none());
    }

    #[test]
    fn patch_without_name_is_allowed() {
        let payload = ContributorPayload::parse(FormData::new(), false).unwrap();
        assert!(payload.name.is_none());

        let err = ContributorPayload::parse(FormData::new(), true).unwrap_err();
        assert_eq!(messages(err, "name"), [REQUIRED]);
    }
}
