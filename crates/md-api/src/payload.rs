//! # md-api Payloads
//!
//! Request bodies and the extractors that turn them into core input types.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use md_core::models::CargoItem;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// `axum::Json` with rejections rendered as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// One medication in a JSON load request. Missing text fields arrive blank and
/// are reported by the format checks.
#[derive(Debug, Default, Deserialize)]
pub struct CargoItemPayload {
    #[serde(default)]
    pub name: String,
    /// Number or string; absent means zero.
    #[serde(default)]
    pub weight: Option<Value>,
    #[serde(default)]
    pub code: String,
    /// Reference to an image already in the media store.
    #[serde(default)]
    pub image: String,
}

impl CargoItemPayload {
    pub fn into_cargo(self) -> CargoItem {
        CargoItem {
            name: self.name,
            weight: raw_weight(self.weight),
            code: self.code,
            image: self.image,
        }
    }
}

/// A load body is either one item or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CargoPayload {
    Many(Vec<CargoItemPayload>),
    One(CargoItemPayload),
}

impl CargoPayload {
    pub fn into_items(self) -> Vec<CargoItemPayload> {
        match self {
            CargoPayload::Many(items) => items,
            CargoPayload::One(item) => vec![item],
        }
    }
}

fn raw_weight(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => "0".to_string(),
        Some(Value::String(s)) => s,
        // `50.0` is a whole number of grams; `12.5` stays fractional and fails parsing.
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Body of `POST /api/drones/{id}/load/`.
///
/// JSON bodies carry image references. Multipart bodies describe a single item
/// and may carry the image file itself, which the handler stores first.
pub enum LoadRequest {
    Json(Vec<CargoItem>),
    Form(Multipart),
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA)
}

impl<S> FromRequest<S> for LoadRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(req.headers()) {
            let form = Multipart::from_request(req, state).await?;
            return Ok(LoadRequest::Form(form));
        }
        let JsonBody(payload) = JsonBody::<CargoPayload>::from_request(req, state).await?;
        Ok(LoadRequest::Json(
            payload.into_items().into_iter().map(CargoItemPayload::into_cargo).collect(),
        ))
    }
}

/// A multipart file part, kept until the media store has accepted it.
pub struct UploadedImage {
    pub bytes: bytes::Bytes,
    pub content_type: String,
}

/// Fields of a single-item multipart load form.
#[derive(Default)]
pub struct CargoForm {
    pub item: CargoItemPayload,
    pub upload: Option<UploadedImage>,
}

impl CargoForm {
    /// Reads every part. A file part named `image` becomes the upload; a plain
    /// text `image` part is taken as an existing media reference.
    pub async fn read(mut form: Multipart) -> Result<Self, ApiError> {
        let mut out = CargoForm::default();
        while let Some(field) = form.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if name == "image" && field.file_name().is_some() {
                let content_type = field
                    .content_type()
                    .map(str::to_owned)
                    .or_else(|| {
                        field
                            .file_name()
                            .map(|f| mime_guess::from_path(f).first_or_octet_stream().to_string())
                    })
                    .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
                let bytes = field.bytes().await?;
                out.upload = Some(UploadedImage { bytes, content_type });
                continue;
            }
            let text = field.text().await?;
            match name.as_str() {
                "name" => out.item.name = text,
                "weight" => out.item.weight = Some(Value::String(text)),
                "code" => out.item.code = text,
                "image" => out.item.image = text,
                _ => {}
            }
        }
        Ok(out)
    }
}
