//! `{ "data": ... }` response envelope.
//!
//! Errors use the `{ "error", "code" }` body from [`crate::error`]; every
//! successful handler wraps its payload in [`DataResponse`].

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// A `201 Created` answer carrying the new resource.
pub type Created<T> = (StatusCode, Json<DataResponse<T>>);

/// Wrap a freshly created resource.
///
/// ```ignore
/// Ok(created(submission))
/// ```
pub fn created<T: Serialize>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(DataResponse { data }))
}
