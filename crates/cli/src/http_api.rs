use axum::{
    body::Body,
    http::{header, HeaderValue, Response as HttpResponse, StatusCode},
    response::Response,
};
use rethink_protocol::{serialize_json, ErrorCode, ErrorEnvelope};
use serde::Serialize;

pub(crate) fn error_response(
    code: ErrorCode,
    message: impl Into<String>,
) -> Result<Response, StatusCode> {
    envelope_response(&ErrorEnvelope::new(code, message))
}

pub(crate) fn envelope_response(envelope: &ErrorEnvelope) -> Result<Response, StatusCode> {
    let status = StatusCode::from_u16(envelope.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    build_response(status, envelope)
}

pub(crate) fn build_response<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response, StatusCode> {
    let bytes = serialize_json(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();

    HttpResponse::builder()
        .status(status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(Body::from(bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
