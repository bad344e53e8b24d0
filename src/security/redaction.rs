//! National-ID redaction of outbound response bodies.
//!
//! # Responsibilities
//! - Buffer the complete handler response
//! - Mask every 12-digit identifier (plain, or 4-4-4 grouped by space or hyphen)
//! - Recompute `Content-Length` for the rewritten body
//!
//! # Design Decisions
//! - The whole body is buffered: a match may straddle separate body chunks
//! - Masking keeps the last four digits: `XXXX-XXXX-XXXX-1234`
//! - Applies to every status code; error bodies are masked too
//! - Runs of 11 or 13+ digits are not identifiers and are left alone

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::bytes::Regex;

use crate::error::AppError;
use crate::observability::metrics;

/// Mask written in place of the first eight digits.
pub const MASK_PREFIX: &str = "XXXX-XXXX-XXXX-";

const NATIONAL_ID_PATTERN: &str = r"(?-u:\b)([0-9]{4})[ -]?([0-9]{4})[ -]?([0-9]{4})(?-u:\b)";

/// Masks national-ID numbers in response bodies.
pub struct Redactor {
    pattern: Regex,
    max_body_bytes: usize,
}

impl Redactor {
    pub fn new(max_body_bytes: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(NATIONAL_ID_PATTERN)?,
            max_body_bytes,
        })
    }

    /// Return the body with every identifier masked, and the match count.
    pub fn redact<'a>(&self, body: &'a [u8]) -> (Cow<'a, [u8]>, usize) {
        let mut count = 0;
        let redacted = self.pattern.replace_all(body, |caps: &regex::bytes::Captures<'_>| {
            count += 1;
            let mut masked = MASK_PREFIX.as_bytes().to_vec();
            masked.extend_from_slice(&caps[3]);
            masked
        });
        (redacted, count)
    }

    /// True if `body` still contains an unmasked identifier.
    pub fn contains_identifier(&self, body: &[u8]) -> bool {
        self.pattern.is_match(body)
    }
}

/// Redaction stage: buffer, mask and re-emit the handler response.
pub async fn redaction_middleware(
    State(redactor): State<Arc<Redactor>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let (mut parts, body) = response.into_parts();

    let buffered = match axum::body::to_bytes(body, redactor.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::Internal(format!("response body could not be buffered: {e}"))
                .into_response();
        }
    };

    let (redacted, count) = redactor.redact(&buffered);
    let body = match redacted {
        Cow::Borrowed(_) => buffered.clone(),
        Cow::Owned(masked) => {
            metrics::record_redactions(count);
            tracing::debug!(matches = count, "Masked national-ID numbers in response");
            Bytes::from(masked)
        }
    };

    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    Response::from_parts(parts, Body::from(body))
}
