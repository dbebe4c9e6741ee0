//! Content-negotiated response writing.

use std::io::Write;

use axum::{
    body::Body,
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY},
    },
    response::Response,
};
use bytes::Bytes;
use flate2::{Compression, write::GzEncoder};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("gzip encoding failed: {0}")]
    Compress(#[from] std::io::Error),
    #[error("response could not be built: {0}")]
    Build(#[from] axum::http::Error),
}

/// Pick the response encoding from an `Accept-Encoding` header.
///
/// `gzip` (or `x-gzip`) with a positive q-value selects gzip. A positive
/// `*` selects gzip unless gzip is listed explicitly with `q=0`.
pub fn negotiate(accept_encoding: Option<&HeaderValue>) -> ContentEncoding {
    let Some(header) = accept_encoding.and_then(|value| value.to_str().ok()) else {
        return ContentEncoding::Identity;
    };

    let mut gzip = None;
    let mut wildcard = None;
    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let coding = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let quality = parts.find_map(parse_quality).unwrap_or(1.0);
        match coding.as_str() {
            "gzip" | "x-gzip" => gzip = Some(quality),
            "*" => wildcard = Some(quality),
            _ => {}
        }
    }

    let accepted = match (gzip, wildcard) {
        (Some(q), _) => q > 0.0,
        (None, Some(q)) => q > 0.0,
        (None, None) => false,
    };
    if accepted {
        ContentEncoding::Gzip
    } else {
        ContentEncoding::Identity
    }
}

fn parse_quality(param: &str) -> Option<f32> {
    let (name, value) = param.split_once('=')?;
    if !name.trim().eq_ignore_ascii_case("q") {
        return None;
    }
    // Malformed weights count as zero rather than the default of one.
    Some(value.trim().parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0))
}

/// Build the final response, compressing `content` when the client accepts
/// gzip. The encoder is finished before the response exists.
pub fn write(
    status: StatusCode,
    content: Bytes,
    content_type: &'static str,
    accept_encoding: Option<&HeaderValue>,
) -> Result<Response, WriteError> {
    let encoding = negotiate(accept_encoding);
    let body = match encoding {
        ContentEncoding::Identity => content,
        ContentEncoding::Gzip => gzip(&content)?,
    };

    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HeaderValue::from_static(content_type))
        .header(VARY, HeaderValue::from_static("Accept-Encoding"))
        .header(CONTENT_LENGTH, body.len());
    if encoding == ContentEncoding::Gzip {
        builder = builder.header(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }

    Ok(builder.body(Body::from(body))?)
}

fn gzip(content: &[u8]) -> Result<Bytes, std::io::Error> {
    let buffer = Vec::with_capacity(content.len() / 2);
    let mut encoder = GzEncoder::new(buffer, Compression::default());
    encoder.write_all(content)?;
    encoder.finish().map(Bytes::from)
}
