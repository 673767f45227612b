//! Conversion between raw photo bytes and the data URIs stored as custom images.

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Encodes `bytes` as a base64 data URI, sniffing the MIME type from the content.
pub fn encode_data_uri(bytes: &[u8]) -> String {
    let mime_type = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_MIME_TYPE);
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Decodes a data URI. Non base64 payloads are returned as is, anything that
/// is not a data URI yields None.
pub fn decode_data_uri(uri: &str) -> Option<DecodedImage> {
    let (header, payload) = uri.strip_prefix("data:")?.split_once(',')?;
    let (mime_type, is_base64) = match header.strip_suffix(";base64") {
        Some(mime_type) => (mime_type, true),
        None => (header, false),
    };
    let bytes = if is_base64 {
        STANDARD.decode(payload).ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    let mime_type = if mime_type.is_empty() {
        FALLBACK_MIME_TYPE
    } else {
        mime_type
    };
    Some(DecodedImage {
        mime_type: mime_type.to_string(),
        bytes,
    })
}
