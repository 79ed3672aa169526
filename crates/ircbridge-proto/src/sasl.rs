//! PLAIN SASL mechanism (RFC 4616).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Largest payload chunk carried by a single `AUTHENTICATE` line.
pub const AUTHENTICATE_CHUNK: usize = 400;

/// Encode `authzid NUL authcid NUL password` as base64.
///
/// An empty `authzid` asks the server to derive it from `authcid`.
pub fn encode_plain(authzid: &str, authcid: &str, password: &str) -> String {
    let payload = format!("{}\0{}\0{}", authzid, authcid, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded payload into `AUTHENTICATE` chunks.
///
/// A payload that is an exact multiple of the chunk size is terminated by a
/// lone `+`.
pub fn chunk_payload(encoded: &str) -> Vec<String> {
    if encoded.is_empty() {
        return vec!["+".to_owned()];
    }

    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(AUTHENTICATE_CHUNK)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    if encoded.len() % AUTHENTICATE_CHUNK == 0 {
        chunks.push("+".to_owned());
    }
    chunks
}
