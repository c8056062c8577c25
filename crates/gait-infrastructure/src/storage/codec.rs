//! Transparent gzip codec for the state file.
//!
//! Reads sniff the gzip magic bytes, so a workspace can switch
//! `compress_state` on or off without converting the existing file.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use gait_core::error::{GaitError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound for a decompressed state document.
pub const MAX_DECODED_BYTES: usize = 256 * 1024 * 1024;

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .take(MAX_DECODED_BYTES.saturating_add(1) as u64)
        .read_to_end(&mut out)
        .map_err(|e| GaitError::io(format!("Failed to decompress state file: {}", e)))?;
    if out.len() > MAX_DECODED_BYTES {
        return Err(GaitError::io(format!(
            "Decompressed state file exceeds {} bytes",
            MAX_DECODED_BYTES
        )));
    }
    Ok(out)
}

/// Decodes raw file bytes into document text, inflating gzip when present.
pub fn decode(bytes: &[u8]) -> Result<String> {
    let plain = if is_gzip(bytes) {
        gunzip(bytes)?
    } else {
        bytes.to_vec()
    };
    String::from_utf8(plain).map_err(|e| GaitError::Serialization {
        format: "utf-8".to_string(),
        message: e.to_string(),
    })
}

/// Encodes document text for storage.
pub fn encode(text: &str, compress: bool) -> Result<Vec<u8>> {
    if !compress {
        return Ok(text.as_bytes().to_vec());
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_gzip_decode_to_same_text() {
        let text = r#"{"panelChats":[],"schemaVersion":"1.0"}"#;
        let plain = encode(text, false).unwrap();
        let packed = encode(text, true).unwrap();

        assert!(!is_gzip(&plain));
        assert!(is_gzip(&packed));
        assert_eq!(decode(&plain).unwrap(), text);
        assert_eq!(decode(&packed).unwrap(), text);
    }

    #[test]
    fn test_truncated_gzip_is_an_error() {
        let packed = encode("some state text", true).unwrap();
        let truncated = &packed[..packed.len() / 2];
        assert!(decode(truncated).is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        let err = decode(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(err.is_serialization());
    }
}
