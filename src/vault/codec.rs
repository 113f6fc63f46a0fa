use crate::error::DecodeError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

/// Fixed 8-byte container signature preceding the chunk stream.
pub const CARD_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Chunk type that carries the embedded character definition.
pub const TEXT_CHUNK_TYPE: [u8; 4] = *b"tEXt";

#[derive(Debug, Clone)]
pub struct Chunk {
    pub chunk_type: [u8; 4],
    pub payload: Vec<u8>,
}

/// Reflected CRC-32 over `chunk_type ++ payload`, the checksum every chunk
/// in the container carries.
pub fn crc32(chunk_type: &[u8], payload: &[u8]) -> u32 {
    const POLYNOMIAL: u32 = 0xEDB8_8320;

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in chunk_type.iter().chain(payload.iter()) {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

fn read_be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(raw))
}

fn chunk_type_label(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Walk the full chunk stream, verifying every stored checksum.
///
/// The whole scan fails on the first mismatch; there is no per-chunk
/// recovery.
fn read_chunks(bytes: &[u8]) -> Result<Vec<Chunk>, DecodeError> {
    if !bytes.starts_with(&CARD_SIGNATURE) {
        return Err(DecodeError::Format("signature mismatch".to_string()));
    }

    let mut chunks = Vec::new();
    let mut idx = CARD_SIGNATURE.len();

    while idx < bytes.len() {
        let length = read_be_u32(bytes, idx)
            .ok_or_else(|| DecodeError::Format("truncated chunk length".to_string()))?
            as usize;
        idx += 4;

        let chunk_type: [u8; 4] = bytes
            .get(idx..idx + 4)
            .and_then(|raw| raw.try_into().ok())
            .ok_or_else(|| DecodeError::Format("truncated chunk type".to_string()))?;
        idx += 4;

        let payload = bytes
            .get(idx..idx + length)
            .ok_or_else(|| DecodeError::Format("truncated chunk payload".to_string()))?
            .to_vec();
        idx += length;

        let stored_crc = read_be_u32(bytes, idx)
            .ok_or_else(|| DecodeError::Format("truncated chunk checksum".to_string()))?;
        idx += 4;

        if stored_crc != crc32(&chunk_type, &payload) {
            return Err(DecodeError::Integrity {
                chunk_type: chunk_type_label(&chunk_type),
            });
        }

        chunks.push(Chunk {
            chunk_type,
            payload,
        });
    }

    Ok(chunks)
}

/// Decode the embedded character definition from raw container bytes.
///
/// Pure function: scans and checksums every chunk, then takes the first
/// text chunk, splits its payload at the first NUL into keyword/value, and
/// runs the value through base64, UTF-8, and JSON decoding in that order.
pub fn decode_card_bytes(bytes: &[u8]) -> Result<Value, DecodeError> {
    let chunks = read_chunks(bytes)?;

    let text_chunk = chunks
        .iter()
        .find(|c| c.chunk_type == TEXT_CHUNK_TYPE)
        .ok_or(DecodeError::NotFound)?;

    let nul = text_chunk
        .payload
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| DecodeError::Encoding("text payload has no keyword separator".to_string()))?;
    let value = &text_chunk.payload[nul + 1..];

    let decoded = BASE64
        .decode(value)
        .map_err(|err| DecodeError::Encoding(format!("base64: {err}")))?;
    let text = String::from_utf8(decoded)
        .map_err(|err| DecodeError::Encoding(format!("utf-8: {err}")))?;
    serde_json::from_str(&text).map_err(|err| DecodeError::Encoding(format!("json: {err}")))
}

/// Serialize one chunk with its length prefix and checksum trailer.
pub fn encode_chunk(chunk_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 12);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc32(chunk_type, payload).to_be_bytes());
    out
}

/// Build a text chunk payload holding `keyword NUL base64(json)`.
pub fn encode_text_chunk(keyword: &str, metadata: &Value) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(keyword.as_bytes());
    payload.push(0);
    payload.extend_from_slice(BASE64.encode(metadata.to_string()).as_bytes());
    encode_chunk(&TEXT_CHUNK_TYPE, &payload)
}

/// Assemble a full container from already-encoded chunks.
pub fn encode_card(encoded_chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = CARD_SIGNATURE.to_vec();
    for chunk in encoded_chunks {
        out.extend_from_slice(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        CARD_SIGNATURE, crc32, decode_card_bytes, encode_card, encode_chunk, encode_text_chunk,
    };
    use crate::error::DecodeError;
    use serde_json::json;

    fn sample_card(metadata: &serde_json::Value) -> Vec<u8> {
        encode_card(&[
            encode_chunk(b"IHDR", &[0u8; 13]),
            encode_text_chunk("chara", metadata),
            encode_chunk(b"IEND", &[]),
        ])
    }

    #[test]
    fn decode_round_trips_text_metadata() {
        let metadata = json!({"name": "Aria", "description": "a wandering bard"});
        let card = sample_card(&metadata);

        let decoded = decode_card_bytes(&card).expect("decode");
        assert_eq!(decoded, metadata);

        let reencoded = sample_card(&decoded);
        assert_eq!(reencoded, card);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut card = sample_card(&json!({"name": "Aria"}));
        card[0] = 0x00;
        assert!(matches!(
            decode_card_bytes(&card),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn single_bit_flip_in_any_chunk_fails_integrity() {
        let card = sample_card(&json!({"name": "Aria"}));

        // Payload byte offsets for each of the three chunks.
        let ihdr_payload = CARD_SIGNATURE.len() + 8;
        let text_payload = ihdr_payload + 13 + 4 + 8;
        let offsets = [ihdr_payload, text_payload];

        for &offset in &offsets {
            let mut corrupted = card.clone();
            corrupted[offset] ^= 0x01;
            assert!(
                matches!(
                    decode_card_bytes(&corrupted),
                    Err(DecodeError::Integrity { .. })
                ),
                "flip at {offset} should fail integrity"
            );
        }
    }

    #[test]
    fn corrupt_trailing_chunk_fails_even_after_valid_text_chunk() {
        let mut card = sample_card(&json!({"name": "Aria"}));
        let stored_crc = card.len() - 1;
        card[stored_crc] ^= 0x01;
        assert!(matches!(
            decode_card_bytes(&card),
            Err(DecodeError::Integrity { chunk_type }) if chunk_type == "IEND"
        ));
    }

    #[test]
    fn missing_text_chunk_is_not_found() {
        let card = encode_card(&[encode_chunk(b"IHDR", &[0u8; 13]), encode_chunk(b"IEND", &[])]);
        assert!(matches!(decode_card_bytes(&card), Err(DecodeError::NotFound)));
    }

    #[test]
    fn malformed_base64_is_encoding_error() {
        let mut payload = b"chara".to_vec();
        payload.push(0);
        payload.extend_from_slice(b"!!not-base64!!");
        let card = encode_card(&[encode_chunk(b"tEXt", &payload)]);
        assert!(matches!(
            decode_card_bytes(&card),
            Err(DecodeError::Encoding(_))
        ));
    }

    #[test]
    fn truncated_stream_is_format_error() {
        let card = sample_card(&json!({"name": "Aria"}));
        let truncated = &card[..card.len() - 2];
        assert!(matches!(
            decode_card_bytes(truncated),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn crc32_matches_reference_vector() {
        // Standard check value for the reflected polynomial.
        assert_eq!(crc32(b"12345", b"6789"), 0xCBF4_3926);
    }
}
