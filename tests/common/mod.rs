use serde_json::Value;

/// Build container bytes the way the companion ecosystem writes card files:
/// signature, checksummed chunks, metadata in a `tEXt` chunk as
/// `keyword NUL base64(json)`.
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

pub fn chunk(chunk_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc32(chunk_type, payload).to_be_bytes());
    out
}

pub fn card_bytes(metadata: &Value) -> Vec<u8> {
    use base64::Engine;

    let mut text_payload = b"chara".to_vec();
    text_payload.push(0);
    text_payload.extend_from_slice(
        base64::engine::general_purpose::STANDARD
            .encode(metadata.to_string())
            .as_bytes(),
    );

    let mut out = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    out.extend_from_slice(&chunk(b"IHDR", &[0u8; 13]));
    out.extend_from_slice(&chunk(b"tEXt", &text_payload));
    out.extend_from_slice(&chunk(b"IEND", &[]));
    out
}
