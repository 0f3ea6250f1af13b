//! Decoding of the legacy statement export encoding.

use encoding_rs::SHIFT_JIS;

/// Decodes raw statement export bytes as Shift_JIS.
///
/// Vpass and e-Navi exports are Shift_JIS regardless of the platform default,
/// so the encoding is fixed here rather than sniffed. Undecodable byte
/// sequences are replaced rather than failing the whole file.
pub fn decode_shift_jis(bytes: &[u8]) -> String {
    let (decoded, _, _) = SHIFT_JIS.decode(bytes);
    decoded.into_owned()
}
