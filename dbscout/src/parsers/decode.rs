use std::borrow::Cow;

/// Decodes UTF-8, dropping any byte sequences that are not valid UTF-8.
///
/// Invalid sequences are removed rather than replaced with U+FFFD, so a corrupt byte in the
/// middle of a record never shows up in match content or interferes with matching.
pub fn decode_lossy(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(valid) => Cow::Borrowed(valid),
        Err(_) => {
            let mut decoded = String::with_capacity(bytes.len());
            for chunk in bytes.utf8_chunks() {
                decoded.push_str(chunk.valid());
            }
            Cow::Owned(decoded)
        }
    }
}

/// Strips every trailing `\r` and `\n`
pub fn trim_line_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |i| i + 1);
    &bytes[..end]
}
