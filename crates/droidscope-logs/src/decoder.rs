/// Decode one raw output line into text.
///
/// Trailing `\n` / `\r` are stripped. Valid UTF-8 is taken as is; anything
/// else is decoded one byte per char (Latin-1), which cannot fail but may
/// render the wrong characters.
pub fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    let bytes = &raw[..end];

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_line_endings() {
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"hello\n\n"), "hello");
        assert_eq!(decode_line(b"  spaced  \n"), "  spaced  ");
        assert_eq!(decode_line(b""), "");
        assert_eq!(decode_line(b"\r\n"), "");
    }

    #[test]
    fn test_utf8_passthrough() {
        assert_eq!(decode_line("相机 ✓\n".as_bytes()), "相机 ✓");
    }

    #[test]
    fn test_invalid_utf8_falls_back_per_byte() {
        let raw = [b'o', b'k', 0xff, 0xfe, b'\n'];
        let text = decode_line(&raw);
        assert_eq!(text, "ok\u{ff}\u{fe}");
        assert_eq!(text.chars().count(), 4);
    }

    #[test]
    fn test_never_fails_on_any_byte() {
        let all: Vec<u8> = (0..=255u8).collect();
        let text = decode_line(&all);
        // 0x0a and 0x0d are not trailing here, so every byte survives
        assert_eq!(text.chars().count(), 256);

        // Truncated multi-byte sequence
        assert_eq!(decode_line(&[0xe7, 0x9b]), "\u{e7}\u{9b}");
    }
}
