use chardetng::EncodingDetector;
use engine_logging::engine_warn;
use encoding_rs::Encoding;

/// How far into the document a `<meta charset>` declaration is looked for.
const META_PRESCAN_BYTES: usize = 1024;

/// A page converted to UTF-8, with the name of the encoding it came in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
    /// Some bytes were invalid in that encoding and became U+FFFD.
    pub lossy: bool,
}

/// Decodes a downloaded page into UTF-8.
///
/// Precedence: byte order mark, `Content-Type` charset, `<meta charset>` in
/// the first kilobyte, then a `chardetng` guess. Invalid sequences become
/// U+FFFD.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> DecodedHtml {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    let declared = content_type
        .and_then(header_charset)
        .or_else(|| meta_charset(bytes));
    if let Some(enc) = declared.and_then(|label| Encoding::for_label(label.as_bytes())) {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn header_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\'']).to_string())
    })
}

/// Finds `charset=` inside a `<meta` tag near the start of the document.
fn meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_PRESCAN_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    head.split("<meta").skip(1).find_map(|tag| {
        let tag = tag.split('>').next()?;
        let start = tag.find("charset=")? + "charset=".len();
        let label: String = tag[start..]
            .trim_start_matches(['"', '\''])
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
            .collect();
        (!label.is_empty()).then_some(label)
    })
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> DecodedHtml {
    let (text, _, lossy) = encoding.decode(bytes);
    if lossy {
        engine_warn!("Page is not clean {}; invalid bytes replaced", encoding.name());
    }
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
        lossy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_charset_wins_over_detection() {
        let bytes = b"<p>caf\xe9</p>";
        let decoded = decode_html(bytes, Some("text/html; Charset=\"ISO-8859-1\""));
        assert_eq!(decoded.html, "<p>caf\u{e9}</p>");
        assert_eq!(decoded.encoding_label, "windows-1252");
    }

    #[test]
    fn meta_charset_is_used_without_header() {
        let bytes = b"<html><head><meta charset=\"windows-1252\"></head><p>\x93hi\x94</p>";
        let decoded = decode_html(bytes, Some("text/html"));
        assert!(decoded.html.contains("\u{201c}hi\u{201d}"));
    }

    #[test]
    fn bom_is_honoured() {
        let decoded = decode_html(b"\xef\xbb\xbfhello", None);
        assert_eq!(decoded.html, "hello");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn stray_bytes_are_replaced_not_rejected() {
        let decoded = decode_html(b"<p>ok \xff then more</p>", Some("text/html; charset=utf-8"));
        assert_eq!(decoded.html, "<p>ok \u{fffd} then more</p>");
        assert!(decoded.lossy);
        assert!(!decode_html(b"<p>ok</p>", Some("text/html; charset=utf-8")).lossy);
    }

    #[test]
    fn meta_prescan_handles_http_equiv() {
        let bytes = br#"<meta http-equiv="Content-Type" content="text/html; charset=Shift_JIS">"#;
        assert_eq!(meta_charset(bytes).as_deref(), Some("shift_jis"));
    }
}
