use encoding_rs::{Encoding, UTF_8};
use regex::Regex;

/// How far into the document to look for a `<meta>` charset declaration.
const META_SNIFF_BYTES: usize = 4096;

/// Decode an HTML body into text.
///
/// Precedence: byte-order mark, then the `charset` parameter of the HTTP
/// `Content-Type`, then a `<meta>` declaration near the top of the page,
/// then UTF-8. Undecodable sequences become U+FFFD.
///
/// ```
/// use fineprint_web::decode::decode_html;
///
/// let latin1 = b"<p>g\xe9n\xe9rales</p>";
/// assert_eq!(
///     decode_html(latin1, Some("text/html; charset=ISO-8859-1")),
///     "<p>générales</p>"
/// );
/// ```
pub fn decode_html(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(body)
        .map(|(enc, _)| enc)
        .or_else(|| content_type.and_then(charset_from_content_type))
        .or_else(|| charset_from_meta(body))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!(encoding = used.name(), "decode.replacement_chars");
    }
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches(['"', '\'']).as_bytes()))
}

fn charset_from_meta(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_BYTES)]);
    let re = Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#).ok()?;
    let label = re.captures(&head)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_charset_wins_over_meta() {
        let body = b"<meta charset=\"utf-8\"><p>caf\xe9</p>";
        assert_eq!(
            decode_html(body, Some("text/html; charset=windows-1252")),
            "<meta charset=\"utf-8\"><p>café</p>"
        );
    }

    #[test]
    fn meta_charset_is_used_without_header() {
        let body = b"<html><head><meta charset=\"iso-8859-1\"></head><p>\xe0 chaque</p></html>";
        let text = decode_html(body, Some("text/html"));
        assert!(text.contains("à chaque"));
    }

    #[test]
    fn http_equiv_meta_is_understood() {
        let body = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-1\"><p>\xe9t\xe9</p>";
        assert!(decode_html(body, None).contains("été"));
    }

    #[test]
    fn utf8_is_the_default() {
        assert_eq!(decode_html("<p>naïve</p>".as_bytes(), None), "<p>naïve</p>");
    }

    #[test]
    fn bom_overrides_everything() {
        let mut body = vec![0xEF, 0xBB, 0xBF];
        body.extend_from_slice("<p>ü</p>".as_bytes());
        assert_eq!(
            decode_html(&body, Some("text/html; charset=iso-8859-1")),
            "<p>ü</p>"
        );
    }

    #[test]
    fn unknown_labels_fall_back_to_utf8() {
        assert_eq!(
            decode_html("<p>ok</p>".as_bytes(), Some("text/html; charset=klingon")),
            "<p>ok</p>"
        );
    }
}
