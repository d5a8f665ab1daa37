//! Flat `<xml>` envelope codec used by the WeChat Pay v2 API.
//!
//! Requests and error responses are a single `<xml>` root with one child
//! element per parameter. Nested elements are not part of the protocol and are
//! rejected on decode.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::WxPayError;
use crate::model::common::Params;

const ROOT: &str = "xml";
const ROOT_MARKER: &[u8] = b"<xml>";

/// Serialize a parameter set as `<xml><key>value</key>...</xml>`.
pub fn encode(params: &Params) -> Vec<u8> {
    let mut out = String::with_capacity(64 + params.len() * 32);
    out.push_str("<xml>");
    for (key, value) in params {
        out.push('<');
        out.push_str(key);
        out.push('>');
        out.push_str(&escape(value.as_str()));
        out.push_str("</");
        out.push_str(key);
        out.push('>');
    }
    out.push_str("</xml>");
    out.into_bytes()
}

/// Parse a flat `<xml>` document into tag -> text pairs.
///
/// Text and CDATA content are both accepted; a self-closing or empty child maps to `""`.
pub fn decode(document: &[u8]) -> Result<Params, WxPayError> {
    let text = std::str::from_utf8(document)
        .map_err(|e| WxPayError::MalformedResponse(format!("response is not UTF-8: {e}")))?;

    let mut reader = Reader::from_str(text);

    let mut params = Params::new();
    let mut depth = 0usize;
    let mut root_closed = false;
    let mut current: Option<(String, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("at position {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Start(e) => {
                let name = element_name(e.name().as_ref())?;
                match depth {
                    0 if root_closed => return Err(malformed("multiple root elements")),
                    0 if name == ROOT => depth = 1,
                    0 => return Err(malformed(format!("unexpected root element <{name}>"))),
                    1 => {
                        current = Some((name, String::new()));
                        depth = 2;
                    }
                    _ => return Err(malformed(format!("nested element <{name}>"))),
                }
            }
            Event::Empty(e) => {
                let name = element_name(e.name().as_ref())?;
                match depth {
                    0 if root_closed => return Err(malformed("multiple root elements")),
                    0 if name == ROOT => root_closed = true,
                    0 => return Err(malformed(format!("unexpected root element <{name}>"))),
                    1 => {
                        params.insert(name, String::new());
                    }
                    _ => return Err(malformed(format!("nested element <{name}>"))),
                }
            }
            Event::Text(t) => {
                let unescaped = t.unescape().map_err(|e| malformed(e.to_string()))?;
                if let Some((_, value)) = current.as_mut() {
                    // Child values are kept verbatim, surrounding whitespace included.
                    value.push_str(&unescaped);
                } else if depth == 0 && !unescaped.trim().is_empty() {
                    return Err(malformed("text outside the root element"));
                }
            }
            Event::CData(c) => {
                if let Some((_, value)) = current.as_mut() {
                    let raw = c.into_inner();
                    let s = std::str::from_utf8(&raw).map_err(|e| malformed(e.to_string()))?;
                    value.push_str(s);
                }
            }
            Event::End(_) => match depth {
                2 => {
                    if let Some((name, value)) = current.take() {
                        params.insert(name, value);
                    }
                    depth = 1;
                }
                1 => {
                    depth = 0;
                    root_closed = true;
                }
                _ => return Err(malformed("unbalanced closing tag")),
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_closed {
        return Err(malformed("missing or unterminated <xml> root"));
    }
    Ok(params)
}

/// Whether a response body carries the `<xml>` root marker.
///
/// Bill downloads return raw CSV on success and an XML envelope on failure,
/// so the body shape, not the HTTP status, decides how it is read.
pub fn looks_like_xml(body: &[u8]) -> bool {
    body.windows(ROOT_MARKER.len()).any(|w| w == ROOT_MARKER)
}

fn element_name(raw: &[u8]) -> Result<String, WxPayError> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|e| malformed(format!("element name is not UTF-8: {e}")))
}

fn malformed(msg: impl Into<String>) -> WxPayError {
    WxPayError::MalformedResponse(msg.into())
}
