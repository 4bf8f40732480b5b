//! Messaging markup for webhook replies

pub const CONTENT_TYPE: &str = "application/xml";

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// `<Response><Message>..</Message></Response>`, or an empty `<Response/>`
/// when there is nothing to send.
pub fn render_reply(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return r#"<?xml version="1.0" encoding="UTF-8"?><Response/>"#.to_string();
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>{}</Message></Response>"#,
        escape_xml(text)
    )
}
