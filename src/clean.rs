//! HTML to plain text.
//!
//! One transform shared by the static and rendered fetch paths: parse, drop
//! text under non-content elements, emit one line per text node, drop blank
//! lines, cap the length.

use scraper::{Html, Node};

/// Elements whose text is never page content.
pub const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "noscript", "iframe", "svg",
];

/// Maximum characters kept, excluding the marker.
pub const MAX_TEXT_CHARS: usize = 15_000;

pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_CONTENT_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        raw.push_str(text);
        raw.push('\n');
    }

    let cleaned = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    cap_chars(cleaned, MAX_TEXT_CHARS)
}

/// Truncate to `max` characters and append [`TRUNCATION_MARKER`] if cut.
pub fn cap_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut capped = text[..cut].to_string();
            capped.push_str(TRUNCATION_MARKER);
            capped
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_non_content_elements() {
        let html = r#"<html><head><title>Noodle Bar</title><style>.x{color:red}</style>
            <script>var tracking = 1;</script></head>
            <body>
              <header>Site header</header>
              <nav><a href="/">Home</a></nav>
              <main><h1>Menu</h1><p>Tonkotsu ramen $16</p><p>Gyoza $8</p></main>
              <noscript>Enable JavaScript</noscript>
              <iframe src="/map"></iframe>
              <svg><text>logo</text></svg>
              <footer>Copyright</footer>
            </body></html>"#;

        let text = clean_html(html);
        assert_eq!(text, "Noodle Bar\nMenu\nTonkotsu ramen $16\nGyoza $8");
    }

    #[test]
    fn collapses_blank_lines_and_trims() {
        let html = "<body><p>  first  </p>\n\n\n<div>\n   \n</div><p>second</p></body>";
        assert_eq!(clean_html(html), "first\nsecond");
    }

    #[test]
    fn empty_document_is_empty_text() {
        assert_eq!(clean_html(""), "");
        assert_eq!(clean_html("<html><body><script>x()</script></body></html>"), "");
    }

    #[test]
    fn caps_long_text_with_marker() {
        let body = format!("<p>{}</p>", "a".repeat(MAX_TEXT_CHARS + 500));
        let text = clean_html(&body);
        assert!(text.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            text.chars().count(),
            MAX_TEXT_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn cap_counts_characters_not_bytes() {
        let capped = cap_chars("ééééé".to_string(), 3);
        assert_eq!(capped, format!("ééé{}", TRUNCATION_MARKER));
        assert_eq!(cap_chars("abc".to_string(), 3), "abc");
    }
}
