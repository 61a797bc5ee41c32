use std::sync::OnceLock;

use anyhow::{Result, anyhow};
use maud::{Markup, html};
use regex::Regex;

use crate::meta::MetadataRecord;

fn title_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?is)<title(?:\s[^>]*)?>.*?</title\s*>").unwrap())
}

fn head_close_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)</head\s*>").unwrap())
}

/// Open Graph and Twitter Card tags for `meta`. Attribute values are escaped.
pub fn meta_tags(meta: &MetadataRecord) -> Vec<Markup> {
    let property = |key: &str, value: &str| html! { meta property=(key) content=(value); };
    let name = |key: &str, value: &str| html! { meta name=(key) content=(value); };
    vec![
        property("og:title", &meta.title),
        property("og:description", &meta.description),
        property("og:image", &meta.image),
        property("og:url", &meta.url),
        property("og:type", "article"),
        name("twitter:card", "summary_large_image"),
        name("twitter:title", &meta.title),
        name("twitter:description", &meta.description),
        name("twitter:image", &meta.image),
    ]
}

pub fn title_element(meta: &MetadataRecord) -> Markup { html! { title { (meta.title) } } }

fn tag_block(meta: &MetadataRecord, with_title: bool) -> String {
    let mut out = String::from("\n    <!-- Dynamic Social Tags -->\n");
    if with_title {
        out.push_str("    ");
        out.push_str(&title_element(meta).0);
        out.push('\n');
    }
    for tag in meta_tags(meta) {
        out.push_str("    ");
        out.push_str(&tag.0);
        out.push('\n');
    }
    out.push_str("    ");
    out
}

/// Patches `document` with the preview metadata: the first `<title>` element is replaced and
/// the tag block is inserted before the first `</head>`. All other bytes are left untouched.
/// Fails if the document has no `</head>`.
pub fn inject(document: &str, meta: &MetadataRecord) -> Result<String> {
    let first_head_close = head_close_regex()
        .find(document)
        .map(|m| m.start())
        .ok_or_else(|| anyhow!("Base document has no </head>"))?;
    // Only a title opened inside the head counts; `<title>` in body SVGs is left alone
    let title = title_regex().find(document).filter(|m| m.start() < first_head_close);
    let (title, head_close) = match title {
        Some(title) if title.end() <= first_head_close => (Some(title), first_head_close),
        // A `</head>` inside the title text doesn't count
        Some(title) => match head_close_regex().find_at(document, title.end()) {
            Some(head_close) => (Some(title), head_close.start()),
            None => (None, first_head_close),
        },
        None => (None, first_head_close),
    };

    let mut out = String::with_capacity(document.len() + 2048);
    match title {
        Some(title) => {
            out.push_str(&document[..title.start()]);
            out.push_str(&title_element(meta).0);
            out.push_str(&document[title.end()..head_close]);
            out.push_str(&tag_block(meta, false));
            out.push_str(&document[head_close..]);
        }
        None => {
            out.push_str(&document[..head_close]);
            out.push_str(&tag_block(meta, true));
            out.push_str(&document[head_close..]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{inject, meta_tags};
    use crate::meta::MetadataRecord;

    const INDEX: &str = r#"<!doctype html>
<html lang="ar" dir="rtl">
  <head>
    <meta charset="UTF-8" />
    <title>ASCWW</title>
    <script type="module" crossorigin src="/assets/index-B7x2kQ9a.js"></script>
    <link rel="stylesheet" crossorigin href="/assets/index-Dz3fT1ab.css">
  </head>
  <body>
    <div id="root"></div>
    <svg><title>Logo</title></svg>
  </body>
</html>
"#;

    fn meta() -> MetadataRecord {
        MetadataRecord {
            title: "Water station opened".to_string(),
            description: "A short description".to_string(),
            image: "https://cdn.example.org/image/x.jpg".to_string(),
            url: "https://news.example.org/news/7".to_string(),
        }
    }

    #[test]
    fn test_inject() {
        let out = inject(INDEX, &meta()).unwrap();
        assert_eq!(out.matches("<title>").count(), 2);
        assert!(out.contains("<title>Water station opened</title>"));
        assert!(!out.contains("<title>ASCWW</title>"));
        // The second title belongs to the body and is left alone
        assert!(out.contains("<svg><title>Logo</title></svg>"));
        assert!(out.contains(r#"<meta property="og:title" content="Water station opened">"#));
        assert!(out.contains(r#"<meta property="og:url" content="https://news.example.org/news/7">"#));
        assert!(out.contains(r#"<meta property="og:type" content="article">"#));
        assert!(out.contains(r#"<meta name="twitter:card" content="summary_large_image">"#));
        assert!(out.contains("<!-- Dynamic Social Tags -->"));

        let head_end = out.find("</head>").unwrap();
        assert!(out.find("og:title").unwrap() < head_end);
        // Everything from </head> onwards is byte-identical
        let original_head_end = INDEX.find("</head>").unwrap();
        assert_eq!(&out[head_end..], &INDEX[original_head_end..]);
        // Everything before the title is byte-identical
        let title_start = INDEX.find("<title>").unwrap();
        assert_eq!(&out[..title_start], &INDEX[..title_start]);
        assert!(out.contains(r#"<script type="module" crossorigin src="/assets/index-B7x2kQ9a.js"></script>"#));
    }

    #[test]
    fn test_inject_escapes_quotes() {
        let mut meta = meta();
        meta.title = r#"The "big" opening"#.to_string();
        meta.description = r#"He said "hello" & left"#.to_string();
        let out = inject(INDEX, &meta).unwrap();
        assert!(out.contains(
            r#"<meta property="og:description" content="He said &quot;hello&quot; &amp; left">"#
        ));
        assert!(out.contains(r#"<meta name="twitter:title" content="The &quot;big&quot; opening">"#));
        assert!(!out.contains(r#"content="He said "hello""#));
    }

    #[test]
    fn test_inject_replacement_is_literal() {
        let mut meta = meta();
        meta.title = "Prices up $1 and ${name}".to_string();
        let out = inject(INDEX, &meta).unwrap();
        assert!(out.contains("<title>Prices up $1 and ${name}</title>"));
    }

    #[test]
    fn test_inject_multiline_title() {
        let document = "<html><head><title>\n  App\n</title></head><body>x</body></html>";
        let out = inject(document, &meta()).unwrap();
        assert!(out.starts_with("<html><head><title>Water station opened</title>"));
        assert!(out.ends_with("</head><body>x</body></html>"));
        assert_eq!(out.matches("<title>").count(), 1);
    }

    #[test]
    fn test_inject_without_title() {
        let document = "<html><HEAD><meta charset=\"utf-8\"></HEAD><body></body></html>";
        let out = inject(document, &meta()).unwrap();
        assert_eq!(out.matches("<title>").count(), 1);
        assert!(out.find("<title>").unwrap() < out.find("</HEAD>").unwrap());
        assert!(out.ends_with("</HEAD><body></body></html>"));
    }

    #[test]
    fn test_inject_title_only_in_body() {
        let document = "<html><head><meta charset=\"utf-8\"></head>\
            <body><svg><title>Logo</title></svg></body></html>";
        let out = inject(document, &meta()).unwrap();
        let head_end = out.find("</head>").unwrap();
        assert!(out[..head_end].contains("<title>Water station opened</title>"));
        assert_eq!(&out[head_end..], &document[document.find("</head>").unwrap()..]);
        assert!(out.ends_with("<body><svg><title>Logo</title></svg></body></html>"));
    }

    #[test]
    fn test_inject_title_in_head_with_close_tag_text() {
        let document = "<html><head><title>a </head> b</title></head><body></body></html>";
        let out = inject(document, &meta()).unwrap();
        assert!(out.starts_with("<html><head><title>Water station opened</title>"));
        assert_eq!(out.matches("<title>").count(), 1);
        assert!(out.ends_with("</head><body></body></html>"));
    }

    #[test]
    fn test_title_pattern_is_exact() {
        let document = "<html><head><title-bar>x</title-bar><title lang=\"ar\">App</title></head></html>";
        let out = inject(document, &meta()).unwrap();
        assert!(out.contains("<title-bar>x</title-bar><title>Water station opened</title>"));
        assert_eq!(out.matches("<title>").count(), 1);
    }

    #[test]
    fn test_inject_without_head() {
        assert!(inject("<html><body>no head</body></html>", &meta()).is_err());
        assert!(inject("", &meta()).is_err());
    }

    #[test]
    fn test_meta_tags() {
        let tags = meta_tags(&meta());
        assert_eq!(tags.len(), 9);
        assert_eq!(
            tags[2].0,
            r#"<meta property="og:image" content="https://cdn.example.org/image/x.jpg">"#
        );
    }
}
