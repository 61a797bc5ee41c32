use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use news_meta_core::util::UrlExt;
use url::Url;

use crate::{
    inject::{meta_tags, title_element},
    meta::MetadataRecord,
};

/// Where the fallback page sends the browser: the app root, carrying the requested path so
/// the client router can resume there.
pub fn redirect_target(origin: &Url, requested_path: Option<&str>) -> Result<String> {
    let root = origin.join("/").context("Invalid site origin")?;
    let requested_path = requested_path.map(str::trim).filter(|p| !p.is_empty() && *p != "/");
    let target = root.query_param("redirect", requested_path);
    Ok(target[url::Position::BeforePath..].to_string())
}

/// Minimal standalone page served when the base document can't be patched. Carries the
/// preview tags and immediately redirects to the app.
pub fn render(
    meta: &MetadataRecord,
    origin: &Url,
    requested_path: Option<&str>,
) -> Result<Markup> {
    let target = redirect_target(origin, requested_path)?;
    let target_js = serde_json::to_string(&target).context("Failed to encode redirect target")?;
    Ok(html! {
        (DOCTYPE)
        html lang="ar" dir="rtl" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                (title_element(meta))
                @for tag in meta_tags(meta) {
                    (tag)
                }
                script { (PreEscaped(format!("window.location.replace({target_js});"))) }
            }
            body {
                h1 { "جارٍ التحويل..." }
                noscript {
                    a href=(target) { (meta.title) }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{redirect_target, render};
    use crate::meta::MetadataRecord;

    fn origin() -> Url { Url::parse("https://news.example.org/some/page").unwrap() }

    #[test]
    fn test_redirect_target() {
        let cases: &[(Option<&str>, &str)] = &[
            (None, "/"),
            (Some(""), "/"),
            (Some("/"), "/"),
            (Some("/news/7"), "/?redirect=%2Fnews%2F7"),
            (Some("/news/<script>"), "/?redirect=%2Fnews%2F%3Cscript%3E"),
        ];
        for &(path, expected) in cases {
            assert_eq!(redirect_target(&origin(), path).unwrap(), expected);
        }
    }

    #[test]
    fn test_render() {
        let meta = MetadataRecord {
            title: "Default \"title\"".to_string(),
            description: "Default description".to_string(),
            image: "https://news.example.org/logo.png".to_string(),
            url: "https://news.example.org/".to_string(),
        };
        let page = render(&meta, &origin(), Some("/news/7")).unwrap().into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains(r#"<html lang="ar" dir="rtl">"#));
        assert!(page.contains("<title>Default &quot;title&quot;</title>"));
        assert!(page.contains(r#"<meta property="og:title" content="Default &quot;title&quot;">"#));
        assert!(page.contains(r#"<meta property="og:image" content="https://news.example.org/logo.png">"#));
        assert!(page.contains(r#"<script>window.location.replace("/?redirect=%2Fnews%2F7");</script>"#));
        assert_eq!(page.matches("<title>").count(), 1);
    }
}
