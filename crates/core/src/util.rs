use std::path::{Path, PathBuf};

use url::Url;

pub trait UrlExt {
    fn query_param(&self, key: &str, value: Option<&str>) -> Url;
    fn with_path(&self, path: &str) -> Url;
    fn with_segments<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url;
}

impl UrlExt for Url {
    #[inline]
    fn query_param(&self, key: &str, value: Option<&str>) -> Url {
        let mut out = self.clone();
        let mut pairs = out.query_pairs_mut();
        pairs.clear();
        let mut updated = false;
        for (k, v) in self.query_pairs() {
            if k == key {
                if let Some(value) = value {
                    if value.is_empty() {
                        pairs.append_key_only(&k);
                    } else {
                        pairs.append_pair(&k, value);
                    }
                }
                updated = true;
            } else if v.is_empty() {
                pairs.append_key_only(&k);
            } else {
                pairs.append_pair(&k, &v);
            }
        }
        if !updated && let Some(value) = value {
            pairs.append_pair(key, value);
        }
        drop(pairs);
        if out.query() == Some("") {
            out.set_query(None);
        }
        out
    }

    #[inline]
    fn with_path(&self, path: &str) -> Url {
        let mut out = self.clone();
        out.set_path(path);
        out.set_query(None);
        out.set_fragment(None);
        out
    }

    /// Replaces the path with the given segments, percent-encoding each one.
    fn with_segments<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut out = self.with_path("/");
        if let Ok(mut path) = out.path_segments_mut() {
            path.clear().extend(segments);
        }
        out
    }
}

/// Join two paths, only including the normal components.
pub fn join_normalized(base: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    let mut out = base.as_ref().to_path_buf();
    out.extend(path.as_ref().components().filter(|v| matches!(v, std::path::Component::Normal(_))));
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use url::Url;

    use super::{UrlExt, join_normalized};

    #[test]
    fn test_query_param() {
        let url = Url::parse("https://example.org/?a=1").unwrap();
        assert_eq!(
            url.query_param("redirect", Some("/news/5")).as_str(),
            "https://example.org/?a=1&redirect=%2Fnews%2F5"
        );
        assert_eq!(url.query_param("a", None).as_str(), "https://example.org/");
        assert_eq!(url.query_param("a", Some("2")).as_str(), "https://example.org/?a=2");
    }

    #[test]
    fn test_with_segments() {
        let origin = Url::parse("https://example.org/some/page?x=1").unwrap();
        assert_eq!(origin.with_segments(["news", "42"]).as_str(), "https://example.org/news/42");
        assert_eq!(
            origin.with_segments(["news", "a b/c"]).as_str(),
            "https://example.org/news/a%20b%2Fc"
        );
    }

    #[test]
    fn test_join_normalized() {
        assert_eq!(join_normalized("dist", "index.html"), PathBuf::from("dist/index.html"));
        assert_eq!(join_normalized("dist", "../../etc/passwd"), PathBuf::from("dist/etc/passwd"));
        assert_eq!(join_normalized("dist", "/index.html"), PathBuf::from("dist/index.html"));
    }
}
