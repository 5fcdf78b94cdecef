//! URL canonicalization for cross-source duplicate matching.

use url::Url;

/// Query parameters that only carry attribution on any host.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "igshid", "mc_cid", "mc_eid"];

/// Short parameter names that are share or player state on these hosts but
/// can identify content elsewhere (`viewtopic.php?t=`, `?s=` search pages).
const X_SHARE_PARAMS: &[&str] = &["s", "t", "ref_src", "ref_url"];
const YOUTUBE_SHARE_PARAMS: &[&str] = &["t", "si", "feature", "pp"];

const HOST_PREFIXES: &[&str] = &["www.", "m.", "mobile.", "old."];

/// `host` is already canonical (see [`canonical_host`]).
fn is_tracking(host: &str, key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    if key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str()) {
        return true;
    }
    match host {
        "x.com" => X_SHARE_PARAMS.contains(&key.as_str()),
        "youtube.com" | "youtu.be" => YOUTUBE_SHARE_PARAMS.contains(&key.as_str()),
        _ => false,
    }
}

fn canonical_host(host: &str) -> String {
    let mut host = host.to_ascii_lowercase();
    while let Some(stripped) = HOST_PREFIXES
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .filter(|rest| rest.contains('.'))
    {
        host = stripped.to_string();
    }
    match host.as_str() {
        "twitter.com" => "x.com".to_string(),
        _ => host,
    }
}

/// Video id for `youtu.be/{id}` and `youtube.com/shorts/{id}` links.
fn short_video_id(host: &str, url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    let id = match host {
        "youtu.be" => segments.next()?,
        "youtube.com" => match (segments.next(), segments.next()) {
            (Some("shorts"), Some(id)) => id,
            _ => return None,
        },
        _ => return None,
    };
    (!id.is_empty()).then(|| id.to_string())
}

/// Reduce `raw` to a canonical form so that different links to the same
/// content compare equal.
///
/// Unparseable input falls back to the trimmed, lower-cased string.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_lowercase();
    };
    let Some(host) = url.host_str().map(canonical_host) else {
        return trimmed.to_lowercase();
    };

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking(&host, k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let host = if let Some(id) = short_video_id(&host, &url) {
        url.set_path("/watch");
        pairs.retain(|(k, _)| k != "v");
        pairs.push(("v".to_string(), id));
        "youtube.com".to_string()
    } else {
        host
    };

    if url.set_host(Some(&host)).is_err() {
        return trimmed.to_lowercase();
    }
    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    pairs.sort();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    let mut out = url.to_string();
    if out.ends_with('/') {
        out.pop();
    }
    out
}

/// Host of `raw` without a leading `www.`, if it parses.
#[must_use]
pub fn domain_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Video id from a YouTube watch, short, or `youtu.be` link.
#[must_use]
pub fn youtube_video_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = canonical_host(url.host_str()?);
    if let Some(id) = short_video_id(&host, &url) {
        return Some(id);
    }
    if host == "youtube.com" {
        return url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment_tracking_and_trailing_slash() {
        assert_eq!(
            canonicalize("https://Example.com/post/?utm_source=x&b=2&a=1#comments"),
            "https://example.com/post?a=1&b=2"
        );
    }

    #[test]
    fn drops_host_prefixes() {
        assert_eq!(
            canonicalize("https://www.reddit.com/r/rust/comments/abc/"),
            canonicalize("https://old.reddit.com/r/rust/comments/abc")
        );
        assert_eq!(
            canonicalize("https://m.youtube.com/watch?v=abc123"),
            "https://youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn twitter_maps_to_x() {
        assert_eq!(
            canonicalize("https://mobile.twitter.com/rustlang/status/42?s=20&t=abc"),
            "https://x.com/rustlang/status/42"
        );
    }

    #[test]
    fn youtube_short_links_become_watch_urls() {
        let expected = "https://youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(canonicalize("https://youtu.be/dQw4w9WgXcQ?si=xyz"), expected);
        assert_eq!(
            canonicalize("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(
            canonicalize("https://www.youtube.com/watch?v=dQw4w9WgXcQ&feature=share"),
            expected
        );
    }

    #[test]
    fn short_params_identify_content_on_other_hosts() {
        let a = canonicalize("https://forum.example.org/viewtopic.php?t=101");
        let b = canonicalize("https://forum.example.org/viewtopic.php?t=202");
        assert_eq!(a, "https://forum.example.org/viewtopic.php?t=101");
        assert_ne!(a, b);
        assert_eq!(
            canonicalize("https://blog.example.com/?s=borrow+checker&utm_medium=social"),
            "https://blog.example.com/?s=borrow+checker"
        );
        assert_eq!(
            canonicalize("https://example.com/page?ref=home&feature=x"),
            "https://example.com/page?feature=x&ref=home"
        );
    }

    #[test]
    fn youtube_timestamp_is_player_state() {
        assert_eq!(
            canonicalize("https://youtu.be/abc123?t=42"),
            "https://youtube.com/watch?v=abc123"
        );
        assert_eq!(
            canonicalize("https://www.youtube.com/watch?v=abc123&t=90s&pp=ygU"),
            "https://youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn video_id_case_is_preserved() {
        assert_eq!(
            canonicalize("https://youtube.com/watch?v=AbC"),
            "https://youtube.com/watch?v=AbC"
        );
    }

    #[test]
    fn root_path_has_no_trailing_slash() {
        assert_eq!(canonicalize("https://example.com/"), "https://example.com");
    }

    #[test]
    fn unparseable_falls_back_to_lowercase() {
        assert_eq!(canonicalize("  Not A URL "), "not a url");
    }

    #[test]
    fn domain_strips_www() {
        assert_eq!(
            domain_of("https://www.Example.org/a").as_deref(),
            Some("example.org")
        );
        assert_eq!(domain_of("nope"), None);
    }

    #[test]
    fn video_id_from_links() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=abc&t=10").as_deref(),
            Some("abc")
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/xyz").as_deref(),
            Some("xyz")
        );
        assert_eq!(youtube_video_id("https://vimeo.com/1"), None);
    }
}
