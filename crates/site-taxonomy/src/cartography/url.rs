//! URL normalisation and the same-site rule.

use url::Url;

/// Canonical form used wherever URLs are compared or stored: everything
/// from the first `#` is dropped, then any trailing `/`.
pub fn normalize_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    without_fragment.trim_end_matches('/').to_string()
}

/// Whether `candidate` lives on the same site as `base`.
///
/// Network locations must match exactly; `www.example.com` and
/// `example.com` are different sites.
pub fn is_internal(candidate: &Url, base: &Url) -> bool {
    matches!(candidate.scheme(), "http" | "https") && candidate.authority() == base.authority()
}

/// The normalised, same-site subset of `links`, in order.
pub fn internal_links(links: impl IntoIterator<Item = Url>, base: &Url) -> Vec<String> {
    links
        .into_iter()
        .filter(|link| is_internal(link, base))
        .map(|link| normalize_url(link.as_str()))
        .collect()
}
