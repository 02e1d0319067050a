/// Checks a lowercase host against one allowed-domain entry
///
/// An entry allows the domain itself and every subdomain below it, so
/// `"example.com"` allows `"www.example.com"` but not `"notexample.com"`.
///
/// # Examples
///
/// ```
/// use comics_crawler::url::matches_allowed_domain;
///
/// assert!(matches_allowed_domain("example.com", "example.com"));
/// assert!(matches_allowed_domain("example.com", "shop.example.com"));
/// assert!(!matches_allowed_domain("example.com", "myexample.com"));
/// ```
pub fn matches_allowed_domain(allowed: &str, host: &str) -> bool {
    let allowed = allowed.to_lowercase();
    host == allowed
        || host
            .strip_suffix(allowed.as_str())
            .map_or(false, |prefix| prefix.ends_with('.'))
}
