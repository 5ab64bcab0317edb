/// Case-insensitive exact match of a request origin against a site's allow
/// list. An empty list allows nothing.
pub fn is_allowed(origin: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|entry| entry.eq_ignore_ascii_case(origin))
}
