pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Pulls the anti-forgery token out of a raw `Cookie` string. A missing cookie
/// yields an empty token; the server is left to reject it.
pub fn token_from_cookies(cookies: &str) -> String {
    let decoded = urlencoding::decode(cookies)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| cookies.to_string());
    let prefix = format!("{CSRF_COOKIE}=");

    decoded
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .map(str::to_string)
        .unwrap_or_default()
}
