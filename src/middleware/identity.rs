use axum::http::HeaderMap;

// Identity headers set by the upstream authenticator. The gateway trusts
// these values and never validates tokens itself.
pub const USER_HEADER: &str = "x-user";
pub const ROLE_HEADER: &str = "x-user-role";

pub fn username(headers: &HeaderMap) -> Option<&str> {
    header_value(headers, USER_HEADER)
}

pub fn role(headers: &HeaderMap) -> Option<&str> {
    header_value(headers, ROLE_HEADER)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_headers_are_anonymous() {
        let mut headers = HeaderMap::new();
        assert_eq!(username(&headers), None);

        headers.insert(USER_HEADER, "   ".parse().unwrap());
        assert_eq!(username(&headers), None);
    }

    #[test]
    fn user_and_role_are_read_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, "alice".parse().unwrap());
        headers.insert(ROLE_HEADER, " moderator ".parse().unwrap());

        assert_eq!(username(&headers), Some("alice"));
        assert_eq!(role(&headers), Some("moderator"));
    }
}
