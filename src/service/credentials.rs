use std::fmt;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use headers::{Authorization, Header, HeaderMapExt, authorization::Basic};

use crate::error::ClientError;

/// Username/password pair as supplied by the caller, not yet checked.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the credentials of a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    BasicHeader,
    QueryString,
}

/// Pick exactly one credential source for the request.
///
/// A non-empty `Authorization` header must be HTTP Basic and decode cleanly;
/// otherwise the `u` and `p` query parameters are taken as-is (missing ones
/// become empty strings).
pub fn resolve(
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<(Credentials, CredentialSource), ClientError> {
    let has_header = headers
        .get(AUTHORIZATION)
        .is_some_and(|v| !v.as_bytes().is_empty());

    if has_header {
        let creds = basic_credentials(headers)?;
        return Ok((creds, CredentialSource::BasicHeader));
    }
    Ok((query_credentials(query), CredentialSource::QueryString))
}

fn basic_credentials(headers: &HeaderMap) -> Result<Credentials, ClientError> {
    let auth = headers
        .typed_try_get::<Authorization<Basic>>()
        .map_err(|_| {
            ClientError::MalformedCredentials(format!(
                "expected {} Basic credentials",
                Authorization::<Basic>::name()
            ))
        })?
        .ok_or_else(|| ClientError::MalformedCredentials("header is empty".to_string()))?;

    Ok(Credentials {
        username: auth.username().to_string(),
        password: auth.password().to_string(),
    })
}

fn query_credentials(query: Option<&str>) -> Credentials {
    let mut username = None;
    let mut password = None;

    if let Some(qs) = query {
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            // first occurrence wins
            match k.as_ref() {
                "u" if username.is_none() => username = Some(v.into_owned()),
                "p" if password.is_none() => password = Some(v.into_owned()),
                _ => {}
            }
        }
    }

    Credentials {
        username: username.unwrap_or_default(),
        password: password.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn basic(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(raw).expect("valid header value"),
        );
        headers
    }

    #[test]
    fn decodes_basic_header() {
        // "alice:wonder"
        let headers = basic("Basic YWxpY2U6d29uZGVy");
        let (creds, source) = resolve(&headers, None).expect("resolve");
        assert_eq!(source, CredentialSource::BasicHeader);
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "wonder");
    }

    #[test]
    fn header_wins_over_query() {
        let headers = basic("Basic YWxpY2U6d29uZGVy");
        let (creds, source) = resolve(&headers, Some("u=bob&p=x")).expect("resolve");
        assert_eq!(source, CredentialSource::BasicHeader);
        assert_eq!(creds.username, "alice");
    }

    #[test]
    fn falls_back_to_query_without_header() {
        let (creds, source) =
            resolve(&HeaderMap::new(), Some("u=bob&p=x&other=1")).expect("resolve");
        assert_eq!(source, CredentialSource::QueryString);
        assert_eq!(
            creds,
            Credentials {
                username: "bob".to_string(),
                password: "x".to_string()
            }
        );
    }

    #[test]
    fn empty_header_counts_as_absent() {
        let headers = basic("");
        let (creds, source) = resolve(&headers, Some("u=bob&p=x")).expect("resolve");
        assert_eq!(source, CredentialSource::QueryString);
        assert_eq!(creds.username, "bob");
    }

    #[test]
    fn missing_query_params_are_empty() {
        let (creds, _) = resolve(&HeaderMap::new(), None).expect("resolve");
        assert_eq!(creds, Credentials::default());

        let (creds, _) = resolve(&HeaderMap::new(), Some("u=carol")).expect("resolve");
        assert_eq!(creds.username, "carol");
        assert!(creds.password.is_empty());
    }

    #[test]
    fn query_values_keep_their_content() {
        let (creds, _) =
            resolve(&HeaderMap::new(), Some("u=%20spaced%20&p=a%3Ab")).expect("resolve");
        assert_eq!(creds.username, " spaced ");
        assert_eq!(creds.password, "a:b");
    }

    #[test]
    fn empty_password_in_header_is_kept_empty() {
        // "alice:"
        let headers = basic("Basic YWxpY2U6");
        let (creds, _) = resolve(&headers, None).expect("resolve");
        assert_eq!(creds.username, "alice");
        assert!(creds.password.is_empty());
    }

    #[test]
    fn rejects_bad_base64() {
        let headers = basic("Basic !!!not-base64!!!");
        let err = resolve(&headers, None).expect_err("should fail");
        assert!(matches!(err, ClientError::MalformedCredentials(_)));
    }

    #[test]
    fn rejects_missing_colon() {
        // "alice"
        let headers = basic("Basic YWxpY2U=");
        let err = resolve(&headers, None).expect_err("should fail");
        assert!(matches!(err, ClientError::MalformedCredentials(_)));
    }

    #[test]
    fn rejects_other_schemes() {
        let headers = basic("Bearer some-token");
        let err = resolve(&headers, Some("u=bob&p=x")).expect_err("should fail");
        assert!(matches!(err, ClientError::MalformedCredentials(_)));
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials {
            username: "alice".to_string(),
            password: "wonder".to_string(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("alice"));
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("wonder"), "password leaked: {printed}");

        let printed = format!("{creds:#?}");
        assert!(!printed.contains("wonder"));
    }
}
