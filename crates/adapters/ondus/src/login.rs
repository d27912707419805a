//! Login form scraping.
//!
//! The Ondus identity provider has no password grant. A refresh token is
//! obtained by submitting the HTML login form and following the redirect to
//! the app's `ondus://` callback, which serves the token JSON over HTTPS.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::OndusError;

const APP_SCHEME: &str = "ondus";

static FORM_ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<form[^>]*\saction\s*=\s*"([^"]+)""#).expect("login form regex is valid")
});

/// Extract the login form's `action` URL from the login page, resolved
/// against the page URL.
///
/// # Errors
///
/// Returns [`OndusError::LoginFormNotFound`] when the page has no form.
pub fn form_action(html: &str, page_url: &Url) -> Result<Url, OndusError> {
    let action = FORM_ACTION
        .captures(html)
        .and_then(|caps| caps.get(1))
        .ok_or(OndusError::LoginFormNotFound)?
        .as_str()
        .replace("&amp;", "&");
    Ok(page_url.join(&action)?)
}

/// Rewrite the `ondus://` callback to a URL that can be fetched, using
/// `scheme` (the scheme of the API base URL, `https` in production).
///
/// # Errors
///
/// Returns [`OndusError::UnexpectedRedirect`] when `location` is missing or
/// does not use the `ondus` scheme.
pub fn callback_url(location: Option<&str>, scheme: &str) -> Result<Url, OndusError> {
    let unexpected = || OndusError::UnexpectedRedirect(location.map(str::to_string));
    let rest = location
        .and_then(|l| l.strip_prefix(APP_SCHEME))
        .and_then(|l| l.strip_prefix("://"))
        .ok_or_else(unexpected)?;
    Url::parse(&format!("{scheme}://{rest}")).map_err(|_| unexpected())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r#"
        <html><body>
          <form id="kc-form-login" class="form" onsubmit="return true;"
                action="https://idp2-apigw.cloud.grohe.com/v1/sso/auth/realms/idm-apigw/login-actions/authenticate?session_code=abc&amp;execution=def&amp;client_id=iot&amp;tab_id=xyz"
                method="post">
            <input name="username"/><input name="password" type="password"/>
          </form>
        </body></html>
    "#;

    #[test]
    fn should_extract_and_unescape_form_action() {
        let page = Url::parse("https://idp-apigw.cloud.grohe.com/v3/iot/oidc/login").unwrap();
        let action = form_action(LOGIN_PAGE, &page).unwrap();
        assert_eq!(
            action.as_str(),
            "https://idp2-apigw.cloud.grohe.com/v1/sso/auth/realms/idm-apigw/login-actions/authenticate?session_code=abc&execution=def&client_id=iot&tab_id=xyz"
        );
    }

    #[test]
    fn should_resolve_relative_form_action() {
        let page = Url::parse("http://127.0.0.1:8080/sso/login").unwrap();
        let action = form_action(r#"<form method="post" action="/sso/authenticate?x=1">"#, &page)
            .unwrap();
        assert_eq!(action.as_str(), "http://127.0.0.1:8080/sso/authenticate?x=1");
    }

    #[test]
    fn should_fail_when_page_has_no_form() {
        let page = Url::parse("https://example.com/").unwrap();
        let result = form_action("<html><p>Maintenance</p></html>", &page);
        assert!(matches!(result, Err(OndusError::LoginFormNotFound)));
    }

    #[test]
    fn should_rewrite_app_scheme_to_https() {
        let url = callback_url(
            Some("ondus://idp2-apigw.cloud.grohe.com/v3/iot/oidc/token?code=123"),
            "https",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://idp2-apigw.cloud.grohe.com/v3/iot/oidc/token?code=123"
        );
    }

    #[test]
    fn should_reject_foreign_redirect() {
        let result = callback_url(Some("https://example.com/login?error=1"), "https");
        assert!(matches!(
            result,
            Err(OndusError::UnexpectedRedirect(Some(ref l))) if l == "https://example.com/login?error=1"
        ));
    }

    #[test]
    fn should_reject_missing_redirect() {
        let result = callback_url(None, "https");
        assert!(matches!(result, Err(OndusError::UnexpectedRedirect(None))));
    }
}
