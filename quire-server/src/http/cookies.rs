//! Session and flash cookies
//!
//! Both live in a [`CookieJar`]: handlers take the jar as an extractor and
//! return it alongside their response so the additions become `Set-Cookie`
//! headers. Values are percent-encoded by the jar.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use quire_core::SessionToken;

pub const SESSION_COOKIE: &str = "quire_session";
pub const FLASH_COOKIE: &str = "quire_flash";

const FLASH_TTL: time::Duration = time::Duration::minutes(5);

fn build(
    name: &'static str,
    value: String,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

/// Expired cookie under `name`. Sent even when the request did not carry
/// the cookie, since the browser may still hold it.
fn expired(name: &'static str, secure: bool) -> Cookie<'static> {
    build(name, String::new(), time::Duration::ZERO, secure)
}

pub fn session_token(jar: &CookieJar) -> Option<SessionToken> {
    jar.get(SESSION_COOKIE)
        .map(Cookie::value_trimmed)
        .filter(|raw| !raw.is_empty())
        .map(SessionToken::new)
}

pub fn with_session(
    jar: CookieJar,
    token: &SessionToken,
    ttl: chrono::Duration,
    secure: bool,
) -> CookieJar {
    let max_age = time::Duration::seconds(ttl.num_seconds());
    jar.add(build(SESSION_COOKIE, token.as_str().to_owned(), max_age, secure))
}

pub fn without_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired(SESSION_COOKIE, secure))
}

/// One-shot message shown on the next rendered page.
pub fn with_flash(jar: CookieJar, message: &str, secure: bool) -> CookieJar {
    jar.add(build(FLASH_COOKIE, message.to_owned(), FLASH_TTL, secure))
}

pub fn without_flash(jar: CookieJar) -> CookieJar {
    jar.add(expired(FLASH_COOKIE, false))
}

pub fn read_flash(jar: &CookieJar) -> Option<String> {
    jar.get(FLASH_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|message| !message.is_empty())
}
