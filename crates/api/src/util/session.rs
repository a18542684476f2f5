use core::{
    fmt::{self, Display},
    str::FromStr,
};
use hyper::{
    header::{HeaderValue, InvalidHeaderValue, COOKIE},
    HeaderMap,
};

/// Name of the cookie that carries the session ID.
pub const COOKIE_NAME: &str = "sid";

/// Opaque random identifier for a visitor's quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId([u8; 16]);

impl SessionId {
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Produces the `Set-Cookie` value that stores this ID in the browser.
    pub fn to_cookie(self) -> Result<HeaderValue, InvalidHeaderValue> {
        let cookie = format!("{COOKIE_NAME}={self}; Path=/; HttpOnly; SameSite=Strict");
        HeaderValue::from_str(&cookie)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0; 32];
        hex::encode_to_slice(self.0, &mut buf).map_err(|_| fmt::Error)?;
        let text = core::str::from_utf8(&buf).map_err(|_| fmt::Error)?;
        f.write_str(text)
    }
}

impl FromStr for SessionId {
    type Err = hex::FromHexError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut buf = [0; 16];
        hex::decode_to_slice(text, &mut buf)?;
        Ok(Self(buf))
    }
}

/// Extracts the raw session cookie from a map of headers.
fn extract_cookie(headers: &HeaderMap) -> Option<&[u8]> {
    headers
        .get_all(COOKIE)
        .iter()
        .flat_map(|value| value.as_bytes().split(|&byte| byte == b';'))
        .filter_map(|section| {
            let mid = section.iter().copied().position(|byte| byte == b'=')?;
            let (left, right) = section.split_at(mid);
            Some((left.trim_ascii(), right[1..].trim_ascii()))
        })
        .find_map(|(key, session)| (key == COOKIE_NAME.as_bytes()).then_some(session))
}

/// Extracts and parses the session ID from a map of headers. Malformed cookies count as absent.
pub fn extract_session(headers: &HeaderMap) -> Option<SessionId> {
    let raw = extract_cookie(headers)?;
    let text = core::str::from_utf8(raw).ok()?;
    text.parse().ok()
}
