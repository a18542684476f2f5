/// Looks up `key` in an `application/x-www-form-urlencoded` body. Only the first occurrence counts.
fn find_field<'b>(body: &'b str, key: &str) -> Option<&'b str> {
    body.split('&').find_map(|chunk| {
        let (name, value) = chunk.split_once('=')?;
        (name == key).then_some(value)
    })
}

/// Parses the option index submitted by the answer form. Values are plain digits, so no
/// percent-decoding is necessary.
pub fn parse_choice(body: &[u8]) -> Option<usize> {
    let body = core::str::from_utf8(body).ok()?;
    find_field(body.trim(), "choice")?.parse().ok()
}
