use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::transport::Method;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding: unreserved characters stay, everything else becomes `%XX`.
///
/// Form encoding is applied first and its deviations are then patched (`+` for space, a bare
/// `*`, an escaped `~`).
pub fn percent_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// Parameters sorted by key and joined as `key=value&...`, each side percent-encoded.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut sorted = params.iter().collect::<Vec<_>>();
    sorted.sort_by(|(left, _), (right, _)| left.cmp(right));

    sorted
        .into_iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `<METHOD>&%2F&<percent-encoded canonical query>`.
pub fn string_to_sign(method: Method, params: &[(String, String)]) -> String {
    format!(
        "{}&{}&{}",
        method.as_str(),
        percent_encode("/"),
        percent_encode(&canonical_query(params))
    )
}

/// Base64 HMAC-SHA1 of [`string_to_sign`], keyed with `secret + "&"`.
///
/// The result is sent as the `Signature` query parameter.
pub fn sign_query(method: Method, params: &[(String, String)], secret: &str) -> String {
    let key = format!("{secret}&");
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take any size key");
    mac.update(string_to_sign(method, params).as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}
