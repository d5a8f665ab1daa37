use md5::{Digest, Md5};

use crate::model::common::Params;

/// Key that carries the signature itself; never part of the signed string.
pub const SIGN_KEY: &str = "sign";

/// Build the string-to-sign per the WeChat Pay v2 MD5 scheme.
///
/// Format: `"{k1}={v1}&{k2}={v2}&...&key={secret}"`, keys in ascending byte order.
/// Any existing `sign` entry is skipped.
pub fn build_sign_string(params: &Params, key: &str) -> String {
    let mut out = String::new();
    for (k, v) in params.iter().filter(|(k, _)| k.as_str() != SIGN_KEY) {
        out.push_str(k);
        out.push('=');
        out.push_str(v);
        out.push('&');
    }
    out.push_str("key=");
    out.push_str(key);
    out
}

/// Sign the parameter set with the merchant API key and return the uppercase hex MD5 digest.
pub fn sign_md5(params: &Params, key: &str) -> String {
    let digest = Md5::digest(build_sign_string(params, key).as_bytes());
    hex::encode_upper(digest)
}
