use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

const NONCE_LEN: usize = 16;

/// Generate a 16-character alphanumeric `nonce_str` from the OS CSPRNG.
pub fn gen_nonce() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
