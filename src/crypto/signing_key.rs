use std::fmt;

use hmac::{Hmac, Mac};

use sha2::Sha256;

use secrecy::Secret;

/// HMAC-SHA256 key used to sign and verify bearer tokens
#[derive(Clone)]
pub struct SigningKey(Hmac<Sha256>);

impl SigningKey {
    pub fn new(key: &Secret<String>) -> anyhow::Result<Self> {
        use secrecy::ExposeSecret;

        let key = key.expose_secret();
        if key.is_empty() {
            anyhow::bail!("Signing key must not be empty");
        }
        let hmac = Hmac::new_from_slice(key.as_bytes())?;

        Ok(Self(hmac))
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.0
            .clone()
            .chain_update(msg)
            .finalize()
            .into_bytes()
            .to_vec()
    }

    /// Constant-time signature check
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> bool {
        self.0
            .clone()
            .chain_update(msg)
            .verify_slice(signature)
            .is_ok()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}
