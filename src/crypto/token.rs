use std::str::FromStr;

use serde::{Deserialize, Serialize};

use chrono::{DateTime, TimeZone, Utc};

use base64::{
    alphabet,
    engine::{self, general_purpose},
    Engine as _,
};

use crate::crypto::SigningKey;

lazy_static::lazy_static! {
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature does not match")]
    SignatureMismatch,
    #[error("Token is expired")]
    Expired,
    #[error("Token is malformed")]
    Malformed,
}

impl From<std::str::Utf8Error> for TokenError {
    fn from(_e: std::str::Utf8Error) -> Self {
        Self::Malformed
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(_e: serde_json::Error) -> Self {
        Self::Malformed
    }
}

impl From<base64::DecodeError> for TokenError {
    fn from(_e: base64::DecodeError) -> Self {
        Self::Malformed
    }
}

pub type TokenResult<T> = Result<T, TokenError>;

/// Signed bearer token, `<base64 claims>.<base64 signature>`
#[derive(Debug, Clone, PartialEq)]
pub struct Token(String);

impl Token {
    /// Sign `payload`, optionally valid only until `expires_at`
    pub fn sign<T: Serialize>(
        payload: &T,
        key: &SigningKey,
        expires_at: Option<DateTime<Utc>>,
    ) -> TokenResult<Token> {
        let claims = Claims {
            exp: expires_at.map(|at| at.timestamp()),
            data: payload,
        };
        let msg = serde_json::to_string(&claims)?;
        let sig = key.sign(msg.as_bytes());

        Ok(Token(format!(
            "{}.{}",
            BASE64_ENGINE.encode(msg),
            BASE64_ENGINE.encode(sig)
        )))
    }

    /// Check the signature and expiry at `now`, then decode the payload
    pub fn verify<T>(&self, key: &SigningKey, now: DateTime<Utc>) -> TokenResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let (msg, sig) = self.0.split_once('.').ok_or(TokenError::Malformed)?;
        let msg = BASE64_ENGINE.decode(msg)?;
        let sig = BASE64_ENGINE.decode(sig)?;

        if !key.verify(&msg, &sig) {
            return Err(TokenError::SignatureMismatch);
        }

        let claims: Claims<T> = serde_json::from_str(std::str::from_utf8(&msg)?)?;
        if claims.is_expired(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims.data)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(Self(token.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims<T> {
    exp: Option<i64>,
    data: T,
}

impl<T> Claims<T> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            // NOTE: Ambiguous timestamps resolve to the earliest instant
            Some(exp) => Utc
                .timestamp_opt(exp, 0)
                .earliest()
                .map(|exp| now >= exp)
                .unwrap_or(true),
            None => false,
        }
    }
}
