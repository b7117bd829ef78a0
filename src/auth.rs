use std::future::{ready, Ready};

use actix_web::http::header::{self, HeaderMap};
use actix_web::{dev, web, FromRequest, HttpRequest};

use anyhow::Context;

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use crate::crypto::{SigningKey, Token, TokenResult};
use crate::domain::{EmailAddress, Role};
use crate::error::RestError;

const BEARER_AUTH_PREFIX: &str = "Bearer ";

/// Authenticated caller, decoded from a signed bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub email: EmailAddress,
    pub role: Role,
}

impl Principal {
    pub fn new(email: EmailAddress, role: Role) -> Self {
        Self { email, role }
    }

    /// Mint a bearer token for this principal
    pub fn issue_token(
        &self,
        key: &SigningKey,
        expires_at: Option<DateTime<Utc>>,
    ) -> TokenResult<Token> {
        Token::sign(self, key, expires_at)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), RestError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(RestError::Forbidden("Administrator role required".into()))
        }
    }

    /// Allow admins and the given user
    pub fn require_self_or_admin(&self, email: &EmailAddress) -> Result<(), RestError> {
        if self.is_admin() || &self.email == email {
            Ok(())
        } else {
            Err(RestError::Forbidden("Not allowed to act for another user".into()))
        }
    }

    fn from_headers(headers: &HeaderMap, key: &SigningKey) -> anyhow::Result<Self> {
        let token: Token = headers
            .get(header::AUTHORIZATION)
            .context("Missing authorization in header")?
            .to_str()?
            .strip_prefix(BEARER_AUTH_PREFIX)
            .context("Authorization scheme not bearer")?
            .parse()?;

        let principal = token
            .verify(key, Utc::now())
            .context("Failed to verify bearer token")?;
        Ok(principal)
    }
}

impl FromRequest for Principal {
    type Error = RestError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        // NOTE: Must be registered with the application at startup
        let Some(key) = req.app_data::<web::Data<SigningKey>>() else {
            return ready(Err(RestError::InternalError(
                "Signing key not registered".into(),
            )));
        };

        let principal =
            Self::from_headers(req.headers(), key).map_err(RestError::FailedToAuthenticate);
        ready(principal)
    }
}
