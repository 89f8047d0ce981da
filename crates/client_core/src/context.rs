use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use shared::domain::TeamId;

use crate::error::SessionError;

/// Who is chatting, in which team, with which bearer token.
///
/// Created when the user enters a team's chat and dropped on logout or when
/// navigating away; nothing else in the crate reads ambient credentials.
#[derive(Clone)]
pub struct SessionContext {
    token: String,
    username: String,
    team_id: TeamId,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("username", &self.username)
            .field("team_id", &self.team_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[allow(dead_code)]
    exp: i64,
}

impl SessionContext {
    pub fn new(
        token: impl Into<String>,
        username: impl Into<String>,
        team_id: TeamId,
    ) -> Result<Self, SessionError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }
        Ok(Self {
            token,
            username: username.into(),
            team_id,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    pub fn token_is_valid(&self) -> bool {
        token_unexpired(&self.token)
    }
}

/// Checks the `exp` claim only. The signature belongs to the server to verify.
pub(crate) fn token_unexpired(token: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation).is_ok()
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;
