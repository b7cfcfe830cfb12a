use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error,
};
use serde::{Deserialize, Serialize};

/// Claims of the identity provider's HS256 access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Provider user id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

pub fn generate_token(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Checks signature and expiry, and the issuer when one is configured.
pub fn verify_token(token: &str, secret: &str, issuer: Option<&str>) -> Result<Claims, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "test-secret";

    fn claims(exp_offset: i64, iss: Option<&str>) -> Claims {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        Claims {
            sub: "user-1".into(),
            email: Some("user@company.com".into()),
            name: None,
            exp: (now + exp_offset) as usize,
            iss: iss.map(str::to_string),
        }
    }

    #[test]
    fn valid_token_round_trips_claims() {
        let token = generate_token(&claims(600, None), SECRET).unwrap();
        let decoded = verify_token(&token, SECRET, None).unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.email.as_deref(), Some("user@company.com"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(&claims(600, None), SECRET).unwrap();
        assert!(verify_token(&token, "other", None).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = generate_token(&claims(-3600, None), SECRET).unwrap();
        assert!(verify_token(&token, SECRET, None).is_err());
    }

    #[test]
    fn issuer_is_checked_when_configured() {
        let token = generate_token(&claims(600, Some("https://id.example")), SECRET).unwrap();
        assert!(verify_token(&token, SECRET, Some("https://id.example")).is_ok());
        assert!(verify_token(&token, SECRET, Some("https://other.example")).is_err());
    }
}
