use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TOKEN_TTL: time::Duration = time::Duration::days(3);

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// HS256 key pair for issuing and verifying bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (time::OffsetDateTime::now_utc() + TOKEN_TTL).unix_timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Resolves a presented credential to a user id, or fails if the token
    /// is malformed, tampered with, or expired.
    pub fn verify(&self, token: &str) -> anyhow::Result<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(Uuid::parse_str(&data.claims.sub)?)
    }
}
