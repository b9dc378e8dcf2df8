use chrono::{DateTime, Duration, Utc};
use derive_more::Display;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Individual tokens are short-lived by design; batch tokens carry an
/// administrator-chosen expiry instead.
pub const INDIVIDUAL_TOKEN_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QrPurpose {
    CheckIn,
    CheckOut,
}

/// Signed payload carried inside a QR code. Either `record_id` (individual
/// token bound to one attendance row) or `batch_id` (time-boxed token any
/// employee may present) is set, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrClaims {
    pub purpose: QrPurpose,
    pub record_id: Option<u64>,
    pub batch_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenFault {
    #[display(fmt = "malformed or tampered payload")]
    Malformed,
    #[display(fmt = "expired")]
    Expired,
    #[display(fmt = "wrong purpose")]
    WrongPurpose,
}

/// Encodes and decodes QR payloads as HMAC-signed JWTs so a tampered token
/// fails decoding rather than only failing the expiry check.
///
/// Expiry is validated against the injected clock in [`QrCodec::validate`],
/// not against the system clock inside the JWT library, which keeps the
/// freshness window fully deterministic under test.
pub struct QrCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl QrCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Token bound to one attendance record, valid for five minutes.
    pub fn issue_record_token(
        &self,
        purpose: QrPurpose,
        record_id: u64,
        now: DateTime<Utc>,
    ) -> String {
        let claims = QrClaims {
            purpose,
            record_id: Some(record_id),
            batch_id: None,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(INDIVIDUAL_TOKEN_TTL_SECS)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    /// Time-boxed token usable by any employee. Returns the token together
    /// with the generated batch id.
    pub fn issue_batch_token(
        &self,
        purpose: QrPurpose,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> (String, String) {
        let batch_id = Uuid::new_v4().to_string();
        let claims = QrClaims {
            purpose,
            record_id: None,
            batch_id: Some(batch_id.clone()),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        (self.sign(&claims), batch_id)
    }

    fn sign(&self, claims: &QrClaims) -> String {
        encode(&Header::default(), claims, &self.encoding).unwrap()
    }

    /// Signature and shape check only; freshness is a separate step.
    pub fn decode(&self, token: &str) -> Result<QrClaims, TokenFault> {
        decode::<QrClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenFault::Malformed)
    }

    /// Rejects tokens past their window or presented for the wrong action.
    pub fn validate(
        &self,
        claims: &QrClaims,
        expected: QrPurpose,
        now: DateTime<Utc>,
    ) -> Result<(), TokenFault> {
        if now.timestamp() > claims.exp {
            return Err(TokenFault::Expired);
        }
        if claims.purpose != expected {
            return Err(TokenFault::WrongPurpose);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn codec() -> QrCodec {
        QrCodec::new("test-qr-secret")
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, s).unwrap()
    }

    #[test]
    fn record_token_roundtrip() {
        let c = codec();
        let now = at(1, 0, 0);
        let token = c.issue_record_token(QrPurpose::CheckOut, 42, now);
        let claims = c.decode(&token).unwrap();
        assert_eq!(claims.purpose, QrPurpose::CheckOut);
        assert_eq!(claims.record_id, Some(42));
        assert!(claims.batch_id.is_none());
        assert_eq!(claims.exp, claims.iat + INDIVIDUAL_TOKEN_TTL_SECS);
        assert!(c.validate(&claims, QrPurpose::CheckOut, now).is_ok());
    }

    #[test]
    fn batch_token_carries_admin_expiry() {
        let c = codec();
        let (token, batch_id) =
            c.issue_batch_token(QrPurpose::CheckIn, at(1, 0, 0), at(9, 0, 0));
        let claims = c.decode(&token).unwrap();
        assert_eq!(claims.batch_id.as_deref(), Some(batch_id.as_str()));
        assert!(claims.record_id.is_none());
        assert!(c.validate(&claims, QrPurpose::CheckIn, at(8, 59, 59)).is_ok());
    }

    #[test]
    fn expired_by_one_second_is_rejected() {
        let c = codec();
        let token = c.issue_record_token(QrPurpose::CheckOut, 42, at(1, 0, 0));
        let claims = c.decode(&token).unwrap();
        let just_past = at(1, 5, 1); // exp + 1s
        assert_eq!(
            c.validate(&claims, QrPurpose::CheckOut, just_past),
            Err(TokenFault::Expired)
        );
        // the boundary instant itself is still valid
        assert!(c.validate(&claims, QrPurpose::CheckOut, at(1, 5, 0)).is_ok());
    }

    #[test]
    fn wrong_purpose_is_rejected() {
        let c = codec();
        let token = c.issue_record_token(QrPurpose::CheckIn, 1, at(1, 0, 0));
        let claims = c.decode(&token).unwrap();
        assert_eq!(
            c.validate(&claims, QrPurpose::CheckOut, at(1, 1, 0)),
            Err(TokenFault::WrongPurpose)
        );
    }

    #[test]
    fn tampered_token_fails_decode() {
        let c = codec();
        let token = c.issue_record_token(QrPurpose::CheckIn, 1, at(1, 0, 0));
        let mut forged = token.clone();
        forged.truncate(token.len() - 2);
        assert_eq!(c.decode(&forged), Err(TokenFault::Malformed));

        // signed with a different secret
        let other = QrCodec::new("other-secret").issue_record_token(
            QrPurpose::CheckIn,
            1,
            at(1, 0, 0),
        );
        assert_eq!(c.decode(&other), Err(TokenFault::Malformed));
    }
}
