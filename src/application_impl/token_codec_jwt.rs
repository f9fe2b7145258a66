use crate::application_port::*;
use crate::domain_model::Claims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};

/// HS256-only codec. Any other algorithm in the header, `none` included, is
/// rejected before the signature is even looked at.
pub struct JwtHs256Codec {
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new() -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        JwtHs256Codec { validation }
    }
}

impl Default for JwtHs256Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCodec for JwtHs256Codec {
    fn sign(&self, claims: &Claims, key: &SigningKey) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, key.encoding())
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }

    fn parse(&self, token: &str, key: &SigningKey) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, key.decoding(), &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::BadToken,
            }
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::*;
    use chrono::Utc;

    const NONE_HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";

    fn claims(issued_at: i64, expires_at: i64) -> Claims {
        Claims {
            session_id: SessionId("60a1cc8e-f741-45bc-a794-1ac655790c3b".to_string()),
            user_id: UserId(1),
            issued_at,
            expires_at,
        }
    }

    fn live_claims() -> Claims {
        let now = Utc::now().timestamp();
        claims(now, now + 3600)
    }

    fn key() -> SigningKey {
        SigningKey::from_secret(b"accessKey")
    }

    #[test]
    fn sign_then_parse() {
        let codec = JwtHs256Codec::new();
        let claims = live_claims();
        let token = codec.sign(&claims, &key()).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.parse(&token, &key()).unwrap(), claims);
    }

    #[test]
    fn signing_is_deterministic() {
        let codec = JwtHs256Codec::new();
        let claims = live_claims();
        assert_eq!(
            codec.sign(&claims, &key()).unwrap(),
            codec.sign(&claims, &key()).unwrap()
        );
    }

    #[test]
    fn wrong_key_is_bad_token() {
        let codec = JwtHs256Codec::new();
        let token = codec.sign(&live_claims(), &key()).unwrap();
        let other = SigningKey::from_secret(b"refreshKey");

        assert!(matches!(codec.parse(&token, &other), Err(AuthError::BadToken)));
    }

    #[test]
    fn expired_token() {
        let codec = JwtHs256Codec::new();
        let token = codec.sign(&claims(100, 103), &key()).unwrap();

        assert!(matches!(
            codec.parse(&token, &key()),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn expired_token_with_wrong_key_is_bad_token() {
        let codec = JwtHs256Codec::new();
        let token = codec.sign(&claims(100, 103), &key()).unwrap();
        let other = SigningKey::from_secret(b"refreshKey");

        assert!(matches!(codec.parse(&token, &other), Err(AuthError::BadToken)));
    }

    #[test]
    fn malformed_tokens() {
        let codec = JwtHs256Codec::new();
        for token in ["", "bad.bad.bad", "onlyonepart", "a.b", "a.b.c.d"] {
            assert!(
                matches!(codec.parse(token, &key()), Err(AuthError::BadToken)),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn none_algorithm_is_rejected() {
        let codec = JwtHs256Codec::new();
        let token = codec.sign(&live_claims(), &key()).unwrap();
        let payload = token.split('.').nth(1).unwrap();

        for forged in [
            format!("{NONE_HEADER}.{payload}."),
            format!("{NONE_HEADER}.{payload}.{}", token.rsplit('.').next().unwrap()),
        ] {
            assert!(matches!(
                codec.parse(&forged, &key()),
                Err(AuthError::BadToken)
            ));
        }
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        let codec = JwtHs256Codec::new();
        let token = encode(
            &Header::new(Algorithm::HS512),
            &live_claims(),
            key().encoding(),
        )
        .unwrap();

        assert!(matches!(codec.parse(&token, &key()), Err(AuthError::BadToken)));
    }

    #[test]
    fn tampered_signature() {
        let codec = JwtHs256Codec::new();
        let token = codec.sign(&live_claims(), &key()).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for offset in [0, 10, 20] {
            let mut bytes = token.clone().into_bytes();
            let at = sig_start + offset;
            bytes[at] = if bytes[at] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(matches!(
                codec.parse(&tampered, &key()),
                Err(AuthError::BadToken)
            ));
        }
    }

    #[test]
    fn tampered_payload() {
        let codec = JwtHs256Codec::new();
        let token = codec.sign(&live_claims(), &key()).unwrap();
        let forged_payload = {
            let other = codec
                .sign(
                    &Claims {
                        user_id: UserId(2),
                        ..live_claims()
                    },
                    &key(),
                )
                .unwrap();
            other.split('.').nth(1).unwrap().to_string()
        };
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(codec.parse(&forged, &key()), Err(AuthError::BadToken)));
    }

    #[test]
    fn wire_claim_names() {
        let codec = JwtHs256Codec::new();
        let token = codec.sign(&claims(100, 200), &key()).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);

        let json = serde_json::to_value(claims(100, 200)).unwrap();
        assert_eq!(json["uuid"], "60a1cc8e-f741-45bc-a794-1ac655790c3b");
        assert_eq!(json["user_id"], 1);
        assert_eq!(json["iat"], 100);
        assert_eq!(json["exp"], 200);
    }
}
