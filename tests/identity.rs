//! Bearer credential verification against real RSA key material.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

use citizen_gateway::security::AuthError;

mod common;
use common::{now_secs, sign, verifier, Claims, OTHER_PRIVATE_PEM, PUBLIC_PEM};

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[test]
fn test_valid_token_yields_identity() {
    let citizen = Uuid::new_v4();
    let token = common::token_for(citizen);

    let identity = verifier().verify(Some(&bearer(&token))).unwrap();
    assert_eq!(identity.id(), citizen);
}

#[test]
fn test_rs384_and_rs512_are_accepted() {
    let citizen = Uuid::new_v4();
    for algorithm in [Algorithm::RS384, Algorithm::RS512] {
        let token = sign(&Claims::valid_for(&citizen.to_string()), algorithm);
        assert_eq!(verifier().verify(Some(&bearer(&token))).unwrap().id(), citizen);
    }
}

#[test]
fn test_missing_or_malformed_header() {
    let v = verifier();
    assert_eq!(v.verify(None), Err(AuthError::MissingOrMalformedCredential));
    assert_eq!(
        v.verify(Some("Basic dXNlcjpwYXNz")),
        Err(AuthError::MissingOrMalformedCredential)
    );
    assert_eq!(v.verify(Some("Bearer")), Err(AuthError::MissingOrMalformedCredential));
}

#[test]
fn test_garbage_token_is_invalid() {
    assert_eq!(
        verifier().verify(Some("Bearer not.a.jwt")),
        Err(AuthError::InvalidCredential)
    );
}

#[test]
fn test_token_from_another_key_is_rejected() {
    let key = EncodingKey::from_rsa_pem(OTHER_PRIVATE_PEM).unwrap();
    let claims = Claims::valid_for(&Uuid::new_v4().to_string());
    let token = encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap();

    assert_eq!(
        verifier().verify(Some(&bearer(&token))),
        Err(AuthError::InvalidCredential)
    );
}

#[test]
fn test_expired_token_is_rejected() {
    let claims = Claims {
        sub: Some(Uuid::new_v4().to_string()),
        exp: now_secs() - 3600,
        iat: now_secs() - 7200,
    };
    let token = sign(&claims, Algorithm::RS256);

    assert_eq!(
        verifier().verify(Some(&bearer(&token))),
        Err(AuthError::InvalidCredential)
    );
}

#[test]
fn test_hmac_signed_with_public_key_is_rejected() {
    // Classic algorithm confusion: the public key used as an HMAC secret.
    let claims = Claims::valid_for(&Uuid::new_v4().to_string());
    let key = EncodingKey::from_secret(PUBLIC_PEM);
    let token = encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();

    assert_eq!(
        verifier().verify(Some(&bearer(&token))),
        Err(AuthError::InvalidCredential)
    );
}

#[test]
fn test_unsigned_token_is_rejected() {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": Uuid::new_v4().to_string(),
        "exp": now_secs() + 3600,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

    for token in [format!("{header}.{payload}."), format!("{header}.{payload}")] {
        assert_eq!(
            verifier().verify(Some(&bearer(&token))),
            Err(AuthError::InvalidCredential)
        );
    }
}

#[test]
fn test_non_uuid_subject() {
    let token = sign(&Claims::valid_for("citizen-42"), Algorithm::RS256);
    assert_eq!(
        verifier().verify(Some(&bearer(&token))),
        Err(AuthError::InvalidSubjectClaim)
    );
}

#[test]
fn test_missing_subject() {
    let claims = Claims {
        sub: None,
        exp: now_secs() + 3600,
        iat: now_secs(),
    };
    let token = sign(&claims, Algorithm::RS256);

    assert_eq!(
        verifier().verify(Some(&bearer(&token))),
        Err(AuthError::InvalidSubjectClaim)
    );
}
