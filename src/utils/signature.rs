//! Verificación de firmas de webhooks
//!
//! La pasarela firma cada webhook con HMAC-SHA512 sobre los bytes crudos
//! del cuerpo, codificado en hex en la cabecera `x-paystack-signature`.
//! La comparación es en tiempo constante.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Verifica la firma hex de un webhook contra los bytes crudos del cuerpo.
///
/// Devuelve `false` ante firma ausente, hex inválido o mismatch; nunca
/// corta la comparación antes de tiempo.
pub fn verify_webhook_signature(secret: &str, raw_body: &[u8], signature_hex: &str) -> bool {
    let provided = match hex::decode(signature_hex.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(provided.as_slice()).into()
}

/// Calcula la firma hex de un cuerpo, tal y como la enviaría la pasarela.
/// Usado por los tests para construir webhooks válidos.
pub fn sign_payload(secret: &str, raw_body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "sk_test_abc123";

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"event":"charge.success","data":{"reference":"RNT-1"}}"#;
        let sig = sign_payload(SECRET, body);
        assert!(verify_webhook_signature(SECRET, body, &sig));
    }

    #[test]
    fn rejects_tampered_body() {
        let body = br#"{"event":"charge.success","data":{"amount":5000}}"#;
        let sig = sign_payload(SECRET, body);
        let tampered = br#"{"event":"charge.success","data":{"amount":9000}}"#;
        assert!(!verify_webhook_signature(SECRET, tampered, &sig));
    }

    #[test]
    fn rejects_signature_from_wrong_secret() {
        let body = br#"{"event":"charge.success"}"#;
        let sig = sign_payload("sk_test_other", body);
        assert!(!verify_webhook_signature(SECRET, body, &sig));
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert!(!verify_webhook_signature(SECRET, b"{}", "not-hex-at-all"));
        assert!(!verify_webhook_signature(SECRET, b"{}", ""));
    }

    #[test]
    fn rejects_truncated_signature() {
        let body = br#"{"event":"charge.success"}"#;
        let sig = sign_payload(SECRET, body);
        assert!(!verify_webhook_signature(SECRET, body, &sig[..64]));
    }
}
