use sha2::{Digest, Sha256};

/// Normalizes a client-supplied `Idempotency-Key` header into a storage key,
/// and hashes request bodies for the "same key, different payload" check
/// (§7 "Idempotency-key collision with mismatched parameters" mirrors this
/// at the ledger level; this is the HTTP-facing counterpart).
#[derive(Debug, Clone)]
pub struct IdempotencyKeyGenerator {
    key_prefix: String,
}

impl IdempotencyKeyGenerator {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
        }
    }

    pub fn normalize_client_key(&self, client_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(client_key.as_bytes());
        format!("{}_{}", self.key_prefix, hex::encode(hasher.finalize()))
    }

    pub fn hash_request<T: serde::Serialize>(&self, request: &T) -> String {
        let json = serde_json::to_string(request).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Body {
        amount: i64,
    }

    #[test]
    fn normalize_is_deterministic_and_prefixed() {
        let generator = IdempotencyKeyGenerator::new("idem");
        let key1 = generator.normalize_client_key("client-supplied-key-123");
        let key2 = generator.normalize_client_key("client-supplied-key-123");
        assert_eq!(key1, key2);
        assert!(key1.starts_with("idem_"));
    }

    #[test]
    fn different_client_keys_normalize_differently() {
        let generator = IdempotencyKeyGenerator::new("idem");
        assert_ne!(
            generator.normalize_client_key("a"),
            generator.normalize_client_key("b")
        );
    }

    #[test]
    fn request_hash_distinguishes_payloads() {
        let generator = IdempotencyKeyGenerator::new("idem");
        let h1 = generator.hash_request(&Body { amount: 100 });
        let h2 = generator.hash_request(&Body { amount: 200 });
        assert_ne!(h1, h2);
    }
}
