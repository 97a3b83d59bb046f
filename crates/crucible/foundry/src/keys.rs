use crate::error::{FoundryError, FoundryResult};
use crucible_store::{Collection, CrucibleStore, RecordStoreExt};
use crucible_types::{hex_decode, hex_encode, ContentHash};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

const KEY_RECORD: &str = "system_signing_key";

#[derive(Serialize, Deserialize)]
struct StoredKey {
    secret: String,
    public: String,
}

/// The system's ed25519 keypair, created on first use and persisted in
/// the kernel state collection.
pub struct SystemKey {
    signing: SigningKey,
}

impl SystemKey {
    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&secret),
        }
    }

    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::from_secret(secret)
    }

    pub async fn load_or_create(store: &dyn CrucibleStore) -> FoundryResult<Self> {
        if let Some(stored) = store
            .get_json::<StoredKey>(Collection::KernelState, KEY_RECORD)
            .await?
        {
            let bytes = hex_decode(&stored.secret).map_err(|e| FoundryError::Key(e.to_string()))?;
            let secret: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| FoundryError::Key("stored secret is not 32 bytes".into()))?;
            return Ok(Self::from_secret(secret));
        }
        let key = Self::generate();
        store
            .put_json(
                Collection::KernelState,
                KEY_RECORD,
                &StoredKey {
                    secret: hex_encode(key.signing.as_bytes()),
                    public: key.public_key_hex(),
                },
            )
            .await?;
        info!(public_key = %key.public_key_hex(), "generated system signing key");
        Ok(key)
    }

    pub fn public_key_hex(&self) -> String {
        hex_encode(self.signing.verifying_key().as_bytes())
    }

    /// Hex signature over the digest bytes.
    pub fn sign(&self, digest: &ContentHash) -> String {
        hex_encode(&self.signing.sign(digest.as_bytes()).to_bytes())
    }
}

/// Check a hex signature over `digest` against a hex public key.
pub fn verify_signature(digest: &ContentHash, signature_hex: &str, public_key_hex: &str) -> bool {
    let Ok(pk) = hex_decode(public_key_hex) else {
        return false;
    };
    let Ok(pk) = <[u8; 32]>::try_from(pk.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&pk) else {
        return false;
    };
    let Ok(sig) = hex_decode(signature_hex) else {
        return false;
    };
    let Ok(sig) = <[u8; 64]>::try_from(sig.as_slice()) else {
        return false;
    };
    key.verify(digest.as_bytes(), &Signature::from_bytes(&sig))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_store::InMemoryStore;

    #[test]
    fn signatures_verify_and_bind_the_digest() {
        let key = SystemKey::from_secret([42u8; 32]);
        let digest = ContentHash::hash(b"content");
        let sig = key.sign(&digest);
        assert!(verify_signature(&digest, &sig, &key.public_key_hex()));
        assert!(!verify_signature(
            &ContentHash::hash(b"other"),
            &sig,
            &key.public_key_hex()
        ));
        let other = SystemKey::from_secret([99u8; 32]);
        assert!(!verify_signature(&digest, &sig, &other.public_key_hex()));
        assert!(!verify_signature(&digest, "zz", &key.public_key_hex()));
    }

    #[tokio::test]
    async fn key_persists_across_loads() {
        let store = InMemoryStore::new();
        let a = SystemKey::load_or_create(&store).await.unwrap();
        let b = SystemKey::load_or_create(&store).await.unwrap();
        assert_eq!(a.public_key_hex(), b.public_key_hex());
    }
}
