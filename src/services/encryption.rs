use base64::{engine::general_purpose::STANDARD, Engine};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};

pub const KEY_LEN: usize = 32;

#[derive(thiserror::Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid encrypted data format")]
    InvalidFormat,
}

/// AES-256-GCM key used to seal credential store entries.
pub struct StoreCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl StoreCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Result<Self, EncryptionError> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| EncryptionError::EncryptionFailed("Invalid key".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Seals `plaintext` and returns base64 of `[nonce (12 bytes)][ciphertext + tag]`.
    pub fn seal(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce_bytes).map_err(|_| {
            EncryptionError::EncryptionFailed("Failed to generate nonce".to_string())
        })?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| EncryptionError::EncryptionFailed("Sealing failed".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);

        Ok(STANDARD.encode(sealed))
    }

    /// Opens a value produced by [`StoreCipher::seal`].
    pub fn open(&self, sealed: &str) -> Result<String, EncryptionError> {
        let bytes = STANDARD
            .decode(sealed)
            .map_err(|_| EncryptionError::InvalidFormat)?;

        if bytes.len() < NONCE_LEN {
            return Err(EncryptionError::InvalidFormat);
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| EncryptionError::InvalidFormat)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| EncryptionError::DecryptionFailed("Opening failed".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| EncryptionError::DecryptionFailed("Invalid UTF-8".to_string()))
    }
}

/// Derives a 32-byte key from a passphrase with SHA-256.
pub fn derive_key(key_string: &str) -> [u8; KEY_LEN] {
    let hash = digest::digest(&digest::SHA256, key_string.as_bytes());
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(hash.as_ref());
    key
}

/// Generates fresh random key material, base64 encoded for a key file.
pub fn generate_key_material() -> Result<String, EncryptionError> {
    let mut bytes = [0u8; KEY_LEN];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| EncryptionError::EncryptionFailed("Failed to generate key".to_string()))?;
    Ok(STANDARD.encode(bytes))
}
