//! # Payload Sealing
//!
//! AES-256-GCM sealing of envelope payloads plus HMAC-SHA256 signing.
//!
//! ## Sealed payload layout
//! ```text
//! [IV(16)] [Ciphertext(N)] [Tag(16)]
//! ```
//! The IV is raw bytes drawn fresh from the OS RNG on every call; the GCM tag
//! travels at the end of the ciphertext segment. Nothing is hex or base64
//! encoded on the wire.
//!
//! ## Security
//! - One IV per `encrypt` call, never reused under the same key
//! - Authentication failure and short input both surface as `Security`
//! - Key bytes are zeroized on drop and hidden from `Debug`

use crate::error::{constants, EnvelopeError, Result};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use tracing::{instrument, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256-GCM with a 128-bit nonce
type Aes256Gcm16 = AesGcm<Aes256, U16>;

type HmacSha256 = Hmac<Sha256>;

/// Length of the IV prefix of a sealed payload
pub const IV_LEN: usize = 16;

/// Length of a symmetric key
pub const KEY_LEN: usize = 32;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Secret key held for the lifetime of a [`SecurityManager`]
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct SecretKey([u8; KEY_LEN]);

/// IV ‖ ciphertext produced by [`SecurityManager::encrypt`]
#[derive(Clone, PartialEq, Eq)]
pub struct SealedPayload(Vec<u8>);

impl SealedPayload {
    /// Wrap raw bytes, rejecting anything too short to hold an IV
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < IV_LEN {
            return Err(EnvelopeError::security(constants::ERR_SEALED_TOO_SHORT));
        }
        Ok(Self(bytes))
    }

    pub fn iv(&self) -> &[u8] {
        &self.0[..IV_LEN]
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.0[IV_LEN..]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for SealedPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SealedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedPayload")
            .field("iv", &hex::encode(self.iv()))
            .field("ciphertext_len", &self.ciphertext().len())
            .finish()
    }
}

/// Seals, opens and signs payloads with one immutable key
pub struct SecurityManager {
    key: SecretKey,
    cipher: Aes256Gcm16,
}

impl SecurityManager {
    /// Use the supplied 32-byte key
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        let cipher = Aes256Gcm16::new(&key.into());
        Self {
            key: SecretKey(key),
            cipher,
        }
    }

    /// Generate a fresh random key
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; KEY_LEN];
        fill_random(&mut key)?;
        let manager = Self::new(key);
        key.zeroize();
        Ok(manager)
    }

    /// Build from a key slice, which must be exactly 32 bytes
    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
            EnvelopeError::Config(format!(
                "Security key must be {KEY_LEN} bytes, got {}",
                key.len()
            ))
        })?;
        Ok(Self::new(key))
    }

    /// Build from a hex-encoded 32-byte key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let mut bytes = hex::decode(key_hex.trim())
            .map_err(|e| EnvelopeError::Config(format!("Security key is not valid hex: {e}")))?;
        let manager = Self::from_slice(&bytes);
        bytes.zeroize();
        manager
    }

    /// Seal `data` under a fresh random IV
    #[instrument(skip(self, data), fields(len = data.len()), level = "trace")]
    pub fn encrypt(&self, data: &[u8]) -> Result<SealedPayload> {
        let mut iv = [0u8; IV_LEN];
        fill_random(&mut iv)?;

        let ciphertext = self
            .cipher
            .encrypt(Nonce::<U16>::from_slice(&iv), data)
            .map_err(|_| EnvelopeError::security(constants::ERR_ENCRYPTION_FAILED))?;

        let mut sealed = Vec::with_capacity(IV_LEN + ciphertext.len());
        sealed.extend_from_slice(&iv);
        sealed.extend(ciphertext);
        Ok(SealedPayload(sealed))
    }

    /// Open a sealed payload produced by [`SecurityManager::encrypt`]
    #[instrument(skip(self, sealed), level = "trace")]
    pub fn decrypt(&self, sealed: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let sealed = sealed.as_ref();
        if sealed.len() < IV_LEN {
            warn!(len = sealed.len(), "Sealed payload shorter than IV");
            return Err(EnvelopeError::security(constants::ERR_SEALED_TOO_SHORT));
        }

        let (iv, ciphertext) = sealed.split_at(IV_LEN);
        self.cipher
            .decrypt(Nonce::<U16>::from_slice(iv), ciphertext)
            .map_err(|_| EnvelopeError::security(constants::ERR_DECRYPTION_FAILED))
    }

    /// HMAC-SHA256 over `data`, hex-encoded
    pub fn sign(&self, data: &[u8]) -> Result<String> {
        Ok(hex::encode(self.mac(data)?.finalize().into_bytes()))
    }

    /// Check a signature produced by [`SecurityManager::sign`] in constant time
    pub fn verify(&self, data: &[u8], signature_hex: &str) -> Result<()> {
        let expected = hex::decode(signature_hex)
            .map_err(|_| EnvelopeError::security(constants::ERR_SIGNATURE_MISMATCH))?;
        self.mac(data)?
            .verify_slice(&expected)
            .map_err(|_| EnvelopeError::security(constants::ERR_SIGNATURE_MISMATCH))
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key.0)
            .map_err(|e| EnvelopeError::security(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}

impl fmt::Debug for SecurityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityManager")
            .field("key", &"<redacted>")
            .finish()
    }
}

fn fill_random(buf: &mut [u8]) -> Result<()> {
    getrandom::fill(buf)
        .map_err(|e| EnvelopeError::security(format!("{}: {e}", constants::ERR_RANDOM_SOURCE)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let manager = SecurityManager::generate().unwrap();
        let sealed = manager.encrypt(b"payload bytes").unwrap();
        assert_eq!(sealed.iv().len(), IV_LEN);
        assert_eq!(sealed.ciphertext().len(), b"payload bytes".len() + TAG_LEN);
        assert_eq!(manager.decrypt(&sealed).unwrap(), b"payload bytes");
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let manager = SecurityManager::new([7u8; KEY_LEN]);
        let a = manager.encrypt(b"same").unwrap();
        let b = manager.encrypt(b"same").unwrap();
        assert_ne!(a.iv(), b.iv());
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let alice = SecurityManager::new([1u8; KEY_LEN]);
        let mallory = SecurityManager::new([2u8; KEY_LEN]);
        let sealed = alice.encrypt(b"secret").unwrap();
        assert!(matches!(
            mallory.decrypt(&sealed),
            Err(EnvelopeError::Security(_))
        ));
    }

    #[test]
    fn test_short_sealed_payload_rejected() {
        let manager = SecurityManager::new([1u8; KEY_LEN]);
        assert!(matches!(
            manager.decrypt([0u8; 15]),
            Err(EnvelopeError::Security(_))
        ));
        assert!(SealedPayload::from_bytes(vec![0u8; 10]).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let manager = SecurityManager::new([3u8; KEY_LEN]);
        let mut bytes = manager.encrypt(b"integrity").unwrap().into_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(manager.decrypt(&bytes).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let manager = SecurityManager::new([9u8; KEY_LEN]);
        let signature = manager.sign(b"envelope").unwrap();
        assert_eq!(signature.len(), 64);
        manager.verify(b"envelope", &signature).unwrap();
        assert!(manager.verify(b"envelopf", &signature).is_err());
        assert!(manager.verify(b"envelope", "not hex").is_err());
    }

    #[test]
    fn test_from_hex_requires_32_bytes() {
        assert!(SecurityManager::from_hex(&"ab".repeat(32)).is_ok());
        assert!(matches!(
            SecurityManager::from_hex("abcd"),
            Err(EnvelopeError::Config(_))
        ));
        assert!(SecurityManager::from_hex("zz").is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let manager = SecurityManager::new([0x5a; KEY_LEN]);
        let text = format!("{manager:?}");
        assert!(text.contains("redacted"));
        assert!(!text.contains("5a5a"));
    }
}
