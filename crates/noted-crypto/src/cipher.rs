//! AES-256-GCM content cipher
//!
//! Stored format is the pair returned by `encrypt`:
//! ```text
//! ciphertext = [N bytes: encrypted payload][16 bytes: GCM tag]
//! iv         = [12 bytes: random nonce]
//! ```
//!
//! The nonce is sampled from the OS RNG on every call and never derived from a
//! counter, so two seals under one key cannot collide short of an RNG failure.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use noted_core::Sealed;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_SIZE]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new(key.into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(Sealed::new(ciphertext, nonce_bytes.to_vec()))
}

/// Decrypt and authenticate. Any tampering with ciphertext or nonce, or the
/// wrong key, yields `DecryptionFailed`.
pub fn decrypt(sealed: &Sealed, key: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
    if sealed.iv.len() != NONCE_SIZE || sealed.ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new(key.into());
    let nonce = Nonce::from_slice(&sealed.iv);

    cipher
        .decrypt(nonce, sealed.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)
}

pub fn encrypt_text(text: &str, key: &[u8; KEY_SIZE]) -> Result<Sealed> {
    encrypt(text.as_bytes(), key)
}

pub fn decrypt_text(sealed: &Sealed, key: &[u8; KEY_SIZE]) -> Result<String> {
    let bytes = decrypt(sealed, key)?;
    String::from_utf8(bytes).map_err(|e| {
        let mut bytes = e.into_bytes();
        bytes.zeroize();
        CryptoError::DecryptionFailed
    })
}

/// Wrap (encrypt) a raw 256-bit key under another key.
///
/// Same primitive as [`encrypt`]; kept separate because a wrapped key crosses
/// a different trust boundary than note content.
pub fn wrap_key(key: &[u8; KEY_SIZE], wrapping_key: &[u8; KEY_SIZE]) -> Result<Sealed> {
    encrypt(key, wrapping_key)
}

/// Unwrap a key sealed by [`wrap_key`].
pub fn unwrap_key(wrapped: &Sealed, wrapping_key: &[u8; KEY_SIZE]) -> Result<[u8; KEY_SIZE]> {
    let mut plaintext = decrypt(wrapped, wrapping_key)?;

    if plaintext.len() != KEY_SIZE {
        plaintext.zeroize();
        return Err(CryptoError::DecryptionFailed);
    }

    let mut key_bytes = [0u8; KEY_SIZE];
    key_bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();

    Ok(key_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: [u8; KEY_SIZE] = [0x42; KEY_SIZE];

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"# shopping\n- eggs\n- milk";

        let sealed = encrypt(plaintext, &KEY).unwrap();
        let decrypted = decrypt(&sealed, &KEY).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let sealed = encrypt(b"", &KEY).unwrap();
        assert_eq!(sealed.ciphertext.len(), TAG_SIZE);
        assert_eq!(decrypt(&sealed, &KEY).unwrap(), b"");
    }

    #[test]
    fn test_sealed_sizes() {
        let sealed = encrypt(&[0u8; 1000], &KEY).unwrap();

        // plaintext (1000) + tag (16)
        assert_eq!(sealed.ciphertext.len(), 1000 + TAG_SIZE);
        assert_eq!(sealed.iv.len(), NONCE_SIZE);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let a = encrypt(b"same text", &KEY).unwrap();
        let b = encrypt(b"same text", &KEY).unwrap();

        assert_ne!(a.iv, b.iv, "nonces must never repeat under one key");
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let sealed = encrypt(b"secret data", &KEY).unwrap();
        let result = decrypt(&sealed, &[0x43; KEY_SIZE]);

        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_every_ciphertext_bit_flip_detected() {
        let sealed = encrypt(b"tamper me", &KEY).unwrap();

        for byte in 0..sealed.ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered.ciphertext[byte] ^= 1 << bit;
                assert!(
                    matches!(decrypt(&tampered, &KEY), Err(CryptoError::DecryptionFailed)),
                    "flip at byte {byte} bit {bit} must fail"
                );
            }
        }
    }

    #[test]
    fn test_every_nonce_bit_flip_detected() {
        let sealed = encrypt(b"tamper me", &KEY).unwrap();

        for byte in 0..NONCE_SIZE {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered.iv[byte] ^= 1 << bit;
                assert!(matches!(
                    decrypt(&tampered, &KEY),
                    Err(CryptoError::DecryptionFailed)
                ));
            }
        }
    }

    #[test]
    fn test_malformed_nonce_length() {
        let mut sealed = encrypt(b"data", &KEY).unwrap();
        sealed.iv.push(0);
        assert!(matches!(decrypt(&sealed, &KEY), Err(CryptoError::DecryptionFailed)));

        sealed.iv.truncate(4);
        assert!(matches!(decrypt(&sealed, &KEY), Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_truncated_ciphertext() {
        let mut sealed = encrypt(b"data", &KEY).unwrap();
        sealed.ciphertext.truncate(3);
        assert!(matches!(decrypt(&sealed, &KEY), Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_text_roundtrip_unicode() {
        let text = "naïve café, 日本語 ✓";
        let sealed = encrypt_text(text, &KEY).unwrap();
        assert_eq!(decrypt_text(&sealed, &KEY).unwrap(), text);
    }

    #[test]
    fn test_decrypt_text_rejects_non_utf8() {
        let sealed = encrypt(&[0xFF, 0xFE, 0xFD], &KEY).unwrap();
        assert!(matches!(
            decrypt_text(&sealed, &KEY),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_key_wrap_unwrap_roundtrip() {
        let inner = [0x17u8; KEY_SIZE];
        let wrapped = wrap_key(&inner, &KEY).unwrap();

        assert_eq!(wrapped.ciphertext.len(), KEY_SIZE + TAG_SIZE);
        assert_eq!(unwrap_key(&wrapped, &KEY).unwrap(), inner);
    }

    proptest! {
        #[test]
        fn roundtrip_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..=2048)) {
            let sealed = encrypt(&data, &KEY).unwrap();
            prop_assert_eq!(decrypt(&sealed, &KEY).unwrap(), data);
        }
    }

    #[test]
    fn test_unwrap_rejects_wrong_length_payload() {
        let not_a_key = encrypt(b"sixteen bytes!!!", &KEY).unwrap();
        assert!(matches!(
            unwrap_key(&not_a_key, &KEY),
            Err(CryptoError::DecryptionFailed)
        ));
    }
}
