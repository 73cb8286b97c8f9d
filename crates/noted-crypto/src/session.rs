//! Vault session: the only place a plaintext vault key lives
//!
//! ```text
//! Locked ──unlock()──▶ Unlocking ──ok──▶ Unlocked
//!    ▲                     │                │
//!    └────────err──────────┘    lock() / sign_out()
//! ```

use noted_core::AccountKeys;
use secrecy::SecretString;

use crate::error::{CryptoError, Result};
use crate::kdf::{account_salt, derive_master_key, derive_verifier, password_digest, KdfParams};
use crate::keys::{
    derive_stretched_key, generate_vault_key, unwrap_vault_key, wrap_vault_key, VaultKey,
};
use crate::password::check_password_strength;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Locked,
    Unlocking,
    Unlocked,
}

/// Session-scoped holder of the vault key for one account.
#[derive(Debug)]
pub struct VaultSession {
    account_id: String,
    state: SessionState,
    vault_key: Option<VaultKey>,
}

impl VaultSession {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            state: SessionState::Locked,
            vault_key: None,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == SessionState::Unlocked
    }

    /// Derive, verify and unwrap. Every failure reports `InvalidMasterPassword`
    /// and leaves the session locked.
    pub fn unlock(&mut self, password: &SecretString, keys: &AccountKeys) -> Result<()> {
        self.state = SessionState::Unlocking;

        match open_vault(password, &self.account_id, keys) {
            Ok(vault_key) => {
                self.vault_key = Some(vault_key);
                self.state = SessionState::Unlocked;
                tracing::debug!(account = %self.account_id, "vault unlocked");
                Ok(())
            }
            Err(e) => {
                self.vault_key = None;
                self.state = SessionState::Locked;
                tracing::warn!(account = %self.account_id, reason = %e, "unlock failed");
                Err(CryptoError::InvalidMasterPassword)
            }
        }
    }

    pub fn vault_key(&self) -> Result<&VaultKey> {
        match (&self.state, &self.vault_key) {
            (SessionState::Unlocked, Some(key)) => Ok(key),
            _ => Err(CryptoError::Locked),
        }
    }

    /// Drop the vault key (zeroized on drop) and return to `Locked`.
    pub fn lock(&mut self) {
        self.vault_key.take();
        self.state = SessionState::Locked;
    }

    pub fn sign_out(mut self) {
        self.lock();
        tracing::debug!(account = %self.account_id, "signed out");
    }
}

fn open_vault(password: &SecretString, account_id: &str, keys: &AccountKeys) -> Result<VaultKey> {
    let params = KdfParams::from_algorithm(&keys.kdf_algorithm);
    let salt = account_salt(account_id);

    let master = derive_master_key(password, &salt, &params)?;
    let verifier = derive_verifier(&master, &password_digest(password), &params)?;
    if !verifier.matches(&keys.verifier_hash) {
        return Err(CryptoError::InvalidMasterPassword);
    }

    let stretched = derive_stretched_key(&master, &salt)?;
    unwrap_vault_key(&keys.wrapped_vault_key(), &stretched)
}

fn seal_account(
    password: &SecretString,
    account_id: &str,
    vault_key: &VaultKey,
    params: &KdfParams,
) -> Result<AccountKeys> {
    let salt = account_salt(account_id);
    let master = derive_master_key(password, &salt, params)?;
    let verifier = derive_verifier(&master, &password_digest(password), params)?;
    let stretched = derive_stretched_key(&master, &salt)?;
    let wrapped = wrap_vault_key(vault_key, &stretched)?;

    Ok(AccountKeys {
        verifier_hash: verifier.as_bytes().to_vec(),
        wrapped_vault_key: wrapped.ciphertext,
        wrap_iv: wrapped.iv,
        kdf_algorithm: params.algorithm(),
    })
}

/// First-time setup: a fresh vault key wrapped under the password.
pub fn setup_account(
    password: &SecretString,
    account_id: &str,
    params: &KdfParams,
) -> Result<(AccountKeys, VaultKey)> {
    check_password_strength(password)?;

    let vault_key = generate_vault_key();
    let keys = seal_account(password, account_id, &vault_key, params)?;
    tracing::info!(account = %account_id, "account key material created");

    Ok((keys, vault_key))
}

/// Change the master password. The vault key is unchanged, so note keys and
/// versions stay readable; the old password stops working once the returned
/// material replaces `current`.
pub fn rekey_account(
    old_password: &SecretString,
    new_password: &SecretString,
    account_id: &str,
    current: &AccountKeys,
    params: &KdfParams,
) -> Result<AccountKeys> {
    check_password_strength(new_password)?;

    let vault_key = open_vault(old_password, account_id, current)
        .map_err(|_| CryptoError::InvalidMasterPassword)?;
    let keys = seal_account(new_password, account_id, &vault_key, params)?;
    tracing::info!(account = %account_id, "account re-keyed");

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "alice@example.com";

    fn fast_params() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    fn setup(password: &str) -> (AccountKeys, VaultKey) {
        setup_account(&SecretString::from(password), ACCOUNT, &fast_params()).unwrap()
    }

    #[test]
    fn test_setup_then_unlock() {
        let (keys, vault_key) = setup("correct horse 42");
        let mut session = VaultSession::new(ACCOUNT);
        assert_eq!(session.state(), SessionState::Locked);

        session
            .unlock(&SecretString::from("correct horse 42"), &keys)
            .unwrap();

        assert!(session.is_unlocked());
        assert_eq!(session.vault_key().unwrap().as_bytes(), vault_key.as_bytes());
    }

    #[test]
    fn test_account_id_case_does_not_matter() {
        let (keys, _) = setup("correct horse 42");
        let mut session = VaultSession::new("Alice@Example.com");
        session
            .unlock(&SecretString::from("correct horse 42"), &keys)
            .unwrap();
        assert!(session.is_unlocked());
    }

    #[test]
    fn test_wrong_password_stays_locked() {
        let (keys, _) = setup("correct horse 42");
        let mut session = VaultSession::new(ACCOUNT);

        let err = session
            .unlock(&SecretString::from("correct horse 43"), &keys)
            .unwrap_err();

        assert!(matches!(err, CryptoError::InvalidMasterPassword));
        assert_eq!(session.state(), SessionState::Locked);
        assert!(matches!(session.vault_key(), Err(CryptoError::Locked)));
    }

    #[test]
    fn test_corrupt_wrapped_key_reports_invalid_password() {
        let (mut keys, _) = setup("correct horse 42");
        keys.wrapped_vault_key[0] ^= 0x01;

        let mut session = VaultSession::new(ACCOUNT);
        let err = session
            .unlock(&SecretString::from("correct horse 42"), &keys)
            .unwrap_err();

        assert!(matches!(err, CryptoError::InvalidMasterPassword));
        assert!(!session.is_unlocked());
    }

    #[test]
    fn test_failed_unlock_clears_previous_key() {
        let (keys, _) = setup("correct horse 42");
        let mut session = VaultSession::new(ACCOUNT);
        session
            .unlock(&SecretString::from("correct horse 42"), &keys)
            .unwrap();

        assert!(session
            .unlock(&SecretString::from("wrong horse 42"), &keys)
            .is_err());
        assert!(matches!(session.vault_key(), Err(CryptoError::Locked)));
    }

    #[test]
    fn test_lock_discards_key() {
        let (keys, _) = setup("correct horse 42");
        let mut session = VaultSession::new(ACCOUNT);
        session
            .unlock(&SecretString::from("correct horse 42"), &keys)
            .unwrap();

        session.lock();

        assert_eq!(session.state(), SessionState::Locked);
        assert!(matches!(session.vault_key(), Err(CryptoError::Locked)));
    }

    #[test]
    fn test_setup_rejects_weak_password() {
        let result = setup_account(&SecretString::from("short1"), ACCOUNT, &fast_params());
        assert!(matches!(result, Err(CryptoError::WeakPassword(_))));
    }

    #[test]
    fn test_setup_records_params() {
        let (keys, _) = setup("correct horse 42");
        assert_eq!(keys.kdf_algorithm, fast_params().algorithm());
        assert_eq!(keys.wrap_iv.len(), crate::NONCE_SIZE);
    }

    #[test]
    fn test_rekey_keeps_vault_key() {
        let (old_keys, vault_key) = setup("correct horse 42");

        let new_keys = rekey_account(
            &SecretString::from("correct horse 42"),
            &SecretString::from("battery staple 7"),
            ACCOUNT,
            &old_keys,
            &fast_params(),
        )
        .unwrap();

        assert_ne!(new_keys.verifier_hash, old_keys.verifier_hash);
        assert_ne!(new_keys.wrap_iv, old_keys.wrap_iv);

        let mut session = VaultSession::new(ACCOUNT);
        assert!(session
            .unlock(&SecretString::from("correct horse 42"), &new_keys)
            .is_err());
        session
            .unlock(&SecretString::from("battery staple 7"), &new_keys)
            .unwrap();
        assert_eq!(session.vault_key().unwrap().as_bytes(), vault_key.as_bytes());
    }

    #[test]
    fn test_rekey_requires_old_password() {
        let (keys, _) = setup("correct horse 42");
        let result = rekey_account(
            &SecretString::from("not the password 1"),
            &SecretString::from("battery staple 7"),
            ACCOUNT,
            &keys,
            &fast_params(),
        );
        assert!(matches!(result, Err(CryptoError::InvalidMasterPassword)));
    }
}
