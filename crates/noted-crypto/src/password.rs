//! Minimum strength rules for a new master password

use secrecy::{ExposeSecret, SecretString};

use crate::error::{CryptoError, Result};

pub const MIN_PASSWORD_LEN: usize = 8;

/// At least [`MIN_PASSWORD_LEN`] characters, with a letter and a digit.
pub fn check_password_strength(password: &SecretString) -> Result<()> {
    let pw = password.expose_secret();

    if pw.chars().count() < MIN_PASSWORD_LEN {
        return Err(CryptoError::WeakPassword(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !pw.chars().any(char::is_alphabetic) {
        return Err(CryptoError::WeakPassword("must contain a letter".into()));
    }
    if !pw.chars().any(|c| c.is_ascii_digit()) {
        return Err(CryptoError::WeakPassword("must contain a digit".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(pw: &str) -> Result<()> {
        check_password_strength(&SecretString::from(pw))
    }

    #[test]
    fn test_accepts_letters_and_digits() {
        assert!(check("abcdefg1").is_ok());
        assert!(check("correct horse battery 9").is_ok());
        assert!(check("пароль123").is_ok());
    }

    #[test]
    fn test_rejects_short() {
        assert!(matches!(check("abc123"), Err(CryptoError::WeakPassword(_))));
        // 7 chars even though multi-byte
        assert!(check("ééééé1a").is_err());
    }

    #[test]
    fn test_rejects_missing_class() {
        assert!(check("abcdefghij").is_err());
        assert!(check("1234567890").is_err());
        assert!(check("!!!!!!!!1").is_err());
    }
}
