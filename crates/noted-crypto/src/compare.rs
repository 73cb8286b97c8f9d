//! Timing-safe comparison of verifiers

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Compare two byte strings without leaking where they first differ.
///
/// Both inputs are MACed under a fresh random key and the tags compared with
/// `verify_slice`, which is constant time. Length differences are absorbed by
/// the MAC as well.
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);

    let mac = HmacSha256::new_from_slice(&key);
    key.zeroize();
    let Ok(mac) = mac else {
        return false;
    };

    let mut mac_a = mac.clone();
    let mut mac_b = mac;
    mac_a.update(a);
    mac_b.update(b);
    let tag_a = mac_a.finalize().into_bytes();
    mac_b.verify_slice(&tag_a).is_ok()
}
