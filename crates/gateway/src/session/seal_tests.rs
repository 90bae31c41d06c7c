// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

fn pair() -> CredentialPair {
    CredentialPair {
        access_token: "access-abc".into(),
        refresh_token: "refresh-xyz".into(),
        expires_at_ms: 42,
    }
}

#[test]
fn open_recovers_sealed_pair() -> anyhow::Result<()> {
    let sealer = Sealer::derive(SECRET)?;
    let sealed = sealer.seal(&pair())?;
    assert_eq!(sealer.open(&sealed)?, pair());
    Ok(())
}

#[test]
fn sealers_derived_from_same_secret_interoperate() -> anyhow::Result<()> {
    let sealed = Sealer::derive(SECRET)?.seal(&pair())?;
    assert_eq!(Sealer::derive(SECRET)?.open(&sealed)?, pair());
    Ok(())
}

#[test]
fn sealed_bytes_do_not_contain_tokens() -> anyhow::Result<()> {
    let sealer = Sealer::derive(SECRET)?;
    let sealed = sealer.seal(&pair())?;
    let haystack = String::from_utf8_lossy(&sealed);
    assert!(!haystack.contains("access-abc"));
    assert!(!haystack.contains("refresh-xyz"));
    Ok(())
}

#[test]
fn each_seal_uses_a_fresh_nonce() -> anyhow::Result<()> {
    let sealer = Sealer::derive(SECRET)?;
    assert_ne!(sealer.seal(&pair())?, sealer.seal(&pair())?);
    Ok(())
}

#[test]
fn tampered_blob_is_rejected() -> anyhow::Result<()> {
    let sealer = Sealer::derive(SECRET)?;
    let mut sealed = sealer.seal(&pair())?;
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;
    assert!(sealer.open(&sealed).is_err());
    Ok(())
}

#[test]
fn other_secret_cannot_open() -> anyhow::Result<()> {
    let sealed = Sealer::derive(SECRET)?.seal(&pair())?;
    let other = Sealer::derive(b"fedcba9876543210fedcba9876543210")?;
    assert!(other.open(&sealed).is_err());
    Ok(())
}

#[test]
fn truncated_blob_is_rejected() -> anyhow::Result<()> {
    let sealer = Sealer::derive(SECRET)?;
    assert!(sealer.open(&[1, 2, 3]).is_err());
    Ok(())
}

#[test]
fn cookie_key_is_deterministic_per_secret() -> anyhow::Result<()> {
    let a = derive_cookie_key(SECRET)?;
    let b = derive_cookie_key(SECRET)?;
    let c = derive_cookie_key(b"fedcba9876543210fedcba9876543210")?;
    assert_eq!(a.master(), b.master());
    assert_ne!(a.master(), c.master());
    Ok(())
}
