// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! At-rest sealing of credential pairs and cookie key derivation.
//!
//! Both keys come from the configured session secret through HKDF-SHA256
//! with distinct labels. Sealed blobs are `nonce || ciphertext || tag`
//! under ChaCha20-Poly1305.

use axum_extra::extract::cookie::Key;
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, NONCE_LEN};
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};

use crate::session::CredentialPair;

const SALT: &[u8] = b"leporid-gateway/v1";
const SEAL_LABEL: &[u8] = b"session-seal";
const COOKIE_LABEL: &[u8] = b"cookie-key";
const COOKIE_KEY_LEN: usize = 64;

struct CookieKeyLen;

impl hkdf::KeyType for CookieKeyLen {
    fn len(&self) -> usize {
        COOKIE_KEY_LEN
    }
}

fn prk(secret: &[u8]) -> hkdf::Prk {
    hkdf::Salt::new(hkdf::HKDF_SHA256, SALT).extract(secret)
}

/// Derive the signing+encryption key for private cookies.
pub fn derive_cookie_key(secret: &[u8]) -> anyhow::Result<Key> {
    let mut bytes = [0u8; COOKIE_KEY_LEN];
    prk(secret)
        .expand(&[COOKIE_LABEL], CookieKeyLen)
        .and_then(|okm| okm.fill(&mut bytes))
        .map_err(|_| anyhow::anyhow!("cookie key derivation failed"))?;
    Key::try_from(&bytes[..]).map_err(|e| anyhow::anyhow!("cookie key rejected: {e}"))
}

/// Encrypts and authenticates credential pairs for storage.
pub struct Sealer {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl Sealer {
    pub fn derive(secret: &[u8]) -> anyhow::Result<Self> {
        let prk = prk(secret);
        let okm = prk
            .expand(&[SEAL_LABEL], &aead::CHACHA20_POLY1305)
            .map_err(|_| anyhow::anyhow!("seal key derivation failed"))?;
        let key = LessSafeKey::new(UnboundKey::from(okm));
        Ok(Self { key, rng: SystemRandom::new() })
    }

    pub fn seal(&self, pair: &CredentialPair) -> anyhow::Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce_bytes).map_err(|_| anyhow::anyhow!("nonce generation failed"))?;

        let mut in_out = serde_json::to_vec(pair)?;
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| anyhow::anyhow!("seal failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(sealed)
    }

    pub fn open(&self, sealed: &[u8]) -> anyhow::Result<CredentialPair> {
        if sealed.len() < NONCE_LEN {
            anyhow::bail!("sealed credentials truncated");
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| anyhow::anyhow!("bad nonce"))?;

        let mut in_out = ciphertext.to_vec();
        let plain = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| anyhow::anyhow!("sealed credentials failed authentication"))?;
        Ok(serde_json::from_slice(plain)?)
    }
}

#[cfg(test)]
#[path = "seal_tests.rs"]
mod tests;
