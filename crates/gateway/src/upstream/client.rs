// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the upstream identity/resource API.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION};
use reqwest::{Client, Method, Url};

use crate::envelope::Reply;
use crate::identity::UserIdentity;
use crate::session::{epoch_ms, CredentialPair};
use crate::upstream::token::{Grant, TokenError, TokenResponse};

/// Longest upstream error body kept for logs.
const DETAIL_LIMIT: usize = 512;

/// Credential used for `GET /users/me`.
#[derive(Clone, Copy)]
pub enum MeAuth<'a> {
    /// Full `Authorization` header value, e.g. `Bearer abc`.
    Authorization(&'a str),
    Bearer(&'a str),
    /// Raw upstream session cookie value.
    Cookie { name: &'a str, value: &'a str },
}

/// A relayed upstream response.
#[derive(Debug)]
pub struct Forwarded {
    pub status: u16,
    pub content_type: Option<HeaderValue>,
    /// Redirect target; redirects are relayed, not followed.
    pub location: Option<HeaderValue>,
    pub body: Bytes,
}

/// Shared client for one upstream base URL. Cheap to clone.
#[derive(Clone)]
pub struct UpstreamClient {
    base_url: String,
    client: Client,
}

impl UpstreamClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        crate::ensure_crypto();
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_owned(), client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange a grant for a new credential pair.
    ///
    /// The expiry is fixed from the moment the response is received.
    pub async fn exchange(&self, grant: &Grant) -> Result<CredentialPair, TokenError> {
        let url = Url::parse_with_params(&self.url("/auth/token"), grant.params())
            .map_err(|e| TokenError::Malformed(format!("token url: {e}")))?;
        let resp = self.client.post(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let mut detail = resp.text().await.unwrap_or_default();
            detail.truncate(floor_char_boundary(&detail, DETAIL_LIMIT));
            return Err(TokenError::Rejected { status: status.as_u16(), detail });
        }

        let bytes = resp.bytes().await?;
        let received_at = epoch_ms();
        let token: TokenResponse =
            serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))?;
        Ok(token.into_pair(received_at))
    }

    /// Fetch the caller's identity from `GET /users/me`.
    pub async fn me(&self, auth: MeAuth<'_>) -> anyhow::Result<UserIdentity> {
        let req = self.client.get(self.url("/users/me"));
        let req = match auth {
            MeAuth::Authorization(value) => req.header(AUTHORIZATION, value),
            MeAuth::Bearer(token) => req.bearer_auth(token),
            MeAuth::Cookie { name, value } => req.header(COOKIE, format!("{name}={value}")),
        };
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(Reply::<UserIdentity>::decode(status, &body).into_result()?)
    }

    /// Send an arbitrary request and collect the full response.
    pub async fn forward(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Forwarded, reqwest::Error> {
        let mut req = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            req = req.body(body);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let content_type = resp.headers().get(CONTENT_TYPE).cloned();
        let location = resp.headers().get(LOCATION).cloned();
        let body = resp.bytes().await?;
        Ok(Forwarded { status, content_type, location, body })
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
