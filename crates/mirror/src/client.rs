// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-aware HTTP client for the gateway.
//!
//! Every response is decoded into a [`Reply`]: callers get the envelope's
//! `data` on success and a structured [`Failure`] otherwise. Failures also
//! raise an error notification, and authentication failures sign the shared
//! [`AuthSnapshot`] out.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use leporid_gateway::envelope::{Failure, Reply};

use crate::mirror::AuthSnapshot;
use crate::notify::{NotificationKind, NotificationSink};

/// Why a client call failed.
#[derive(Debug)]
pub enum ClientError {
    /// The gateway or upstream answered with a non-success envelope.
    Api(Failure),
    /// The request never produced a response.
    Transport(reqwest::Error),
}

impl ClientError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Api(f) if f.is_authentication())
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(failure) => write!(f, "{failure}"),
            Self::Transport(e) => write!(f, "network error: {e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(failure) => Some(failure),
            Self::Transport(e) => Some(e),
        }
    }
}

/// HTTP client that keeps the gateway's cookies between calls.
#[derive(Clone)]
pub struct SessionClient {
    base_url: Url,
    http: Client,
    jar: Arc<Jar>,
    notifier: Arc<dyn NotificationSink>,
    /// Signed-in state shared by every clone and the owning mirror.
    auth: Arc<Mutex<AuthSnapshot>>,
}

impl SessionClient {
    pub fn new(base_url: &str, notifier: Arc<dyn NotificationSink>) -> anyhow::Result<Self> {
        leporid_gateway::ensure_crypto();
        let base_url = Url::parse(base_url)?;
        let jar = Arc::new(Jar::default());
        let http = Client::builder().cookie_provider(Arc::clone(&jar)).build()?;
        let auth = Arc::new(Mutex::new(AuthSnapshot::default()));
        Ok(Self { base_url, http, jar, notifier, auth })
    }

    /// Detach from any earlier snapshot and start a new one. Clones taken
    /// afterwards report to it.
    pub(crate) fn attach_auth(&mut self, initial: AuthSnapshot) -> Arc<Mutex<AuthSnapshot>> {
        self.auth = Arc::new(Mutex::new(initial));
        Arc::clone(&self.auth)
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    /// Current value of a cookie the gateway has set, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let raw = header.to_str().ok()?;
        raw.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
    }

    /// Store a cookie as if the gateway had set it.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.jar.add_cookie_str(&format!("{name}={value}; Path=/"), &self.base_url);
    }

    /// Send a request and decode the envelope.
    pub async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.base_url.join(path).map_err(|e| {
            self.fail(Failure {
                code: 400,
                node: Some("bad-request".to_owned()),
                message: Some(format!("invalid path {path}: {e}")),
            })
        })?;

        let mut req = self.http.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Err(self.transport(e)),
        };
        let status = resp.status().as_u16();
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.transport(e)),
        };

        Reply::<T>::decode(status, &bytes).into_result().map_err(|failure| self.fail(failure))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.call::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::POST, path, Some(body)).await
    }

    fn fail(&self, failure: Failure) -> ClientError {
        tracing::debug!(code = failure.code, node = ?failure.node, "request failed");
        if failure.is_authentication() {
            *self.auth.lock() = AuthSnapshot::default();
        }
        self.notifier.notify(NotificationKind::Error, &failure.describe());
        ClientError::Api(failure)
    }

    fn transport(&self, e: reqwest::Error) -> ClientError {
        tracing::debug!(err = %e, "request did not complete");
        self.notifier.notify(NotificationKind::Error, "Network error, please try again");
        ClientError::Transport(e)
    }
}
