// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Authentication client (Identity Toolkit REST API).
//!
//! Handles:
//! - Email/password sign-up and sign-in
//! - Password changes for the signed-in user
//! - Holding the current credentials for other platform clients

use crate::error::AppError;
use crate::platform::{AuthSession, IdentityProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity Toolkit client keeping the signed-in user in memory.
pub struct FirebaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: RwLock<Option<AuthSession>>,
}

impl FirebaseAuthClient {
    /// Create a client for the given web API key.
    ///
    /// For local development with the Auth emulator, set FIREBASE_AUTH_EMULATOR_HOST.
    pub fn new(api_key: String) -> Self {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => {
                tracing::info!(host = %host, "Using Firebase Auth emulator");
                format!("http://{}/identitytoolkit.googleapis.com/v1", host)
            }
            Err(_) => IDENTITY_TOOLKIT_URL.to_string(),
        };
        Self::with_base_url(api_key, base_url)
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            session: RwLock::new(None),
        }
    }

    fn store_session(&self, session: Option<AuthSession>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    /// POST a JSON body to an `accounts:*` endpoint.
    async fn post_accounts<B: Serialize>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<AccountResponse, AppError> {
        let url = format!("{}/accounts:{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Identity service unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<IdentityErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            tracing::warn!(method, status = %status, code = %code, "Identity request rejected");
            return Err(AppError::Auth(describe_error_code(&code)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Malformed identity response: {}", e)))
    }

    async fn password_grant(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response = self.post_accounts(method, &body).await?;

        let session = AuthSession {
            uid: response.local_id,
            email: response.email.unwrap_or_else(|| email.to_string()),
            id_token: response.id_token.unwrap_or_default(),
        };
        self.store_session(Some(session.clone()));

        tracing::info!(uid = %session.uid, method, "Signed in");
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuthClient {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.password_grant("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        self.password_grant("signInWithPassword", email, password).await
    }

    async fn sign_out(&self) {
        if let Some(session) = self.current_user() {
            tracing::info!(uid = %session.uid, "Signed out");
        }
        self.store_session(None);
    }

    async fn update_password(&self, new_password: &str) -> Result<(), AppError> {
        let session = self.current_user().ok_or(AppError::Unauthorized)?;

        let body = UpdatePasswordRequest {
            id_token: &session.id_token,
            password: new_password,
            return_secure_token: true,
        };
        let response = self.post_accounts("update", &body).await?;

        // Changing the password revokes the old token; keep the fresh one.
        if let Some(id_token) = response.id_token {
            self.store_session(Some(AuthSession {
                id_token,
                ..session.clone()
            }));
        }

        tracing::info!(uid = %session.uid, "Password updated");
        Ok(())
    }

    fn current_user(&self) -> Option<AuthSession> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Turn an Identity Toolkit error code into a message for the screen.
///
/// Codes look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should be ...`.
fn describe_error_code(code: &str) -> String {
    let (key, detail) = match code.split_once(" : ") {
        Some((key, detail)) => (key.trim(), Some(detail.trim())),
        None => (code.trim(), None),
    };

    match key {
        "EMAIL_EXISTS" => "The email address is already in use".to_string(),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid credentials".to_string()
        }
        "INVALID_EMAIL" => "The email address is badly formatted".to_string(),
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later".to_string(),
        "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" | "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" => {
            "Sign in again to change the password".to_string()
        }
        "WEAK_PASSWORD" => detail
            .unwrap_or("Password should be at least 6 characters")
            .to_string(),
        _ => detail.unwrap_or(key).to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordRequest<'a> {
    id_token: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// Subset of the `accounts:*` response we use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    error: IdentityError,
}

#[derive(Debug, Deserialize)]
struct IdentityError {
    message: String,
}
