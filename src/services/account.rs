// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration and sign-in.

use crate::error::{AppError, Result};
use crate::models::User;
use crate::platform::{AuthSession, IdentityProvider, UserStore};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Registration form.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 30, message = "ID number is required"))]
    pub id_number: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(max = 30, message = "Phone number is too long"))]
    #[serde(default)]
    pub phone: String,
}

impl Registration {
    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            id_number: self.id_number.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }
}

/// Flatten validator errors into a single message.
pub(crate) fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("Invalid {}", field),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Registration, sign-in and sign-out against the identity service.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn UserStore>) -> Self {
        Self { identity, store }
    }

    /// Create the account, then the `users/{uid}` document.
    pub async fn register(&self, form: &Registration) -> Result<User> {
        let form = form.trimmed();
        form.validate()
            .map_err(|e| AppError::BadRequest(validation_message(&e)))?;

        let session = self.identity.create_account(&form.email, &form.password).await?;

        let user = User {
            uid: session.uid.clone(),
            name: form.name,
            id_number: form.id_number,
            email: form.email,
            phone: form.phone,
            ..Default::default()
        };

        if let Err(e) = self.store.set_user(&user).await {
            tracing::error!(uid = %user.uid, error = %e, "Account created but user document not saved");
            return Err(e);
        }

        tracing::info!(uid = %user.uid, "User registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = email.trim();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::BadRequest(
                "Email and password are required".to_string(),
            ));
        }
        self.identity.sign_in(email, password).await
    }

    pub async fn logout(&self) {
        self.identity.sign_out().await;
    }

    pub fn current_user(&self) -> Option<AuthSession> {
        self.identity.current_user()
    }
}
