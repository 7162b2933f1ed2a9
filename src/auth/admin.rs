//! # Admin Accounts
//!
//! The only principals that can sign in. Admins are provisioned from the
//! CLI or a seed; there is no self sign-up.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::crypto::{hash_password, verify_password};
use super::errors::{AuthError, AuthResult};

/// Admin model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,

    /// Login email (unique)
    pub email: String,

    /// Argon2id password hash (never plaintext)
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub created_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

impl Admin {
    /// Create a new admin, hashing `password`
    pub fn new(email: String, password: &str, name: Option<String>) -> AuthResult<Self> {
        Ok(Self::with_hash(email, hash_password(password)?, name))
    }

    /// Create an admin from an already hashed password
    pub fn with_hash(email: String, password_hash: String, name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    pub fn verify_password(&self, password: &str) -> AuthResult<bool> {
        verify_password(password, &self.password_hash)
    }

    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.last_login_at = Some(at);
    }
}

/// Admin repository trait
///
/// Abstracts storage operations for admins.
pub trait AdminRepository: Send + Sync {
    fn find_by_email(&self, email: &str) -> AuthResult<Option<Admin>>;

    /// Store a new admin; the email must be unused
    fn create(&self, admin: &Admin) -> AuthResult<()>;

    /// Replace an existing admin
    fn update(&self, admin: &Admin) -> AuthResult<()>;
}

/// In-memory admin repository
#[derive(Debug, Default)]
pub struct InMemoryAdminRepository {
    admins: RwLock<Vec<Admin>>,
}

impl InMemoryAdminRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AuthError {
    AuthError::StorageError("Lock poisoned".to_string())
}

impl AdminRepository for InMemoryAdminRepository {
    fn find_by_email(&self, email: &str) -> AuthResult<Option<Admin>> {
        let admins = self.admins.read().map_err(poisoned)?;
        Ok(admins
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn create(&self, admin: &Admin) -> AuthResult<()> {
        let mut admins = self.admins.write().map_err(poisoned)?;

        if admins.iter().any(|a| a.email.eq_ignore_ascii_case(&admin.email)) {
            return Err(AuthError::EmailAlreadyExists);
        }

        admins.push(admin.clone());
        Ok(())
    }

    fn update(&self, admin: &Admin) -> AuthResult<()> {
        let mut admins = self.admins.write().map_err(poisoned)?;

        match admins.iter_mut().find(|a| a.id == admin.id) {
            Some(existing) => {
                *existing = admin.clone();
                Ok(())
            }
            None => Err(AuthError::StorageError("Admin not found".to_string())),
        }
    }
}
