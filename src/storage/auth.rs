//! Local accounts for the people allowed to edit the catalog.
//!
//! One session is kept per database: logging in replaces it, logging out
//! clears it.

use log::info;
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use thiserror::Error;

use crate::{
    config,
    storage::{
        db,
        error::StorageError,
        schema::{columns::*, tables::*},
    },
};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account for {0} already exists")]
    AlreadyExists(String),

    #[error("password must be at least 6 characters")]
    PasswordTooShort,

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Storage(err.into())
    }
}

pub trait AuthService {
    fn signup(&mut self, email: &str, password: &str) -> Result<User, AuthError>;
    fn login(&mut self, email: &str, password: &str) -> Result<User, AuthError>;
    fn logout(&mut self) -> Result<(), AuthError>;
    fn current_user(&self) -> Result<Option<User>, AuthError>;
}

pub struct LocalAuth {
    pub(crate) db: rusqlite::Connection,
}

impl LocalAuth {
    pub fn new(db_config: &config::Database) -> Result<Self, StorageError> {
        Ok(Self::from_existing_conn(db::open(db_config)?))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db }
    }

    fn start_session(&mut self, email: &str) -> Result<(), AuthError> {
        let tx = self.db.transaction()?;
        tx.execute(&format!("DELETE FROM {SESSION}"), [])?;
        tx.execute(
            &format!("INSERT INTO {SESSION} ({EMAIL}) VALUES (?1)"),
            params![email],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AuthError::InvalidEmail(email)),
    }
}

const SALT_LEN: usize = 16;
const DIGEST_CONTEXT: &str = "soundfolio 2024-05 local account password";
const DIGEST_ROUNDS: u32 = 20_000;

fn new_salt() -> String {
    let bytes: [u8; SALT_LEN] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Salted, domain-separated blake3 digest, re-hashed `DIGEST_ROUNDS` times.
fn password_digest(salt: &str, password: &str) -> String {
    let mut material = Vec::with_capacity(salt.len() + password.len());
    material.extend_from_slice(salt.as_bytes());
    material.extend_from_slice(password.as_bytes());

    let mut digest = blake3::derive_key(DIGEST_CONTEXT, &material);
    for _ in 0..DIGEST_ROUNDS {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&digest);
        hasher.update(salt.as_bytes());
        digest = *hasher.finalize().as_bytes();
    }
    blake3::Hash::from(digest).to_hex().to_string()
}

impl AuthService for LocalAuth {
    fn signup(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }

        let salt = new_salt();
        let inserted = self.db.execute(
            &format!(
                "INSERT INTO {USERS} ({EMAIL}, {SALT}, {PASSWORD_HASH}) VALUES (?1, ?2, ?3)
                 ON CONFLICT({EMAIL}) DO NOTHING"
            ),
            params![email, salt, password_digest(&salt, password)],
        )?;
        if inserted == 0 {
            return Err(AuthError::AlreadyExists(email));
        }

        self.start_session(&email)?;
        info!("signed up {email}");
        Ok(User { email })
    }

    fn login(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;

        let stored: Option<(String, String)> = self
            .db
            .query_row(
                &format!("SELECT {SALT}, {PASSWORD_HASH} FROM {USERS} WHERE {EMAIL} = ?1"),
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match stored {
            Some((salt, hash)) if password_digest(&salt, password) == hash => {
                self.start_session(&email)?;
                info!("logged in {email}");
                Ok(User { email })
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn logout(&mut self) -> Result<(), AuthError> {
        self.db.execute(&format!("DELETE FROM {SESSION}"), [])?;
        Ok(())
    }

    fn current_user(&self) -> Result<Option<User>, AuthError> {
        let email: Option<String> = self
            .db
            .query_row(&format!("SELECT {EMAIL} FROM {SESSION} LIMIT 1"), [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(email.map(|email| User { email }))
    }
}
