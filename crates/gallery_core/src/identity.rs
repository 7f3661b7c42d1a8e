//! User identity resolution.
//!
//! # Responsibility
//! - Yield a stable user id from an authenticated session, or from a locally
//!   persisted anonymous id when no session exists.
//!
//! # Invariants
//! - Anonymous ids look like `temp_` followed by 9 lowercase alphanumerics.
//! - A provider returns the same anonymous id for its whole lifetime, even
//!   when the id file cannot be written.

use crate::model::vote::UserId;
use log::{info, warn};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const TEMP_ID_PREFIX: &str = "temp_";
const TEMP_ID_SUFFIX_LEN: usize = 9;

static TEMP_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^temp_[a-z0-9]{9}$").expect("valid temp id regex"));

/// The caller on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: UserId,
    authenticated: bool,
}

impl Identity {
    /// Identity backed by an authenticated session.
    pub fn authenticated(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            authenticated: true,
        }
    }

    /// Identity backed by a local temp id.
    pub fn anonymous(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            authenticated: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated && !self.user_id.trim().is_empty()
    }
}

/// Source of the current caller identity.
pub trait IdentityProvider {
    fn current_identity(&self) -> Identity;
}

/// Session-first provider with a file-persisted anonymous fallback.
#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    session_user: Option<UserId>,
    temp_id_path: Option<PathBuf>,
    temp_id: OnceCell<UserId>,
}

impl LocalIdentityProvider {
    pub fn new(temp_id_path: Option<PathBuf>) -> Self {
        Self {
            session_user: None,
            temp_id_path,
            temp_id: OnceCell::new(),
        }
    }

    /// Sets or clears the authenticated session user. Blank ids clear it.
    pub fn set_session_user(&mut self, user_id: Option<&str>) {
        self.session_user = user_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
    }

    fn anonymous_id(&self) -> &str {
        self.temp_id.get_or_init(|| match &self.temp_id_path {
            Some(path) => load_or_create_temp_id(path),
            None => new_temp_id(),
        })
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn current_identity(&self) -> Identity {
        match &self.session_user {
            Some(user_id) => Identity::authenticated(user_id.clone()),
            None => Identity::anonymous(self.anonymous_id()),
        }
    }
}

/// Returns true for values shaped like a generated anonymous id.
pub fn is_temp_user_id(value: &str) -> bool {
    TEMP_ID_RE.is_match(value)
}

fn new_temp_id() -> UserId {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{TEMP_ID_PREFIX}{}", &suffix[..TEMP_ID_SUFFIX_LEN])
}

fn load_or_create_temp_id(path: &Path) -> UserId {
    if let Ok(stored) = fs::read_to_string(path) {
        let stored = stored.trim();
        if is_temp_user_id(stored) {
            return stored.to_string();
        }
        warn!("event=temp_id_load module=identity status=error error_code=malformed_temp_id");
    }

    let created = new_temp_id();
    let persisted = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::write(path, &created));
    match persisted {
        Ok(()) => info!("event=temp_id_create module=identity status=ok persisted=true"),
        Err(err) => warn!(
            "event=temp_id_create module=identity status=error persisted=false error={err}"
        ),
    }
    created
}
