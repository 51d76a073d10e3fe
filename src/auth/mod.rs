//! Authorization Module
//!
//! Authorization is a single capability: may `subject` perform `action` on
//! `object`? The service asks before touching storage; how the answer is
//! computed is up to the implementation.

mod acl;

use crate::error::{DriftError, Result};

pub use acl::{AclAuthorizer, AclRule};

/// Object name matching every object
pub const OBJECT_WILDCARD: &str = "*";

/// Action covering SetKey, GetKey and both streams
pub const SET_GET_ACTION: &str = "setget";

/// Action covering ListKeys
pub const LIST_ACTION: &str = "list";

/// Decides whether a caller may perform an action
pub trait Authorizer: Send + Sync {
    /// `Ok(())` to allow, `Err(PermissionDenied)` to deny
    fn authorize(&self, subject: &str, object: &str, action: &str) -> Result<()>;
}

/// Allows every call
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _subject: &str, _object: &str, _action: &str) -> Result<()> {
        Ok(())
    }
}

/// Build the standard denial error
pub(crate) fn denied(subject: &str, object: &str, action: &str) -> DriftError {
    let subject = if subject.is_empty() { "<anonymous>" } else { subject };
    DriftError::PermissionDenied(format!(
        "{} not permitted to {} to {}",
        subject, action, object
    ))
}
