//! ACL table authorizer
//!
//! Policy file format, one rule per line:
//! ```text
//! # comment
//! p, root, *, setget
//! p, root, *, list
//! ```

use std::fs;
use std::path::Path;

use crate::error::{DriftError, Result};

use super::{denied, Authorizer, OBJECT_WILDCARD};

/// One allow rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclRule {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl AclRule {
    fn matches(&self, subject: &str, object: &str, action: &str) -> bool {
        self.subject == subject
            && (self.object == OBJECT_WILDCARD || self.object == object)
            && self.action == action
    }
}

/// Allow-list of (subject, object, action) rules; anything unlisted is denied
#[derive(Debug, Clone, Default)]
pub struct AclAuthorizer {
    rules: Vec<AclRule>,
}

impl AclAuthorizer {
    /// Empty table (denies everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an allow rule
    pub fn allow(
        mut self,
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        self.rules.push(AclRule {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        });
        self
    }

    /// Load rules from a policy file
    pub fn from_policy_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            DriftError::Config(format!("Cannot read policy file {}: {}", path.display(), e))
        })?;
        let authorizer = Self::parse(&text)?;

        tracing::info!(
            path = %path.display(),
            rules = authorizer.rules.len(),
            "Loaded ACL policy"
        );

        Ok(authorizer)
    }

    /// Parse policy text
    pub fn parse(text: &str) -> Result<Self> {
        let mut rules = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            match fields.as_slice() {
                ["p", subject, object, action] => rules.push(AclRule {
                    subject: subject.to_string(),
                    object: object.to_string(),
                    action: action.to_string(),
                }),
                _ => {
                    return Err(DriftError::Config(format!(
                        "Policy line {}: expected 'p, subject, object, action', got '{}'",
                        line_no + 1,
                        line
                    )))
                }
            }
        }

        Ok(Self { rules })
    }

    /// Loaded rules
    pub fn rules(&self) -> &[AclRule] {
        &self.rules
    }
}

impl Authorizer for AclAuthorizer {
    fn authorize(&self, subject: &str, object: &str, action: &str) -> Result<()> {
        if self
            .rules
            .iter()
            .any(|rule| rule.matches(subject, object, action))
        {
            return Ok(());
        }

        tracing::warn!(subject, object, action, "Authorization denied");
        Err(denied(subject, object, action))
    }
}
