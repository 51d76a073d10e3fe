//! Tests for authorization
//!
//! These tests verify:
//! - Policy text parsing
//! - Allow/deny decisions and the wildcard object
//! - Loading from a policy file

use std::fs;

use driftkv::auth::{
    AclAuthorizer, AllowAll, Authorizer, LIST_ACTION, OBJECT_WILDCARD, SET_GET_ACTION,
};
use driftkv::DriftError;
use tempfile::TempDir;

const POLICY: &str = "\
# subject, object, action
p, root, *, setget
p, root, *, list

p, reader, *, list
";

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_skips_comments_and_blanks() {
    let acl = AclAuthorizer::parse(POLICY).unwrap();

    assert_eq!(acl.rules().len(), 3);
    assert_eq!(acl.rules()[2].subject, "reader");
    assert_eq!(acl.rules()[2].action, LIST_ACTION);
}

#[test]
fn test_parse_rejects_malformed_line() {
    let err = AclAuthorizer::parse("p, root, *").unwrap_err();

    match err {
        DriftError::Config(msg) => assert!(msg.contains("line 1")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_parse_rejects_unknown_rule_type() {
    assert!(AclAuthorizer::parse("g, root, admin, list").is_err());
}

// =============================================================================
// Decision Tests
// =============================================================================

#[test]
fn test_listed_subject_is_allowed() {
    let acl = AclAuthorizer::parse(POLICY).unwrap();

    acl.authorize("root", OBJECT_WILDCARD, SET_GET_ACTION).unwrap();
    acl.authorize("root", OBJECT_WILDCARD, LIST_ACTION).unwrap();
    acl.authorize("reader", OBJECT_WILDCARD, LIST_ACTION).unwrap();
}

#[test]
fn test_unlisted_action_is_denied() {
    let acl = AclAuthorizer::parse(POLICY).unwrap();

    let err = acl
        .authorize("reader", OBJECT_WILDCARD, SET_GET_ACTION)
        .unwrap_err();

    match err {
        DriftError::PermissionDenied(msg) => {
            assert_eq!(msg, "reader not permitted to setget to *");
        }
        other => panic!("Expected PermissionDenied, got {:?}", other),
    }
}

#[test]
fn test_anonymous_subject_is_denied() {
    let acl = AclAuthorizer::parse(POLICY).unwrap();

    let err = acl.authorize("", OBJECT_WILDCARD, LIST_ACTION).unwrap_err();
    assert!(err.to_string().contains("<anonymous>"));
}

#[test]
fn test_wildcard_rule_covers_named_objects() {
    let acl = AclAuthorizer::new()
        .allow("root", "*", "setget")
        .allow("guest", "public", "setget");

    acl.authorize("root", "anything", "setget").unwrap();
    acl.authorize("guest", "public", "setget").unwrap();
    assert!(acl.authorize("guest", "private", "setget").is_err());
}

#[test]
fn test_empty_table_denies_everything() {
    let acl = AclAuthorizer::new();
    assert!(acl.authorize("root", OBJECT_WILDCARD, LIST_ACTION).is_err());
}

#[test]
fn test_allow_all() {
    AllowAll.authorize("", OBJECT_WILDCARD, SET_GET_ACTION).unwrap();
}

// =============================================================================
// Policy File Tests
// =============================================================================

#[test]
fn test_load_policy_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("policy.csv");
    fs::write(&path, POLICY).unwrap();

    let acl = AclAuthorizer::from_policy_file(&path).unwrap();
    assert_eq!(acl.rules().len(), 3);
}

#[test]
fn test_missing_policy_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();

    let err = AclAuthorizer::from_policy_file(&temp_dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, DriftError::Config(_)));
}
