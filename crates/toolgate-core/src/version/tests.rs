// crates/toolgate-core/src/version/tests.rs
// ============================================================================
// Module: Tool Version Unit Tests
// Description: Unit tests for version normalization and ordering.
// Purpose: Validate padding, rejection, and display behavior.
// Dependencies: toolgate-core
// ============================================================================

//! ## Overview
//! Exercises short-form padding, malformed input rejection, and ordering.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;

#[test]
fn single_segment_pads_with_zeros() {
    assert_eq!(ToolVersion::parse("2").expect("version"), ToolVersion::new(2, 0, 0));
}

#[test]
fn two_segments_pad_patch() {
    assert_eq!(ToolVersion::parse("1.2").expect("version"), ToolVersion::new(1, 2, 0));
}

#[test]
fn full_triple_parses() {
    assert_eq!(ToolVersion::parse("1.2.3").expect("version"), ToolVersion::new(1, 2, 3));
}

#[test]
fn four_segments_are_rejected() {
    assert_eq!(
        ToolVersion::parse("1.2.3.4").unwrap_err(),
        VersionError::InvalidFormat("1.2.3.4".to_string())
    );
}

#[test]
fn empty_input_is_rejected() {
    assert_eq!(ToolVersion::parse("  ").unwrap_err(), VersionError::InvalidFormat("  ".to_string()));
}

#[test]
fn negative_segment_is_rejected() {
    assert_eq!(
        ToolVersion::parse("-1").unwrap_err(),
        VersionError::InvalidSegment("-1".to_string())
    );
}

#[test]
fn textual_segment_is_rejected() {
    assert_eq!(
        ToolVersion::parse("1.two").unwrap_err(),
        VersionError::InvalidSegment("1.two".to_string())
    );
}

#[test]
fn versions_order_numerically() {
    assert!(ToolVersion::parse("2").expect("a") > ToolVersion::parse("1.9.9").expect("b"));
    assert!(ToolVersion::parse("1.10").expect("a") > ToolVersion::parse("1.9").expect("b"));
}

#[test]
fn display_is_dotted_triple() {
    assert_eq!(ToolVersion::parse("3.1").expect("version").to_string(), "3.1.0");
    assert_eq!(ToolVersion::initial().to_string(), "1.0.0");
}
