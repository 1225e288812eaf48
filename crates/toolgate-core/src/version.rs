// crates/toolgate-core/src/version.rs
// ============================================================================
// Module: Tool Versions
// Description: Normalized semver triples for registered tools.
// Purpose: Provide a stable, comparable version form for listings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Tool versions normalize to a `major.minor.patch` triple. Short forms pad
//! with zeros (`"2"` becomes `2.0.0`, `"1.2"` becomes `1.2.0`). Versions are
//! descriptive metadata in listings; tool names remain the unique registry
//! key.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Normalized tool version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolVersion {
    /// Major version component.
    pub major: u32,
    /// Minor version component.
    pub minor: u32,
    /// Patch version component.
    pub patch: u32,
}

/// Version parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    /// The version string is empty or has too many segments.
    #[error("invalid version format: `{0}`")]
    InvalidFormat(String),
    /// A version segment is not a non-negative integer.
    #[error("invalid version segment in `{0}`")]
    InvalidSegment(String),
}

impl ToolVersion {
    /// Creates a version from explicit components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns the default `1.0.0` version applied when none is declared.
    #[must_use]
    pub const fn initial() -> Self {
        Self::new(1, 0, 0)
    }

    /// Parses a version from `"major"`, `"major.minor"`, or
    /// `"major.minor.patch"` forms, padding missing segments with zeros.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] for empty input, more than three segments, or
    /// non-numeric segments.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(VersionError::InvalidFormat(text.to_string()));
        }
        let segments: Vec<&str> = trimmed.split('.').collect();
        if segments.len() > 3 {
            return Err(VersionError::InvalidFormat(text.to_string()));
        }
        let mut components = [0u32; 3];
        for (index, segment) in segments.iter().enumerate() {
            components[index] = segment
                .parse::<u32>()
                .map_err(|_| VersionError::InvalidSegment(text.to_string()))?;
        }
        Ok(Self::new(components[0], components[1], components[2]))
    }
}

impl Default for ToolVersion {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests;
