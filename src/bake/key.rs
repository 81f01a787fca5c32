//! Geometry cache keys

use std::fmt;

use sha2::{Digest, Sha256};

use crate::model::{SectionIndex, Viewport, WritingMode};

/// Everything a baked extent depends on.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeyParts<'a> {
    /// Host typographic settings.
    pub settings_fingerprint: &'a str,
    /// Detected writing mode of the section.
    pub writing_mode: WritingMode,
    /// Page size.
    pub viewport: Viewport,
    /// Section position.
    pub section: SectionIndex,
    /// Stable document identity.
    pub document_key: &'a str,
    /// Section href.
    pub href: &'a str,
}

/// SHA-256 hex digest identifying one baked entry set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash the key components.
    pub fn compute(parts: &CacheKeyParts<'_>) -> Self {
        let mut hasher = Sha256::new();
        let fields = [
            parts.settings_fingerprint.to_string(),
            if parts.writing_mode.is_vertical() {
                "vertical".to_string()
            } else {
                "horizontal".to_string()
            },
            parts.writing_mode.vertical_reversed.to_string(),
            parts.writing_mode.is_rtl().to_string(),
            parts.viewport.width.to_string(),
            parts.viewport.height.to_string(),
            parts.section.get().to_string(),
            parts.document_key.to_string(),
            parts.href.to_string(),
        ];
        for field in &fields {
            hasher.update(field.as_bytes());
            hasher.update(b"\n");
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
