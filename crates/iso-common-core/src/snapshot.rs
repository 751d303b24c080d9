//! Persisted image kinds.

use core::fmt;

/// Kind of persisted program image.
///
/// Only the `Full*` kinds carry an object store partition. `Message` images
/// transport single values between isolates and never include roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SnapshotKind {
    /// Full heap image, code regenerated on load.
    Full,
    /// Core libraries only, code regenerated on load.
    FullCore,
    /// Full image with JIT-compiled code.
    FullJit,
    /// Full image with ahead-of-time compiled code.
    FullAot,
    Message,
    None,
    Invalid,
}

impl SnapshotKind {
    pub const FULL_KINDS: [SnapshotKind; 4] = [
        SnapshotKind::Full,
        SnapshotKind::FullCore,
        SnapshotKind::FullJit,
        SnapshotKind::FullAot,
    ];

    /// Does an image of this kind persist generated code?
    pub fn includes_code(self) -> bool {
        matches!(self, SnapshotKind::FullJit | SnapshotKind::FullAot)
    }

    pub fn is_full(self) -> bool {
        matches!(
            self,
            SnapshotKind::Full | SnapshotKind::FullCore | SnapshotKind::FullJit | SnapshotKind::FullAot
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SnapshotKind::Full => "full",
            SnapshotKind::FullCore => "full-core",
            SnapshotKind::FullJit => "full-jit",
            SnapshotKind::FullAot => "full-aot",
            SnapshotKind::Message => "message",
            SnapshotKind::None => "none",
            SnapshotKind::Invalid => "invalid",
        }
    }

    /// Parse a kind from its `name()`.
    pub fn from_name(name: &str) -> Option<Self> {
        [
            SnapshotKind::Full,
            SnapshotKind::FullCore,
            SnapshotKind::FullJit,
            SnapshotKind::FullAot,
            SnapshotKind::Message,
            SnapshotKind::None,
            SnapshotKind::Invalid,
        ]
        .into_iter()
        .find(|k| k.name() == name)
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_kinds() {
        assert!(SnapshotKind::FullAot.includes_code());
        assert!(SnapshotKind::FullJit.includes_code());
        assert!(!SnapshotKind::Full.includes_code());
        assert!(!SnapshotKind::Message.is_full());
    }

    #[test]
    fn test_from_name() {
        for kind in SnapshotKind::FULL_KINDS {
            assert_eq!(SnapshotKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(SnapshotKind::from_name("bogus"), None);
    }
}
