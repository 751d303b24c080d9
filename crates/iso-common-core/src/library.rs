//! Bootstrap library identifiers.

use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// System libraries, listed in the order they are compiled.
///
/// A library may only depend on libraries declared before it, so the
/// discriminant doubles as the load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LibraryId {
    Core = 0,
    Async = 1,
    Collection = 2,
    Convert = 3,
    Developer = 4,
    Ffi = 5,
    Internal = 6,
    Isolate = 7,
    Math = 8,
    Mirrors = 9,
    TypedData = 10,
    VmService = 11,
}

/// Raw id that does not name a bootstrap library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown bootstrap library id {0}")]
pub struct UnknownLibraryId(pub u8);

impl LibraryId {
    pub const COUNT: usize = 12;

    /// All ids in declaration (= dependency) order.
    pub const ALL: [LibraryId; Self::COUNT] = [
        LibraryId::Core,
        LibraryId::Async,
        LibraryId::Collection,
        LibraryId::Convert,
        LibraryId::Developer,
        LibraryId::Ffi,
        LibraryId::Internal,
        LibraryId::Isolate,
        LibraryId::Math,
        LibraryId::Mirrors,
        LibraryId::TypedData,
        LibraryId::VmService,
    ];

    /// Checked conversion from a raw id.
    pub fn from_raw(raw: u8) -> Result<Self, UnknownLibraryId> {
        Self::try_from(raw).map_err(|_| UnknownLibraryId(raw))
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Library name as written in import URIs (`sys:<name>`).
    pub fn name(self) -> &'static str {
        match self {
            LibraryId::Core => "core",
            LibraryId::Async => "async",
            LibraryId::Collection => "collection",
            LibraryId::Convert => "convert",
            LibraryId::Developer => "developer",
            LibraryId::Ffi => "ffi",
            LibraryId::Internal => "internal",
            LibraryId::Isolate => "isolate",
            LibraryId::Math => "math",
            LibraryId::Mirrors => "mirrors",
            LibraryId::TypedData => "typed_data",
            LibraryId::VmService => "vmservice",
        }
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys:{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_declaration_order() {
        for (i, id) in LibraryId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
        assert!(LibraryId::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(LibraryId::from_raw(7), Ok(LibraryId::Isolate));
        assert_eq!(LibraryId::from_raw(12), Err(UnknownLibraryId(12)));
    }

    #[test]
    fn test_display() {
        assert_eq!(LibraryId::TypedData.to_string(), "sys:typed_data");
    }
}
