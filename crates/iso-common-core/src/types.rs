//! Object kinds shared by the heap and the root stores.

use num_enum::TryFromPrimitive;

/// Object kind - the semantic type carried by a heap object and declared
/// for every root slot.
///
/// This is a flat tag: the heap stores it in each object header and the
/// store schemas use it to describe what a slot is expected to hold.
/// Nothing here inspects the object's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ObjectKind {
    Object = 0,
    Class = 1,
    Type = 2,
    TypeArguments = 3,
    Function = 4,
    Field = 5,
    Library = 6,
    Array = 7,
    GrowableObjectArray = 8,
    Instance = 9,
    Smi = 10,
    Code = 11,
    ObjectPool = 12,
    CompressedStackMaps = 13,
    UnhandledException = 14,
    StackTrace = 15,
    String = 16,
}

impl ObjectKind {
    /// Create an ObjectKind from its u8 representation.
    #[inline]
    pub fn from_u8(v: u8) -> Self {
        Self::try_from(v).unwrap_or(ObjectKind::Object)
    }

    /// Short lowercase name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Class => "class",
            Self::Type => "type",
            Self::TypeArguments => "type_arguments",
            Self::Function => "function",
            Self::Field => "field",
            Self::Library => "library",
            Self::Array => "array",
            Self::GrowableObjectArray => "growable_object_array",
            Self::Instance => "instance",
            Self::Smi => "smi",
            Self::Code => "code",
            Self::ObjectPool => "object_pool",
            Self::CompressedStackMaps => "compressed_stack_maps",
            Self::UnhandledException => "unhandled_exception",
            Self::StackTrace => "stack_trace",
            Self::String => "string",
        }
    }

    /// Is this an append-only container (arrays, pools, listener lists)?
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Array | Self::GrowableObjectArray | Self::ObjectPool
        )
    }
}

/// Nullability of a type object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Nullability {
    NonNullable = 0,
    Nullable = 1,
    /// Written without a marker, nullability inherited from context.
    Unmarked = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_roundtrip() {
        for v in 0..=16u8 {
            assert_eq!(ObjectKind::from_u8(v) as u8, v);
        }
        assert_eq!(ObjectKind::from_u8(200), ObjectKind::Object);
    }

    #[test]
    fn test_containers() {
        assert!(ObjectKind::GrowableObjectArray.is_container());
        assert!(!ObjectKind::Class.is_container());
    }
}
