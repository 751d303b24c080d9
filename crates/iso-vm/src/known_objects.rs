//! Built-in classes, types and type-argument vectors.

use iso_common_core::{LibraryId, Nullability, ObjectKind};
use iso_runtime::{ObjectRef, SlotRange};

use crate::error::StoreError;
use crate::object_store::{Field, ObjectStore};

/// Slot filled from a declaration of a bootstrap library.
struct KnownMember {
    field: Field,
    library: LibraryId,
    path: &'static str,
}

const fn member(field: Field, library: LibraryId, path: &'static str) -> KnownMember {
    KnownMember { field, library, path }
}

/// Slot holding the canonical type of a library class.
struct KnownType {
    field: Field,
    library: LibraryId,
    /// Empty for `dynamic`, which has no class.
    class: &'static str,
    nullability: Nullability,
}

const fn ty(field: Field, library: LibraryId, class: &'static str, nullability: Nullability) -> KnownType {
    KnownType {
        field,
        library,
        class,
        nullability,
    }
}

use LibraryId::{Async, Collection, Core, Ffi, Internal, TypedData};
use Nullability::{NonNullable, Nullable, Unmarked};

static KNOWN_MEMBERS: &[KnownMember] = &[
    member(Field::ObjectClass, Core, "Object"),
    member(Field::NullClass, Core, "Null"),
    member(Field::NeverClass, Core, "Never"),
    member(Field::ClosureClass, Core, "_Closure"),
    member(Field::IntegerImplementationClass, Core, "_IntegerImplementation"),
    member(Field::SmiClass, Core, "_Smi"),
    member(Field::MintClass, Core, "_Mint"),
    member(Field::DoubleClass, Core, "_Double"),
    member(Field::CompiletimeErrorClass, Core, "_CompileTimeError"),
    member(Field::PragmaClass, Core, "pragma"),
    member(Field::PragmaName, Core, "pragma.name"),
    member(Field::PragmaOptions, Core, "pragma.options"),
    member(Field::OneByteStringClass, Core, "_OneByteString"),
    member(Field::TwoByteStringClass, Core, "_TwoByteString"),
    member(Field::ExternalOneByteStringClass, Core, "_ExternalOneByteString"),
    member(Field::ExternalTwoByteStringClass, Core, "_ExternalTwoByteString"),
    member(Field::BoolClass, Core, "bool"),
    member(Field::ArrayClass, Core, "_List"),
    member(Field::ImmutableArrayClass, Core, "_ImmutableList"),
    member(Field::GrowableObjectArrayClass, Core, "_GrowableList"),
    member(Field::ErrorClass, Core, "Error"),
    member(Field::WeakPropertyClass, Core, "_WeakProperty"),
    member(Field::StackTraceClass, Core, "_StackTrace"),
    member(Field::SymbolClass, Internal, "Symbol"),
    member(Field::LinkedHashMapClass, Collection, "_LinkedHashMap"),
    member(Field::LinkedHashSetClass, Collection, "_LinkedHashSet"),
    member(Field::Float32x4Class, TypedData, "_Float32x4"),
    member(Field::Int32x4Class, TypedData, "_Int32x4"),
    member(Field::Float64x2Class, TypedData, "_Float64x2"),
    member(Field::FutureClass, Async, "Future"),
    member(Field::CompleterClass, Async, "Completer"),
    member(Field::GrowableListFactory, Core, "_GrowableList._withData"),
    member(Field::SimpleInstanceOfFunction, Core, "Object._simpleInstanceOf"),
    member(Field::SimpleInstanceOfTrueFunction, Core, "Object._simpleInstanceOfTrue"),
    member(Field::SimpleInstanceOfFalseFunction, Core, "Object._simpleInstanceOfFalse"),
    member(Field::AsyncStarMoveNextHelper, Async, "_asyncStarMoveNextHelper"),
    member(Field::CompleteOnAsyncReturn, Async, "_completeOnAsyncReturn"),
    member(Field::CompleteOnAsyncError, Async, "_completeOnAsyncError"),
    member(Field::AsyncStarStreamController, Async, "_AsyncStarStreamController"),
    member(Field::FfiPointerClass, Ffi, "Pointer"),
    member(Field::FfiNativeTypeClass, Ffi, "NativeType"),
    member(Field::FfiAsFunctionInternal, Ffi, "_asFunctionInternal"),
];

static KNOWN_TYPES: &[KnownType] = &[
    ty(Field::ObjectType, Core, "Object", Unmarked),
    ty(Field::NullableObjectType, Core, "Object", Nullable),
    ty(Field::NonNullableObjectType, Core, "Object", NonNullable),
    ty(Field::NullType, Core, "Null", Nullable),
    ty(Field::NeverType, Core, "Never", NonNullable),
    ty(Field::DynamicType, Core, "", Unmarked),
    ty(Field::FunctionType, Core, "Function", Unmarked),
    ty(Field::NonNullableFunctionType, Core, "Function", NonNullable),
    ty(Field::TypeType, Core, "Type", NonNullable),
    ty(Field::NumberType, Core, "num", Unmarked),
    ty(Field::NonNullableNumberType, Core, "num", NonNullable),
    ty(Field::IntType, Core, "int", Unmarked),
    ty(Field::NonNullableIntType, Core, "int", NonNullable),
    ty(Field::NullableIntType, Core, "int", Nullable),
    ty(Field::Int64Type, Core, "_IntegerImplementation", NonNullable),
    ty(Field::SmiType, Core, "_Smi", NonNullable),
    ty(Field::MintType, Core, "_Mint", NonNullable),
    ty(Field::DoubleType, Core, "double", Unmarked),
    ty(Field::NonNullableDoubleType, Core, "double", NonNullable),
    ty(Field::NullableDoubleType, Core, "double", Nullable),
    ty(Field::StringType, Core, "String", Unmarked),
    ty(Field::NonNullableStringType, Core, "String", NonNullable),
    ty(Field::BoolType, Core, "bool", Unmarked),
    ty(Field::ArrayType, Core, "_List", Unmarked),
    ty(Field::Float32x4Type, TypedData, "_Float32x4", NonNullable),
    ty(Field::Int32x4Type, TypedData, "_Int32x4", NonNullable),
    ty(Field::Float64x2Type, TypedData, "_Float64x2", NonNullable),
];

/// Canonical type-argument vectors, built from already populated type slots.
static KNOWN_TYPE_ARGUMENTS: &[(Field, &[Field])] = &[
    (Field::TypeArgumentInt, &[Field::IntType]),
    (Field::TypeArgumentNonNullableInt, &[Field::NonNullableIntType]),
    (Field::TypeArgumentDouble, &[Field::DoubleType]),
    (Field::TypeArgumentString, &[Field::StringType]),
    (Field::TypeArgumentStringDynamic, &[Field::StringType, Field::DynamicType]),
    (Field::TypeArgumentStringString, &[Field::StringType, Field::StringType]),
];

/// Empty tables and lists every group starts with.
static INITIAL_CONTAINERS: &[Field] = &[
    Field::SymbolTable,
    Field::CanonicalTypes,
    Field::CanonicalFunctionTypes,
    Field::CanonicalTypeParameters,
    Field::CanonicalTypeArguments,
    Field::ClosureFunctions,
    Field::PendingClasses,
    Field::GlobalObjectPool,
];

pub(crate) fn init(store: &ObjectStore) -> Result<(), StoreError> {
    if store.bootstrap_library(Core).is_null() {
        return Err(StoreError::LibraryNotLoaded(Core));
    }

    for &field in INITIAL_CONTAINERS {
        if store.peek(field).is_null() {
            let table = store.heap().alloc_array(field.kind(), field.name(), Vec::new())?;
            store.set(field, table);
        }
    }

    for known in KNOWN_MEMBERS {
        if !store.registry().is_loaded(known.library) {
            tracing::debug!(slot = known.field.name(), library = %known.library, "library not loaded, skipped");
            continue;
        }
        let value = store.lookup(known.library, known.path)?;
        debug_assert_eq!(
            store.heap().kind(value),
            Some(known.field.kind()),
            "`{}` resolved to the wrong kind of declaration",
            known.path
        );
        store.set(known.field, value);
    }

    for known in KNOWN_TYPES {
        if !store.registry().is_loaded(known.library) {
            continue;
        }
        let class = if known.class.is_empty() {
            ObjectRef::NULL
        } else {
            store.lookup(known.library, known.class)?
        };
        let value = store.canonical_type(class, &[], known.nullability)?;
        store.set(known.field, value);
    }

    for &(field, types) in KNOWN_TYPE_ARGUMENTS {
        let types = types
            .iter()
            .map(|f| store.require(*f))
            .collect::<Result<Vec<_>, _>>()?;
        let value = store.canonical_type_arguments(&types)?;
        store.set(field, value);
    }

    debug_assert_eq!(store.heap().kind(store.peek(Field::GlobalObjectPool)), Some(ObjectKind::ObjectPool));
    Ok(())
}

/// Resolve the library declarations an image of `persisted` slots did not
/// carry. Runs on a restored store before it is sealed.
pub(crate) fn refill(store: &ObjectStore, persisted: SlotRange) -> Result<(), StoreError> {
    let mut refilled = 0;
    for known in KNOWN_MEMBERS {
        if persisted.contains(known.field.index())
            || !store.registry().is_loaded(known.library)
            || !store.peek(known.field).is_null()
        {
            continue;
        }
        store.set(known.field, store.lookup(known.library, known.path)?);
        refilled += 1;
    }
    for known in KNOWN_TYPES {
        if persisted.contains(known.field.index())
            || !store.registry().is_loaded(known.library)
            || !store.peek(known.field).is_null()
        {
            continue;
        }
        let class = if known.class.is_empty() {
            ObjectRef::NULL
        } else {
            store.lookup(known.library, known.class)?
        };
        store.set(known.field, store.canonical_type(class, &[], known.nullability)?);
        refilled += 1;
    }
    tracing::debug!(refilled, "known objects outside the image resolved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap;
    use crate::system_libraries::SystemLibraries;
    use iso_runtime::Heap;
    use std::sync::Arc;

    fn store_with(ids: &[LibraryId], libs: &SystemLibraries) -> ObjectStore {
        let store = ObjectStore::new(Arc::new(Heap::unbounded()));
        bootstrap::load_libraries(&store, libs, ids).unwrap();
        store
    }

    #[test]
    fn test_requires_core() {
        let store = ObjectStore::new(Arc::new(Heap::unbounded()));
        assert_eq!(init(&store), Err(StoreError::LibraryNotLoaded(Core)));
    }

    #[test]
    fn test_types_are_canonical() {
        let store = store_with(&[Core], &SystemLibraries::standard());
        init(&store).unwrap();
        let int = store.peek(Field::IntType);
        assert_eq!(
            store.canonical_type(store.lookup(Core, "int").unwrap(), &[], Unmarked),
            Ok(int)
        );
        assert_ne!(store.peek(Field::NullableIntType), int);

        let args = store.heap().object(store.peek(Field::TypeArgumentStringString)).unwrap();
        let string = store.peek(Field::StringType);
        assert_eq!(args.fields, vec![string, string]);
        assert_eq!(
            store.canonical_type_arguments(&[string, string]),
            Ok(store.peek(Field::TypeArgumentStringString))
        );
    }

    #[test]
    fn test_optional_libraries_skipped() {
        let store = store_with(&[Core], &SystemLibraries::standard());
        init(&store).unwrap();
        assert!(store.peek(Field::FutureClass).is_null());
        assert!(store.peek(Field::Float32x4Type).is_null());
        assert!(!store.peek(Field::GrowableListFactory).is_null());
    }

    #[test]
    fn test_refill_outside_range() {
        let store = store_with(&[Core, Ffi], &SystemLibraries::standard());
        let persisted = SlotRange::new(0, Field::FfiPointerClass.index());
        refill(&store, persisted).unwrap();
        assert_eq!(store.peek(Field::FfiPointerClass), store.lookup(Ffi, "Pointer").unwrap());
        assert!(!store.peek(Field::FfiAsFunctionInternal).is_null());
        // Slots inside the persisted range are left to the image.
        assert!(store.peek(Field::ObjectClass).is_null());
    }

    #[test]
    fn test_missing_member_is_fatal() {
        let mut libs = SystemLibraries::standard();
        libs.remove_member(Core, "_WeakProperty");
        let store = store_with(&[Core], &libs);
        let err = init(&store).unwrap_err();
        assert_eq!(
            err,
            StoreError::MissingMember {
                library: Core,
                member: "_WeakProperty".to_string()
            }
        );
        assert!(err.is_fatal());
    }
}
