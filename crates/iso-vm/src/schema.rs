//! Root slot schema.
//!
//! Both root stores are declared as tables of
//! `Variant = "name": Kind, access, populate;` rows. `root_fields!` turns a
//! table into a `#[repr(u16)]` enum whose discriminant is the slot index, a
//! static `FieldInfo` array in the same order, and the lookup helpers built
//! on them. Declaration order is slot order is offset order.

use core::fmt;
use core::sync::atomic::Ordering;

use iso_common_core::{LibraryId, ObjectKind};
use iso_runtime::slot::byte_offset_for_slots;

/// Memory ordering of an atomic slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderPolicy {
    /// Plain concurrent counters and indices.
    Relaxed,
    /// Published structures: writers release, readers acquire.
    AcquireRelease,
}

impl OrderPolicy {
    #[inline]
    pub fn load_order(self) -> Ordering {
        match self {
            OrderPolicy::Relaxed => Ordering::Relaxed,
            OrderPolicy::AcquireRelease => Ordering::Acquire,
        }
    }

    #[inline]
    pub fn store_order(self) -> Ordering {
        match self {
            OrderPolicy::Relaxed => Ordering::Relaxed,
            OrderPolicy::AcquireRelease => Ordering::Release,
        }
    }
}

/// Lazily populated root groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LazyGroup {
    Core = 0,
    Async = 1,
    Isolate = 2,
}

impl LazyGroup {
    pub const COUNT: usize = 3;
    pub const ALL: [LazyGroup; Self::COUNT] = [LazyGroup::Core, LazyGroup::Async, LazyGroup::Isolate];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Library whose members the group's initializer looks up.
    pub fn library(self) -> LibraryId {
        match self {
            LazyGroup::Core => LibraryId::Core,
            LazyGroup::Async => LibraryId::Async,
            LazyGroup::Isolate => LibraryId::Isolate,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LazyGroup::Core => "core",
            LazyGroup::Async => "async",
            LazyGroup::Isolate => "isolate",
        }
    }
}

impl fmt::Display for LazyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a slot may be read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Written once during bootstrap, never again once the store is sealed.
    ReadOnly,
    /// Single writer, no synchronization.
    ReadWrite,
    Atomic(OrderPolicy),
    /// Null until the first `get`, which runs the group initializer.
    Lazy(LazyGroup),
}

impl Access {
    #[inline]
    pub fn load_order(self) -> Ordering {
        match self {
            Access::ReadOnly | Access::ReadWrite => Ordering::Relaxed,
            Access::Atomic(policy) => policy.load_order(),
            Access::Lazy(_) => Ordering::Acquire,
        }
    }

    #[inline]
    pub fn store_order(self) -> Ordering {
        match self {
            Access::ReadOnly | Access::ReadWrite => Ordering::Relaxed,
            Access::Atomic(policy) => policy.store_order(),
            Access::Lazy(_) => Ordering::Release,
        }
    }

    #[inline]
    pub fn is_lazy(self) -> bool {
        matches!(self, Access::Lazy(_))
    }

    #[inline]
    pub fn is_atomic(self) -> bool {
        matches!(self, Access::Atomic(_))
    }

    pub fn lazy_group(self) -> Option<LazyGroup> {
        match self {
            Access::Lazy(group) => Some(group),
            _ => None,
        }
    }

    /// Short tag used by the layout dump.
    pub fn tag(self) -> &'static str {
        match self {
            Access::ReadOnly => "ro",
            Access::ReadWrite => "rw",
            Access::Atomic(OrderPolicy::Relaxed) => "atomic",
            Access::Atomic(OrderPolicy::AcquireRelease) => "atomic-acq-rel",
            Access::Lazy(LazyGroup::Core) => "lazy-core",
            Access::Lazy(LazyGroup::Async) => "lazy-async",
            Access::Lazy(LazyGroup::Isolate) => "lazy-isolate",
        }
    }
}

/// When a slot is expected to hold a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Populate {
    /// Filled by the bootstrap sequence, never null afterwards.
    Bootstrap,
    /// Filled during bootstrap if and only if the library was loaded.
    WithLibrary(LibraryId),
    /// Filled by its lazy group's initializer.
    OnDemand,
    /// Filled by the compiler or runtime after bootstrap; may stay null.
    Runtime,
}

impl Populate {
    /// Must the slot be non-null once bootstrap loaded `loaded`?
    pub fn required(self, loaded: &[LibraryId]) -> bool {
        match self {
            Populate::Bootstrap => true,
            Populate::WithLibrary(id) => loaded.contains(&id),
            Populate::OnDemand | Populate::Runtime => false,
        }
    }
}

/// One schema row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: &'static str,
    pub kind: ObjectKind,
    pub access: Access,
    pub populate: Populate,
}

/// Byte offset of slot `index` as seen by generated code.
#[inline]
pub const fn slot_offset(index: usize) -> usize {
    byte_offset_for_slots(index)
}

macro_rules! access_mode {
    (ro) => { $crate::schema::Access::ReadOnly };
    (rw) => { $crate::schema::Access::ReadWrite };
    (atomic) => { $crate::schema::Access::Atomic($crate::schema::OrderPolicy::Relaxed) };
    (acq_rel) => { $crate::schema::Access::Atomic($crate::schema::OrderPolicy::AcquireRelease) };
    (lazy_core) => { $crate::schema::Access::Lazy($crate::schema::LazyGroup::Core) };
    (lazy_async) => { $crate::schema::Access::Lazy($crate::schema::LazyGroup::Async) };
    (lazy_isolate) => { $crate::schema::Access::Lazy($crate::schema::LazyGroup::Isolate) };
}

macro_rules! populate_mode {
    (boot) => { $crate::schema::Populate::Bootstrap };
    (on_demand) => { $crate::schema::Populate::OnDemand };
    (runtime) => { $crate::schema::Populate::Runtime };
    (lib($lib:ident)) => { $crate::schema::Populate::WithLibrary(iso_common_core::LibraryId::$lib) };
}

/// Declare a root slot table.
macro_rules! root_fields {
    (
        $(#[$meta:meta])*
        pub enum $Enum:ident in $SCHEMA:ident {
            $(
                $Variant:ident = $name:literal : $kind:ident, $access:ident, $populate:ident $(($lib:ident))? ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        pub enum $Enum {
            $( $Variant, )*
        }

        pub static $SCHEMA: &[$crate::schema::FieldInfo] = &[
            $(
                $crate::schema::FieldInfo {
                    name: $name,
                    kind: iso_common_core::ObjectKind::$kind,
                    access: access_mode!($access),
                    populate: populate_mode!($populate $(($lib))?),
                },
            )*
        ];

        impl $Enum {
            pub const ALL: &'static [$Enum] = &[ $( $Enum::$Variant, )* ];
            pub const COUNT: usize = Self::ALL.len();

            #[inline]
            pub const fn index(self) -> usize {
                self as usize
            }

            /// Byte offset of the slot inside its store.
            #[inline]
            pub const fn offset(self) -> usize {
                $crate::schema::slot_offset(self as usize)
            }

            #[inline]
            pub fn info(self) -> &'static $crate::schema::FieldInfo {
                &$SCHEMA[self as usize]
            }

            #[inline]
            pub fn name(self) -> &'static str {
                self.info().name
            }

            #[inline]
            pub fn kind(self) -> iso_common_core::ObjectKind {
                self.info().kind
            }

            #[inline]
            pub fn access(self) -> $crate::schema::Access {
                self.info().access
            }

            #[inline]
            pub fn populate(self) -> $crate::schema::Populate {
                self.info().populate
            }

            pub fn from_index(index: usize) -> Option<Self> {
                Self::ALL.get(index).copied()
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|f| f.name() == name)
            }

            pub fn iter() -> impl Iterator<Item = $Enum> {
                Self::ALL.iter().copied()
            }

            /// Slot range covering `first..=last`.
            pub const fn range(first: $Enum, last: $Enum) -> iso_runtime::SlotRange {
                iso_runtime::SlotRange::inclusive(first as usize, last as usize)
            }

            /// Slot range covering the whole table.
            pub const fn full_range() -> iso_runtime::SlotRange {
                iso_runtime::SlotRange::new(0, Self::COUNT)
            }
        }

        impl core::fmt::Display for $Enum {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}
