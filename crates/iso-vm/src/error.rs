//! Root store errors.

use iso_common_core::{FeatureError, LibraryId, SnapshotKind, UnknownLibraryId};
use iso_runtime::{HeapError, SlotRange};

use crate::schema::LazyGroup;

/// Errors raised while bootstrapping or using the root stores.
///
/// Everything except `OutOfMemory` is bootstrap-fatal: the group or isolate
/// being started cannot run and the caller is expected to abort startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("bootstrap library {library} is missing `{member}`")]
    MissingMember { library: LibraryId, member: String },

    #[error("bootstrap library {0} has not been loaded")]
    LibraryNotLoaded(LibraryId),

    #[error("no definition supplied for bootstrap library {0}")]
    MissingLibraryDefinition(LibraryId),

    #[error(transparent)]
    UnknownLibrary(#[from] UnknownLibraryId),

    #[error("snapshot kind `{0}` has no object store partition")]
    NoSnapshotPartition(SnapshotKind),

    #[error("root image covers {found:?}, expected {expected:?}")]
    ImageMismatch { expected: SlotRange, found: SlotRange },

    #[error("malformed root image: {0}")]
    MalformedImage(String),

    #[error("root slot `{0}` must be initialized first")]
    Uninitialized(&'static str),

    #[error("could not allocate the out-of-memory singleton")]
    OutOfMemorySingleton,

    #[error("lazy {group} roots are unavailable: initializer failed")]
    LazyInitFailed {
        group: LazyGroup,
        #[source]
        source: Box<StoreError>,
    },

    #[error("lazy {0} initializer panicked")]
    InitializerPanicked(LazyGroup),

    #[error(transparent)]
    Heap(#[from] HeapError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Allocation failure while preallocating a non-essential object.
    #[error("out of memory while preallocating {what}")]
    OutOfMemory { what: &'static str },
}

impl StoreError {
    /// Must the group or isolate being started abort?
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StoreError::OutOfMemory { .. })
    }
}
