//! # iso-common-core
//!
//! Core identifiers shared by the heap, the root stores and the tooling.
//! `no_std` compatible.
//!
//! - `ObjectKind` - semantic type of a root slot / heap object
//! - `LibraryId` - bootstrap library identifiers in dependency order
//! - `SnapshotKind` - persisted image kinds
//! - `experimental` - generated experimental-feature table

#![cfg_attr(not(feature = "std"), no_std)]

pub mod types;
pub mod library;
pub mod snapshot;
pub mod experimental;

pub use types::{ObjectKind, Nullability};
pub use library::{LibraryId, UnknownLibraryId};
pub use snapshot::SnapshotKind;
pub use experimental::{ExperimentalFeature, FeatureError};
