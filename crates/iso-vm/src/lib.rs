//! # iso-vm
//!
//! Root object registry of an isolate group:
//! - `object_store` - the shared, contiguous group root table
//! - `isolate_store` - per-isolate root slots
//! - `bootstrap` / `system_libraries` - bootstrap library registry and loader
//! - `lazy_init` - on-demand population of rarely used root groups
//! - `snapshot` - root partitions of persisted images
//! - `group` - isolate group and isolate lifecycle, root scanning

#[macro_use]
pub mod schema;

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod group;
pub mod isolate_store;
mod known_objects;
mod lazy_init;
pub mod object_store;
pub mod report;
mod roots;
pub mod safepoint;
pub mod snapshot;
pub mod stubs;
pub mod system_libraries;

pub use config::{FeatureSet, GroupConfig};
pub use error::StoreError;
pub use group::{Isolate, IsolateGroup, IsolateId};
pub use isolate_store::{IsolateField, IsolateObjectStore};
pub use object_store::{Field, ObjectStore};
pub use report::StoreReport;
pub use safepoint::{MutatorScope, SafepointHandler, SafepointScope};
pub use schema::{Access, FieldInfo, LazyGroup, OrderPolicy, Populate};
pub use snapshot::RootImage;
pub use system_libraries::SystemLibraries;
