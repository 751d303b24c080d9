//! Declarations of the bootstrap libraries.
//!
//! Only the declarations the root stores look up are listed, plus a few
//! neighbours so lookups have something to miss. Tests edit a copy of
//! `SystemLibraries::standard()` to simulate malformed libraries.

use indexmap::IndexMap;

use iso_common_core::{LibraryId, ObjectKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberDef {
    pub name: &'static str,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: &'static str,
    pub members: Vec<MemberDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDef {
    pub id: LibraryId,
    pub classes: Vec<ClassDef>,
    /// Top-level functions.
    pub functions: Vec<&'static str>,
}

impl LibraryDef {
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Remove `Class`, `Class.member` or a top-level function.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, path: &str) -> bool {
        match path.split_once('.') {
            Some((class, member)) => self
                .classes
                .iter_mut()
                .find(|c| c.name == class)
                .map(|c| {
                    let before = c.members.len();
                    c.members.retain(|m| m.name != member);
                    c.members.len() != before
                })
                .unwrap_or(false),
            None => {
                let before = self.classes.len() + self.functions.len();
                self.classes.retain(|c| c.name != path);
                self.functions.retain(|f| *f != path);
                self.classes.len() + self.functions.len() != before
            }
        }
    }
}

fn class(name: &'static str) -> ClassDef {
    ClassDef {
        name,
        members: Vec::new(),
    }
}

fn class_with(name: &'static str, functions: &[&'static str], fields: &[&'static str]) -> ClassDef {
    let members = functions
        .iter()
        .map(|&name| MemberDef { name, kind: ObjectKind::Function })
        .chain(fields.iter().map(|&name| MemberDef { name, kind: ObjectKind::Field }))
        .collect();
    ClassDef { name, members }
}

fn library(id: LibraryId, classes: Vec<ClassDef>, functions: &[&'static str]) -> LibraryDef {
    LibraryDef {
        id,
        classes,
        functions: functions.to_vec(),
    }
}

/// Declarations of every bootstrap library, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SystemLibraries {
    defs: IndexMap<LibraryId, LibraryDef>,
}

impl SystemLibraries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard bootstrap libraries.
    pub fn standard() -> Self {
        let mut libs = Self::empty();

        libs.insert(library(
            LibraryId::Core,
            vec![
                class_with(
                    "Object",
                    &[
                        "_objectEquals",
                        "_objectHashCode",
                        "_objectToString",
                        "_simpleInstanceOf",
                        "_simpleInstanceOfTrue",
                        "_simpleInstanceOfFalse",
                    ],
                    &[],
                ),
                class("Null"),
                class("Never"),
                class("Function"),
                class("Type"),
                class("num"),
                class("int"),
                class("double"),
                class("String"),
                class("bool"),
                class("List"),
                class("Map"),
                class("_List"),
                class("_ImmutableList"),
                class_with("_GrowableList", &["_withData"], &["_data", "_length"]),
                class("_Closure"),
                class("_IntegerImplementation"),
                class("_Smi"),
                class("_Mint"),
                class("_Double"),
                class("_CompileTimeError"),
                class_with("pragma", &[], &["name", "options"]),
                class("_OneByteString"),
                class("_TwoByteString"),
                class("_ExternalOneByteString"),
                class("_ExternalTwoByteString"),
                class("Error"),
                class("_WeakProperty"),
                class("_StackTrace"),
                class("StackOverflowError"),
                class("OutOfMemoryError"),
            ],
            &["print", "identical"],
        ));

        libs.insert(library(
            LibraryId::Async,
            vec![
                class_with("Future", &["timeout", "wait"], &[]),
                class("Completer"),
                class("_AsyncStarStreamController"),
                class("Stream"),
            ],
            &["_asyncStarMoveNextHelper", "_completeOnAsyncReturn", "_completeOnAsyncError"],
        ));

        libs.insert(library(
            LibraryId::Collection,
            vec![class("_LinkedHashMap"), class("_LinkedHashSet"), class("ListQueue")],
            &[],
        ));

        libs.insert(library(
            LibraryId::Convert,
            vec![class("JsonCodec"), class("Utf8Codec")],
            &["jsonEncode", "jsonDecode"],
        ));

        libs.insert(library(
            LibraryId::Developer,
            vec![class("Timeline"), class("ServiceExtensionResponse")],
            &["postEvent", "debugger"],
        ));

        libs.insert(library(
            LibraryId::Ffi,
            vec![class("Pointer"), class("NativeType"), class("Struct")],
            &["_asFunctionInternal"],
        ));

        libs.insert(library(
            LibraryId::Internal,
            vec![class("Symbol"), class("ClassID")],
            &[],
        ));

        libs.insert(library(
            LibraryId::Isolate,
            vec![
                class_with(
                    "_RawReceivePort",
                    &["_lookupHandler", "_lookupOpenPorts", "_handleMessage"],
                    &[],
                ),
                class("Isolate"),
                class("SendPort"),
            ],
            &[],
        ));

        libs.insert(library(
            LibraryId::Math,
            vec![class("Random"), class("Point")],
            &["min", "max", "sqrt"],
        ));

        libs.insert(library(LibraryId::Mirrors, vec![class("MirrorSystem")], &[]));

        libs.insert(library(
            LibraryId::TypedData,
            vec![
                class("_Float32x4"),
                class("_Int32x4"),
                class("_Float64x2"),
                class("Uint8List"),
            ],
            &[],
        ));

        libs.insert(library(LibraryId::VmService, vec![class("VMService")], &["boot"]));

        libs
    }

    pub fn insert(&mut self, def: LibraryDef) {
        self.defs.insert(def.id, def);
    }

    pub fn get(&self, id: LibraryId) -> Option<&LibraryDef> {
        self.defs.get(&id)
    }

    /// Drop a whole library definition.
    pub fn remove(&mut self, id: LibraryId) -> Option<LibraryDef> {
        self.defs.shift_remove(&id)
    }

    /// Drop a declaration from library `id`; see `LibraryDef::remove`.
    pub fn remove_member(&mut self, id: LibraryId, path: &str) -> bool {
        self.defs.get_mut(&id).map(|def| def.remove(path)).unwrap_or(false)
    }

    pub fn ids(&self) -> impl Iterator<Item = LibraryId> + '_ {
        self.defs.keys().copied()
    }
}
