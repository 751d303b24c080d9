//! Group object store.
//!
//! One per isolate group. Holds every canonical runtime object managed code
//! needs (built-in classes and types, canonical tables, the bootstrap
//! libraries, preallocated errors and the generated stubs) in one contiguous
//! block of slots, so the collector and the snapshot writer can walk any
//! declared sub-range with a single loop.
//!
//! Slot order matters:
//! - lazily populated slots come first,
//! - everything a `Full`/`FullCore` image persists ends at
//!   `global_object_pool`,
//! - generated code follows and ends at `slow_tts_stub`, the end of the
//!   `FullJit`/`FullAot` partition,
//! - slots owned by the runtime after startup come last.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use iso_common_core::{LibraryId, Nullability, ObjectKind, SnapshotKind};
use iso_runtime::{Heap, HeapObject, ObjectPointerVisitor, ObjectRef, SlotBlock, SlotRange};

use crate::bootstrap::BootstrapRegistry;
use crate::error::StoreError;
use crate::lazy_init::LazyInit;
use crate::safepoint::SafepointScope;
use crate::schema::{Access, LazyGroup};

root_fields! {
    /// Slots of the group object store, in layout order.
    pub enum Field in OBJECT_STORE_SCHEMA {
        // Lazy groups.
        ListClass = "list_class": Class, lazy_core, on_demand;
        NonNullableListRareType = "non_nullable_list_rare_type": Type, lazy_core, on_demand;
        NonNullableMapRareType = "non_nullable_map_rare_type": Type, lazy_core, on_demand;
        ObjectEqualsFunction = "object_equals_function": Function, lazy_core, on_demand;
        ObjectHashCodeFunction = "object_hash_code_function": Function, lazy_core, on_demand;
        ObjectToStringFunction = "object_to_string_function": Function, lazy_core, on_demand;
        NonNullableFutureRareType = "non_nullable_future_rare_type": Type, lazy_async, on_demand;
        NonNullableFutureNeverType = "non_nullable_future_never_type": Type, lazy_async, on_demand;
        NullableFutureNullType = "nullable_future_null_type": Type, lazy_async, on_demand;
        LookupPortHandler = "lookup_port_handler": Function, lazy_isolate, on_demand;
        LookupOpenPorts = "lookup_open_ports": Function, lazy_isolate, on_demand;
        HandleMessageFunction = "handle_message_function": Function, lazy_isolate, on_demand;

        // Built-in classes.
        ObjectClass = "object_class": Class, ro, boot;
        NullClass = "null_class": Class, ro, boot;
        NeverClass = "never_class": Class, ro, boot;
        ClosureClass = "closure_class": Class, ro, boot;
        IntegerImplementationClass = "integer_implementation_class": Class, ro, boot;
        SmiClass = "smi_class": Class, ro, boot;
        MintClass = "mint_class": Class, ro, boot;
        DoubleClass = "double_class": Class, ro, boot;
        CompiletimeErrorClass = "compiletime_error_class": Class, ro, boot;
        PragmaClass = "pragma_class": Class, ro, boot;
        PragmaName = "pragma_name": Field, ro, boot;
        PragmaOptions = "pragma_options": Field, ro, boot;
        OneByteStringClass = "one_byte_string_class": Class, ro, boot;
        TwoByteStringClass = "two_byte_string_class": Class, ro, boot;
        ExternalOneByteStringClass = "external_one_byte_string_class": Class, ro, boot;
        ExternalTwoByteStringClass = "external_two_byte_string_class": Class, ro, boot;
        BoolClass = "bool_class": Class, ro, boot;
        ArrayClass = "array_class": Class, ro, boot;
        ImmutableArrayClass = "immutable_array_class": Class, ro, boot;
        GrowableObjectArrayClass = "growable_object_array_class": Class, ro, boot;
        ErrorClass = "error_class": Class, ro, boot;
        WeakPropertyClass = "weak_property_class": Class, ro, boot;
        StackTraceClass = "stack_trace_class": Class, ro, boot;
        SymbolClass = "symbol_class": Class, ro, lib(Internal);
        LinkedHashMapClass = "linked_hash_map_class": Class, ro, lib(Collection);
        LinkedHashSetClass = "linked_hash_set_class": Class, ro, lib(Collection);
        Float32x4Class = "float32x4_class": Class, ro, lib(TypedData);
        Int32x4Class = "int32x4_class": Class, ro, lib(TypedData);
        Float64x2Class = "float64x2_class": Class, ro, lib(TypedData);
        FutureClass = "future_class": Class, ro, lib(Async);
        CompleterClass = "completer_class": Class, ro, lib(Async);

        // Built-in types.
        ObjectType = "object_type": Type, rw, boot;
        NullableObjectType = "nullable_object_type": Type, rw, boot;
        NonNullableObjectType = "non_nullable_object_type": Type, rw, boot;
        NullType = "null_type": Type, rw, boot;
        NeverType = "never_type": Type, rw, boot;
        DynamicType = "dynamic_type": Type, rw, boot;
        FunctionType = "function_type": Type, rw, boot;
        NonNullableFunctionType = "non_nullable_function_type": Type, rw, boot;
        TypeType = "type_type": Type, rw, boot;
        NumberType = "number_type": Type, rw, boot;
        NonNullableNumberType = "non_nullable_number_type": Type, rw, boot;
        IntType = "int_type": Type, rw, boot;
        NonNullableIntType = "non_nullable_int_type": Type, rw, boot;
        NullableIntType = "nullable_int_type": Type, rw, boot;
        Int64Type = "int64_type": Type, rw, boot;
        SmiType = "smi_type": Type, rw, boot;
        MintType = "mint_type": Type, rw, boot;
        DoubleType = "double_type": Type, rw, boot;
        NonNullableDoubleType = "non_nullable_double_type": Type, rw, boot;
        NullableDoubleType = "nullable_double_type": Type, rw, boot;
        StringType = "string_type": Type, rw, boot;
        NonNullableStringType = "non_nullable_string_type": Type, rw, boot;
        BoolType = "bool_type": Type, rw, boot;
        ArrayType = "array_type": Type, rw, boot;
        Float32x4Type = "float32x4_type": Type, rw, lib(TypedData);
        Int32x4Type = "int32x4_type": Type, rw, lib(TypedData);
        Float64x2Type = "float64x2_type": Type, rw, lib(TypedData);

        // Canonical type-argument vectors.
        TypeArgumentInt = "type_argument_int": TypeArguments, rw, boot;
        TypeArgumentNonNullableInt = "type_argument_non_nullable_int": TypeArguments, rw, boot;
        TypeArgumentDouble = "type_argument_double": TypeArguments, rw, boot;
        TypeArgumentString = "type_argument_string": TypeArguments, rw, boot;
        TypeArgumentStringDynamic = "type_argument_string_dynamic": TypeArguments, rw, boot;
        TypeArgumentStringString = "type_argument_string_string": TypeArguments, rw, boot;

        // Canonicalization tables.
        SymbolTable = "symbol_table": Array, rw, boot;
        CanonicalTypes = "canonical_types": Array, rw, boot;
        CanonicalFunctionTypes = "canonical_function_types": Array, rw, boot;
        CanonicalTypeParameters = "canonical_type_parameters": Array, rw, boot;
        CanonicalTypeArguments = "canonical_type_arguments": Array, rw, boot;

        // Bootstrap libraries, in `LibraryId` order.
        CoreLibrary = "core_library": Library, rw, boot;
        AsyncLibrary = "async_library": Library, rw, lib(Async);
        CollectionLibrary = "collection_library": Library, rw, lib(Collection);
        ConvertLibrary = "convert_library": Library, rw, lib(Convert);
        DeveloperLibrary = "developer_library": Library, rw, lib(Developer);
        FfiLibrary = "ffi_library": Library, rw, lib(Ffi);
        InternalLibrary = "internal_library": Library, rw, lib(Internal);
        IsolateLibrary = "isolate_library": Library, rw, lib(Isolate);
        MathLibrary = "math_library": Library, rw, lib(Math);
        MirrorsLibrary = "mirrors_library": Library, rw, lib(Mirrors);
        TypedDataLibrary = "typed_data_library": Library, rw, lib(TypedData);
        VmServiceLibrary = "vmservice_library": Library, rw, lib(VmService);

        Libraries = "libraries": GrowableObjectArray, rw, boot;
        LibrariesMap = "libraries_map": Array, rw, runtime;
        LoadingUnits = "loading_units": Array, rw, runtime;
        RootLibrary = "root_library": Library, rw, runtime;
        ClosureFunctions = "closure_functions": GrowableObjectArray, rw, boot;
        PendingClasses = "pending_classes": GrowableObjectArray, rw, boot;

        // Core and async entry points.
        GrowableListFactory = "growable_list_factory": Function, rw, boot;
        SimpleInstanceOfFunction = "simple_instance_of_function": Function, rw, boot;
        SimpleInstanceOfTrueFunction = "simple_instance_of_true_function": Function, rw, boot;
        SimpleInstanceOfFalseFunction = "simple_instance_of_false_function": Function, rw, boot;
        AsyncStarMoveNextHelper = "async_star_move_next_helper": Function, rw, lib(Async);
        CompleteOnAsyncReturn = "complete_on_async_return": Function, rw, lib(Async);
        CompleteOnAsyncError = "complete_on_async_error": Function, rw, lib(Async);
        AsyncStarStreamController = "async_star_stream_controller": Class, rw, lib(Async);

        // Preallocated errors.
        StackOverflow = "stack_overflow": Instance, rw, boot;
        OutOfMemory = "out_of_memory": Instance, rw, boot;

        FutureTimeoutFutureIndex = "future_timeout_future_index": Smi, atomic, runtime;
        FutureWaitFutureIndex = "future_wait_future_index": Smi, atomic, runtime;
        CanonicalizedStackMapEntries = "canonicalized_stack_map_entries": CompressedStackMaps, rw, runtime;
        GlobalObjectPool = "global_object_pool": ObjectPool, acq_rel, boot;

        // Generated code.
        UniqueDynamicTargets = "unique_dynamic_targets": Array, rw, runtime;
        MegamorphicCacheTable = "megamorphic_cache_table": GrowableObjectArray, acq_rel, boot;
        BuildGenericMethodExtractorCode = "build_generic_method_extractor_code": Code, rw, boot;
        BuildNonGenericMethodExtractorCode = "build_nongeneric_method_extractor_code": Code, rw, boot;
        AllocateMintStub = "allocate_mint_stub": Code, rw, boot;
        AllocateDoubleStub = "allocate_double_stub": Code, rw, boot;
        AllocateFloat32x4Stub = "allocate_float32x4_stub": Code, rw, boot;
        AllocateFloat64x2Stub = "allocate_float64x2_stub": Code, rw, boot;
        AllocateInt32x4Stub = "allocate_int32x4_stub": Code, rw, boot;
        AllocateArrayStub = "allocate_array_stub": Code, rw, boot;
        AllocateGrowableArrayStub = "allocate_growable_array_stub": Code, rw, boot;
        AllocateContextStub = "allocate_context_stub": Code, rw, boot;
        AllocateObjectStub = "allocate_object_stub": Code, rw, boot;
        AllocateObjectParameterizedStub = "allocate_object_parametrized_stub": Code, rw, boot;
        AllocateObjectSlowStub = "allocate_object_slow_stub": Code, rw, boot;
        AllocateClosureStub = "allocate_closure_stub": Code, rw, boot;
        AllocateUnhandledExceptionStub = "allocate_unhandled_exception_stub": Code, rw, boot;
        CloneContextStub = "clone_context_stub": Code, rw, boot;
        WriteBarrierStub = "write_barrier_stub": Code, rw, boot;
        ArrayWriteBarrierStub = "array_write_barrier_stub": Code, rw, boot;
        ThrowStub = "throw_stub": Code, rw, boot;
        ReThrowStub = "re_throw_stub": Code, rw, boot;
        AssertBooleanStub = "assert_boolean_stub": Code, rw, boot;
        AssertSubtypeStub = "assert_subtype_stub": Code, rw, boot;
        AssertAssignableStub = "assert_assignable_stub": Code, rw, boot;
        InstanceOfStub = "instance_of_stub": Code, rw, boot;
        InitStaticFieldStub = "init_static_field_stub": Code, rw, boot;
        InitLateStaticFieldStub = "init_late_static_field_stub": Code, rw, boot;
        InitInstanceFieldStub = "init_instance_field_stub": Code, rw, boot;
        InitLateInstanceFieldStub = "init_late_instance_field_stub": Code, rw, boot;
        CallClosureNoSuchMethodStub = "call_closure_no_such_method_stub": Code, rw, boot;
        StackOverflowStubWithFpuRegsStub = "stack_overflow_stub_with_fpu_regs_stub": Code, rw, boot;
        StackOverflowStubWithoutFpuRegsStub = "stack_overflow_stub_without_fpu_regs_stub": Code, rw, boot;
        NullErrorStubWithFpuRegsStub = "null_error_stub_with_fpu_regs_stub": Code, rw, boot;
        NullErrorStubWithoutFpuRegsStub = "null_error_stub_without_fpu_regs_stub": Code, rw, boot;
        RangeErrorStubWithFpuRegsStub = "range_error_stub_with_fpu_regs_stub": Code, rw, boot;
        RangeErrorStubWithoutFpuRegsStub = "range_error_stub_without_fpu_regs_stub": Code, rw, boot;
        DispatchTableNullErrorStub = "dispatch_table_null_error_stub": Code, rw, boot;
        InstantiateTypeStub = "instantiate_type_stub": Code, rw, boot;
        InstantiateTypeArgumentsStub = "instantiate_type_arguments_stub": Code, rw, boot;
        TopTypeTtsStub = "top_type_tts_stub": Code, rw, boot;
        NullableTypeParameterTtsStub = "nullable_type_parameter_tts_stub": Code, rw, boot;
        TypeParameterTtsStub = "type_parameter_tts_stub": Code, rw, boot;
        UnreachableTtsStub = "unreachable_tts_stub": Code, rw, boot;
        SlowTtsStub = "slow_tts_stub": Code, rw, boot;

        // Runtime owned.
        DispatchTableCodeEntries = "dispatch_table_code_entries": Array, acq_rel, runtime;
        InstructionsTables = "instructions_tables": GrowableObjectArray, rw, runtime;
        ObfuscationMap = "obfuscation_map": Array, rw, runtime;
        FfiCallbackFunctions = "ffi_callback_functions": GrowableObjectArray, rw, runtime;
        FfiPointerClass = "ffi_pointer_class": Class, rw, lib(Ffi);
        FfiNativeTypeClass = "ffi_native_type_class": Class, rw, lib(Ffi);
        FfiAsFunctionInternal = "ffi_as_function_internal": Function, rw, lib(Ffi);
    }
}

/// Last slot persisted by images that regenerate code on load.
pub const LAST_FULL_SNAPSHOT_FIELD: Field = Field::GlobalObjectPool;
/// Last slot persisted by images that carry code.
pub const LAST_CODE_SNAPSHOT_FIELD: Field = Field::SlowTtsStub;

const _: () = assert!((Field::SlowTtsStub as usize) > (Field::GlobalObjectPool as usize));
const _: () = assert!((Field::HandleMessageFunction as usize) < (Field::ObjectClass as usize));
const _: () = assert!(
    (Field::VmServiceLibrary as usize) - (Field::CoreLibrary as usize) + 1 == LibraryId::COUNT
);

// Bootstrap phases.
const PHASE_KNOWN_OBJECTS: u8 = 1 << 0;
const PHASE_STUBS: u8 = 1 << 1;
const PHASE_PREALLOCATED: u8 = 1 << 2;

/// Root table shared by every isolate of a group.
pub struct ObjectStore {
    slots: SlotBlock,
    heap: Arc<Heap>,
    registry: BootstrapRegistry,
    lazy: LazyInit,
    phases: AtomicU8,
    sealed: AtomicBool,
}

impl ObjectStore {
    /// Create a store of null slots allocating into `heap`.
    pub fn new(heap: Arc<Heap>) -> Self {
        Self {
            slots: SlotBlock::new(Field::COUNT),
            heap,
            registry: BootstrapRegistry::new(),
            lazy: LazyInit::new(),
            phases: AtomicU8::new(0),
            sealed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn heap(&self) -> &Arc<Heap> {
        &self.heap
    }

    #[inline]
    pub fn registry(&self) -> &BootstrapRegistry {
        &self.registry
    }

    // =========================================================================
    // Slot access
    // =========================================================================

    /// Current value of `field`.
    ///
    /// A null lazy slot first runs its group initializer (once per store,
    /// whichever thread gets there first).
    pub fn get(&self, field: Field) -> Result<ObjectRef, StoreError> {
        let access = field.access();
        let value = self.slots.load(field.index(), access.load_order());
        match access {
            Access::Lazy(group) if value.is_null() => {
                self.lazy.ensure(group, || crate::lazy_init::run(group, self))?;
                Ok(self.slots.load(field.index(), Ordering::Acquire))
            }
            _ => Ok(value),
        }
    }

    /// Raw read, never triggers lazy initialization.
    #[inline]
    pub fn peek(&self, field: Field) -> ObjectRef {
        self.slots.load(field.index(), field.access().load_order())
    }

    /// Write `field` with the ordering its schema declares.
    pub fn set(&self, field: Field, value: ObjectRef) {
        let access = field.access();
        debug_assert!(
            !access.is_lazy(),
            "`{}` is populated by its lazy initializer",
            field
        );
        if access == Access::ReadOnly {
            debug_assert!(
                !self.is_sealed(),
                "read-only slot `{}` written after the store was sealed",
                field
            );
            let prev = self.slots.load(field.index(), Ordering::Relaxed);
            debug_assert!(
                prev.is_null() || prev == value,
                "read-only slot `{}` written twice",
                field
            );
        }
        self.slots.store(field.index(), value, access.store_order());
    }

    /// Atomic read with an explicit ordering.
    pub fn load_with(&self, field: Field, order: Ordering) -> ObjectRef {
        debug_assert!(field.access().is_atomic(), "`{}` is not an atomic slot", field);
        self.slots.load(field.index(), order)
    }

    /// Atomic write with an explicit ordering.
    pub fn store_with(&self, field: Field, value: ObjectRef, order: Ordering) {
        debug_assert!(field.access().is_atomic(), "`{}` is not an atomic slot", field);
        self.slots.store(field.index(), value, order);
    }

    /// Publish the values computed by a lazy group initializer.
    pub(crate) fn publish_lazy(&self, group: LazyGroup, values: &[(Field, ObjectRef)]) {
        for &(field, value) in values {
            debug_assert_eq!(field.access(), Access::Lazy(group), "`{}` is not in lazy group {}", field, group);
            debug_assert!(!value.is_null(), "lazy slot `{}` published as null", field);
            self.slots.store(field.index(), value, Ordering::Release);
        }
    }

    /// Forbid further writes to read-only slots.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
        tracing::debug!("object store sealed");
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// How many times the initializer of `group` has run.
    pub fn lazy_init_runs(&self, group: LazyGroup) -> usize {
        self.lazy.runs(group)
    }

    /// Slots that must hold a value given the loaded libraries but are null.
    pub fn missing_required(&self) -> Vec<Field> {
        let loaded = self.registry.loaded();
        Field::iter()
            .filter(|f| f.populate().required(&loaded) && self.peek(*f).is_null())
            .collect()
    }

    // =========================================================================
    // Bootstrap libraries
    // =========================================================================

    /// Library registered under `id`, null if it was not loaded.
    pub fn bootstrap_library(&self, id: LibraryId) -> ObjectRef {
        self.peek(BootstrapRegistry::field(id))
    }

    /// Library registered under a raw id.
    pub fn bootstrap_library_raw(&self, raw: u8) -> Result<ObjectRef, StoreError> {
        let id = LibraryId::from_raw(raw)?;
        Ok(self.bootstrap_library(id))
    }

    /// Register the library for `id`. Libraries must be registered in
    /// dependency order.
    pub fn set_bootstrap_library(&self, id: LibraryId, library: ObjectRef) {
        self.registry.record(id);
        self.set(BootstrapRegistry::field(id), library);
    }

    /// Resolve `Class` or `Class.member` inside a loaded bootstrap library.
    pub fn lookup(&self, library: LibraryId, path: &str) -> Result<ObjectRef, StoreError> {
        let mut current = self.bootstrap_library(library);
        if current.is_null() {
            return Err(StoreError::LibraryNotLoaded(library));
        }
        for part in path.split('.') {
            current = self
                .heap
                .lookup_member(current, part)
                .ok_or_else(|| StoreError::MissingMember {
                    library,
                    member: path.to_string(),
                })?;
        }
        Ok(current)
    }

    /// Canonical type of `class` applied to `args`.
    pub fn canonical_type(
        &self,
        class: ObjectRef,
        args: &[ObjectRef],
        nullability: Nullability,
    ) -> Result<ObjectRef, StoreError> {
        let table = self.require(Field::CanonicalTypes)?;
        let name = if class.is_null() {
            "dynamic".to_string()
        } else {
            self.heap.name(class).unwrap_or_default()
        };
        let mut fields = Vec::with_capacity(args.len() + 1);
        fields.push(class);
        fields.extend_from_slice(args);
        let candidate = HeapObject::new(ObjectKind::Type, name)
            .with_fields(fields)
            .with_nullability(nullability);
        Ok(self.heap.canonicalize(table, candidate)?)
    }

    /// Canonical type-argument vector.
    pub fn canonical_type_arguments(&self, types: &[ObjectRef]) -> Result<ObjectRef, StoreError> {
        let table = self.require(Field::CanonicalTypeArguments)?;
        let candidate = HeapObject::new(ObjectKind::TypeArguments, "").with_fields(types.to_vec());
        Ok(self.heap.canonicalize(table, candidate)?)
    }

    /// Value of a slot that bootstrap must already have filled.
    pub(crate) fn require(&self, field: Field) -> Result<ObjectRef, StoreError> {
        let value = self.peek(field);
        if value.is_null() {
            return Err(StoreError::Uninitialized(field.name()));
        }
        Ok(value)
    }

    // =========================================================================
    // Bootstrap sequence
    // =========================================================================

    /// Populate the built-in classes, types, type-argument vectors and
    /// canonical tables. Runs once; later calls are no-ops.
    pub fn init_known_objects(&self) -> Result<(), StoreError> {
        self.run_phase(PHASE_KNOWN_OBJECTS, "known objects", || {
            crate::known_objects::init(self)
        })
    }

    /// Generate one code object per stub slot. Runs once; later calls are
    /// no-ops.
    pub fn init_stubs(&self) -> Result<(), StoreError> {
        self.run_phase(PHASE_STUBS, "stubs", || crate::stubs::init(self))
    }

    /// Build the preallocated stack-overflow and out-of-memory errors.
    ///
    /// Failing to build the out-of-memory singleton is fatal; any other
    /// allocation failure is returned as `StoreError::OutOfMemory`.
    pub fn preallocate_objects(&self) -> Result<(), StoreError> {
        debug_assert!(
            self.phase_done(PHASE_KNOWN_OBJECTS),
            "preallocate_objects before init_known_objects"
        );
        self.run_phase(PHASE_PREALLOCATED, "preallocated objects", || {
            let oom_class = self.lookup(LibraryId::Core, "OutOfMemoryError")?;
            let oom = self
                .heap
                .allocate(HeapObject::new(ObjectKind::Instance, "OutOfMemoryError").with_fields(vec![oom_class]))
                .map_err(|err| {
                    tracing::error!(%err, "out-of-memory singleton");
                    StoreError::OutOfMemorySingleton
                })?;
            self.set(Field::OutOfMemory, oom);

            let so_class = self.lookup(LibraryId::Core, "StackOverflowError")?;
            let so = self
                .heap
                .allocate(HeapObject::new(ObjectKind::Instance, "StackOverflowError").with_fields(vec![so_class]))
                .map_err(|_| StoreError::OutOfMemory { what: "stack overflow error" })?;
            self.set(Field::StackOverflow, so);
            Ok(())
        })
    }

    fn phase_done(&self, phase: u8) -> bool {
        self.phases.load(Ordering::Acquire) & phase != 0
    }

    fn run_phase(
        &self,
        phase: u8,
        what: &'static str,
        f: impl FnOnce() -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if self.phase_done(phase) {
            tracing::debug!(what, "already initialized");
            return Ok(());
        }
        f()?;
        self.phases.fetch_or(phase, Ordering::AcqRel);
        tracing::debug!(what, "initialized");
        Ok(())
    }

    // =========================================================================
    // Visitation and snapshots
    // =========================================================================

    /// Visit every slot in layout order.
    pub fn visit_object_pointers(&self, scope: &SafepointScope<'_>, visitor: &mut dyn ObjectPointerVisitor) {
        self.visit_range(scope, Field::full_range(), visitor);
    }

    /// Visit the slots of `range` in layout order.
    pub fn visit_range(
        &self,
        _scope: &SafepointScope<'_>,
        range: SlotRange,
        visitor: &mut dyn ObjectPointerVisitor,
    ) {
        self.slots.visit(range, visitor);
    }

    /// Slots persisted by an image of `kind`.
    pub fn snapshot_range(kind: SnapshotKind) -> Result<SlotRange, StoreError> {
        let first = Field::ALL[0];
        match kind {
            SnapshotKind::Full | SnapshotKind::FullCore => Ok(Field::range(first, LAST_FULL_SNAPSHOT_FIELD)),
            SnapshotKind::FullJit | SnapshotKind::FullAot => Ok(Field::range(first, LAST_CODE_SNAPSHOT_FIELD)),
            SnapshotKind::Message | SnapshotKind::None | SnapshotKind::Invalid => {
                Err(StoreError::NoSnapshotPartition(kind))
            }
        }
    }

    /// Slots holding generated stub code.
    pub fn stub_range() -> SlotRange {
        Field::range(Field::BuildGenericMethodExtractorCode, LAST_CODE_SNAPSHOT_FIELD)
    }

    /// Slots filled by lazy initializers.
    pub fn lazy_range() -> SlotRange {
        Field::range(Field::ListClass, Field::HandleMessageFunction)
    }

    /// Backing slots, for replaying an image into a fresh store.
    pub(crate) fn slots(&self) -> &SlotBlock {
        &self.slots
    }

    /// Number of non-null slots.
    pub fn populated(&self) -> usize {
        self.slots.populated(self.slots.full_range())
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("slots", &self.slots)
            .field("libraries", &self.registry.loaded())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
