//! Generated stubs.
//!
//! Every slot between the method-extractor builders and `slow_tts_stub`
//! holds the code object of one stub generator. Images that do not persist
//! code leave these slots out and regenerate them on load.

use iso_common_core::ObjectKind;

use crate::error::StoreError;
use crate::object_store::{Field, ObjectStore};

/// Stub slot and the generator that produces its code.
pub static STUBS: &[(Field, &str)] = &[
    (Field::BuildGenericMethodExtractorCode, "BuildGenericMethodExtractor"),
    (Field::BuildNonGenericMethodExtractorCode, "BuildNonGenericMethodExtractor"),
    (Field::AllocateMintStub, "AllocateMint"),
    (Field::AllocateDoubleStub, "AllocateDouble"),
    (Field::AllocateFloat32x4Stub, "AllocateFloat32x4"),
    (Field::AllocateFloat64x2Stub, "AllocateFloat64x2"),
    (Field::AllocateInt32x4Stub, "AllocateInt32x4"),
    (Field::AllocateArrayStub, "AllocateArray"),
    (Field::AllocateGrowableArrayStub, "AllocateGrowableArray"),
    (Field::AllocateContextStub, "AllocateContext"),
    (Field::AllocateObjectStub, "AllocateObject"),
    (Field::AllocateObjectParameterizedStub, "AllocateObjectParameterized"),
    (Field::AllocateObjectSlowStub, "AllocateObjectSlow"),
    (Field::AllocateClosureStub, "AllocateClosure"),
    (Field::AllocateUnhandledExceptionStub, "AllocateUnhandledException"),
    (Field::CloneContextStub, "CloneContext"),
    (Field::WriteBarrierStub, "WriteBarrier"),
    (Field::ArrayWriteBarrierStub, "ArrayWriteBarrier"),
    (Field::ThrowStub, "Throw"),
    (Field::ReThrowStub, "ReThrow"),
    (Field::AssertBooleanStub, "AssertBoolean"),
    (Field::AssertSubtypeStub, "AssertSubtype"),
    (Field::AssertAssignableStub, "AssertAssignable"),
    (Field::InstanceOfStub, "InstanceOf"),
    (Field::InitStaticFieldStub, "InitStaticField"),
    (Field::InitLateStaticFieldStub, "InitLateStaticField"),
    (Field::InitInstanceFieldStub, "InitInstanceField"),
    (Field::InitLateInstanceFieldStub, "InitLateInstanceField"),
    (Field::CallClosureNoSuchMethodStub, "CallClosureNoSuchMethod"),
    (Field::StackOverflowStubWithFpuRegsStub, "StackOverflowSharedWithFPURegs"),
    (Field::StackOverflowStubWithoutFpuRegsStub, "StackOverflowSharedWithoutFPURegs"),
    (Field::NullErrorStubWithFpuRegsStub, "NullErrorSharedWithFPURegs"),
    (Field::NullErrorStubWithoutFpuRegsStub, "NullErrorSharedWithoutFPURegs"),
    (Field::RangeErrorStubWithFpuRegsStub, "RangeErrorSharedWithFPURegs"),
    (Field::RangeErrorStubWithoutFpuRegsStub, "RangeErrorSharedWithoutFPURegs"),
    (Field::DispatchTableNullErrorStub, "DispatchTableNullError"),
    (Field::InstantiateTypeStub, "InstantiateType"),
    (Field::InstantiateTypeArgumentsStub, "InstantiateTypeArguments"),
    (Field::TopTypeTtsStub, "TopTypeTypeTest"),
    (Field::NullableTypeParameterTtsStub, "NullableTypeParameterTypeTest"),
    (Field::TypeParameterTtsStub, "TypeParameterTypeTest"),
    (Field::UnreachableTtsStub, "UnreachableTypeTest"),
    (Field::SlowTtsStub, "SlowTypeTest"),
];

/// Generator name of the stub held by `field`.
pub fn stub_name(field: Field) -> Option<&'static str> {
    STUBS.iter().find(|(f, _)| *f == field).map(|(_, name)| *name)
}

pub(crate) fn init(store: &ObjectStore) -> Result<(), StoreError> {
    let heap = store.heap();
    for &(field, name) in STUBS {
        if !store.peek(field).is_null() {
            continue;
        }
        let code = heap.alloc_named(ObjectKind::Code, name)?;
        store.set(field, code);
    }
    if store.peek(Field::MegamorphicCacheTable).is_null() {
        let table = heap.alloc_array(ObjectKind::GrowableObjectArray, "megamorphic_cache_table", Vec::new())?;
        store.set(Field::MegamorphicCacheTable, table);
    }
    tracing::debug!(count = STUBS.len(), "stubs generated");
    Ok(())
}
