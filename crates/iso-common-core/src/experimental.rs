//! Experimental language features.
//!
//! NOTE: the tables below are generated from the feature manifest. Do not
//! edit them by hand; regenerate instead.

use num_enum::TryFromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ExperimentalFeature {
    NonfunctionTypeAliases = 0,
    NonNullable = 1,
    ExtensionMethods = 2,
    ConstantUpdate2018 = 3,
    ControlFlowCollections = 4,
    GenericMetadata = 5,
    SetLiterals = 6,
    SpreadCollections = 7,
    TripleShift = 8,
    ConstructorTearoffs = 9,
    EnhancedEnums = 10,
    NamedArgumentsAnywhere = 11,
    SuperParameters = 12,
    InferenceUpdate1 = 13,
    UnnamedLibraries = 14,
}

const FEATURE_COUNT: usize = 15;

const FEATURE_VALUES: [bool; FEATURE_COUNT] = [
    true, true, true, true, true, true, true, true,
    true, true, true, true, true, true, true,
];

const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "nonfunction-type-aliases",
    "non-nullable",
    "extension-methods",
    "constant-update-2018",
    "control-flow-collections",
    "generic-metadata",
    "set-literals",
    "spread-collections",
    "triple-shift",
    "constructor-tearoffs",
    "enhanced-enums",
    "named-arguments-anywhere",
    "super-parameters",
    "inference-update-1",
    "unnamed-libraries",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureError {
    #[error("experimental feature index {0} is out of range")]
    OutOfRange(usize),
    #[error("unknown experimental feature")]
    UnknownName,
}

impl ExperimentalFeature {
    pub const COUNT: usize = FEATURE_COUNT;

    /// Checked lookup by table index.
    pub fn from_index(index: usize) -> Result<Self, FeatureError> {
        u8::try_from(index)
            .ok()
            .and_then(|v| Self::try_from(v).ok())
            .ok_or(FeatureError::OutOfRange(index))
    }

    /// Lookup by display name.
    pub fn from_name(name: &str) -> Result<Self, FeatureError> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::from_index(i))
            .unwrap_or(Err(FeatureError::UnknownName))
    }

    pub fn iter() -> impl Iterator<Item = ExperimentalFeature> {
        (0..FEATURE_COUNT).filter_map(|i| Self::from_index(i).ok())
    }
}

/// Is the feature enabled when no override is given?
pub fn default_enabled(feature: ExperimentalFeature) -> bool {
    FEATURE_VALUES[feature as usize]
}

/// Display name of the feature, as accepted on the command line.
pub fn name(feature: ExperimentalFeature) -> &'static str {
    FEATURE_NAMES[feature as usize]
}
