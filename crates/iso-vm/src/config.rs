//! Isolate group configuration.

use serde::{Deserialize, Serialize};

use iso_common_core::experimental::{self, ExperimentalFeature};
use iso_common_core::LibraryId;

use crate::error::StoreError;

/// Settings of one isolate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupConfig {
    /// Heap capacity, in objects.
    pub heap_capacity: usize,
    /// Reject writes to read-only slots once bootstrap finished.
    pub seal_after_bootstrap: bool,
    /// Bootstrap libraries to load. Core is always required.
    pub libraries: Vec<LibraryId>,
    /// Experimental feature overrides: `name` enables, `no-name` disables.
    pub experiments: Vec<String>,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            heap_capacity: 1 << 20,
            seal_after_bootstrap: true,
            libraries: LibraryId::ALL.to_vec(),
            experiments: Vec::new(),
        }
    }
}

impl GroupConfig {
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        serde_json::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn with_libraries(mut self, libraries: &[LibraryId]) -> Self {
        self.libraries = libraries.to_vec();
        self
    }

    pub fn with_heap_capacity(mut self, capacity: usize) -> Self {
        self.heap_capacity = capacity;
        self
    }

    pub fn with_experiments<I, S>(mut self, experiments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.experiments.extend(experiments.into_iter().map(Into::into));
        self
    }

    /// Resolve the experiment overrides against the feature table.
    pub fn features(&self) -> Result<FeatureSet, StoreError> {
        FeatureSet::from_overrides(&self.experiments)
    }
}

/// Enabled state of every experimental feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSet {
    enabled: [bool; ExperimentalFeature::COUNT],
}

impl Default for FeatureSet {
    fn default() -> Self {
        let mut enabled = [false; ExperimentalFeature::COUNT];
        for feature in ExperimentalFeature::iter() {
            enabled[feature as usize] = experimental::default_enabled(feature);
        }
        Self { enabled }
    }
}

impl FeatureSet {
    pub fn from_overrides<S: AsRef<str>>(overrides: &[S]) -> Result<Self, StoreError> {
        let mut set = Self::default();
        for item in overrides {
            let item = item.as_ref();
            let (name, on) = match item.strip_prefix("no-") {
                Some(rest) => (rest, false),
                None => (item, true),
            };
            let feature = ExperimentalFeature::from_name(name)?;
            set.enabled[feature as usize] = on;
        }
        Ok(set)
    }

    pub fn is_enabled(&self, feature: ExperimentalFeature) -> bool {
        self.enabled[feature as usize]
    }

    /// Names of the enabled features, in table order.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        ExperimentalFeature::iter()
            .filter(|f| self.is_enabled(*f))
            .map(experimental::name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso_common_core::FeatureError;

    #[test]
    fn test_defaults() {
        let config = GroupConfig::default();
        assert!(config.seal_after_bootstrap);
        assert_eq!(config.libraries.len(), LibraryId::COUNT);
        let features = config.features().unwrap();
        assert_eq!(features.enabled_names().len(), ExperimentalFeature::COUNT);
    }

    #[test]
    fn test_from_json() {
        let config = GroupConfig::from_json(
            r#"{ "heap_capacity": 4096, "libraries": ["Core", "Async"], "experiments": ["no-triple-shift"] }"#,
        )
        .unwrap();
        assert_eq!(config.heap_capacity, 4096);
        assert_eq!(config.libraries, vec![LibraryId::Core, LibraryId::Async]);
        assert!(config.seal_after_bootstrap);
        assert!(!config.features().unwrap().is_enabled(ExperimentalFeature::TripleShift));

        assert!(matches!(
            GroupConfig::from_json(r#"{ "heap": 1 }"#),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_versioned_experiment_names() {
        let config = GroupConfig::default().with_experiments(["no-inference-update-1", "constant-update-2018"]);
        let features = config.features().unwrap();
        assert!(!features.is_enabled(ExperimentalFeature::InferenceUpdate1));
        assert!(features.is_enabled(ExperimentalFeature::ConstantUpdate2018));
        assert_eq!(features.enabled_names()[0], "nonfunction-type-aliases");
    }

    #[test]
    fn test_unknown_experiment() {
        let config = GroupConfig::default().with_experiments(["spread-collections", "warp-drive"]);
        assert_eq!(
            config.features(),
            Err(StoreError::Feature(FeatureError::UnknownName))
        );
    }
}
