//! Versioned schemas and forward migration
//!
//! Settings outlive application upgrades. Each settings shape carries a
//! monotonic version number, and stored data is migrated forward one version
//! at a time through an ordered chain of upgrade steps, then validated at the
//! current version. Every field has a context-independent default, so upgrade
//! steps may emit partial objects and the validator fills in the rest.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

use crate::error::SchemaError;

/// Key under which the schema version is tagged inline in persisted blobs.
pub const VERSION_KEY: &str = "schemaVersion";

/// One forward migration step.
///
/// `up` validates its input at version `version - 1` and projects it into a
/// shape for `version`. The projection may be partial.
pub struct MigrationStep {
    pub version: u32,
    pub up: fn(Value) -> Result<Value, SchemaError>,
}

/// A versioned schema: the current shape `T` plus the ordered chain of
/// migration steps leading up to it from version 0.
pub struct SchemaDefinition<T> {
    version: u32,
    steps: Vec<MigrationStep>,
    _shape: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> SchemaDefinition<T> {
    /// Build a definition, verifying that the steps cover `1..=version` with
    /// no gaps. A gap means the chain itself is broken, which is fatal: it is
    /// a programming error, not bad runtime data.
    pub fn new(version: u32, steps: Vec<MigrationStep>) -> Result<Self, SchemaError> {
        for (index, step) in steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.version != expected {
                return Err(SchemaError::BrokenChain(expected));
            }
        }

        if steps.len() as u32 != version {
            return Err(SchemaError::BrokenChain(steps.len() as u32 + 1));
        }

        Ok(Self {
            version,
            steps,
            _shape: PhantomData,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Validate `data` at the current version, filling field defaults.
    pub fn parse(&self, data: Value) -> Result<T, SchemaError> {
        serde_json::from_value(data).map_err(|source| SchemaError::Validation {
            version: self.version,
            source,
        })
    }

    /// Migrate `data` recorded at `data_version` forward through every later
    /// step, then validate the result at the current version.
    ///
    /// Versions at or below 0 are accepted by the first step, whose input
    /// shape fills defaults for anything missing. Data from the future is
    /// rejected outright.
    pub fn migrate(&self, data: Value, data_version: u32) -> Result<T, SchemaError> {
        if data_version > self.version {
            return Err(SchemaError::FutureVersion {
                data: data_version,
                current: self.version,
            });
        }

        let mut value = data;
        for step in &self.steps {
            if step.version <= data_version {
                continue;
            }
            value = (step.up)(value)?;
        }

        self.parse(value)
    }
}

/// Validate a value into the typed shape of `version`, filling field
/// defaults. Used inside migration steps so `up` functions always see a
/// complete previous shape.
pub fn validate<S: DeserializeOwned>(version: u32, value: Value) -> Result<S, SchemaError> {
    serde_json::from_value(value).map_err(|source| SchemaError::Validation { version, source })
}

/// Serialize a typed shape back into a JSON value at `version`.
pub fn project<S: Serialize>(version: u32, shape: &S) -> Result<Value, SchemaError> {
    serde_json::to_value(shape).map_err(|source| SchemaError::Validation { version, source })
}

/// Deep merge: objects merge key by key recursively; arrays and scalars from
/// `source` replace `target` wholesale.
pub fn merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target), Value::Object(source)) => {
            for (key, incoming) in source {
                let merged = match target.remove(&key) {
                    Some(existing) => merge(existing, incoming),
                    None => incoming,
                };
                target.insert(key, merged);
            }
            Value::Object(target)
        }
        (_, source) => source,
    }
}

/// Read the inline schema version of a persisted blob. Blobs written before
/// versioning carry no tag and are treated as version 0.
pub fn version_of(value: &Value) -> u32 {
    value
        .get(VERSION_KEY)
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32
}

/// Tag a serialized blob with its schema version before persisting.
pub fn tag_version(mut value: Value, version: u32) -> Value {
    if let Value::Object(ref mut map) = value {
        map.insert(VERSION_KEY.to_string(), version.into());
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct PersonV0 {
        full_name: String,
        year_of_birth: i64,
    }

    impl Default for PersonV0 {
        fn default() -> Self {
            Self {
                full_name: "Unknown".to_string(),
                year_of_birth: 1900,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct PersonV1 {
        first_name: String,
        last_name: String,
        year_of_birth: i64,
    }

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct PersonV2 {
        names: Vec<String>,
        year_of_birth: i64,
    }

    fn split_name(value: Value) -> Result<Value, SchemaError> {
        let from: PersonV0 = validate(0, value)?;
        let mut parts = from.full_name.splitn(2, ' ');
        Ok(json!({
            "first_name": parts.next().unwrap_or_default(),
            "last_name": parts.next().unwrap_or_default(),
            "year_of_birth": from.year_of_birth,
        }))
    }

    fn collect_names(value: Value) -> Result<Value, SchemaError> {
        let from: PersonV1 = validate(1, value)?;
        Ok(json!({
            "names": [from.first_name, from.last_name],
            // year_of_birth intentionally omitted: partial projections are
            // filled from field defaults by the validator
        }))
    }

    fn definition() -> SchemaDefinition<PersonV2> {
        SchemaDefinition::new(
            2,
            vec![
                MigrationStep {
                    version: 1,
                    up: split_name,
                },
                MigrationStep {
                    version: 2,
                    up: collect_names,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_same_version_parses_directly() {
        let definition = definition();
        let data = json!({ "names": ["John", "Doe"], "year_of_birth": 1990 });

        let result = definition.migrate(data, 2).unwrap();

        assert_eq!(
            result,
            PersonV2 {
                names: vec!["John".to_string(), "Doe".to_string()],
                year_of_birth: 1990,
            }
        );
    }

    #[test]
    fn test_migrates_through_every_later_step() {
        let definition = definition();
        let data = json!({ "full_name": "John Doe", "year_of_birth": 1990 });

        let result = definition.migrate(data, 0).unwrap();

        assert_eq!(result.names, vec!["John", "Doe"]);
        // collect_names dropped the field; the default fills it
        assert_eq!(result.year_of_birth, 0);
    }

    #[test]
    fn test_migration_is_idempotent_on_current_data() {
        let definition = definition();
        let data = json!({ "full_name": "John Doe", "year_of_birth": 1990 });

        let once = definition.migrate(data, 0).unwrap();
        let again = definition
            .migrate(serde_json::to_value(&once).unwrap(), definition.version())
            .unwrap();

        assert_eq!(once, again);
    }

    #[test]
    fn test_version_zero_accepts_anything() {
        let definition = definition();

        let result = definition.migrate(json!({}), 0).unwrap();

        assert_eq!(result.names, vec!["Unknown", ""]);
    }

    #[test]
    fn test_future_version_is_rejected() {
        let definition = definition();

        let err = definition.migrate(json!({}), 3).unwrap_err();

        assert!(matches!(
            err,
            SchemaError::FutureVersion { data: 3, current: 2 }
        ));
    }

    #[test]
    fn test_gap_in_chain_is_fatal() {
        let result: Result<SchemaDefinition<PersonV2>, _> = SchemaDefinition::new(
            2,
            vec![MigrationStep {
                version: 2,
                up: collect_names,
            }],
        );

        assert!(matches!(result, Err(SchemaError::BrokenChain(1))));
    }

    #[test]
    fn test_missing_final_step_is_fatal() {
        let result: Result<SchemaDefinition<PersonV2>, _> = SchemaDefinition::new(
            2,
            vec![MigrationStep {
                version: 1,
                up: split_name,
            }],
        );

        assert!(matches!(result, Err(SchemaError::BrokenChain(2))));
    }

    #[test]
    fn test_version_tagging_round_trip() {
        let tagged = tag_version(json!({ "a": 1 }), 4);

        assert_eq!(version_of(&tagged), 4);
        assert_eq!(tagged["a"], 1);
        assert_eq!(version_of(&json!({ "a": 1 })), 0);
    }

    #[test]
    fn test_merge_is_deep_for_objects() {
        let target = json!({ "a": { "x": 1, "y": 2 }, "b": true });
        let source = json!({ "a": { "y": 3 } });

        let merged = merge(target, source);

        assert_eq!(merged, json!({ "a": { "x": 1, "y": 3 }, "b": true }));
    }

    #[test]
    fn test_merge_replaces_arrays_wholesale() {
        let target = json!({ "hotkeys": ["a", "b"], "n": 1 });
        let source = json!({ "hotkeys": ["c"] });

        let merged = merge(target, source);

        assert_eq!(merged, json!({ "hotkeys": ["c"], "n": 1 }));
    }

    mod merge_properties {
        use super::*;
        use proptest::prelude::*;

        fn value_strategy() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::from),
                any::<i32>().prop_map(Value::from),
                "[a-z]{0,6}".prop_map(Value::from),
            ];

            leaf.prop_recursive(3, 24, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                    prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                        .prop_map(|map| Value::Object(map.into_iter().collect())),
                ]
            })
        }

        proptest! {
            #[test]
            fn merging_a_value_into_itself_is_identity(value in value_strategy()) {
                prop_assert_eq!(merge(value.clone(), value.clone()), value);
            }

            #[test]
            fn merge_is_right_biased_on_scalars(
                target in value_strategy(),
                source in any::<i32>().prop_map(Value::from),
            ) {
                prop_assert_eq!(merge(target, source.clone()), source);
            }

            #[test]
            fn applying_the_same_patch_twice_changes_nothing(
                target in value_strategy(),
                patch in value_strategy(),
            ) {
                let once = merge(target, patch.clone());
                prop_assert_eq!(merge(once.clone(), patch), once);
            }
        }
    }
}
