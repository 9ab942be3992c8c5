use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{StaticHasError, StaticHasResult};

// -----------------------------------------------------------------------------
// Feature table
// -----------------------------------------------------------------------------

/// Flags that should be statically replaced in the code.
///
/// Lookups are exact and case-sensitive: `Foo` and `foo` are different flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureTable(HashMap<String, bool>);

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, flag: &str) -> Option<bool> {
        self.0.get(flag).copied()
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.0.contains_key(flag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for FeatureTable {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<HashMap<String, bool>> for FeatureTable {
    fn from(map: HashMap<String, bool>) -> Self {
        Self(map)
    }
}

// -----------------------------------------------------------------------------
// Selectors & resolution
// -----------------------------------------------------------------------------

/// What a host can pass as `features`: a preset name, several preset names,
/// or an explicit table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FeatureSelector {
    Name(String),
    Names(Vec<String>),
    Table(FeatureTable),
}

/// Source of named feature sets ("presets").
pub trait FeatureResolver {
    /// Look up one preset. `is_running_in_node` tells the resolver which host
    /// loads it; resolvers that do not care may ignore it.
    fn feature_set(&self, name: &str, is_running_in_node: bool) -> Option<FeatureTable>;
}

/// In-memory preset registry, seeded with the built-in `ie11` and `node` sets.
#[derive(Debug, Clone)]
pub struct FeatureSets {
    sets: HashMap<String, FeatureTable>,
}

const BUILTIN_SETS: &[(&str, &str)] = &[
    ("ie11", include_str!("features/ie11.json")),
    ("node", include_str!("features/node.json")),
];

impl FeatureSets {
    pub fn empty() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut sets = Self::empty();
        for (name, json) in BUILTIN_SETS {
            match parse_feature_set(name, json) {
                Ok(table) => sets.insert(*name, table),
                Err(err) => warn!(error = %err, "skipping built-in feature set"),
            }
        }
        sets
    }

    pub fn insert(&mut self, name: impl Into<String>, table: FeatureTable) {
        self.sets.insert(name.into(), table);
    }

    /// Register a preset from its JSON document (`{"flag": true, ...}`).
    pub fn insert_json(&mut self, name: &str, json: &str) -> StaticHasResult<()> {
        let table = parse_feature_set(name, json)?;
        self.insert(name, table);
        Ok(())
    }
}

impl Default for FeatureSets {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FeatureResolver for FeatureSets {
    fn feature_set(&self, name: &str, _is_running_in_node: bool) -> Option<FeatureTable> {
        self.sets.get(name).cloned()
    }
}

fn parse_feature_set(name: &str, json: &str) -> StaticHasResult<FeatureTable> {
    serde_json::from_str(json).map_err(|e| StaticHasError::feature_set(name, e.to_string()))
}

/// Turn whatever the host passed as `features` into a flat table.
///
/// Several presets are merged by keeping only the flags every one of them
/// agrees on. A single unknown preset name empties the whole result.
pub fn resolve_features(
    selector: Option<&FeatureSelector>,
    resolver: &dyn FeatureResolver,
    is_running_in_node: bool,
) -> FeatureTable {
    let names: &[String] = match selector {
        None => return FeatureTable::new(),
        Some(FeatureSelector::Table(table)) => return table.clone(),
        Some(FeatureSelector::Name(name)) => std::slice::from_ref(name),
        Some(FeatureSelector::Names(names)) => names,
    };

    let mut tables = Vec::with_capacity(names.len());
    let mut unresolved = false;
    for name in names {
        match resolver.feature_set(name, is_running_in_node) {
            Some(table) => tables.push(table),
            None => {
                warn!("Cannot resolve feature set: {}", name);
                unresolved = true;
            }
        }
    }
    if unresolved {
        return FeatureTable::new();
    }

    let mut tables = tables.into_iter();
    let Some(FeatureTable(mut merged)) = tables.next() else {
        return FeatureTable::new();
    };
    for table in tables {
        merged.retain(|flag, value| table.get(flag) == Some(*value));
    }
    FeatureTable(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> FeatureSelector {
        FeatureSelector::Names(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn no_features() {
        let sets = FeatureSets::builtin();
        assert!(resolve_features(None, &sets, false).is_empty());
    }

    #[test]
    fn explicit_table_is_used_as_is() {
        let sets = FeatureSets::empty();
        let table: FeatureTable = [("foo", true), ("bar", false)].into_iter().collect();
        let resolved = resolve_features(Some(&FeatureSelector::Table(table.clone())), &sets, true);
        assert_eq!(resolved, table);
    }

    #[test]
    fn single_feature_set() {
        let sets = FeatureSets::builtin();
        let ie11 = resolve_features(Some(&FeatureSelector::Name("ie11".into())), &sets, false);
        assert_eq!(ie11.len(), 33);
        assert_eq!(ie11.get("arraybuffer"), Some(true));
        assert_eq!(ie11.get("es6-promise"), Some(false));
        assert_eq!(ie11.get("host-browser"), Some(true));
        assert_eq!(ie11.get("xhr2"), Some(true));
    }

    #[test]
    fn two_feature_sets_keep_agreeing_flags() {
        let sets = FeatureSets::builtin();
        let merged = resolve_features(Some(&names(&["ie11", "node"])), &sets, false);
        let expected: FeatureTable = [
            ("arraybuffer", true),
            ("blob", true),
            ("dom-mutationobserver", false),
            ("es2017-object", false),
            ("es2017-string", false),
            ("es-observable", false),
            ("fetch", false),
            ("float32array", true),
            ("formdata", false),
            ("microtasks", true),
            ("setimmediate", true),
        ]
        .into_iter()
        .collect();
        assert_eq!(merged, expected);
    }

    #[test]
    fn unknown_feature_set_empties_result() {
        let sets = FeatureSets::builtin();
        let resolved = resolve_features(Some(&names(&["ie11", "foo"])), &sets, false);
        assert!(resolved.is_empty());
    }

    #[test]
    fn custom_set_from_json() {
        let mut sets = FeatureSets::empty();
        sets.insert_json("static", r#"{"foo": true, "bar": false}"#).unwrap();
        let resolved = resolve_features(Some(&FeatureSelector::Name("static".into())), &sets, true);
        assert_eq!(resolved.get("foo"), Some(true));
        assert_eq!(resolved.get("bar"), Some(false));

        let err = sets.insert_json("broken", "[1, 2]").unwrap_err();
        assert!(matches!(err, StaticHasError::FeatureSet { ref name, .. } if name == "broken"));
    }

    #[test]
    fn selector_deserializes_every_shape() {
        let name: FeatureSelector = serde_json::from_str(r#""ie11""#).unwrap();
        assert_eq!(name, FeatureSelector::Name("ie11".into()));

        let list: FeatureSelector = serde_json::from_str(r#"["ie11", "node"]"#).unwrap();
        assert_eq!(list, names(&["ie11", "node"]));

        let table: FeatureSelector = serde_json::from_str(r#"{"foo": true}"#).unwrap();
        match table {
            FeatureSelector::Table(t) => assert_eq!(t.get("foo"), Some(true)),
            other => panic!("expected a table, got {other:?}"),
        }
    }

    #[test]
    fn lookups_are_case_sensitive() {
        let table: FeatureTable = [("foo", true)].into_iter().collect();
        assert!(table.contains("foo"));
        assert!(!table.contains("Foo"));
        assert_eq!(table.get("FOO"), None);
    }
}
