//! Compile-time resolution of `has()` feature tests in JavaScript modules.
//!
//! Given a table of known features, a run
//!
//! - removes `'has("flag")'` / `'!has("flag")'` pragma statements and, when the
//!   pragma resolves to true, the `require('module');` right after them,
//! - replaces `<has>.default('flag')` calls with `true` or `false`,
//! - leaves calls on unknown flags alone and reports them as dynamic.
//!
//! Untouched code is copied through byte for byte.

mod binding;
mod config;
mod diagnostics;
mod emit;
mod error;
mod features;
mod parse;
mod pragma;
mod substitute;
mod walk;

use swc_core::common::GLOBALS;
use tracing::debug;

pub use config::{TransformOptions, DEFAULT_FILE_NAME};
pub use diagnostics::{Diagnostics, ElisionKind, ElisionRecord};
pub use error::{StaticHasError, StaticHasResult};
pub use features::{resolve_features, FeatureResolver, FeatureSelector, FeatureSets, FeatureTable};
pub use pragma::PragmaMatch;

use binding::resolve_has_binding;
use emit::{emit, Printed};
use parse::parse_source;
use pragma::{scan_pragmas, Elision};
use substitute::substitute_has_calls;
use walk::remove_items;

// -----------------------------------------------------------------------------
// Transform state
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    /// Present when a prior map was passed in.
    pub map: Option<String>,
}

/// A transform with its feature table resolved once, reusable across files.
#[derive(Debug, Clone)]
pub struct StaticHasTransform {
    features: FeatureTable,
    file_name: String,
    jsx: bool,
    inline_source_map: bool,
}

impl StaticHasTransform {
    pub fn new(features: FeatureTable) -> Self {
        Self {
            features,
            file_name: DEFAULT_FILE_NAME.to_string(),
            jsx: false,
            inline_source_map: false,
        }
    }

    pub fn from_options(options: &TransformOptions, resolver: &dyn FeatureResolver) -> Self {
        let features = resolve_features(
            options.features.as_ref(),
            resolver,
            options.is_running_in_node,
        );
        Self::new(features)
            .with_file_name(options.file_name())
            .with_jsx(options.jsx)
            .with_inline_source_map(options.inline_source_map)
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_jsx(mut self, jsx: bool) -> Self {
        self.jsx = jsx;
        self
    }

    pub fn with_inline_source_map(mut self, inline_source_map: bool) -> Self {
        self.inline_source_map = inline_source_map;
        self
    }

    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    /// Run both passes over `source`.
    ///
    /// `prior_map` is the source map of `source` from an earlier step; the
    /// returned map goes from the new code straight to that map's sources.
    /// Dynamic flags and elisions are added to `diagnostics`; the caller
    /// decides when to flush it.
    pub fn transform(
        &self,
        source: &str,
        prior_map: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> StaticHasResult<TransformOutput> {
        GLOBALS.set(&Default::default(), || {
            self.run(source, prior_map, diagnostics)
        })
    }

    fn run(
        &self,
        source: &str,
        prior_map: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> StaticHasResult<TransformOutput> {
        let mut parsed = parse_source(source, &self.file_name, self.jsx)?;

        // Pass 1: pragmas and the imports they guard
        let elisions = scan_pragmas(&parsed, &self.features);
        remove_items(&mut parsed.program, elisions.iter().map(|e| e.index));

        let Some(binding) = resolve_has_binding(&parsed.program) else {
            debug!(file = %self.file_name, "module does not import has, left as is");
            return Ok(TransformOutput {
                code: source.to_string(),
                map: prior_map.map(str::to_string),
            });
        };

        let mut edits = Vec::with_capacity(elisions.len());
        for Elision { record, edit, .. } in elisions {
            diagnostics.record_elision(record);
            edits.push(edit);
        }

        // Pass 2: call sites
        edits.extend(substitute_has_calls(
            &mut parsed,
            &binding,
            &self.features,
            diagnostics,
        ));

        let prior = prior_map
            .map(|map| sourcemap::SourceMap::from_slice(map.as_bytes()))
            .transpose()?;
        let Printed { code, map } = emit(&parsed, edits, prior.as_ref(), self.inline_source_map)?;
        Ok(TransformOutput { code, map })
    }
}

// -----------------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------------

/// One-shot transform against the built-in feature sets.
pub fn transform(
    source: &str,
    features: Option<&FeatureSelector>,
    is_running_in_node: bool,
    prior_map: Option<&str>,
    diagnostics: &mut Diagnostics,
) -> StaticHasResult<TransformOutput> {
    let features = resolve_features(features, &FeatureSets::builtin(), is_running_in_node);
    StaticHasTransform::new(features).transform(source, prior_map, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, bool)]) -> FeatureTable {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn passes_run_in_order() {
        let source = "'has(\"foo\")';\nrequire('polyfill');\nvar has = require('./has');\nif (has.default('foo')) {}\n";
        let mut diagnostics = Diagnostics::new();
        let out = StaticHasTransform::new(table(&[("foo", true)]))
            .transform(source, None, &mut diagnostics)
            .unwrap();
        assert_eq!(
            out.code,
            "// has('foo')\n// elided: import 'polyfill'\nvar has = require('./has');\nif (true) {}\n"
        );
        assert_eq!(diagnostics.elisions().len(), 2);
        assert!(out.map.is_none());
    }

    #[test]
    fn binding_inside_elided_import_does_not_count() {
        // the only `*/has` require is guarded by a truthy pragma
        let source = "'has(\"foo\")';\nrequire('./has');\nhas.default('foo');\n";
        let mut diagnostics = Diagnostics::new();
        let out = StaticHasTransform::new(table(&[("foo", true)]))
            .transform(source, None, &mut diagnostics)
            .unwrap();
        assert_eq!(out.code, source);
        assert!(diagnostics.elisions().is_empty());
    }

    #[test]
    fn options_drive_the_transform() {
        let options = TransformOptions::from_json(
            r#"{"features": {"foo": false}, "fileName": "widget.js", "jsx": true}"#,
        )
        .unwrap();
        let transform = StaticHasTransform::from_options(&options, &FeatureSets::empty());
        assert_eq!(transform.features().get("foo"), Some(false));

        let mut diagnostics = Diagnostics::new();
        let out = transform
            .transform(
                "const h = require('x/has');\nconst el = <div>{h.default('foo')}</div>;\n",
                None,
                &mut diagnostics,
            )
            .unwrap();
        assert_eq!(
            out.code,
            "const h = require('x/has');\nconst el = <div>{false}</div>;\n"
        );
    }

    #[test]
    fn parse_errors_name_the_file() {
        let mut diagnostics = Diagnostics::new();
        let err = StaticHasTransform::new(FeatureTable::new())
            .with_file_name("broken.js")
            .transform("var = ;", None, &mut diagnostics)
            .unwrap_err();
        assert!(err.to_string().starts_with("Parse error in broken.js"));
    }

    #[test]
    fn unreadable_prior_map_is_an_error() {
        let mut diagnostics = Diagnostics::new();
        let err = StaticHasTransform::new(FeatureTable::new())
            .transform(
                "var h = require('./has');\nh.default('x');\n",
                Some("not a map"),
                &mut diagnostics,
            )
            .unwrap_err();
        assert!(matches!(err, StaticHasError::SourceMap(_)));
    }

    #[test]
    fn prior_map_is_not_read_without_a_binding() {
        let mut diagnostics = Diagnostics::new();
        let out = StaticHasTransform::new(FeatureTable::new())
            .transform("a();\n", Some("not a map"), &mut diagnostics)
            .unwrap();
        assert_eq!(out.code, "a();\n");
        assert_eq!(out.map.as_deref(), Some("not a map"));
    }
}
