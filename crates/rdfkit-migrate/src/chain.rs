//! # Migration Chain
//!
//! An ordered list of [`MigrationStep`]s. Each step rewrites documents of
//! one format series into the shape of its target version. Migrating a
//! document applies every step whose source series matches the document's
//! current version, in ascending target order, so a document several
//! versions behind passes through each intermediate shape.
//!
//! ## Version handling
//!
//! | declared version | outcome |
//! |------------------|---------|
//! | absent, not a string, malformed | [`MigrationOutcome::Unchanged`] |
//! | older than every step's source | [`MigrationOutcome::Unchanged`] |
//! | covered by a step | [`MigrationOutcome::Migrated`] |
//! | equal to the target | [`MigrationOutcome::Unchanged`] |
//! | newer than the target | [`MigrationOutcome::FutureVersion`] |
//!
//! The input is never modified; steps run on a copy.

use std::fmt;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use rdfkit_core::{FormatVersion, RawMapping};

use crate::v0_4;

/// Rewrites a raw document in place.
pub type Transform = fn(&mut RawMapping);

/// One migration step.
#[derive(Clone, Copy)]
pub struct MigrationStep {
    /// Short label used in logs.
    pub name: &'static str,
    /// Any version of this `MAJOR.MINOR` series is migrated by the step.
    pub source: FormatVersion,
    /// Version stamped on the rewritten document.
    pub target: FormatVersion,
    /// The rewrite. Must be a no-op on already rewritten parts.
    pub transform: Transform,
}

impl MigrationStep {
    /// Whether a document declaring `version` is migrated by this step.
    pub fn applies_to(&self, version: &FormatVersion) -> bool {
        version.same_series(&self.source) && *version < self.target
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

// ── Error Types ──────────────────────────────────────────────────────

/// Errors building a chain or choosing a migration target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// Two steps produce the same version.
    #[error("migration steps '{first}' and '{second}' both target {target}")]
    DuplicateTarget {
        first: &'static str,
        second: &'static str,
        target: FormatVersion,
    },
    /// A step does not move the document forward.
    #[error("migration step '{name}' goes from {from} to {to}; steps must move to a newer version")]
    NotForward {
        name: &'static str,
        from: FormatVersion,
        to: FormatVersion,
    },
    /// The requested target lies beyond every known format series.
    #[error("cannot migrate to {target}; the latest known format version is {latest}")]
    UnsupportedTarget {
        target: FormatVersion,
        latest: FormatVersion,
    },
}

// ── Outcome ──────────────────────────────────────────────────────────

/// What migration did to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No step applied.
    Unchanged,
    /// At least one step applied.
    Migrated {
        from: FormatVersion,
        to: FormatVersion,
    },
    /// The document declares a version newer than the target and was left
    /// untouched.
    FutureVersion {
        declared: FormatVersion,
        latest: FormatVersion,
    },
}

impl MigrationOutcome {
    /// Whether the document was rewritten.
    pub fn is_migrated(&self) -> bool {
        matches!(self, Self::Migrated { .. })
    }
}

/// A migrated document together with what happened to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    /// The resulting document; a copy of the input if nothing applied.
    pub document: Value,
    pub outcome: MigrationOutcome,
}

// ── Chain ────────────────────────────────────────────────────────────

/// Ordered migration steps ending at the latest format version.
#[derive(Debug, Clone)]
pub struct MigrationChain {
    steps: Vec<MigrationStep>,
    latest: FormatVersion,
}

/// The newest format version this crate migrates to.
pub const LATEST_FORMAT_VERSION: FormatVersion = FormatVersion::new_const(0, 5, 0);

impl MigrationChain {
    /// Build a chain ending at `latest`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::NotForward`] if a step's target is not
    /// newer than its source, [`MigrationError::DuplicateTarget`] if two
    /// steps share a target, and [`MigrationError::UnsupportedTarget`] if a
    /// step targets a version beyond `latest`.
    pub fn new(latest: FormatVersion, mut steps: Vec<MigrationStep>) -> Result<Self, MigrationError> {
        for step in &steps {
            if step.target <= step.source {
                return Err(MigrationError::NotForward {
                    name: step.name,
                    from: step.source,
                    to: step.target,
                });
            }
            if step.target > latest {
                return Err(MigrationError::UnsupportedTarget {
                    target: step.target,
                    latest,
                });
            }
        }
        steps.sort_by_key(|s| s.target);
        if let Some(pair) = steps.windows(2).find(|w| w[0].target == w[1].target) {
            return Err(MigrationError::DuplicateTarget {
                first: pair[0].name,
                second: pair[1].name,
                target: pair[0].target,
            });
        }
        Ok(Self { steps, latest })
    }

    /// The chain of every migration this crate knows.
    pub fn standard() -> Self {
        Self {
            steps: vec![v0_4::STEP],
            latest: LATEST_FORMAT_VERSION,
        }
    }

    /// The version documents are migrated to by [`migrate`](Self::migrate).
    pub fn latest(&self) -> FormatVersion {
        self.latest
    }

    /// The steps, in application order.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Migrate a document to the latest version.
    pub fn migrate(&self, raw: &Value) -> Migration {
        self.apply(raw, self.latest)
    }

    /// Migrate a document, stopping at `target`.
    ///
    /// Steps whose target lies beyond `target` are not applied. A target
    /// in the latest series but past its patch level is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::UnsupportedTarget`] for a target outside
    /// every known series.
    pub fn migrate_to(&self, raw: &Value, target: FormatVersion) -> Result<Migration, MigrationError> {
        if target > self.latest && !target.same_series(&self.latest) {
            return Err(MigrationError::UnsupportedTarget {
                target,
                latest: self.latest,
            });
        }
        Ok(self.apply(raw, target))
    }

    fn apply(&self, raw: &Value, target: FormatVersion) -> Migration {
        let unchanged = |outcome| Migration {
            document: raw.clone(),
            outcome,
        };
        let Value::Object(map) = raw else {
            return unchanged(MigrationOutcome::Unchanged);
        };
        let Some(declared) = declared_version(map) else {
            return unchanged(MigrationOutcome::Unchanged);
        };
        if declared > target {
            warn!(%declared, latest = %target, "document declares a newer format version than known");
            return unchanged(MigrationOutcome::FutureVersion {
                declared,
                latest: target,
            });
        }

        let mut map = map.clone();
        let mut current = declared;
        for step in self.steps.iter().filter(|s| s.target <= target) {
            if !step.applies_to(&current) {
                continue;
            }
            (step.transform)(&mut map);
            map.insert(
                "format_version".to_string(),
                Value::String(step.target.to_string()),
            );
            debug!(step = step.name, from = %current, to = %step.target, "applied migration step");
            current = step.target;
        }

        if current == declared {
            return unchanged(MigrationOutcome::Unchanged);
        }
        Migration {
            document: Value::Object(map),
            outcome: MigrationOutcome::Migrated {
                from: declared,
                to: current,
            },
        }
    }
}

impl Default for MigrationChain {
    fn default() -> Self {
        Self::standard()
    }
}

/// The well-formed `format_version` of a raw document, if any.
pub fn declared_version(map: &RawMapping) -> Option<FormatVersion> {
    map.get("format_version")
        .and_then(Value::as_str)
        .and_then(|s| FormatVersion::new(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(major: u64, minor: u64, patch: u64) -> FormatVersion {
        FormatVersion::new_const(major, minor, patch)
    }

    fn mark(tag: &'static str) -> impl Fn(&mut RawMapping) {
        move |map| {
            let trail = map
                .entry("trail")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = trail {
                items.push(json!(tag));
            }
        }
    }

    fn to_0_2(map: &mut RawMapping) {
        mark("0.2")(map);
    }

    fn to_0_3(map: &mut RawMapping) {
        mark("0.3")(map);
    }

    fn to_0_4(map: &mut RawMapping) {
        mark("0.4")(map);
    }

    fn toy_chain() -> MigrationChain {
        MigrationChain::new(
            v(0, 4, 0),
            vec![
                MigrationStep { name: "c", source: v(0, 3, 0), target: v(0, 4, 0), transform: to_0_4 },
                MigrationStep { name: "a", source: v(0, 1, 0), target: v(0, 2, 0), transform: to_0_2 },
                MigrationStep { name: "b", source: v(0, 2, 0), target: v(0, 3, 0), transform: to_0_3 },
            ],
        )
        .unwrap()
    }

    #[test]
    fn steps_apply_in_ascending_order() {
        let m = toy_chain().migrate(&json!({"format_version": "0.1.3"}));
        assert_eq!(m.document["trail"], json!(["0.2", "0.3", "0.4"]));
        assert_eq!(m.document["format_version"], json!("0.4.0"));
        assert_eq!(
            m.outcome,
            MigrationOutcome::Migrated { from: v(0, 1, 3), to: v(0, 4, 0) }
        );
    }

    #[test]
    fn chain_starts_at_declared_series() {
        let m = toy_chain().migrate(&json!({"format_version": "0.3.1"}));
        assert_eq!(m.document["trail"], json!(["0.4"]));
    }

    #[test]
    fn migrate_to_stops_early() {
        let m = toy_chain()
            .migrate_to(&json!({"format_version": "0.1.0"}), v(0, 3, 0))
            .unwrap();
        assert_eq!(m.document["trail"], json!(["0.2", "0.3"]));
        assert_eq!(m.document["format_version"], json!("0.3.0"));
    }

    #[test]
    fn unsupported_target() {
        let err = toy_chain()
            .migrate_to(&json!({"format_version": "0.1.0"}), v(0, 6, 0))
            .unwrap_err();
        assert!(matches!(err, MigrationError::UnsupportedTarget { .. }));
        assert!(toy_chain().migrate_to(&json!({}), v(0, 4, 7)).is_ok());
    }

    #[test]
    fn current_and_unversioned_documents_are_untouched() {
        let chain = toy_chain();
        for raw in [
            json!({"format_version": "0.4.0", "x": 1}),
            json!({"format_version": "0.0.9"}),
            json!({"format_version": 0.4}),
            json!({"format_version": "zero"}),
            json!({"name": "no version"}),
            json!(["not", "a", "mapping"]),
        ] {
            let m = chain.migrate(&raw);
            assert_eq!(m.outcome, MigrationOutcome::Unchanged);
            assert_eq!(m.document, raw);
        }
    }

    #[test]
    fn future_version_is_reported_and_untouched() {
        let raw = json!({"format_version": "0.9.0"});
        let m = toy_chain().migrate(&raw);
        assert_eq!(m.document, raw);
        assert_eq!(
            m.outcome,
            MigrationOutcome::FutureVersion { declared: v(0, 9, 0), latest: v(0, 4, 0) }
        );
    }

    #[test]
    fn duplicate_targets_are_rejected() {
        let err = MigrationChain::new(
            v(0, 4, 0),
            vec![
                MigrationStep { name: "a", source: v(0, 2, 0), target: v(0, 3, 0), transform: to_0_3 },
                MigrationStep { name: "b", source: v(0, 1, 0), target: v(0, 3, 0), transform: to_0_2 },
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateTarget { .. }));
    }

    #[test]
    fn backwards_steps_are_rejected() {
        let err = MigrationChain::new(
            v(0, 4, 0),
            vec![MigrationStep { name: "a", source: v(0, 3, 0), target: v(0, 2, 0), transform: to_0_2 }],
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::NotForward { name: "a", .. }));
    }

    #[test]
    fn standard_chain_is_valid() {
        let standard = MigrationChain::standard();
        let rebuilt = MigrationChain::new(standard.latest(), standard.steps().to_vec());
        assert!(rebuilt.is_ok());
        assert_eq!(standard.latest(), LATEST_FORMAT_VERSION);
    }
}
