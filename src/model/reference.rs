//! References to child pipeline definitions

use super::VariableScope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a pipeline reference should be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A definition file, absolute or relative to the store root
    Path,
    /// A stored definition addressed by name inside a directory
    StoredName,
    /// A stored definition addressed by its opaque identifier
    OpaqueId,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Path => write!(f, "path"),
            ReferenceKind::StoredName => write!(f, "stored_name"),
            ReferenceKind::OpaqueId => write!(f, "opaque_id"),
        }
    }
}

/// The durable reference to a child pipeline as written in an entry definition.
///
/// All location fields may be present at once (older entries kept every field);
/// [`PipelineReference::effective_kind`] decides which one is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReference {
    #[serde(
        rename = "reference_kind",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<ReferenceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Stored pipeline name; serialized as `pipeline_name` so it cannot clash
    /// with the name of an entry that flattens this reference
    #[serde(
        rename = "pipeline_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

impl PipelineReference {
    pub fn by_path(path: impl Into<String>) -> Self {
        Self {
            kind: Some(ReferenceKind::Path),
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn by_name(name: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            kind: Some(ReferenceKind::StoredName),
            name: Some(name.into()),
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    pub fn by_id(object_id: impl Into<String>) -> Self {
        Self {
            kind: Some(ReferenceKind::OpaqueId),
            object_id: Some(object_id.into()),
            ..Self::default()
        }
    }

    /// The recorded kind, or the inferred one for entries that never recorded it.
    ///
    /// Inference order: a non-empty path, then an opaque id, then a stored name.
    /// A reference with nothing set is treated as a path reference.
    pub fn effective_kind(&self) -> ReferenceKind {
        if let Some(kind) = self.kind {
            return kind;
        }
        if is_set(&self.path) {
            ReferenceKind::Path
        } else if is_set(&self.object_id) {
            ReferenceKind::OpaqueId
        } else if is_set(&self.name) {
            ReferenceKind::StoredName
        } else {
            ReferenceKind::Path
        }
    }

    /// Turn the reference into a concrete location, substituting variables.
    ///
    /// Returns `None` when the field the effective kind needs is empty.
    pub fn locate(&self, scope: &VariableScope) -> Option<ResolvedLocation> {
        let sub = |v: &Option<String>| {
            v.as_deref()
                .map(|s| scope.substitute(s))
                .filter(|s| !s.trim().is_empty())
        };
        match self.effective_kind() {
            ReferenceKind::Path => sub(&self.path).map(ResolvedLocation::Path),
            ReferenceKind::StoredName => sub(&self.name).map(|name| ResolvedLocation::Stored {
                name,
                directory: sub(&self.directory).unwrap_or_else(|| "/".to_string()),
            }),
            ReferenceKind::OpaqueId => sub(&self.object_id).map(ResolvedLocation::Id),
        }
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl fmt::Display for PipelineReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_empty = |v: &Option<String>| v.clone().unwrap_or_default();
        match self.effective_kind() {
            ReferenceKind::Path => write!(f, "{}", or_empty(&self.path)),
            ReferenceKind::StoredName => write!(
                f,
                "{}/{}",
                or_empty(&self.directory).trim_end_matches('/'),
                or_empty(&self.name)
            ),
            ReferenceKind::OpaqueId => write!(f, "id:{}", or_empty(&self.object_id)),
        }
    }
}

/// A reference after kind selection and variable substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLocation {
    Path(String),
    Stored { name: String, directory: String },
    Id(String),
}

impl ResolvedLocation {
    pub fn kind(&self) -> ReferenceKind {
        match self {
            ResolvedLocation::Path(_) => ReferenceKind::Path,
            ResolvedLocation::Stored { .. } => ReferenceKind::StoredName,
            ResolvedLocation::Id(_) => ReferenceKind::OpaqueId,
        }
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedLocation::Path(p) => write!(f, "{}", p),
            ResolvedLocation::Stored { name, directory } => {
                write!(f, "{}/{}", directory.trim_end_matches('/'), name)
            }
            ResolvedLocation::Id(id) => write!(f, "id:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn everything_set() -> PipelineReference {
        PipelineReference {
            kind: None,
            path: Some("etl/load.yml".to_string()),
            name: Some("load".to_string()),
            directory: Some("/etl".to_string()),
            object_id: Some("4f2a".to_string()),
        }
    }

    #[test]
    fn test_inference_prefers_path() {
        assert_eq!(everything_set().effective_kind(), ReferenceKind::Path);
    }

    #[test]
    fn test_inference_falls_back_to_id_then_name() {
        let mut reference = everything_set();
        reference.path = Some("  ".to_string());
        assert_eq!(reference.effective_kind(), ReferenceKind::OpaqueId);

        reference.object_id = None;
        assert_eq!(reference.effective_kind(), ReferenceKind::StoredName);

        reference.name = None;
        assert_eq!(reference.effective_kind(), ReferenceKind::Path);
    }

    #[test]
    fn test_recorded_kind_wins_over_inference() {
        let mut reference = everything_set();
        reference.kind = Some(ReferenceKind::StoredName);
        assert_eq!(
            reference.locate(&VariableScope::new()),
            Some(ResolvedLocation::Stored {
                name: "load".to_string(),
                directory: "/etl".to_string()
            })
        );
    }

    #[test]
    fn test_locate_substitutes_variables() {
        let scope: VariableScope = [("BASE", "/srv/pipelines")].into_iter().collect();
        let reference = PipelineReference::by_path("${BASE}/load.yml");
        assert_eq!(
            reference.locate(&scope),
            Some(ResolvedLocation::Path("/srv/pipelines/load.yml".to_string()))
        );
    }

    #[test]
    fn test_locate_empty_field_is_none() {
        let reference = PipelineReference {
            kind: Some(ReferenceKind::OpaqueId),
            ..PipelineReference::default()
        };
        assert_eq!(reference.locate(&VariableScope::new()), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PipelineReference::by_name("load", "/etl/").to_string(),
            "/etl/load"
        );
        assert_eq!(PipelineReference::by_id("4f2a").to_string(), "id:4f2a");
    }
}
