//! Resource records and the manifest classifier
//!
//! A rendered chart is one text blob holding many YAML documents. The
//! classifier splits it, parses each document into a [`Resource`] and keeps
//! source order, which later decides which duplicate ConfigMap wins.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_yaml::Value as YamlValue;
use std::fmt;

use crate::error::{WarningKind, Warnings};
use crate::value::{Map, MapExt, Value};

/// Resource kinds the engine acts on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
    Service,
    Deployment,
    StatefulSet,
    Other(String),
}

impl ResourceKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "ConfigMap" => Self::ConfigMap,
            "Secret" => Self::Secret,
            "Service" => Self::Service,
            "Deployment" => Self::Deployment,
            "StatefulSet" => Self::StatefulSet,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::Service => "Service",
            Self::Deployment => "Deployment",
            Self::StatefulSet => "StatefulSet",
            Self::Other(kind) => kind,
        }
    }

    /// Kinds that carry a pod template
    pub fn is_workload(&self) -> bool {
        matches!(self, Self::Deployment | Self::StatefulSet)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed manifest document
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub metadata: Map,
    pub spec: Map,
    pub data: Map,
}

impl Resource {
    /// `metadata.name`, guaranteed present for classified resources
    pub fn name(&self) -> &str {
        self.metadata.str_field("name").unwrap_or_default()
    }

    /// `Kind/name`, used to scope warnings
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.kind, self.name())
    }

    /// Parse a single YAML document.
    ///
    /// The document must be a mapping with a string `metadata.name`; `spec` and
    /// `data` default to empty maps when absent.
    pub fn from_yaml(doc: &str) -> std::result::Result<Self, String> {
        let raw: YamlValue = serde_yaml::from_str(doc).map_err(|e| e.to_string())?;
        let Value::Map(mut root) = Value::from(raw) else {
            return Err("document is not a mapping".to_string());
        };

        let kind = ResourceKind::parse(root.str_field("kind").unwrap_or_default());
        let metadata = take_map(&mut root, "metadata")?;
        let spec = take_map(&mut root, "spec")?;
        let mut data = take_map(&mut root, "data")?;

        // Secret `stringData` is plain text and overrides `data` on the same key
        if kind == ResourceKind::Secret {
            for (key, value) in take_map(&mut root, "stringData")? {
                data.insert(key, Value::String(STANDARD.encode(value.render())));
            }
        }

        match metadata.get("name") {
            Some(Value::String(name)) if !name.is_empty() => {}
            _ => return Err("missing metadata.name".to_string()),
        }

        Ok(Self {
            kind,
            metadata,
            spec,
            data,
        })
    }

    /// Tree that `fieldRef` paths are evaluated against
    pub fn field_root(&self) -> Value {
        let mut root = Map::new();
        root.insert("metadata".to_string(), Value::Map(self.metadata.clone()));
        root.insert("spec".to_string(), Value::Map(self.spec.clone()));
        Value::Map(root)
    }
}

fn take_map(root: &mut Map, key: &str) -> std::result::Result<Map, String> {
    match root.shift_remove(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Map(m)) => Ok(m),
        Some(_) => Err(format!("'{}' is not a mapping", key)),
    }
}

/// Classified manifest set in source order
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    resources: Vec<Resource>,
}

impl Manifest {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Split `text` into documents and classify each one.
    ///
    /// Blank and comment-only documents are skipped silently; documents that do
    /// not parse into a resource are dropped with a [`WarningKind::Parse`]
    /// warning.
    pub fn parse(text: &str, warnings: &mut Warnings) -> Self {
        let mut resources = Vec::new();

        for (index, doc) in split_documents(text).into_iter().enumerate() {
            if is_blank_document(doc) {
                continue;
            }
            match Resource::from_yaml(doc) {
                Ok(resource) => {
                    tracing::debug!(resource = %resource.display_name(), "classified");
                    resources.push(resource);
                }
                Err(message) => {
                    warnings.push(WarningKind::Parse, format!("document {}", index), message);
                }
            }
        }

        Self { resources }
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources of one kind, in source order
    pub fn of_kind<'a>(
        &'a self,
        kind: &'a ResourceKind,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources.iter().filter(move |r| &r.kind == kind)
    }

    /// Deployments and StatefulSets, in source order
    pub fn workloads(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(|r| r.kind.is_workload())
    }
}

/// Split on `---` document separators. A separator is a line that is exactly
/// `---` or starts with `--- ` (helm emits `--- # Source: ...`), so dashes
/// inside block scalars stay put.
fn split_documents(text: &str) -> Vec<&str> {
    let mut docs = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == "---" || trimmed.starts_with("--- ") {
            docs.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    docs.push(&text[start..]);
    docs
}

fn is_blank_document(doc: &str) -> bool {
    doc.lines().all(|l| {
        let l = l.trim();
        l.is_empty() || l.starts_with('#') || l == "..."
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order() {
        let text = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: first
data:
  a: "1"
---
apiVersion: v1
kind: Service
metadata:
  name: svc
spec:
  ports:
    - port: 80
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: second
"#;
        let mut warnings = Warnings::new();
        let manifest = Manifest::parse(text, &mut warnings);

        assert!(warnings.is_empty());
        let names: Vec<&str> = manifest.resources().iter().map(Resource::name).collect();
        assert_eq!(names, vec!["first", "svc", "second"]);
        assert_eq!(manifest.of_kind(&ResourceKind::ConfigMap).count(), 2);
        assert_eq!(manifest.resources()[1].kind, ResourceKind::Service);
    }

    #[test]
    fn test_bad_document_is_dropped_with_warning() {
        let text = concat!(
            "kind: ConfigMap\nmetadata:\n  name: ok\n",
            "---\nkind: [unclosed\n",
            "---\nkind: Secret\nmetadata: {}\n",
        );
        let mut warnings = Warnings::new();
        let manifest = Manifest::parse(text, &mut warnings);

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.resources()[0].name(), "ok");
        assert_eq!(warnings.count(WarningKind::Parse), 2);
        let scopes: Vec<&str> = warnings.iter().map(|w| w.scope.as_str()).collect();
        assert_eq!(scopes, vec!["document 1", "document 2"]);
    }

    #[test]
    fn test_blank_and_comment_documents_are_skipped() {
        let text = concat!(
            "---\n# Source: chart/templates/empty.yaml\n",
            "---\n\n",
            "---\nkind: ConfigMap\nmetadata:\n  name: a\n",
        );
        let mut warnings = Warnings::new();
        let manifest = Manifest::parse(text, &mut warnings);

        assert_eq!(manifest.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_separator_with_trailing_comment() {
        let text = concat!(
            "--- # Source: a.yaml\nkind: ConfigMap\nmetadata:\n  name: a\n",
            "--- # Source: b.yaml\nkind: ConfigMap\nmetadata:\n  name: b\n",
        );
        let mut warnings = Warnings::new();
        let manifest = Manifest::parse(text, &mut warnings);
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_dashes_inside_block_scalar_do_not_split() {
        let text = concat!(
            "kind: ConfigMap\nmetadata:\n  name: a\n",
            "data:\n  notes: |\n    ----\n    text---more\n",
        );
        let mut warnings = Warnings::new();
        let manifest = Manifest::parse(text, &mut warnings);

        assert_eq!(manifest.len(), 1);
        let notes = manifest.resources()[0].data.str_field("notes").unwrap();
        assert!(notes.contains("text---more"));
    }

    #[test]
    fn test_non_mapping_spec_is_rejected() {
        let err =
            Resource::from_yaml("kind: Service\nmetadata:\n  name: a\nspec: [1, 2]\n").unwrap_err();
        assert!(err.contains("spec"));
    }

    #[test]
    fn test_secret_string_data_is_encoded_into_data() {
        let doc = r#"
kind: Secret
metadata:
  name: db
data:
  user: YWRtaW4=
  password: b2xk
stringData:
  password: s3cret
  port: 5432
"#;
        let secret = Resource::from_yaml(doc).unwrap();

        assert_eq!(secret.data.str_field("user"), Some("YWRtaW4="));
        assert_eq!(secret.data.str_field("password"), Some("czNjcmV0"));
        assert_eq!(secret.data.str_field("port"), Some("NTQzMg=="));

        let config =
            Resource::from_yaml("kind: ConfigMap\nmetadata:\n  name: c\nstringData:\n  a: b\n")
                .unwrap();
        assert!(config.data.is_empty());
    }

    #[test]
    fn test_workloads() {
        let text = concat!(
            "kind: Deployment\nmetadata:\n  name: d\n",
            "---\nkind: StatefulSet\nmetadata:\n  name: s\n",
            "---\nkind: Job\nmetadata:\n  name: j\n",
        );
        let mut warnings = Warnings::new();
        let manifest = Manifest::parse(text, &mut warnings);

        let names: Vec<&str> = manifest.workloads().map(Resource::name).collect();
        assert_eq!(names, vec!["d", "s"]);
        assert_eq!(
            manifest.resources()[2].kind,
            ResourceKind::Other("Job".to_string())
        );
    }
}
