//! Pod resolver
//!
//! Turns a Deployment or StatefulSet into one [`AppUnit`] per container, with
//! every ConfigMap, Secret and field reference replaced by its value.
//!
//! Failures are layered:
//! - a malformed workload yields a [`ResolveError`] and no units at all
//! - an unresolvable reference only drops the one variable or file, with a
//!   warning, and the rest of the container is still produced

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::app::{AppUnit, PodUnits, PostStartHook, WorkloadKind};
use crate::error::{WarningKind, Warnings};
use crate::index::{ReferenceIndex, ServiceInfo};
use crate::resource::{Manifest, Resource, ResourceKind};
use crate::value::{Map, MapExt, Value, parse_field_path};

/// Why a workload produced no units
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0} is not a Deployment or StatefulSet")]
    NotAWorkload(String),

    #[error("missing metadata.name")]
    MissingName,

    #[error("missing spec.template.spec")]
    MissingTemplateSpec,

    #[error("missing containers")]
    MissingContainers,

    #[error("invalid container format at index {0}")]
    InvalidContainer(usize),
}

/// Resolve every Deployment/StatefulSet in `manifest`.
///
/// Workloads that fail to resolve are reported as warnings and skipped.
pub fn resolve_workloads(
    manifest: &Manifest,
    index: &ReferenceIndex,
    warnings: &mut Warnings,
) -> Vec<PodUnits> {
    let resolver = PodResolver::new(index);
    let mut pods = Vec::new();

    for resource in manifest.workloads() {
        match resolver.resolve(resource, warnings) {
            Ok(pod) => pods.push(pod),
            Err(e) => warnings.push(
                WarningKind::InvalidResource,
                resource.display_name(),
                e.to_string(),
            ),
        }
    }

    pods
}

/// Resolves pod templates against a read-only [`ReferenceIndex`]
#[derive(Debug, Clone, Copy)]
pub struct PodResolver<'a> {
    index: &'a ReferenceIndex,
}

/// Per-pod state shared by all of its containers
struct PodContext<'r> {
    resource: &'r Resource,
    kind: WorkloadKind,
    volumes: &'r [Value],
    service: Option<&'r ServiceInfo>,
    field_root: Value,
}

impl<'a> PodResolver<'a> {
    pub fn new(index: &'a ReferenceIndex) -> Self {
        Self { index }
    }

    pub fn resolve(
        &self,
        resource: &Resource,
        warnings: &mut Warnings,
    ) -> Result<PodUnits, ResolveError> {
        let kind = match resource.kind {
            ResourceKind::Deployment => WorkloadKind::Deployment,
            ResourceKind::StatefulSet => WorkloadKind::StatefulSet,
            ref other => return Err(ResolveError::NotAWorkload(other.to_string())),
        };

        let pod_name = resource.name();
        if pod_name.is_empty() {
            return Err(ResolveError::MissingName);
        }

        let template = resource
            .spec
            .map_field("template")
            .ok_or(ResolveError::MissingTemplateSpec)?;
        let template_spec = template
            .map_field("spec")
            .ok_or(ResolveError::MissingTemplateSpec)?;

        let containers = match template_spec.list_field("containers") {
            Some(list) if !list.is_empty() => list,
            _ => return Err(ResolveError::MissingContainers),
        };
        let containers = containers
            .iter()
            .enumerate()
            .map(|(i, c)| c.as_map().ok_or(ResolveError::InvalidContainer(i)))
            .collect::<Result<Vec<&Map>, _>>()?;

        let labels: BTreeMap<String, String> = template
            .map_field("metadata")
            .map(|m| m.string_map("labels"))
            .unwrap_or_default();

        let ctx = PodContext {
            resource,
            kind,
            volumes: template_spec.list_field("volumes").unwrap_or_default(),
            service: self.index.service_for(&labels),
            field_root: resource.field_root(),
        };

        let units = containers
            .into_iter()
            .enumerate()
            .map(|(i, container)| self.resolve_container(&ctx, i, container, warnings))
            .collect();

        Ok(PodUnits {
            pod: pod_name.to_string(),
            units,
        })
    }

    fn resolve_container(
        &self,
        ctx: &PodContext<'_>,
        position: usize,
        container: &Map,
        warnings: &mut Warnings,
    ) -> AppUnit {
        let pod_name = ctx.resource.name();
        let name = match container.str_field("name") {
            Some(name) if !name.is_empty() => name.to_string(),
            _ if position == 0 => pod_name.to_string(),
            _ => format!("{}-{}", pod_name, position),
        };
        let scope = format!("{}/{}", ctx.resource.display_name(), name);

        let mut unit = AppUnit::new(name, ctx.kind, pod_name);

        match container.str_field("image") {
            Some(image) if !image.is_empty() => unit.image = image.to_string(),
            _ => warnings.push(WarningKind::InvalidResource, &scope, "container has no image"),
        }

        unit.command = string_list(container.list_field("command"));
        unit.command.extend(string_list(container.list_field("args")));

        unit.post_start = post_start_hook(container, &scope, warnings);

        self.resolve_env_from(container, &scope, &mut unit, warnings);
        self.resolve_env(ctx, container, &scope, &mut unit, warnings);
        self.resolve_mounts(ctx, container, &scope, &mut unit, warnings);

        // only the main container maps ports; sidecars are reached through it
        if position == 0 {
            if let Some(service) = ctx.service {
                unit.ports = service.ports.iter().map(|p| p.mapping()).collect();
            }
        }

        unit
    }

    /// `envFrom`: whole ConfigMaps/Secrets, later entries overriding earlier ones
    fn resolve_env_from(
        &self,
        container: &Map,
        scope: &str,
        unit: &mut AppUnit,
        warnings: &mut Warnings,
    ) {
        for entry in container.list_field("envFrom").unwrap_or_default() {
            let Some(entry) = entry.as_map() else { continue };
            let prefix = entry.str_field("prefix").unwrap_or_default();

            if let Some(reference) = entry.map_field("configMapRef") {
                let name = reference.str_field("name").unwrap_or_default();
                match self.index.config_map(name) {
                    Some(data) => {
                        for (key, value) in data {
                            unit.environment.insert(format!("{}{}", prefix, key), value.render());
                        }
                    }
                    None => missing(
                        reference,
                        warnings,
                        scope,
                        format!("envFrom ConfigMap '{}' not found", name),
                    ),
                }
            }

            if let Some(reference) = entry.map_field("secretRef") {
                let name = reference.str_field("name").unwrap_or_default();
                match self.index.secret(name) {
                    Some(data) => {
                        for (key, value) in data {
                            match decode_secret(value) {
                                Ok(decoded) => {
                                    unit.environment.insert(format!("{}{}", prefix, key), decoded);
                                }
                                Err(e) => warnings.push(
                                    WarningKind::Decode,
                                    scope,
                                    format!("Secret '{}' key '{}': {}", name, key, e),
                                ),
                            }
                        }
                    }
                    None => missing(
                        reference,
                        warnings,
                        scope,
                        format!("envFrom Secret '{}' not found", name),
                    ),
                }
            }
        }
    }

    /// `env`: a literal `value` wins, otherwise `valueFrom` is resolved
    fn resolve_env(
        &self,
        ctx: &PodContext<'_>,
        container: &Map,
        scope: &str,
        unit: &mut AppUnit,
        warnings: &mut Warnings,
    ) {
        for entry in container.list_field("env").unwrap_or_default() {
            let Some(entry) = entry.as_map() else { continue };
            let Some(key) = entry.str_field("name").filter(|n| !n.is_empty()) else {
                warnings.push(WarningKind::InvalidResource, scope, "env entry without a name");
                continue;
            };

            if let Some(value) = entry.get("value") {
                unit.environment.insert(key.to_string(), value.render());
                continue;
            }

            let Some(source) = entry.map_field("valueFrom") else {
                // `- name: X` alone is an empty variable
                unit.environment.insert(key.to_string(), String::new());
                continue;
            };

            if let Some(value) = self.value_from(ctx, source, key, scope, warnings) {
                unit.environment.insert(key.to_string(), value);
            }
        }
    }

    fn value_from(
        &self,
        ctx: &PodContext<'_>,
        source: &Map,
        key: &str,
        scope: &str,
        warnings: &mut Warnings,
    ) -> Option<String> {
        if let Some(reference) = source.map_field("configMapKeyRef") {
            let name = reference.str_field("name").unwrap_or_default();
            let wanted = reference.str_field("key").unwrap_or_default();
            let value = self.index.config_map(name).and_then(|data| data.get(wanted));
            if value.is_none() {
                missing(
                    reference,
                    warnings,
                    scope,
                    format!("{}: ConfigMap '{}' key '{}' not found", key, name, wanted),
                );
            }
            return value.map(Value::render);
        }

        if let Some(reference) = source.map_field("secretKeyRef") {
            let name = reference.str_field("name").unwrap_or_default();
            let wanted = reference.str_field("key").unwrap_or_default();
            let Some(value) = self.index.secret(name).and_then(|data| data.get(wanted)) else {
                missing(
                    reference,
                    warnings,
                    scope,
                    format!("{}: Secret '{}' key '{}' not found", key, name, wanted),
                );
                return None;
            };
            return match decode_secret(value) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warnings.push(
                        WarningKind::Decode,
                        scope,
                        format!("{}: Secret '{}' key '{}': {}", key, name, wanted, e),
                    );
                    None
                }
            };
        }

        if let Some(reference) = source.map_field("fieldRef") {
            let path = reference.str_field("fieldPath").unwrap_or_default();
            let Some(segments) = parse_field_path(path) else {
                warnings.push(
                    WarningKind::FieldRef,
                    scope,
                    format!("{}: malformed fieldPath '{}'", key, path),
                );
                return None;
            };
            let value = ctx.field_root.get_path(&segments);
            if value.is_none() {
                warnings.push(
                    WarningKind::FieldRef,
                    scope,
                    format!("{}: fieldPath '{}' does not resolve", key, path),
                );
            }
            return value.map(Value::render);
        }

        warnings.push(
            WarningKind::Unsupported,
            scope,
            format!("{}: unsupported valueFrom source", key),
        );
        None
    }

    /// `volumeMounts` backed by ConfigMap or Secret volumes become files
    fn resolve_mounts(
        &self,
        ctx: &PodContext<'_>,
        container: &Map,
        scope: &str,
        unit: &mut AppUnit,
        warnings: &mut Warnings,
    ) {
        for mount in container.list_field("volumeMounts").unwrap_or_default() {
            let Some(mount) = mount.as_map() else { continue };
            let volume_name = mount.str_field("name").unwrap_or_default();
            let Some(mount_path) = mount.str_field("mountPath").filter(|p| !p.is_empty()) else {
                warnings.push(
                    WarningKind::InvalidResource,
                    scope,
                    format!("volumeMount '{}' has no mountPath", volume_name),
                );
                continue;
            };
            let sub_path = mount.str_field("subPath").filter(|p| !p.is_empty());

            let Some(volume) = ctx
                .volumes
                .iter()
                .filter_map(Value::as_map)
                .find(|v| v.str_field("name") == Some(volume_name))
            else {
                warnings.push(
                    WarningKind::MissingReference,
                    scope,
                    format!("volumeMount '{}' has no matching volume", volume_name),
                );
                continue;
            };

            let projection = if let Some(source) = volume.map_field("configMap") {
                let name = source.str_field("name").unwrap_or_default();
                match self.index.config_map(name) {
                    Some(data) => Some(Projection {
                        source: format!("ConfigMap '{}'", name),
                        data,
                        encoded: false,
                        items: source.list_field("items"),
                    }),
                    None => {
                        let message = format!("volume ConfigMap '{}' not found", name);
                        missing(source, warnings, scope, message);
                        None
                    }
                }
            } else if let Some(source) = volume.map_field("secret") {
                let name = source.str_field("secretName").unwrap_or_default();
                match self.index.secret(name) {
                    Some(data) => Some(Projection {
                        source: format!("Secret '{}'", name),
                        data,
                        encoded: true,
                        items: source.list_field("items"),
                    }),
                    None => {
                        let message = format!("volume Secret '{}' not found", name);
                        missing(source, warnings, scope, message);
                        None
                    }
                }
            } else {
                tracing::debug!(scope, volume = volume_name, "volume type is not materialized");
                None
            };

            if let Some(projection) = projection {
                projection.apply(mount_path, sub_path, scope, unit, warnings);
            }
        }
    }
}

/// ConfigMap or Secret data projected into a mount
struct Projection<'d> {
    source: String,
    data: &'d Map,
    /// Secret values are base64 and decoded on the way out
    encoded: bool,
    items: Option<&'d [Value]>,
}

impl Projection<'_> {
    fn apply(
        &self,
        mount_path: &str,
        sub_path: Option<&str>,
        scope: &str,
        unit: &mut AppUnit,
        warnings: &mut Warnings,
    ) {
        if let Some(key) = sub_path {
            if let Some(content) = self.content(key, scope, warnings) {
                unit.mounts.insert(mount_path.to_string(), content);
            }
            return;
        }

        if let Some(items) = self.items {
            for item in items.iter().filter_map(Value::as_map) {
                let key = item.str_field("key").unwrap_or_default();
                let path = item.str_field("path").filter(|p| !p.is_empty()).unwrap_or(key);
                if let Some(content) = self.content(key, scope, warnings) {
                    unit.mounts.insert(join_mount_path(mount_path, path), content);
                }
            }
            return;
        }

        for key in self.data.keys() {
            if let Some(content) = self.content(key, scope, warnings) {
                unit.mounts.insert(join_mount_path(mount_path, key), content);
            }
        }
    }

    fn content(&self, key: &str, scope: &str, warnings: &mut Warnings) -> Option<String> {
        let Some(value) = self.data.get(key) else {
            warnings.push(
                WarningKind::MissingReference,
                scope,
                format!("{} has no key '{}'", self.source, key),
            );
            return None;
        };
        if !self.encoded {
            return Some(value.render());
        }
        match decode_secret(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warnings.push(
                    WarningKind::Decode,
                    scope,
                    format!("{} key '{}': {}", self.source, key, e),
                );
                None
            }
        }
    }
}

/// Report a missing reference unless the reference is marked `optional: true`
fn missing(reference: &Map, warnings: &mut Warnings, scope: &str, message: String) {
    if matches!(reference.get("optional"), Some(Value::Bool(true))) {
        tracing::debug!(scope, "{} (optional)", message);
    } else {
        warnings.push(WarningKind::MissingReference, scope, message);
    }
}

/// Decode one base64 Secret value into text
pub fn decode_secret(value: &Value) -> Result<String, String> {
    let encoded = value.render();
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64: {}", e))?;
    String::from_utf8(bytes).map_err(|_| "decoded value is not UTF-8".to_string())
}

fn join_mount_path(mount_path: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        mount_path.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

fn string_list(list: Option<&[Value]>) -> Vec<String> {
    list.unwrap_or_default()
        .iter()
        .filter(|v| !matches!(v, Value::List(_) | Value::Map(_)))
        .map(Value::render)
        .collect()
}

fn post_start_hook(container: &Map, scope: &str, warnings: &mut Warnings) -> Option<PostStartHook> {
    let hook = container.map_field("lifecycle")?.map_field("postStart")?;
    let exec = hook.map_field("exec");
    let http = hook.map_field("httpGet");

    if exec.is_some() && http.is_some() {
        warnings.push(
            WarningKind::InvalidResource,
            scope,
            "postStart declares both exec and httpGet, using exec",
        );
    }

    if let Some(exec) = exec {
        return Some(PostStartHook::Exec {
            command: string_list(exec.list_field("command")),
        });
    }

    http.map(|http| PostStartHook::HttpGet {
        path: http.str_field("path").unwrap_or_default().to_string(),
        port: http.get("port").map(Value::render).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexOptions;

    fn resolve(text: &str) -> (Vec<PodUnits>, Warnings) {
        let mut warnings = Warnings::new();
        let manifest = Manifest::parse(text, &mut warnings);
        let index =
            ReferenceIndex::build(&manifest, IndexOptions::default(), &mut warnings).unwrap();
        let pods = resolve_workloads(&manifest, &index, &mut warnings);
        (pods, warnings)
    }

    fn single_unit(text: &str) -> (AppUnit, Warnings) {
        let (mut pods, warnings) = resolve(text);
        assert_eq!(pods.len(), 1);
        let mut pod = pods.remove(0);
        assert_eq!(pod.units.len(), 1);
        (pod.units.remove(0), warnings)
    }

    fn yaml_map(s: &str) -> Map {
        match Value::from(serde_yaml::from_str::<serde_yaml::Value>(s).unwrap()) {
            Value::Map(m) => m,
            other => panic!("not a map: {:?}", other),
        }
    }

    #[test]
    fn test_env_from_config_map_key_ref() {
        let (unit, warnings) = single_unit(
            r#"
kind: ConfigMap
metadata:
  name: web-cfg
data:
  port: "8080"
---
kind: Deployment
metadata:
  name: web
spec:
  template:
    spec:
      containers:
        - name: web
          image: nginx:1.25
          env:
            - name: PORT
              valueFrom:
                configMapKeyRef:
                  name: web-cfg
                  key: port
"#,
        );
        assert!(warnings.is_empty());
        assert_eq!(unit.environment.get("PORT").map(String::as_str), Some("8080"));
    }

    #[test]
    fn test_synthetic_index() {
        let index = ReferenceIndex::default()
            .with_config_map("cfg", yaml_map("level: debug\n"))
            .with_secret("creds", yaml_map("token: c2VjcmV0\n"));
        let mut warnings = Warnings::new();
        let manifest = Manifest::parse(
            r#"
kind: StatefulSet
metadata:
  name: worker
spec:
  template:
    spec:
      containers:
        - name: worker
          image: busybox
          envFrom:
            - configMapRef:
                name: cfg
            - secretRef:
                name: creds
              prefix: APP_
"#,
            &mut warnings,
        );
        let pod = PodResolver::new(&index)
            .resolve(&manifest.resources()[0], &mut warnings)
            .unwrap();
        let unit = &pod.units[0];
        assert_eq!(unit.kind, WorkloadKind::StatefulSet);
        assert_eq!(unit.environment.get("level").map(String::as_str), Some("debug"));
        assert_eq!(unit.environment.get("APP_token").map(String::as_str), Some("secret"));
    }

    #[test]
    fn test_env_precedence() {
        let (unit, _) = single_unit(
            r#"
kind: ConfigMap
metadata:
  name: a
data:
  SHARED: from-a
  ONLY_A: a
---
kind: ConfigMap
metadata:
  name: b
data:
  SHARED: from-b
---
kind: Deployment
metadata:
  name: app
spec:
  template:
    spec:
      containers:
        - name: app
          image: app
          envFrom:
            - configMapRef:
                name: a
            - configMapRef:
                name: b
          env:
            - name: ONLY_A
              value: literal
              valueFrom:
                configMapKeyRef:
                  name: a
                  key: ONLY_A
            - name: NUMBER
              value: 42
"#,
        );
        assert_eq!(unit.environment.get("SHARED").map(String::as_str), Some("from-b"));
        assert_eq!(unit.environment.get("ONLY_A").map(String::as_str), Some("literal"));
        assert_eq!(unit.environment.get("NUMBER").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_missing_references_are_value_local() {
        let (unit, warnings) = single_unit(
            r#"
kind: ConfigMap
metadata:
  name: cfg
data:
  present: yes
---
kind: Deployment
metadata:
  name: app
spec:
  template:
    spec:
      containers:
        - name: app
          image: app
          env:
            - name: GOOD
              valueFrom:
                configMapKeyRef:
                  name: cfg
                  key: present
            - name: NO_KEY
              valueFrom:
                configMapKeyRef:
                  name: cfg
                  key: absent
            - name: NO_MAP
              valueFrom:
                configMapKeyRef:
                  name: nope
                  key: present
            - name: OPTIONAL
              valueFrom:
                configMapKeyRef:
                  name: nope
                  key: present
                  optional: true
"#,
        );
        assert_eq!(unit.environment.get("GOOD").map(String::as_str), Some("yes"));
        assert!(!unit.environment.contains_key("NO_KEY"));
        assert!(!unit.environment.contains_key("NO_MAP"));
        assert!(!unit.environment.contains_key("OPTIONAL"));
        assert_eq!(warnings.count(WarningKind::MissingReference), 2);
    }

    #[test]
    fn test_field_ref() {
        let (unit, warnings) = single_unit(
            r#"
kind: Deployment
metadata:
  name: app
  labels:
    app.kubernetes.io/name: my-app
spec:
  replicas: 3
  template:
    spec:
      containers:
        - name: app
          image: app
          env:
            - name: POD_NAME
              valueFrom:
                fieldRef:
                  fieldPath: metadata.name
            - name: REPLICAS
              valueFrom:
                fieldRef:
                  fieldPath: spec.replicas
            - name: APP_LABEL
              valueFrom:
                fieldRef:
                  fieldPath: metadata.labels['app.kubernetes.io/name']
            - name: POD_IP
              valueFrom:
                fieldRef:
                  fieldPath: status.podIP
            - name: BROKEN
              valueFrom:
                fieldRef:
                  fieldPath: metadata..name
"#,
        );
        assert_eq!(unit.environment.get("POD_NAME").map(String::as_str), Some("app"));
        assert_eq!(unit.environment.get("REPLICAS").map(String::as_str), Some("3"));
        assert_eq!(unit.environment.get("APP_LABEL").map(String::as_str), Some("my-app"));
        assert!(!unit.environment.contains_key("POD_IP"));
        assert!(!unit.environment.contains_key("BROKEN"));
        assert_eq!(warnings.count(WarningKind::FieldRef), 2);
    }

    #[test]
    fn test_command_and_args_concatenate() {
        let (unit, _) = single_unit(
            r#"
kind: Deployment
metadata:
  name: app
spec:
  template:
    spec:
      containers:
        - name: app
          image: app
          command: ["/bin/server"]
          args: ["--port", 8080, "--verbose"]
"#,
        );
        assert_eq!(unit.command, vec!["/bin/server", "--port", "8080", "--verbose"]);
    }

    #[test]
    fn test_post_start_hooks() {
        let (pods, _) = resolve(
            r#"
kind: Deployment
metadata:
  name: app
spec:
  template:
    spec:
      containers:
        - name: exec
          image: app
          lifecycle:
            postStart:
              exec:
                command: ["sh", "-c", "echo started"]
        - name: http
          image: app
          lifecycle:
            postStart:
              httpGet:
                path: /warmup
                port: 8080
        - name: none
          image: app
"#,
        );
        let units = &pods[0].units;
        assert_eq!(
            units[0].post_start,
            Some(PostStartHook::Exec {
                command: vec!["sh".to_string(), "-c".to_string(), "echo started".to_string()]
            })
        );
        assert_eq!(
            units[1].post_start.as_ref().and_then(PostStartHook::http_target).as_deref(),
            Some("/warmup:8080")
        );
        assert_eq!(units[2].post_start, None);
    }

    const MOUNTS: &str = r#"
kind: ConfigMap
metadata:
  name: app-config
data:
  app.yaml: "listen: 80"
  log.conf: "level=info"
---
kind: Secret
metadata:
  name: db
data:
  password: cGFzcw==
  user: YWRtaW4=
  broken: "!!notbase64"
---
kind: Deployment
metadata:
  name: app
spec:
  template:
    spec:
      volumes:
        - name: config
          configMap:
            name: app-config
        - name: picked
          configMap:
            name: app-config
            items:
              - key: app.yaml
                path: conf/main.yaml
        - name: secrets
          secret:
            secretName: db
        - name: scratch
          emptyDir: {}
      containers:
        - name: app
          image: app
          volumeMounts:
            - name: config
              mountPath: /etc/app/
            - name: picked
              mountPath: /opt
            - name: secrets
              mountPath: /run/secrets/password
              subPath: password
            - name: secrets
              mountPath: /var/secrets
            - name: scratch
              mountPath: /tmp/scratch
"#;

    #[test]
    fn test_config_map_volume_mounts() {
        let (unit, _) = single_unit(MOUNTS);
        assert_eq!(unit.mounts.get("/etc/app/app.yaml").map(String::as_str), Some("listen: 80"));
        assert_eq!(unit.mounts.get("/etc/app/log.conf").map(String::as_str), Some("level=info"));
        assert_eq!(
            unit.mounts.get("/opt/conf/main.yaml").map(String::as_str),
            Some("listen: 80")
        );
        assert!(!unit.mounts.contains_key("/opt/log.conf"));
    }

    #[test]
    fn test_secret_sub_path_is_decoded() {
        let (unit, _) = single_unit(MOUNTS);
        assert_eq!(
            unit.mounts.get("/run/secrets/password").map(String::as_str),
            Some("pass")
        );
    }

    #[test]
    fn test_secret_decode_failure_skips_one_key() {
        let (unit, warnings) = single_unit(MOUNTS);
        assert_eq!(unit.mounts.get("/var/secrets/password").map(String::as_str), Some("pass"));
        assert_eq!(unit.mounts.get("/var/secrets/user").map(String::as_str), Some("admin"));
        assert!(!unit.mounts.contains_key("/var/secrets/broken"));
        assert_eq!(warnings.count(WarningKind::Decode), 1);
        // emptyDir volumes are not materialized and not an error
        assert!(!unit.mounts.keys().any(|k| k.starts_with("/tmp/scratch")));
        assert_eq!(warnings.count(WarningKind::MissingReference), 0);
    }

    #[test]
    fn test_only_main_container_gets_ports() {
        let (pods, _) = resolve(
            r#"
kind: Service
metadata:
  name: web
spec:
  selector:
    app: web
  ports:
    - port: 80
      targetPort: 8080
---
kind: Deployment
metadata:
  name: web
spec:
  template:
    metadata:
      labels:
        app: web
        tier: frontend
    spec:
      containers:
        - name: web
          image: nginx
        - image: envoy
"#,
        );
        let units = &pods[0].units;
        assert_eq!(units[0].ports, vec!["8080:8080"]);
        assert!(units[1].ports.is_empty());
        assert_eq!(units[1].name, "web-1");
    }

    #[test]
    fn test_unnamed_main_container_takes_pod_name() {
        let (unit, _) = single_unit(
            r#"
kind: Deployment
metadata:
  name: solo
spec:
  template:
    spec:
      containers:
        - image: busybox
"#,
        );
        assert_eq!(unit.name, "solo");
        assert_eq!(unit.pod, "solo");
    }

    #[test]
    fn test_unmatched_selector_gives_no_ports() {
        let (unit, _) = single_unit(
            r#"
kind: Service
metadata:
  name: other
spec:
  selector:
    app: other
  ports:
    - port: 80
---
kind: Service
metadata:
  name: headless
spec:
  ports:
    - port: 81
---
kind: Deployment
metadata:
  name: web
spec:
  template:
    metadata:
      labels:
        app: web
    spec:
      containers:
        - name: web
          image: nginx
"#,
        );
        assert!(unit.ports.is_empty());
    }

    #[test]
    fn test_malformed_workloads_are_resource_local() {
        let (pods, warnings) = resolve(
            r#"
kind: Deployment
metadata:
  name: no-template
spec: {}
---
kind: Deployment
metadata:
  name: no-containers
spec:
  template:
    spec:
      containers: []
---
kind: StatefulSet
metadata:
  name: bad-container
spec:
  template:
    spec:
      containers:
        - just-a-string
---
kind: Deployment
metadata:
  name: fine
spec:
  template:
    spec:
      containers:
        - name: fine
          image: ok
"#,
        );
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].pod, "fine");
        assert_eq!(warnings.count(WarningKind::InvalidResource), 3);
        let messages: Vec<String> = warnings.iter().map(|w| w.message.clone()).collect();
        assert!(messages.contains(&"missing spec.template.spec".to_string()));
        assert!(messages.contains(&"missing containers".to_string()));
        assert!(messages.contains(&"invalid container format at index 0".to_string()));
    }

    #[test]
    fn test_not_a_workload() {
        let index = ReferenceIndex::default();
        let mut warnings = Warnings::new();
        let resource = Resource::from_yaml("kind: ConfigMap\nmetadata:\n  name: x\n").unwrap();
        let err = PodResolver::new(&index).resolve(&resource, &mut warnings).unwrap_err();
        assert_eq!(err, ResolveError::NotAWorkload("ConfigMap".to_string()));
    }

    #[test]
    fn test_decode_secret() {
        assert_eq!(decode_secret(&Value::from("cGFzcw==")), Ok("pass".to_string()));
        assert!(decode_secret(&Value::from("%%%")).is_err());
        // valid base64, invalid UTF-8
        assert!(decode_secret(&Value::from("/w==")).is_err());
    }

    #[test]
    fn test_join_mount_path() {
        assert_eq!(join_mount_path("/etc/app/", "a.yaml"), "/etc/app/a.yaml");
        assert_eq!(join_mount_path("/", "a"), "/a");
        assert_eq!(join_mount_path("/etc", "/a"), "/etc/a");
    }
}
