//! Reference index: ConfigMaps, Secrets and Services by name
//!
//! Built once per manifest set and read-only afterwards. The pod resolver only
//! ever sees it through a shared reference.

use indexmap::IndexMap;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

use crate::error::{CoreError, Result, WarningKind, Warnings};
use crate::resource::{Manifest, Resource, ResourceKind};
use crate::value::{Map, MapExt, Value};

/// A single effective Service port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    /// `targetPort` when numeric, otherwise `port`
    pub port: u16,
    pub protocol: String,
}

impl ServicePort {
    /// `host:container` mapping; non-TCP protocols get a `/udp`-style suffix
    pub fn mapping(&self) -> String {
        if self.protocol.eq_ignore_ascii_case("TCP") {
            format!("{}:{}", self.port, self.port)
        } else {
            format!(
                "{}:{}/{}",
                self.port,
                self.port,
                self.protocol.to_ascii_lowercase()
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<ServicePort>,
}

impl ServiceInfo {
    /// A non-empty selector whose every pair appears in `labels`
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        !self.selector.is_empty()
            && self
                .selector
                .iter()
                .all(|(k, v)| labels.get(k).is_some_and(|l| l == v))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    /// Workloads will share the host network namespace
    pub host_network: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    config_maps: HashMap<String, Map>,
    secrets: HashMap<String, Map>,
    /// Manifest order, so selector matching is deterministic
    services: IndexMap<String, ServiceInfo>,
}

impl ReferenceIndex {
    /// Index every ConfigMap, Secret and Service in `manifest`.
    ///
    /// In host-network mode, a port claimed by two different services is a
    /// fatal [`CoreError::PortConflict`], and service names inside ConfigMap
    /// values are rewritten to `localhost`.
    pub fn build(
        manifest: &Manifest,
        options: IndexOptions,
        warnings: &mut Warnings,
    ) -> Result<Self> {
        let mut index = Self::default();
        let mut used_ports: HashMap<u16, String> = HashMap::new();

        for resource in manifest.resources() {
            match resource.kind {
                ResourceKind::ConfigMap | ResourceKind::Secret => {
                    index.upsert_data(resource, warnings);
                }
                ResourceKind::Service => {
                    let info = service_info(resource, warnings);
                    if options.host_network {
                        claim_ports(&info, &mut used_ports)?;
                    }
                    if index.services.insert(info.name.clone(), info).is_some() {
                        warnings.push(
                            WarningKind::Duplicate,
                            resource.display_name(),
                            "overrides an earlier Service with the same name",
                        );
                    }
                }
                _ => {}
            }
        }

        if options.host_network {
            index.rewrite_service_hosts();
        }

        tracing::debug!(
            config_maps = index.config_maps.len(),
            secrets = index.secrets.len(),
            services = index.services.len(),
            "reference index built"
        );

        Ok(index)
    }

    fn upsert_data(&mut self, resource: &Resource, warnings: &mut Warnings) {
        let table = match resource.kind {
            ResourceKind::Secret => &mut self.secrets,
            _ => &mut self.config_maps,
        };
        if table
            .insert(resource.name().to_string(), resource.data.clone())
            .is_some()
        {
            warnings.push(
                WarningKind::Duplicate,
                resource.display_name(),
                format!("overrides an earlier {} with the same name", resource.kind),
            );
        }
    }

    /// Replace whole-word service names in ConfigMap strings with `localhost`,
    /// approximating cluster DNS once everything shares one namespace.
    fn rewrite_service_hosts(&mut self) {
        if self.services.is_empty() {
            return;
        }

        // longest first so `web-api` is rewritten before `web` can split it
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let patterns: Vec<Regex> = names
            .iter()
            .filter_map(|name| Regex::new(&format!(r"\b{}\b", regex::escape(name))).ok())
            .collect();

        for data in self.config_maps.values_mut() {
            for value in data.values_mut() {
                if let Value::String(s) = value {
                    for pattern in &patterns {
                        if pattern.is_match(s) {
                            *s = pattern.replace_all(s, "localhost").into_owned();
                        }
                    }
                }
            }
        }
    }

    pub fn config_map(&self, name: &str) -> Option<&Map> {
        self.config_maps.get(name)
    }

    /// Raw (still base64-encoded) Secret data
    pub fn secret(&self, name: &str) -> Option<&Map> {
        self.secrets.get(name)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceInfo> {
        self.services.get(name)
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceInfo> {
        self.services.values()
    }

    /// First Service (manifest order) whose selector matches `labels`
    pub fn service_for(&self, labels: &BTreeMap<String, String>) -> Option<&ServiceInfo> {
        self.services.values().find(|s| s.matches(labels))
    }

    /// Builder-style insertion, mostly for tests with synthetic indices
    pub fn with_config_map(mut self, name: &str, data: Map) -> Self {
        self.config_maps.insert(name.to_string(), data);
        self
    }

    pub fn with_secret(mut self, name: &str, data: Map) -> Self {
        self.secrets.insert(name.to_string(), data);
        self
    }

    pub fn with_service(mut self, info: ServiceInfo) -> Self {
        self.services.insert(info.name.clone(), info);
        self
    }
}

fn service_info(resource: &Resource, warnings: &mut Warnings) -> ServiceInfo {
    let name = resource.name().to_string();
    let selector = resource.spec.string_map("selector");
    let mut ports = Vec::new();

    match resource.spec.get("ports") {
        None => {}
        Some(Value::List(entries)) => {
            for entry in entries {
                let Some(entry) = entry.as_map() else {
                    warnings.push(
                        WarningKind::InvalidResource,
                        resource.display_name(),
                        "port entry is not a mapping",
                    );
                    continue;
                };
                let port = entry
                    .get("targetPort")
                    .and_then(Value::as_port)
                    .or_else(|| entry.get("port").and_then(Value::as_port));
                let Some(port) = port else {
                    warnings.push(
                        WarningKind::InvalidResource,
                        resource.display_name(),
                        "port entry has no numeric port or targetPort",
                    );
                    continue;
                };
                let protocol = entry.str_field("protocol").unwrap_or("TCP").to_string();
                ports.push(ServicePort { port, protocol });
            }
        }
        Some(_) => {
            warnings.push(
                WarningKind::InvalidResource,
                resource.display_name(),
                "spec.ports is not a list",
            );
        }
    }

    ServiceInfo {
        name,
        selector,
        ports,
    }
}

fn claim_ports(info: &ServiceInfo, used: &mut HashMap<u16, String>) -> Result<()> {
    for port in &info.ports {
        match used.get(&port.port) {
            Some(existing) if existing != &info.name => {
                return Err(CoreError::PortConflict {
                    port: port.port,
                    existing: existing.clone(),
                    service: info.name.clone(),
                });
            }
            Some(_) => {}
            None => {
                used.insert(port.port, info.name.clone());
            }
        }
    }
    Ok(())
}
