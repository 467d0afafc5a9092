//! The full manifest-to-units pipeline

use crate::app::{AppUnit, PodUnits};
use crate::error::{Result, Warnings};
use crate::index::{IndexOptions, ReferenceIndex};
use crate::resolver::resolve_workloads;
use crate::resource::Manifest;
use crate::topology;

#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateOptions {
    /// Run every unit on the host network instead of publishing ports
    pub host_network: bool,
}

/// Result of a translation: resolved pods plus everything that was skipped
#[derive(Debug)]
pub struct Translation {
    pub pods: Vec<PodUnits>,
    pub warnings: Warnings,
}

impl Translation {
    /// Every unit, pod by pod
    pub fn units(&self) -> impl Iterator<Item = &AppUnit> {
        self.pods.iter().flat_map(|p| p.units.iter())
    }

    pub fn into_units(self) -> Vec<AppUnit> {
        self.pods.into_iter().flat_map(|p| p.units).collect()
    }

    pub fn unit(&self, name: &str) -> Option<&AppUnit> {
        self.units().find(|u| u.name == name)
    }
}

/// Classify, index, resolve and lay out the network of a rendered manifest.
///
/// Only a host-network port conflict fails the call; every other problem is
/// reported in [`Translation::warnings`].
pub fn translate(text: &str, options: TranslateOptions) -> Result<Translation> {
    let mut warnings = Warnings::new();

    let manifest = Manifest::parse(text, &mut warnings);
    let index = ReferenceIndex::build(
        &manifest,
        IndexOptions {
            host_network: options.host_network,
        },
        &mut warnings,
    )?;

    let mut pods = resolve_workloads(&manifest, &index, &mut warnings);
    for pod in &mut pods {
        topology::adjust(pod, options.host_network);
    }

    tracing::debug!(
        resources = manifest.len(),
        pods = pods.len(),
        warnings = warnings.len(),
        "translation finished"
    );

    Ok(Translation { pods, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::NetworkMode;
    use crate::error::{CoreError, WarningKind};

    const WEB: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: web-cfg
data:
  port: "8080"
---
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  selector:
    app: web
  ports:
    - port: 8080
      targetPort: 8080
---
apiVersion: apps/v1
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
          image: nginx:1.25
          env:
            - name: PORT
              valueFrom:
                configMapKeyRef:
                  name: web-cfg
                  key: port
"#;

    #[test]
    fn test_end_to_end_web() {
        let translation = translate(WEB, TranslateOptions::default()).unwrap();
        assert!(translation.warnings.is_empty());

        let units: Vec<&AppUnit> = translation.units().collect();
        assert_eq!(units.len(), 1);
        let web = units[0];
        assert_eq!(web.image, "nginx:1.25");
        assert_eq!(web.environment.len(), 1);
        assert_eq!(web.environment.get("PORT").map(String::as_str), Some("8080"));
        assert_eq!(web.ports, vec!["8080:8080"]);
        assert_eq!(web.network_mode, NetworkMode::None);
    }

    #[test]
    fn test_translation_is_idempotent() {
        let a = translate(WEB, TranslateOptions::default()).unwrap();
        let b = translate(WEB, TranslateOptions::default()).unwrap();
        assert_eq!(a.pods, b.pods);
    }

    #[test]
    fn test_host_network_single_unit() {
        let translation = translate(WEB, TranslateOptions { host_network: true }).unwrap();
        let web = translation.unit("web").unwrap();
        assert_eq!(web.network_mode, NetworkMode::Host);
        assert!(web.ports.is_empty());
    }

    #[test]
    fn test_sidecars_share_first_unit_network() {
        let text = format!(
            "{}\n        - name: proxy\n          image: envoy\n        - image: fluentbit\n",
            WEB.trim_end()
        );
        let translation = translate(&text, TranslateOptions::default()).unwrap();
        let units: Vec<&AppUnit> = translation.units().collect();
        assert_eq!(units.len(), 3);

        assert_eq!(units[0].network_mode, NetworkMode::None);
        assert_eq!(units[0].ports, vec!["8080:8080"]);
        let attached: Vec<&AppUnit> = units
            .iter()
            .copied()
            .filter(|u| u.network_mode == NetworkMode::AttachTo("web".to_string()))
            .collect();
        assert_eq!(attached.len(), 2);
        assert!(attached.iter().all(|u| u.ports.is_empty()));
        assert_eq!(units[2].name, "web-2");
    }

    #[test]
    fn test_host_network_port_conflict_names_both_services() {
        let text = r#"
kind: Service
metadata:
  name: api
spec:
  ports:
    - port: 80
---
kind: Service
metadata:
  name: admin
spec:
  ports:
    - port: 81
      targetPort: 80
"#;
        let err = translate(text, TranslateOptions { host_network: true }).unwrap_err();
        match &err {
            CoreError::PortConflict { port, existing, service } => {
                assert_eq!(*port, 80);
                assert_eq!(existing, "api");
                assert_eq!(service, "admin");
            }
            other => panic!("unexpected error: {}", other),
        }
        let message = err.to_string();
        assert!(message.contains("api") && message.contains("admin"));

        // the same manifest is fine without host networking
        assert!(translate(text, TranslateOptions::default()).is_ok());
    }

    #[test]
    fn test_host_network_rewrites_hosts_seen_by_containers() {
        let text = r#"
kind: Service
metadata:
  name: db
spec:
  selector:
    app: db
  ports:
    - port: 5432
---
kind: ConfigMap
metadata:
  name: app-cfg
data:
  DATABASE_URL: postgres://db:5432/app
---
kind: Deployment
metadata:
  name: app
spec:
  template:
    spec:
      containers:
        - image: app
          envFrom:
            - configMapRef:
                name: app-cfg
"#;
        let translation = translate(text, TranslateOptions { host_network: true }).unwrap();
        assert_eq!(
            translation.unit("app").unwrap().environment["DATABASE_URL"],
            "postgres://localhost:5432/app"
        );

        let translation = translate(text, TranslateOptions::default()).unwrap();
        assert_eq!(
            translation.unit("app").unwrap().environment["DATABASE_URL"],
            "postgres://db:5432/app"
        );
    }

    #[test]
    fn test_secret_string_data_reaches_containers() {
        let text = r#"
kind: Secret
metadata:
  name: db
stringData:
  password: s3cret
  config.ini: "[db]\nhost=db\n"
---
kind: Deployment
metadata:
  name: app
spec:
  template:
    spec:
      containers:
        - image: app
          env:
            - name: DB_PASSWORD
              valueFrom:
                secretKeyRef:
                  name: db
                  key: password
          volumeMounts:
            - name: conf
              mountPath: /etc/app/config.ini
              subPath: config.ini
      volumes:
        - name: conf
          secret:
            secretName: db
"#;
        let translation = translate(text, TranslateOptions::default()).unwrap();
        assert!(translation.warnings.is_empty());

        let app = translation.unit("app").unwrap();
        assert_eq!(app.environment["DB_PASSWORD"], "s3cret");
        assert_eq!(app.mounts["/etc/app/config.ini"], "[db]\nhost=db\n");
    }

    #[test]
    fn test_broken_documents_do_not_stop_others() {
        let text = format!("kind: [broken\n---\nkind: Deployment\nmetadata: {{}}\n---\n{}", WEB);
        let translation = translate(&text, TranslateOptions::default()).unwrap();
        assert_eq!(translation.units().count(), 1);
        assert_eq!(translation.warnings.count(WarningKind::Parse), 2);
    }

    #[test]
    fn test_empty_input() {
        let translation = translate("", TranslateOptions::default()).unwrap();
        assert!(translation.pods.is_empty());
        assert!(translation.into_units().is_empty());
    }
}
