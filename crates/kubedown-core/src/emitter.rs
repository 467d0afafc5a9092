//! Compose descriptor emitter
//!
//! Each unit gets its own directory holding a `docker-compose.yaml` and one
//! file per mount. A unit that cannot be written does not stop its siblings;
//! failures are collected on the [`EmitReport`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::{AppUnit, PostStartHook};
use crate::error::{CoreError, Result, WarningKind, Warnings};

pub const COMPOSE_FILE_NAME: &str = "docker-compose.yaml";

/// Restart policy applied to every service
pub const RESTART_POLICY: &str = "unless-stopped";

/// A compose file holding a single service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,

    pub restart: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_start: Vec<ComposeHook>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeHook {
    pub command: Vec<String>,
}

/// A file to write next to the compose file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountFile {
    pub file_name: String,
    pub content: String,
}

/// Build the compose description of one unit and the files it bind-mounts.
///
/// Mount files are named after the last segment of their container path. When
/// two mounts share that name, later ones get a numeric prefix.
pub fn compose_for(unit: &AppUnit, warnings: &mut Warnings) -> (ComposeFile, Vec<MountFile>) {
    let mut files = Vec::with_capacity(unit.mounts.len());
    let mut volumes = Vec::with_capacity(unit.mounts.len());
    let mut taken = HashSet::new();

    for (mount_path, content) in &unit.mounts {
        let base = mount_path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or("mount");
        let mut file_name = base.to_string();
        let mut n = 1;
        while !taken.insert(file_name.clone()) || file_name == COMPOSE_FILE_NAME {
            file_name = format!("{}-{}", n, base);
            n += 1;
        }

        volumes.push(format!("./{}:{}", file_name, mount_path));
        files.push(MountFile {
            file_name,
            content: content.clone(),
        });
    }

    let post_start = match &unit.post_start {
        Some(PostStartHook::Exec { command }) => vec![ComposeHook {
            command: command.clone(),
        }],
        Some(hook @ PostStartHook::HttpGet { .. }) => {
            warnings.push(
                WarningKind::Unsupported,
                &unit.name,
                format!(
                    "httpGet postStart hook ({}) has no compose equivalent and was dropped",
                    hook.http_target().unwrap_or_default()
                ),
            );
            Vec::new()
        }
        None => Vec::new(),
    };

    let service = ComposeService {
        image: unit.image.clone(),
        command: unit.command.clone(),
        environment: unit.environment.clone(),
        volumes,
        ports: unit.ports.clone(),
        restart: RESTART_POLICY.to_string(),
        network_mode: unit.network_mode.compose_value(),
        post_start,
    };

    let mut services = BTreeMap::new();
    services.insert(unit.name.clone(), service);
    (ComposeFile { services }, files)
}

/// Unit that made it to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedUnit {
    pub name: String,
    pub dir: PathBuf,
    pub files: usize,
}

/// Outcome of emitting a module
#[derive(Debug, Default)]
pub struct EmitReport {
    pub emitted: Vec<EmittedUnit>,
    /// One [`CoreError::Emit`] per unit that could not be written
    pub failures: Vec<CoreError>,
}

impl EmitReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn a partial emission into an error
    pub fn check(&self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::EmitIncomplete {
                failed: self.failures.len(),
                total: self.failures.len() + self.emitted.len(),
            })
        }
    }
}

/// Writes units below a manifest root directory
#[derive(Debug, Clone)]
pub struct Emitter {
    root: PathBuf,
}

impl Emitter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output directory for `unit`.
    ///
    /// A module made of a single unit with the module's own name is written
    /// flat as `<root>/<unit>`; everything else goes to `<root>/<module>/<unit>`.
    pub fn unit_dir(&self, module: &str, unit: &AppUnit, module_units: usize) -> PathBuf {
        if module_units == 1 && unit.name == module {
            self.root.join(&unit.name)
        } else {
            self.root.join(module).join(&unit.name)
        }
    }

    /// Emit every unit of `module`, continuing past units that fail.
    ///
    /// Container names are only unique within a pod. Units whose name is
    /// shared with a unit of another pod are written to `<pod>-<unit>`
    /// instead, and a unit whose directory is still taken fails rather than
    /// overwriting the earlier one.
    pub fn emit(&self, module: &str, units: &[AppUnit], warnings: &mut Warnings) -> EmitReport {
        let mut report = EmitReport::default();

        let mut name_counts: HashMap<&str, usize> = HashMap::new();
        for unit in units {
            *name_counts.entry(unit.name.as_str()).or_default() += 1;
        }
        let mut taken = HashSet::new();

        for unit in units {
            let shared = name_counts.get(unit.name.as_str()).copied().unwrap_or_default() > 1;
            let dir = if shared {
                let dir = self.root.join(module).join(format!("{}-{}", unit.pod, unit.name));
                warnings.push(
                    WarningKind::Duplicate,
                    format!("{}/{}", unit.pod, unit.name),
                    format!("container name is used by several pods, writing to {}", dir.display()),
                );
                dir
            } else {
                self.unit_dir(module, unit, units.len())
            };

            if !taken.insert(dir.clone()) {
                let error = CoreError::Emit {
                    unit: unit.name.clone(),
                    path: dir,
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "another unit of this module is written to the same directory",
                    ),
                };
                tracing::error!("{}", error);
                report.failures.push(error);
                continue;
            }

            match self.write_unit(unit, &dir, warnings) {
                Ok(files) => {
                    tracing::debug!(
                        unit = %unit.name,
                        dir = %dir.display(),
                        "compose file written"
                    );
                    report.emitted.push(EmittedUnit {
                        name: unit.name.clone(),
                        dir,
                        files,
                    });
                }
                Err(source) => {
                    let error = CoreError::Emit {
                        unit: unit.name.clone(),
                        path: dir,
                        source,
                    };
                    tracing::error!("{}", error);
                    report.failures.push(error);
                }
            }
        }

        report
    }

    fn write_unit(
        &self,
        unit: &AppUnit,
        dir: &Path,
        warnings: &mut Warnings,
    ) -> std::io::Result<usize> {
        let (compose, files) = compose_for(unit, warnings);
        let yaml = serde_yaml::to_string(&compose)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::create_dir_all(dir)?;
        for file in &files {
            fs::write(dir.join(&file.file_name), &file.content)?;
        }
        fs::write(dir.join(COMPOSE_FILE_NAME), yaml)?;

        Ok(files.len())
    }
}
