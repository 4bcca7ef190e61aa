use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use api_types::GpuDirectConfig;
use api_types::GpuDirectFlavor;
use api_types::GpuDirectSetting;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde::Serialize;

/// Default accelerator attached to a machine type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceleratorDefault {
    #[serde(rename = "type")]
    pub accelerator_type: String,
    pub count: u32,
}

/// Machine type to default accelerator lookup.
#[derive(Debug, Clone, Default)]
pub struct AcceleratorDefaults {
    entries: HashMap<String, AcceleratorDefault>,
}

static BUILTIN_ACCELERATOR_DEFAULTS: Lazy<AcceleratorDefaults> = Lazy::new(|| {
    let families: [(&str, &str, &[(&str, u32)]); 5] = [
        (
            "a2-highgpu",
            "nvidia-tesla-a100",
            &[("1g", 1), ("2g", 2), ("4g", 4), ("8g", 8)],
        ),
        ("a2-megagpu", "nvidia-tesla-a100", &[("16g", 16)]),
        (
            "a2-ultragpu",
            "nvidia-a100-80gb",
            &[("1g", 1), ("2g", 2), ("4g", 4), ("8g", 8)],
        ),
        ("a3-highgpu", "nvidia-h100-80gb", &[("8g", 8)]),
        ("a3-megagpu", "nvidia-h100-mega-80gb", &[("8g", 8)]),
    ];

    let mut defaults = AcceleratorDefaults::default();
    for (family, accelerator_type, shapes) in families {
        for (suffix, count) in shapes {
            defaults.insert(format!("{family}-{suffix}"), accelerator_type, *count);
        }
    }
    for (vcpus, count) in [(4, 1), (8, 1), (12, 1), (16, 1), (24, 2), (32, 1), (48, 4), (96, 8)] {
        defaults.insert(format!("g2-standard-{vcpus}"), "nvidia-l4", count);
    }
    defaults
});

impl AcceleratorDefaults {
    /// Defaults for the accelerator-optimized machine families.
    pub fn builtin() -> Self {
        BUILTIN_ACCELERATOR_DEFAULTS.clone()
    }

    pub fn get(&self, machine_type: &str) -> Option<&AcceleratorDefault> {
        self.entries.get(machine_type)
    }

    pub fn insert(&mut self, machine_type: impl Into<String>, accelerator_type: &str, count: u32) {
        self.entries.insert(
            machine_type.into(),
            AcceleratorDefault {
                accelerator_type: accelerator_type.to_string(),
                count,
            },
        );
    }

    /// Merges a YAML map of `machine-type: {type, count}` over the current
    /// entries, returning how many entries were read.
    pub fn extend_from_yaml(&mut self, yaml: &str) -> Result<usize, serde_yaml::Error> {
        let overrides: HashMap<String, AcceleratorDefault> = serde_yaml::from_str(yaml)?;
        let count = overrides.len();
        self.entries.extend(overrides);
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// GPUDirect support of one machine type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuDirectProfile {
    pub flavor: GpuDirectFlavor,
    /// Manifests installing the transport plugin and device injector
    pub manifests: Vec<String>,
    /// RxDM sidecar image tag
    pub rxdm_version: String,
}

/// Machine type to GPUDirect profile lookup. A machine type present in this
/// table triggers the workload patch step.
#[derive(Debug, Clone, Default)]
pub struct GpuDirectSettings {
    entries: HashMap<String, GpuDirectProfile>,
}

const ACCELERATOR_MANIFESTS_BASE: &str =
    "https://raw.githubusercontent.com/GoogleCloudPlatform/container-engine-accelerators/master";

static BUILTIN_GPU_DIRECT_SETTINGS: Lazy<GpuDirectSettings> = Lazy::new(|| {
    let nri_injector = format!("{ACCELERATOR_MANIFESTS_BASE}/nri_device_injector/nri-device-injector.yaml");
    let mut settings = GpuDirectSettings::default();
    settings.insert(
        "a3-highgpu-8g",
        GpuDirectProfile {
            flavor: GpuDirectFlavor::Tcpx,
            manifests: vec![
                format!("{ACCELERATOR_MANIFESTS_BASE}/gpudirect-tcpx/nccl-tcpx-installer.yaml"),
                nri_injector.clone(),
            ],
            rxdm_version: "v2.0.12".to_string(),
        },
    );
    settings.insert(
        "a3-megagpu-8g",
        GpuDirectProfile {
            flavor: GpuDirectFlavor::Tcpxo,
            manifests: vec![
                format!("{ACCELERATOR_MANIFESTS_BASE}/gpudirect-tcpxo/nccl-tcpxo-installer.yaml"),
                nri_injector,
            ],
            rxdm_version: "v1.0.12".to_string(),
        },
    );
    settings
});

impl GpuDirectSettings {
    /// Profiles for the A3 machine shapes.
    pub fn builtin() -> Self {
        BUILTIN_GPU_DIRECT_SETTINGS.clone()
    }

    pub fn get(&self, machine_type: &str) -> Option<&GpuDirectProfile> {
        self.entries.get(machine_type)
    }

    pub fn insert(&mut self, machine_type: impl Into<String>, profile: GpuDirectProfile) {
        self.entries.insert(machine_type.into(), profile);
    }

    /// Merges a YAML map of `machine-type: {flavor, manifests, rxdm_version}`
    /// over the current entries, returning how many entries were read.
    pub fn extend_from_yaml(&mut self, yaml: &str) -> Result<usize, serde_yaml::Error> {
        let overrides: HashMap<String, GpuDirectProfile> = serde_yaml::from_str(yaml)?;
        let count = overrides.len();
        self.entries.extend(overrides);
        Ok(count)
    }

    /// Resolves the GPUDirect setting for `machine_type`, applying the user's
    /// overrides. Machine types without a profile get the no-op setting.
    pub fn resolve(
        &self,
        machine_type: &str,
        config: Option<&GpuDirectConfig>,
    ) -> GpuDirectSetting {
        let Some(profile) = self.get(machine_type) else {
            if config.is_some() {
                tracing::warn!(
                    "gpu_direct_config ignored: machine type {} has no GPUDirect support",
                    machine_type
                );
            }
            return GpuDirectSetting::default();
        };

        let manifest_paths = config
            .and_then(|c| c.gpu_direct_manifests.clone())
            .unwrap_or_else(|| profile.manifests.clone());
        let rxdm_version = config
            .and_then(|c| c.rxdm_version.clone())
            .unwrap_or_else(|| profile.rxdm_version.clone());
        let workload_path = config
            .and_then(|c| c.user_workload_path.as_deref())
            .map(|path| patched_workload_path(path, profile.flavor));

        GpuDirectSetting {
            flavor: Some(profile.flavor),
            manifest_paths,
            workload_path,
            rxdm_version,
        }
    }
}

/// `job.yaml` becomes `job-tcpx.yaml` next to the original.
pub fn patched_workload_path(source: &Path, flavor: GpuDirectFlavor) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "yaml".to_string());
    source.with_file_name(format!("{stem}-{flavor}.{extension}"))
}

/// Read-only lookup tables used during one resolution pass.
#[derive(Debug, Clone)]
pub struct LookupTables {
    pub accelerator_defaults: AcceleratorDefaults,
    pub gpu_direct: GpuDirectSettings,
}

impl Default for LookupTables {
    fn default() -> Self {
        Self {
            accelerator_defaults: AcceleratorDefaults::builtin(),
            gpu_direct: GpuDirectSettings::builtin(),
        }
    }
}

/// Loads the lookup tables, layering optional YAML files over the built-in
/// entries.
pub async fn load_tables(
    accelerator_defaults_path: Option<&Path>,
    gpu_direct_settings_path: Option<&Path>,
) -> anyhow::Result<LookupTables> {
    let mut tables = LookupTables::default();

    if let Some(path) = accelerator_defaults_path {
        tracing::info!("Loading accelerator defaults from {:?}", path);
        let yaml_content = tokio::fs::read_to_string(path).await?;
        let loaded = tables.accelerator_defaults.extend_from_yaml(&yaml_content)?;
        tracing::info!("Loaded {} accelerator default entries", loaded);
    }

    if let Some(path) = gpu_direct_settings_path {
        tracing::info!("Loading GPUDirect settings from {:?}", path);
        let yaml_content = tokio::fs::read_to_string(path).await?;
        let loaded = tables.gpu_direct.extend_from_yaml(&yaml_content)?;
        tracing::info!("Loaded {} GPUDirect setting entries", loaded);
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use similar_asserts::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn builtin_accelerator_defaults_cover_a3() {
        let defaults = AcceleratorDefaults::builtin();
        assert_eq!(
            defaults.get("a3-highgpu-8g"),
            Some(&AcceleratorDefault {
                accelerator_type: "nvidia-h100-80gb".to_string(),
                count: 8
            })
        );
        assert_eq!(defaults.get("g2-standard-48").map(|d| d.count), Some(4));
        assert!(defaults.get("n2-standard-8").is_none());
    }

    #[test]
    fn accelerator_defaults_yaml_overrides_builtin() {
        let mut defaults = AcceleratorDefaults::builtin();
        let loaded = defaults
            .extend_from_yaml(
                r#"
a3-highgpu-8g:
  type: custom-h100
  count: 4
ct5p-hightpu-4t:
  type: tpu-v5p
  count: 4
"#,
            )
            .unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(defaults.get("a3-highgpu-8g").map(|d| d.count), Some(4));
        assert_eq!(
            defaults.get("ct5p-hightpu-4t").map(|d| d.accelerator_type.as_str()),
            Some("tpu-v5p")
        );
    }

    #[test]
    fn resolve_known_shape_uses_profile() {
        let settings = GpuDirectSettings::builtin();
        let config = GpuDirectConfig {
            user_workload_path: Some(PathBuf::from("/work/nccl-test.yaml")),
            ..Default::default()
        };

        let setting = settings.resolve("a3-highgpu-8g", Some(&config));

        assert_eq!(setting.flavor, Some(GpuDirectFlavor::Tcpx));
        assert_eq!(setting.rxdm_version, "v2.0.12");
        assert_eq!(setting.manifest_paths.len(), 2);
        assert!(setting.manifest_paths[0].ends_with("gpudirect-tcpx/nccl-tcpx-installer.yaml"));
        assert_eq!(
            setting.workload_path,
            Some(PathBuf::from("/work/nccl-test-tcpx.yaml"))
        );
    }

    #[test]
    fn resolve_applies_user_overrides() {
        let settings = GpuDirectSettings::builtin();
        let config = GpuDirectConfig {
            user_workload_path: None,
            gpu_direct_manifests: Some(vec!["local/installer.yaml".to_string()]),
            rxdm_version: Some("v1.0.9".to_string()),
        };

        let setting = settings.resolve("a3-megagpu-8g", Some(&config));

        assert_eq!(setting.flavor, Some(GpuDirectFlavor::Tcpxo));
        assert_eq!(setting.manifest_paths, vec!["local/installer.yaml".to_string()]);
        assert_eq!(setting.rxdm_version, "v1.0.9");
        assert_eq!(setting.workload_path, None);
    }

    #[test]
    fn resolve_unknown_shape_is_noop() {
        let settings = GpuDirectSettings::builtin();
        let config = GpuDirectConfig {
            user_workload_path: Some(PathBuf::from("job.yaml")),
            ..Default::default()
        };

        assert_eq!(
            settings.resolve("n2-standard-8", Some(&config)),
            GpuDirectSetting::default()
        );
    }

    #[test]
    fn gpu_direct_table_is_extensible_from_yaml() {
        let mut settings = GpuDirectSettings::builtin();
        settings
            .extend_from_yaml(
                r#"
a3-edgegpu-8g:
  flavor: tcpxo
  manifests: []
  rxdm_version: v1.0.12
"#,
            )
            .unwrap();

        let setting = settings.resolve("a3-edgegpu-8g", None);
        assert_eq!(setting.flavor, Some(GpuDirectFlavor::Tcpxo));
        assert!(setting.manifest_paths.is_empty());
    }

    #[test]
    fn patched_path_keeps_directory_and_extension() {
        assert_eq!(
            patched_workload_path(Path::new("dir/job.yml"), GpuDirectFlavor::Tcpxo),
            PathBuf::from("dir/job-tcpxo.yml")
        );
        assert_eq!(
            patched_workload_path(Path::new("job"), GpuDirectFlavor::Tcpx),
            PathBuf::from("job-tcpx.yaml")
        );
    }

    #[tokio::test]
    async fn load_tables_layers_files() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"n1-standard-8:\n  type: nvidia-tesla-t4\n  count: 1\n")
            .unwrap();

        let tables = load_tables(Some(file.path()), None).await.unwrap();

        assert_eq!(
            tables
                .accelerator_defaults
                .get("n1-standard-8")
                .map(|d| d.accelerator_type.as_str()),
            Some("nvidia-tesla-t4")
        );
        assert!(tables.gpu_direct.get("a3-highgpu-8g").is_some());
    }

    #[tokio::test]
    async fn load_tables_fails_on_missing_file() {
        let result = load_tables(None, Some(Path::new("/nonexistent/gpu-direct.yaml"))).await;
        assert!(result.is_err());
    }
}
