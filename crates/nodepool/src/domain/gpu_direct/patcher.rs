use std::io;
use std::path::Path;

use api_types::GpuDirectFlavor;
use api_types::GpuDirectSetting;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Capabilities;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::EmptyDirVolumeSource;
use k8s_openapi::api::core::v1::EnvVar;
use k8s_openapi::api::core::v1::HostPathVolumeSource;
use k8s_openapi::api::core::v1::SecurityContext;
use k8s_openapi::api::core::v1::Volume;
use k8s_openapi::api::core::v1::VolumeMount;
use serde::Deserialize;
use serde_yaml::Mapping;
use serde_yaml::Sequence;
use serde_yaml::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::profile::sidecar_profile;
use super::profile::SidecarProfile;
use crate::domain::errors::PatchError;

/// Rewrites workload manifests so their pods run the RxDM sidecar of a
/// GPUDirect flavor.
///
/// Every pod template found in the manifest (Pods, Jobs, Deployments,
/// JobSets, ...) gets the sidecar container, its host volumes, the GKE
/// multi-network annotations, and the mounts and environment the workload
/// containers need. Entries are upserted by name, so patching an already
/// patched manifest returns it unchanged. A workload mount at one of the
/// injected paths is replaced, and injected library paths are prepended to
/// the workload's own `LD_LIBRARY_PATH`.
#[derive(Debug, Clone)]
pub struct WorkloadPatcher {
    profile: &'static SidecarProfile,
    rxdm_version: String,
}

/// Values injected into each pod template, rendered once per manifest.
struct Injection {
    annotations: Vec<(String, String)>,
    volumes: Vec<Value>,
    sidecar: Value,
    workload_mounts: Vec<Value>,
    workload_env: Vec<Value>,
}

impl WorkloadPatcher {
    pub fn new(flavor: GpuDirectFlavor, rxdm_version: impl Into<String>) -> Self {
        Self {
            profile: sidecar_profile(flavor),
            rxdm_version: rxdm_version.into(),
        }
    }

    /// Patcher for a resolved setting, or `None` for the no-op setting.
    pub fn from_setting(setting: &GpuDirectSetting) -> Option<Self> {
        setting
            .flavor
            .map(|flavor| Self::new(flavor, setting.rxdm_version.clone()))
    }

    pub fn sidecar_name(&self) -> &'static str {
        self.profile.container_name
    }

    /// Patches a (multi-document) YAML manifest. `path` is only used for
    /// error reporting.
    ///
    /// # Errors
    ///
    /// - [`PatchError::ManifestParse`] if the manifest is not valid YAML
    /// - [`PatchError::NoPodTemplate`] if no document contains a pod template
    /// - [`PatchError::Render`] if the patched manifest cannot be serialized
    pub fn patch_manifest(&self, manifest: &str, path: &Path) -> Result<String, Report<PatchError>> {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(manifest) {
            let value = Value::deserialize(document).change_context_lazy(|| {
                PatchError::ManifestParse {
                    path: path.to_path_buf(),
                }
            })?;
            if !value.is_null() {
                documents.push(value);
            }
        }

        let injection = self.injection()?;
        let patched: usize = documents
            .iter_mut()
            .map(|document| patch_pod_templates(document, self.profile, &injection))
            .sum();
        if patched == 0 {
            return Err(Report::new(PatchError::NoPodTemplate {
                path: path.to_path_buf(),
            }));
        }
        debug!("patched {} pod template(s) in {}", patched, path.display());

        let rendered = documents
            .iter()
            .map(serde_yaml::to_string)
            .collect::<Result<Vec<_>, _>>()
            .change_context(PatchError::Render)?;
        Ok(rendered.join("---\n"))
    }

    /// Reads `source`, patches it and writes the result to `destination`.
    ///
    /// # Errors
    ///
    /// - [`PatchError::ManifestNotFound`] if `source` does not exist
    /// - [`PatchError::ManifestRead`] if `source` cannot be read
    /// - [`PatchError::ManifestWrite`] if `destination` cannot be written
    /// - any error of [`Self::patch_manifest`]
    #[tracing::instrument(skip(self), fields(sidecar = self.profile.container_name))]
    pub async fn patch_file(&self, source: &Path, destination: &Path) -> Result<(), Report<PatchError>> {
        let manifest = match tokio::fs::read_to_string(source).await {
            Ok(manifest) => manifest,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Report::new(e).change_context(PatchError::ManifestNotFound {
                    path: source.to_path_buf(),
                }));
            }
            Err(e) => {
                return Err(Report::new(e).change_context(PatchError::ManifestRead {
                    path: source.to_path_buf(),
                }));
            }
        };

        let patched = self.patch_manifest(&manifest, source)?;

        tokio::fs::write(destination, patched)
            .await
            .change_context_lazy(|| PatchError::ManifestWrite {
                path: destination.to_path_buf(),
            })?;

        info!(
            "wrote patched workload {} (rxdm {})",
            destination.display(),
            self.rxdm_version
        );
        Ok(())
    }

    fn injection(&self) -> Result<Injection, Report<PatchError>> {
        let profile = self.profile;

        let devices: String = profile
            .devices
            .iter()
            .map(|device| format!("- path: {device}\n"))
            .collect();
        let interfaces = serde_json::Value::Array(
            (0..=profile.gpu_nic_count)
                .map(|index| {
                    let network = if index == 0 {
                        "default".to_string()
                    } else {
                        format!("vpc{index}")
                    };
                    serde_json::json!({"interfaceName": format!("eth{index}"), "network": network})
                })
                .collect(),
        );
        let annotations = vec![
            (
                format!("devices.gke.io/container.{}", profile.container_name),
                devices,
            ),
            (
                "networking.gke.io/default-interface".to_string(),
                "eth0".to_string(),
            ),
            (
                "networking.gke.io/interfaces".to_string(),
                interfaces.to_string(),
            ),
        ];

        let host_volumes = profile.host_volumes.iter().map(|volume| Volume {
            name: volume.name.to_string(),
            host_path: Some(HostPathVolumeSource {
                path: volume.host_path.to_string(),
                type_: None,
            }),
            ..Default::default()
        });
        let empty_dir_volumes = profile.empty_dir_volumes.iter().map(|name| Volume {
            name: name.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        });
        let volumes = host_volumes
            .chain(empty_dir_volumes)
            .map(|volume| to_value(&volume))
            .collect::<Result<Vec<_>, _>>()?;

        let capabilities = (!profile.capabilities.is_empty()).then(|| Capabilities {
            add: Some(strings(profile.capabilities)),
            drop: None,
        });
        let sidecar = Container {
            name: profile.container_name.to_string(),
            image: Some(format!("{}:{}", profile.image_repository, self.rxdm_version)),
            image_pull_policy: Some("Always".to_string()),
            command: Some(strings(profile.command)),
            args: (!profile.args.is_empty()).then(|| strings(profile.args)),
            security_context: Some(SecurityContext {
                privileged: profile.privileged.then_some(true),
                capabilities,
                ..Default::default()
            }),
            volume_mounts: Some(volume_mounts(profile.sidecar_mounts)),
            env: Some(env_vars(profile.sidecar_env)),
            ..Default::default()
        };

        Ok(Injection {
            annotations,
            volumes,
            sidecar: to_value(&sidecar)?,
            workload_mounts: volume_mounts(profile.workload_mounts)
                .iter()
                .map(to_value)
                .collect::<Result<_, _>>()?,
            workload_env: env_vars(profile.workload_env)
                .iter()
                .map(to_value)
                .collect::<Result<_, _>>()?,
        })
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn volume_mounts(mounts: &[(&str, &str)]) -> Vec<VolumeMount> {
    mounts
        .iter()
        .map(|(name, mount_path)| VolumeMount {
            name: name.to_string(),
            mount_path: mount_path.to_string(),
            ..Default::default()
        })
        .collect()
}

fn env_vars(env: &[(&str, &str)]) -> Vec<EnvVar> {
    env.iter()
        .map(|(name, value)| EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            value_from: None,
        })
        .collect()
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, Report<PatchError>> {
    serde_yaml::to_value(value).change_context(PatchError::Render)
}

/// A mapping whose `spec.containers` is a list: a Pod or a pod template.
fn is_pod_template(mapping: &Mapping) -> bool {
    mapping
        .get("spec")
        .and_then(|spec| spec.get("containers"))
        .is_some_and(Value::is_sequence)
}

fn patch_pod_templates(value: &mut Value, profile: &SidecarProfile, injection: &Injection) -> usize {
    match value {
        Value::Mapping(mapping) if is_pod_template(mapping) => {
            patch_pod_template(mapping, profile, injection);
            1
        }
        Value::Mapping(mapping) => mapping
            .values_mut()
            .map(|child| patch_pod_templates(child, profile, injection))
            .sum(),
        Value::Sequence(sequence) => sequence
            .iter_mut()
            .map(|child| patch_pod_templates(child, profile, injection))
            .sum(),
        Value::Tagged(tagged) => patch_pod_templates(&mut tagged.value, profile, injection),
        _ => 0,
    }
}

fn patch_pod_template(template: &mut Mapping, profile: &SidecarProfile, injection: &Injection) {
    let annotations = mapping_mut(mapping_mut(template, "metadata"), "annotations");
    for (key, value) in &injection.annotations {
        annotations.insert(Value::from(key.as_str()), Value::from(value.as_str()));
    }

    let spec = mapping_mut(template, "spec");
    let volumes = sequence_mut(spec, "volumes");
    for volume in &injection.volumes {
        upsert_named(volumes, volume.clone());
    }

    let containers = sequence_mut(spec, "containers");
    for container in containers.iter_mut() {
        let Value::Mapping(container) = container else {
            continue;
        };
        if container.get("name").and_then(Value::as_str) == Some(profile.container_name) {
            continue;
        }
        let mounts = sequence_mut(container, "volumeMounts");
        for mount in &injection.workload_mounts {
            upsert_mount(mounts, mount.clone());
        }
        let env = sequence_mut(container, "env");
        for var in &injection.workload_env {
            upsert_env(env, var.clone());
        }
    }
    upsert_named(containers, injection.sidecar.clone());
}

/// Replaces the entry with the same `name` in place, or appends.
fn upsert_named(sequence: &mut Sequence, item: Value) {
    let name = item.get("name").cloned();
    match sequence
        .iter_mut()
        .find(|existing| existing.get("name").is_some() && existing.get("name") == name.as_ref())
    {
        Some(existing) => *existing = item,
        None => sequence.push(item),
    }
}

/// Upserts a mount keyed by both `name` and `mountPath`. The first
/// conflicting entry is replaced in place and any other one is dropped, so a
/// path is never mounted twice.
fn upsert_mount(mounts: &mut Sequence, mount: Value) {
    let name = mount.get("name").cloned();
    let path = mount.get("mountPath").cloned();
    let conflicts = |existing: &Value| {
        same_field(existing, "name", name.as_ref()) || same_field(existing, "mountPath", path.as_ref())
    };

    let Some(first) = mounts.iter().position(conflicts) else {
        mounts.push(mount);
        return;
    };
    for existing in mounts.iter() {
        if conflicts(existing) && existing.get("name") != name.as_ref() {
            warn!(
                "replacing workload mount {:?} at {:?}",
                existing.get("name").and_then(serde_yaml::Value::as_str),
                existing.get("mountPath").and_then(serde_yaml::Value::as_str)
            );
        }
    }
    mounts[first] = mount;

    let mut index = 0;
    mounts.retain(|existing| {
        let keep = index == first || !conflicts(existing);
        index += 1;
        keep
    });
}

fn same_field(item: &Value, field: &str, expected: Option<&Value>) -> bool {
    expected.is_some() && item.get(field) == expected
}

/// Variables holding `:`-separated search paths.
const PATH_LIST_ENV: &[&str] = &["LD_LIBRARY_PATH"];

/// Upserts an env var by name. For search path variables the injected path
/// is prepended to the workload's value unless it is already listed.
fn upsert_env(env: &mut Sequence, var: Value) {
    let name = var.get("name").and_then(Value::as_str).unwrap_or_default();
    let injected = var.get("value").and_then(Value::as_str).unwrap_or_default();
    if PATH_LIST_ENV.contains(&name) {
        let existing = env
            .iter_mut()
            .find(|existing| existing.get("name").and_then(Value::as_str) == Some(name));
        if let Some(Value::Mapping(existing)) = existing {
            if let Some(current) = existing.get("value").and_then(Value::as_str) {
                if current.split(':').any(|path| path == injected) {
                    return;
                }
                let value = if current.is_empty() {
                    injected.to_string()
                } else {
                    format!("{injected}:{current}")
                };
                existing.insert(Value::from("value"), Value::from(value));
                return;
            }
        }
    }
    upsert_named(env, var);
}

fn mapping_mut<'a>(mapping: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    let value = mapping
        .entry(Value::from(key))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!("entry was replaced by a mapping"),
    }
}

fn sequence_mut<'a>(mapping: &'a mut Mapping, key: &str) -> &'a mut Sequence {
    let value = mapping
        .entry(Value::from(key))
        .or_insert_with(|| Value::Sequence(Sequence::new()));
    if !value.is_sequence() {
        *value = Value::Sequence(Sequence::new());
    }
    match value {
        Value::Sequence(sequence) => sequence,
        _ => unreachable!("entry was replaced by a sequence"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use similar_asserts::assert_eq;
    use tempfile::TempDir;
    use test_log::test;

    use super::*;

    const JOB: &str = r#"apiVersion: batch/v1
kind: Job
metadata:
  name: nccl-test
spec:
  template:
    metadata:
      labels:
        app: nccl
    spec:
      containers:
      - name: nccl
        image: nccl-tests:latest
        env:
        - name: LD_LIBRARY_PATH
          value: /opt/lib
        resources:
          limits:
            nvidia.com/gpu: 8
      restartPolicy: Never
"#;

    fn parse(manifest: &str) -> Vec<Value> {
        serde_yaml::Deserializer::from_str(manifest)
            .map(|doc| Value::deserialize(doc).unwrap())
            .collect()
    }

    fn pod_spec(document: &Value) -> &Value {
        &document["spec"]["template"]["spec"]
    }

    fn names(list: &Value) -> Vec<String> {
        list.as_sequence()
            .unwrap()
            .iter()
            .map(|item| item["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn tcpx_patch_injects_sidecar_volumes_and_annotations() {
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12");

        let patched = patcher.patch_manifest(JOB, Path::new("job.yaml")).unwrap();
        let document = &parse(&patched)[0];
        let spec = pod_spec(document);

        assert_eq!(names(&spec["containers"]), vec!["nccl", "tcpx-daemon"]);
        let sidecar = &spec["containers"][1];
        assert_eq!(
            sidecar["image"].as_str(),
            Some("us-docker.pkg.dev/gce-ai-infra/gpudirect-tcpx/tcpgpudmarxd-dev:v2.0.12")
        );
        assert_eq!(sidecar["securityContext"]["privileged"].as_bool(), Some(true));
        assert_eq!(
            names(&spec["volumes"]),
            vec!["libraries", "sys", "proc-sys", "tcpx-socket"]
        );

        let workload = &spec["containers"][0];
        assert_eq!(names(&workload["volumeMounts"]), vec!["tcpx-socket", "libraries"]);
        assert_eq!(
            workload["env"][0]["value"].as_str(),
            Some("/usr/local/nvidia/lib64:/opt/lib")
        );
        assert_eq!(workload["env"].as_sequence().map(Vec::len), Some(1));

        let annotations = &document["spec"]["template"]["metadata"]["annotations"];
        assert_eq!(
            annotations["networking.gke.io/default-interface"].as_str(),
            Some("eth0")
        );
        let interfaces: serde_json::Value = serde_json::from_str(
            annotations["networking.gke.io/interfaces"].as_str().unwrap(),
        )
        .unwrap();
        assert_eq!(interfaces.as_array().map(Vec::len), Some(5));
        assert_eq!(interfaces[4]["network"], "vpc4");
        assert!(annotations["devices.gke.io/container.tcpx-daemon"]
            .as_str()
            .unwrap()
            .contains("- path: /dev/nvidiactl\n"));
        assert_eq!(
            document["spec"]["template"]["metadata"]["labels"]["app"].as_str(),
            Some("nccl")
        );
    }

    #[test]
    fn tcpxo_patch_uses_its_profile() {
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpxo, "v1.0.12");

        let patched = patcher.patch_manifest(JOB, Path::new("job.yaml")).unwrap();
        let document = &parse(&patched)[0];
        let spec = pod_spec(document);

        assert_eq!(patcher.sidecar_name(), "tcpxo-daemon");
        assert_eq!(names(&spec["containers"]), vec!["nccl", "tcpxo-daemon"]);
        assert_eq!(
            spec["containers"][1]["securityContext"]["capabilities"]["add"][1].as_str(),
            Some("NET_BIND_SERVICE")
        );
        assert_eq!(
            names(&spec["containers"][0]["env"]),
            vec!["LD_LIBRARY_PATH", "NCCL_FASTRAK_LLCM_DEVICE_DIRECTORY"]
        );
        assert!(names(&spec["volumes"]).contains(&"aperture-devices".to_string()));
    }

    #[test]
    fn patching_is_idempotent() {
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12");
        let path = Path::new("job.yaml");

        let first = patcher.patch_manifest(JOB, path).unwrap();
        let again = patcher.patch_manifest(JOB, path).unwrap();
        let repatched = patcher.patch_manifest(&first, path).unwrap();

        assert_eq!(first, again);
        assert_eq!(first, repatched);
    }

    #[test]
    fn workload_mount_at_injected_path_is_replaced() {
        let pod = r#"apiVersion: v1
kind: Pod
metadata:
  name: trainer
spec:
  containers:
  - name: main
    image: trainer:latest
    volumeMounts:
    - name: scratch
      mountPath: /tmp
    - name: data
      mountPath: /data
  volumes:
  - name: scratch
    emptyDir: {}
"#;
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12");
        let path = Path::new("pod.yaml");

        let patched = patcher.patch_manifest(pod, path).unwrap();
        let document = &parse(&patched)[0];
        let mounts = document["spec"]["containers"][0]["volumeMounts"]
            .as_sequence()
            .unwrap();

        let at_tmp: Vec<_> = mounts
            .iter()
            .filter(|mount| mount["mountPath"].as_str() == Some("/tmp"))
            .map(|mount| mount["name"].as_str().unwrap())
            .collect();
        assert_eq!(at_tmp, vec!["tcpx-socket"]);
        assert_eq!(
            names(&document["spec"]["containers"][0]["volumeMounts"]),
            vec!["tcpx-socket", "data", "libraries"]
        );
        assert_eq!(patcher.patch_manifest(&patched, path).unwrap(), patched);
    }

    #[test]
    fn duplicate_conflicting_mounts_collapse_to_one() {
        let mut mounts = vec![
            serde_yaml::from_str::<Value>("{name: tcpx-socket, mountPath: /run/tcpx}").unwrap(),
            serde_yaml::from_str::<Value>("{name: scratch, mountPath: /tmp}").unwrap(),
        ];

        upsert_mount(
            &mut mounts,
            serde_yaml::from_str("{name: tcpx-socket, mountPath: /tmp}").unwrap(),
        );

        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0]["mountPath"].as_str(), Some("/tmp"));
    }

    #[test]
    fn library_path_is_prepended_once() {
        let injected: Value =
            serde_yaml::from_str("{name: LD_LIBRARY_PATH, value: /usr/local/nvidia/lib64}").unwrap();
        let mut env = vec![
            serde_yaml::from_str::<Value>("{name: LD_LIBRARY_PATH, value: /opt/custom/lib}").unwrap(),
        ];

        upsert_env(&mut env, injected.clone());
        upsert_env(&mut env, injected.clone());

        assert_eq!(
            env[0]["value"].as_str(),
            Some("/usr/local/nvidia/lib64:/opt/custom/lib")
        );

        let mut from_secret = vec![serde_yaml::from_str::<Value>(
            "{name: LD_LIBRARY_PATH, valueFrom: {configMapKeyRef: {name: libs, key: path}}}",
        )
        .unwrap()];
        upsert_env(&mut from_secret, injected.clone());
        assert_eq!(from_secret, vec![injected]);
    }

    #[test]
    fn new_rxdm_version_replaces_existing_sidecar() {
        let old = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.9")
            .patch_manifest(JOB, Path::new("job.yaml"))
            .unwrap();

        let patched = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12")
            .patch_manifest(&old, Path::new("job.yaml"))
            .unwrap();
        let document = &parse(&patched)[0];
        let containers = &pod_spec(document)["containers"];

        assert_eq!(names(containers), vec!["nccl", "tcpx-daemon"]);
        assert!(containers[1]["image"].as_str().unwrap().ends_with(":v2.0.12"));
    }

    #[test]
    fn only_documents_with_pod_templates_are_patched() {
        let manifest = format!(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: headless\nspec:\n  clusterIP: None\n---\n{JOB}"
        );
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12");

        let patched = patcher.patch_manifest(&manifest, Path::new("job.yaml")).unwrap();
        let documents = parse(&patched);

        assert_eq!(documents.len(), 2);
        assert!(documents[0]["spec"].get("volumes").is_none());
        assert!(documents[0].get("metadata").unwrap().get("annotations").is_none());
        assert_eq!(names(&pod_spec(&documents[1])["containers"]).len(), 2);
    }

    #[test]
    fn nested_job_set_templates_are_found() {
        let manifest = r#"apiVersion: jobset.x-k8s.io/v1alpha2
kind: JobSet
metadata:
  name: training
spec:
  replicatedJobs:
  - name: workers
    template:
      spec:
        template:
          spec:
            containers:
            - name: trainer
              image: trainer:latest
"#;
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpxo, "v1.0.12");

        let patched = patcher.patch_manifest(manifest, Path::new("jobset.yaml")).unwrap();
        let document = &parse(&patched)[0];
        let containers =
            &document["spec"]["replicatedJobs"][0]["template"]["spec"]["template"]["spec"]["containers"];

        assert_eq!(names(containers), vec!["trainer", "tcpxo-daemon"]);
    }

    #[test]
    fn manifest_without_pod_template_fails() {
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12");

        let error = patcher
            .patch_manifest("apiVersion: v1\nkind: ConfigMap\ndata: {}\n", Path::new("cm.yaml"))
            .unwrap_err();

        assert!(matches!(
            error.current_context(),
            PatchError::NoPodTemplate { .. }
        ));
    }

    #[test]
    fn unparseable_manifest_fails() {
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12");

        let error = patcher
            .patch_manifest("spec: [unterminated", Path::new("bad.yaml"))
            .unwrap_err();

        assert!(matches!(
            error.current_context(),
            PatchError::ManifestParse { .. }
        ));
    }

    #[test]
    fn no_op_setting_has_no_patcher() {
        assert!(WorkloadPatcher::from_setting(&GpuDirectSetting::default()).is_none());
    }

    #[test(tokio::test)]
    async fn patch_file_writes_identical_output_on_rerun() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("job.yaml");
        let destination = dir.path().join("job-tcpx.yaml");
        tokio::fs::write(&source, JOB).await.unwrap();
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12");

        patcher.patch_file(&source, &destination).await.unwrap();
        let first = tokio::fs::read(&destination).await.unwrap();
        patcher.patch_file(&source, &destination).await.unwrap();
        let second = tokio::fs::read(&destination).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(tokio::fs::read_to_string(&source).await.unwrap(), JOB);
    }

    #[test(tokio::test)]
    async fn patch_file_missing_source_fails() {
        let patcher = WorkloadPatcher::new(GpuDirectFlavor::Tcpx, "v2.0.12");

        let error = patcher
            .patch_file(
                Path::new("/nonexistent/job.yaml"),
                &PathBuf::from("/nonexistent/job-tcpx.yaml"),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error.current_context(),
            PatchError::ManifestNotFound { .. }
        ));
    }
}
