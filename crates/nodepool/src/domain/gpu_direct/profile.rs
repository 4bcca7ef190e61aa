use api_types::GpuDirectFlavor;

/// Volume backed by a host path.
#[derive(Debug)]
pub(crate) struct HostVolume {
    pub name: &'static str,
    pub host_path: &'static str,
}

/// Everything the workload patcher injects for one GPUDirect flavor.
#[derive(Debug)]
pub(crate) struct SidecarProfile {
    pub container_name: &'static str,
    /// Image repository; the RxDM version is used as tag
    pub image_repository: &'static str,
    pub command: &'static [&'static str],
    pub args: &'static [&'static str],
    pub privileged: bool,
    pub capabilities: &'static [&'static str],
    /// Host devices exposed to the sidecar through the device injector
    pub devices: &'static [&'static str],
    pub host_volumes: &'static [HostVolume],
    pub empty_dir_volumes: &'static [&'static str],
    /// (volume, mount path) pairs of the sidecar
    pub sidecar_mounts: &'static [(&'static str, &'static str)],
    pub sidecar_env: &'static [(&'static str, &'static str)],
    /// (volume, mount path) pairs added to every workload container
    pub workload_mounts: &'static [(&'static str, &'static str)],
    pub workload_env: &'static [(&'static str, &'static str)],
    /// GPU NICs attached in addition to eth0
    pub gpu_nic_count: usize,
}

const NVIDIA_DEVICES: &[&str] = &[
    "/dev/nvidia0",
    "/dev/nvidia1",
    "/dev/nvidia2",
    "/dev/nvidia3",
    "/dev/nvidia4",
    "/dev/nvidia5",
    "/dev/nvidia6",
    "/dev/nvidia7",
    "/dev/nvidiactl",
    "/dev/nvidia-uvm",
];

const NVIDIA_DEVICES_WITH_DMABUF: &[&str] = &[
    "/dev/nvidia0",
    "/dev/nvidia1",
    "/dev/nvidia2",
    "/dev/nvidia3",
    "/dev/nvidia4",
    "/dev/nvidia5",
    "/dev/nvidia6",
    "/dev/nvidia7",
    "/dev/nvidiactl",
    "/dev/nvidia-uvm",
    "/dev/dmabuf_import_helper",
];

static TCPX: SidecarProfile = SidecarProfile {
    container_name: "tcpx-daemon",
    image_repository: "us-docker.pkg.dev/gce-ai-infra/gpudirect-tcpx/tcpgpudmarxd-dev",
    command: &[
        "/tcpgpudmarxd/build/app/tcpgpudmarxd",
        "--gpu_nic_preset",
        "a3vm",
        "--gpu_shmem_type",
        "fd",
        "--uds_path",
        "/run/tcpx",
        "--setup_param",
        "\"--verbose 128 2 0 \"",
    ],
    args: &[],
    privileged: true,
    capabilities: &[],
    devices: NVIDIA_DEVICES,
    host_volumes: &[
        HostVolume {
            name: "libraries",
            host_path: "/home/kubernetes/bin/nvidia/lib64",
        },
        HostVolume {
            name: "sys",
            host_path: "/sys",
        },
        HostVolume {
            name: "proc-sys",
            host_path: "/proc/sys",
        },
    ],
    empty_dir_volumes: &["tcpx-socket"],
    sidecar_mounts: &[
        ("libraries", "/usr/local/nvidia/lib64"),
        ("tcpx-socket", "/run/tcpx"),
        ("sys", "/hostsysfs"),
        ("proc-sys", "/hostprocsysfs"),
    ],
    sidecar_env: &[("LD_LIBRARY_PATH", "/usr/local/nvidia/lib64")],
    workload_mounts: &[
        ("tcpx-socket", "/tmp"),
        ("libraries", "/usr/local/nvidia/lib64"),
    ],
    workload_env: &[("LD_LIBRARY_PATH", "/usr/local/nvidia/lib64")],
    gpu_nic_count: 4,
};

static TCPXO: SidecarProfile = SidecarProfile {
    container_name: "tcpxo-daemon",
    image_repository: "us-docker.pkg.dev/gce-ai-infra/gpudirect-tcpxo/tcpgpudmarxd-dev",
    command: &["/bin/sh", "-c"],
    args: &["set -ex\nchmod 755 /fts/entrypoint_rxdm_container.sh\n/fts/entrypoint_rxdm_container.sh --num_hops=2 --num_nics=8 --uid= --alsologtostderr\n"],
    privileged: false,
    capabilities: &["NET_ADMIN", "NET_BIND_SERVICE"],
    devices: NVIDIA_DEVICES_WITH_DMABUF,
    host_volumes: &[
        HostVolume {
            name: "libraries",
            host_path: "/home/kubernetes/bin/nvidia",
        },
        HostVolume {
            name: "sys",
            host_path: "/sys",
        },
        HostVolume {
            name: "proc-sys",
            host_path: "/proc/sys",
        },
        HostVolume {
            name: "aperture-devices",
            host_path: "/dev/aperture_devices",
        },
    ],
    empty_dir_volumes: &[],
    sidecar_mounts: &[
        ("libraries", "/usr/local/nvidia"),
        ("sys", "/hostsysfs"),
        ("proc-sys", "/hostprocsysfs"),
    ],
    sidecar_env: &[("LD_LIBRARY_PATH", "/usr/local/nvidia/lib64")],
    workload_mounts: &[
        ("libraries", "/usr/local/nvidia"),
        ("aperture-devices", "/dev/aperture_devices"),
    ],
    workload_env: &[
        ("LD_LIBRARY_PATH", "/usr/local/nvidia/lib64"),
        ("NCCL_FASTRAK_LLCM_DEVICE_DIRECTORY", "/dev/aperture_devices"),
    ],
    gpu_nic_count: 8,
};

pub(crate) fn sidecar_profile(flavor: GpuDirectFlavor) -> &'static SidecarProfile {
    match flavor {
        GpuDirectFlavor::Tcpx => &TCPX,
        GpuDirectFlavor::Tcpxo => &TCPXO,
    }
}
