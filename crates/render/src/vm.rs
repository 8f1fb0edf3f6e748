use harvest_core::Doc;

use crate::text::{self, Text};
use crate::Formatter;

/// "Running" when ready, else "Created" when created, else "Unknown".
pub fn vm_status(doc: Doc<'_>) -> &'static str {
    if doc.bool_at(&["status", "ready"]) == Some(true) {
        "Running"
    } else if doc.bool_at(&["status", "created"]) == Some(true) {
        "Created"
    } else {
        "Unknown"
    }
}

enum VolumeSource<'a> {
    Claim(&'a str),
    ContainerDisk(&'a str),
    CloudInit { user_data: bool, network_data: bool },
    Other,
}

fn volume_source<'a>(v: Doc<'a>) -> VolumeSource<'a> {
    if v.map_at(&["persistentVolumeClaim"]).is_some() {
        VolumeSource::Claim(v.str_at(&["persistentVolumeClaim", "claimName"]))
    } else if v.map_at(&["containerDisk"]).is_some() {
        VolumeSource::ContainerDisk(v.str_at(&["containerDisk", "image"]))
    } else if v.map_at(&["cloudInitNoCloud"]).is_some() {
        VolumeSource::CloudInit {
            user_data: !v.str_at(&["cloudInitNoCloud", "userData"]).is_empty(),
            network_data: !v.str_at(&["cloudInitNoCloud", "networkData"]).is_empty(),
        }
    } else {
        VolumeSource::Other
    }
}

enum NetworkSource<'a> {
    Pod,
    Multus(&'a str),
    Other,
}

fn network_source<'a>(n: Doc<'a>) -> NetworkSource<'a> {
    if n.has(&["pod"]) {
        NetworkSource::Pod
    } else if n.map_at(&["multus"]).is_some() {
        NetworkSource::Multus(n.str_at(&["multus", "networkName"]))
    } else {
        NetworkSource::Other
    }
}

fn cpu_cores(doc: Doc<'_>) -> Option<i64> {
    doc.i64_at(&["spec", "template", "spec", "domain", "cpu", "cores"]).filter(|c| *c > 0)
}

fn memory(doc: Doc<'_>) -> &str {
    doc.str_at(&["spec", "template", "spec", "domain", "resources", "requests", "memory"])
}

pub struct VmFormatter;

impl Formatter for VmFormatter {
    fn render_one(&self, doc: Doc<'_>) -> String {
        let mut t = Text::new();
        text::envelope(&mut t, "Virtual Machine", doc, vm_status(doc));
        t.field(0, "Ready", doc.bool_at(&["status", "ready"]).unwrap_or(false));
        t.field(0, "Instance Created", doc.bool_at(&["status", "created"]).unwrap_or(false));
        t.field_nonempty(0, "Run Strategy", doc.str_at(&["spec", "runStrategy"]));
        t.field_nonempty(0, "Printable Status", doc.str_at(&["status", "printableStatus"]));

        let cores = cpu_cores(doc);
        let mem = memory(doc);
        if cores.is_some() || !mem.is_empty() {
            t.heading("Specification");
            if let Some(c) = cores {
                t.field(2, "CPU Cores", c);
            }
            t.field_nonempty(2, "Memory", mem);
        }

        let vm_spec = doc.at(&["spec", "template", "spec"]);
        let volumes = vm_spec.list_at(&["volumes"]);
        if !volumes.is_empty() {
            t.heading("Volumes");
            for v in volumes {
                t.line(2, format_args!("{}:", v.str_at(&["name"])));
                match volume_source(v) {
                    VolumeSource::Claim(claim) => {
                        t.field(4, "Type", "PersistentVolumeClaim");
                        t.field(4, "Claim Name", claim);
                    }
                    VolumeSource::ContainerDisk(image) => {
                        t.field(4, "Type", "ContainerDisk");
                        t.field(4, "Image", image);
                    }
                    VolumeSource::CloudInit { user_data, network_data } => {
                        t.field(4, "Type", "CloudInitNoCloud");
                        if user_data {
                            t.field(4, "Has User Data", true);
                        }
                        if network_data {
                            t.field(4, "Has Network Data", true);
                        }
                    }
                    VolumeSource::Other => t.field(4, "Type", "Other"),
                }
            }
        }

        let networks = vm_spec.list_at(&["networks"]);
        if !networks.is_empty() {
            t.heading("Networks");
            for n in networks {
                t.line(2, format_args!("{}:", n.str_at(&["name"])));
                match network_source(n) {
                    NetworkSource::Pod => t.field(4, "Type", "Pod Network"),
                    NetworkSource::Multus(name) => {
                        t.field(4, "Type", "Multus");
                        t.field(4, "Network Name", name);
                    }
                    NetworkSource::Other => t.field(4, "Type", "Other"),
                }
            }
        }
        text::metadata(&mut t, doc);
        t.finish()
    }

    fn render_many(&self, docs: &[Doc<'_>]) -> String {
        text::namespaced_list(docs, "virtual machine", "VMs", |t, d| {
            t.field(4, "Status", vm_status(d));
            if let Some(c) = cpu_cores(d) {
                t.field(4, "CPU Cores", c);
            }
            t.field_nonempty(4, "Memory", memory(d));
            let spec = d.at(&["spec", "template", "spec"]);
            let volumes = spec.list_at(&["volumes"]);
            if !volumes.is_empty() {
                t.line(4, "Volumes:");
                for v in volumes {
                    let name = v.str_at(&["name"]);
                    match volume_source(v) {
                        VolumeSource::Claim(claim) => t.line(6, format_args!("{}: PVC {}", name, claim)),
                        VolumeSource::ContainerDisk(image) => t.line(6, format_args!("{}: ContainerDisk {}", name, image)),
                        VolumeSource::CloudInit { .. } => t.line(6, format_args!("{}: CloudInit", name)),
                        VolumeSource::Other => t.line(6, name),
                    }
                }
            }
            let networks = spec.list_at(&["networks"]);
            if !networks.is_empty() {
                t.line(4, "Networks:");
                for n in networks {
                    let name = n.str_at(&["name"]);
                    match network_source(n) {
                        NetworkSource::Pod => t.line(6, format_args!("{}: Pod Network", name)),
                        NetworkSource::Multus(net) => t.line(6, format_args!("{}: Multus {}", name, net)),
                        NetworkSource::Other => t.line(6, name),
                    }
                }
            }
            t.field(4, "Created", d.created());
        })
    }
}
