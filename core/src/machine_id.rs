//! Stable per-host identifier sent as `machine_id` to the license endpoints.
//!
//! Prefers the OS-provided ID. Without one, the ID is a hash of the OS name,
//! the sorted non-loopback MAC addresses and the hostname, in the same layout
//! the desktop app registered with the license backend.

use std::process::Command;

use sha2::{Digest, Sha256};
use tracing::debug;

const LINUX_ID_FILES: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Resolve this host's machine ID.
pub fn machine_id() -> String {
    match os_machine_id() {
        Some(id) => normalize_id(&id),
        None => {
            debug!("no OS machine id available, using fallback");
            fallback_machine_id(platform_name(), &mac_addresses(), hostname().as_deref())
        }
    }
}

/// Trimmed, lowercased form of a raw ID.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Extract `IOPlatformUUID` from `ioreg -rd1 -c IOPlatformExpertDevice` output.
pub fn parse_ioreg_uuid(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once("\"IOPlatformUUID\"")?;
        let rest = rest.trim_start().strip_prefix('=')?.trim_start();
        let value = rest.strip_prefix('"')?;
        let end = value.find('"')?;
        Some(value[..end].to_string())
    })
}

/// Extract the `MachineGuid` value from `reg query` output.
pub fn parse_reg_machine_guid(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.to_lowercase().starts_with("machineguid"))
        .find_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            (fields.len() >= 3).then(|| fields[fields.len() - 1].to_string())
        })
}

/// OS name as the desktop app spells it (`darwin` rather than `macos`).
pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Lowercase colon-separated hex, e.g. `aa:bb:cc:00:11:22`.
pub fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// `fallback-` followed by the first 16 bytes of
/// `sha256("<os>|<sorted macs joined by ,>|<hostname>")` in hex.
///
/// The hostname segment is left out entirely when it is unknown.
pub fn fallback_machine_id(os: &str, macs: &[String], hostname: Option<&str>) -> String {
    let mut macs: Vec<String> = macs.iter().map(|m| m.to_lowercase()).collect();
    macs.sort();
    let mut parts = vec![os.to_string(), macs.join(",")];
    if let Some(host) = hostname {
        parts.push(host.trim().to_lowercase());
    }
    let digest = Sha256::digest(parts.join("|").as_bytes());
    format!("fallback-{}", hex::encode(&digest[..16]))
}

fn os_machine_id() -> Option<String> {
    let id = match std::env::consts::OS {
        "linux" => linux_machine_id(),
        "macos" => command_output("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])
            .and_then(|out| parse_ioreg_uuid(&out)),
        "windows" => command_output(
            "reg",
            &[
                "query",
                r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ],
        )
        .and_then(|out| parse_reg_machine_guid(&out)),
        _ => None,
    };
    id.filter(|id| !id.trim().is_empty())
}

fn linux_machine_id() -> Option<String> {
    LINUX_ID_FILES.iter().find_map(|path| {
        let content = std::fs::read_to_string(path).ok()?;
        let id = content.trim();
        (!id.is_empty()).then(|| id.to_string())
    })
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
))]
fn mac_addresses() -> Vec<String> {
    use std::collections::BTreeMap;

    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::InterfaceFlags;

    let Ok(addrs) = getifaddrs() else {
        return Vec::new();
    };
    // getifaddrs yields one entry per address; keep one MAC per interface.
    let mut by_interface = BTreeMap::new();
    for ifaddr in addrs {
        if ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK) {
            continue;
        }
        let mac = ifaddr
            .address
            .as_ref()
            .and_then(|addr| addr.as_link_addr())
            .and_then(|link| link.addr());
        if let Some(mac) = mac {
            by_interface
                .entry(ifaddr.interface_name)
                .or_insert_with(|| format_mac(&mac));
        }
    }
    by_interface.into_values().collect()
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
fn mac_addresses() -> Vec<String> {
    Vec::new()
}

#[cfg(unix)]
fn hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
}

#[cfg(not(unix))]
fn hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}
