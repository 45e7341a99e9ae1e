use batchrun_model::HostInfo;

/// Get platform (OS family).
#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

/// Get architecture.
#[inline]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

/// Host name, or `"unknown"` if it cannot be read.
pub fn hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Get OS distribution info (Linux only, best effort).
///
/// Returns OS name from `/etc/os-release` or generic platform name.
pub fn os_info() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(content) = std::fs::read_to_string("/etc/os-release") {
            for line in content.lines() {
                if let Some(name) = line.strip_prefix("PRETTY_NAME=") {
                    return name.trim_matches('"').to_string();
                }
            }
        }
    }

    platform().to_string()
}

/// Describe the current host for provenance records.
pub fn host_info() -> HostInfo {
    HostInfo {
        hostname: hostname(),
        platform: platform().to_string(),
        arch: arch().to_string(),
        os: os_info(),
    }
}
