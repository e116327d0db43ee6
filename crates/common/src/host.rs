//! Host identity used as the claimant in order lock markers.

use crate::config::AppConfig;
use crate::error::{FarmhandError, FarmhandResult};

/// Identity this machine writes into claim markers.
///
/// Resolution order: `host_id` in the user config, the OS hostname, then the
/// `HOSTNAME` environment variable.
pub fn host_identity(config: &AppConfig) -> FarmhandResult<String> {
    let candidate = config
        .host_id
        .clone()
        .or_else(os_hostname)
        .or_else(|| std::env::var("HOSTNAME").ok())
        .map(|id| id.trim().to_string())
        .unwrap_or_default();

    if candidate.is_empty() {
        return Err(FarmhandError::HostIdentity {
            message: "hostname is empty; set host_id in the user config".to_string(),
        });
    }
    Ok(candidate)
}

#[cfg(unix)]
fn os_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..end].to_vec()).ok()
}

#[cfg(windows)]
fn os_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(not(any(unix, windows)))]
fn os_hostname() -> Option<String> {
    None
}
