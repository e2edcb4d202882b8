//! Protected-directory check shared by the file tools.
//!
//! Paths are normalized lexically (no filesystem access) and compared
//! case-insensitively against a list of protected directory prefixes.

use std::path::{Component, Path, PathBuf};

use crate::error::ToolError;

/// Directory prefixes the file tools refuse to touch.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    protected: Vec<PathBuf>,
    base_dir: PathBuf,
}

impl PathPolicy {
    /// Policy protecting `protected`, resolving relative paths against the
    /// process working directory.
    pub fn new(protected: Vec<PathBuf>) -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            protected,
            base_dir,
        }
    }

    /// Resolve relative paths against `base_dir` instead of the working dir.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Configured list when present, the host's system directories otherwise.
    pub fn from_config(configured: Option<&[String]>) -> Self {
        match configured {
            Some(list) => Self::new(list.iter().map(PathBuf::from).collect()),
            None => Self::new(platform_protected_dirs()),
        }
    }

    pub fn protected(&self) -> &[PathBuf] {
        &self.protected
    }

    /// Return the normalized absolute path, or `AccessDenied` when it falls
    /// inside a protected directory.
    pub fn check(&self, raw: &str) -> Result<PathBuf, ToolError> {
        if raw.trim().is_empty() {
            return Err(ToolError::InvalidArguments("path must not be empty".into()));
        }
        let path = normalize(&self.base_dir.join(raw));
        let Some(candidate) = comparable(&path) else {
            return Err(ToolError::AccessDenied(format!(
                "device path {raw} is not allowed"
            )));
        };
        for dir in &self.protected {
            let Some(prefix) = comparable(&normalize(dir)) else {
                continue;
            };
            if prefix.is_empty() {
                continue;
            }
            if is_under(&candidate, &prefix) {
                return Err(ToolError::AccessDenied(format!(
                    "access to system directory {} is not allowed",
                    dir.display()
                )));
            }
        }
        Ok(path)
    }
}

/// System directories protected when nothing is configured.
#[cfg(windows)]
pub fn platform_protected_dirs() -> Vec<PathBuf> {
    let env_or = |key: &str, fallback: &str| {
        std::env::var_os(key)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(fallback))
    };
    vec![
        env_or("WINDIR", r"C:\Windows"),
        env_or("ProgramFiles", r"C:\Program Files"),
        env_or("ProgramFiles(x86)", r"C:\Program Files (x86)"),
        env_or("SystemRoot", r"C:\Windows").join("System32"),
    ]
}

/// System directories protected when nothing is configured.
#[cfg(not(windows))]
pub fn platform_protected_dirs() -> Vec<PathBuf> {
    ["/bin", "/boot", "/dev", "/etc", "/lib", "/proc", "/sbin", "/sys", "/usr"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Lowercased, `/`-separated form used for prefix comparison.
///
/// Windows verbatim (`\\?\C:\`), device (`\\.\C:\`) and local admin-share
/// (`\\localhost\C$\`) spellings collapse to the plain `c:/` form. Other
/// device-namespace paths have no directory to compare and yield `None`.
fn comparable(path: &Path) -> Option<String> {
    let raw = path.to_string_lossy().replace('\\', "/").to_lowercase();
    let plain = strip_windows_prefix(&raw)?;
    Some(collapse_segments(&plain))
}

fn strip_windows_prefix(path: &str) -> Option<String> {
    let unc = match path.strip_prefix("//?/").or_else(|| path.strip_prefix("//./")) {
        Some(rest) if is_drive(rest) => return Some(rest.to_string()),
        Some(rest) => format!("//{}", rest.strip_prefix("unc/")?),
        None => path.to_string(),
    };

    if let Some(rest) = unc.strip_prefix("//") {
        let mut parts = rest.splitn(3, '/');
        let host = parts.next().unwrap_or_default();
        let share = parts.next().unwrap_or_default();
        let tail = parts.next().unwrap_or_default();
        if let Some(drive) = admin_share_drive(share).filter(|_| is_local_host(host)) {
            return Some(format!("{drive}:/{tail}"));
        }
    }
    Some(unc)
}

fn is_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/')
}

/// `c$` names the whole of drive `c:`.
fn admin_share_drive(share: &str) -> Option<char> {
    let mut chars = share.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(drive), Some('$'), None) if drive.is_ascii_alphabetic() => Some(drive),
        _ => None,
    }
}

fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "0--1.ipv6-literal.net")
        || std::env::var("COMPUTERNAME").is_ok_and(|name| name.eq_ignore_ascii_case(host))
}

/// Collapse `.`/`..` segments, never climbing above the root, drive or UNC share.
fn collapse_segments(path: &str) -> String {
    let (lead, body) = if let Some(rest) = path.strip_prefix("//") {
        ("//", rest)
    } else if let Some(rest) = path.strip_prefix('/') {
        ("/", rest)
    } else {
        ("", path)
    };
    let anchored = match lead {
        "//" => 2,
        "" if is_drive(body) => 1,
        _ => 0,
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in body.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.len() > anchored {
                    segments.pop();
                }
            }
            other => segments.push(other),
        }
    }
    format!("{lead}{}", segments.join("/"))
}

fn is_under(candidate: &str, prefix: &str) -> bool {
    match candidate.strip_prefix(prefix) {
        Some(rest) => prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
