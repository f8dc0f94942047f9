// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration, read from `WANDLER_*` environment variables.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default guesses tried, in order, after the empty password when a PDF is
/// unlocked automatically. Best-effort only: this is a tiny dictionary, not a
/// security boundary.
pub const DEFAULT_UNLOCK_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "admin",
    "user",
    "1234",
    "12345",
    "123456789",
    "qwerty",
    "abc123",
    "password123",
    "admin123",
    "user123",
    "test",
    "test123",
    "demo",
    "demo123",
    "guest",
    "guest123",
    "public",
    "public123",
    "default",
    "default123",
    "123",
    "0000",
    "1111",
    "2222",
    "3333",
    "4444",
    "5555",
    "6666",
    "7777",
    "8888",
    "9999",
    "000000",
    "111111",
    "secret",
    "private",
    "secure",
    "access",
    "login",
];

/// Where artifact bytes are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "fs" => Ok(Self::Filesystem),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// Service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Prefix for download URLs in responses. Empty means relative URLs.
    pub public_base_url: String,
    /// Directory for artifact bytes when using the filesystem backend.
    pub storage_dir: PathBuf,
    pub storage_backend: StorageBackend,
    /// Time-to-live of every artifact, in hours.
    pub artifact_ttl_hours: u64,
    /// Pause between background sweeps, in minutes.
    pub sweep_interval_minutes: u64,
    /// Whether the sweeper starts with the server.
    pub auto_start_sweeper: bool,
    /// Hard cap per uploaded file.
    pub max_upload_bytes: usize,
    /// Rasterisation scale for page-image conversions.
    pub render_scale: f32,
    /// Rasterisation scale for the captioned single-document presentation.
    pub caption_render_scale: f32,
    /// JPEG quality (1-100) for PDF to JPEG output.
    pub jpeg_quality: u8,
    /// Upper bound on the wall-clock time of a single conversion.
    pub conversion_timeout_secs: u64,
    /// Connect and read timeout when fetching a remote source document.
    pub fetch_timeout_secs: u64,
    /// Passwords tried (after the empty password) during automatic unlock.
    pub unlock_passwords: Vec<String>,
    /// Directory containing the pdfium shared library, if not on the system path.
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            public_base_url: String::new(),
            storage_dir: default_storage_dir(),
            storage_backend: StorageBackend::Filesystem,
            artifact_ttl_hours: 24,
            sweep_interval_minutes: 60,
            auto_start_sweeper: true,
            max_upload_bytes: 50 * 1024 * 1024,
            render_scale: 2.0,
            caption_render_scale: 3.0,
            jpeg_quality: 95,
            conversion_timeout_secs: 300,
            fetch_timeout_secs: 30,
            unlock_passwords: DEFAULT_UNLOCK_PASSWORDS
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
            pdfium_library_path: None,
        }
    }
}

impl AppConfig {
    /// Build a configuration from the process environment, falling back to
    /// defaults for anything unset or malformed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: parsed("WANDLER_HOST").unwrap_or(defaults.host),
            port: parse_or("WANDLER_PORT", parsed("WANDLER_PORT"), defaults.port),
            public_base_url: parsed("WANDLER_PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.public_base_url),
            storage_dir: parsed("WANDLER_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            storage_backend: parse_or(
                "WANDLER_STORAGE_BACKEND",
                parsed("WANDLER_STORAGE_BACKEND"),
                defaults.storage_backend,
            ),
            artifact_ttl_hours: parse_or(
                "WANDLER_ARTIFACT_TTL_HOURS",
                parsed("WANDLER_ARTIFACT_TTL_HOURS"),
                defaults.artifact_ttl_hours,
            ),
            sweep_interval_minutes: parse_or(
                "WANDLER_SWEEP_INTERVAL_MINUTES",
                parsed("WANDLER_SWEEP_INTERVAL_MINUTES"),
                defaults.sweep_interval_minutes,
            ),
            auto_start_sweeper: parse_or(
                "WANDLER_AUTO_START_SWEEPER",
                parsed("WANDLER_AUTO_START_SWEEPER"),
                defaults.auto_start_sweeper,
            ),
            max_upload_bytes: parse_or(
                "WANDLER_MAX_UPLOAD_BYTES",
                parsed("WANDLER_MAX_UPLOAD_BYTES"),
                defaults.max_upload_bytes,
            ),
            render_scale: parse_or(
                "WANDLER_RENDER_SCALE",
                parsed("WANDLER_RENDER_SCALE"),
                defaults.render_scale,
            ),
            caption_render_scale: parse_or(
                "WANDLER_CAPTION_RENDER_SCALE",
                parsed("WANDLER_CAPTION_RENDER_SCALE"),
                defaults.caption_render_scale,
            ),
            jpeg_quality: within(
                "WANDLER_JPEG_QUALITY",
                parse_or(
                    "WANDLER_JPEG_QUALITY",
                    parsed("WANDLER_JPEG_QUALITY"),
                    defaults.jpeg_quality,
                ),
                1..=100,
                defaults.jpeg_quality,
            ),
            conversion_timeout_secs: parse_or(
                "WANDLER_CONVERSION_TIMEOUT_SECS",
                parsed("WANDLER_CONVERSION_TIMEOUT_SECS"),
                defaults.conversion_timeout_secs,
            ),
            fetch_timeout_secs: parse_or(
                "WANDLER_FETCH_TIMEOUT_SECS",
                parsed("WANDLER_FETCH_TIMEOUT_SECS"),
                defaults.fetch_timeout_secs,
            ),
            unlock_passwords: parsed("WANDLER_UNLOCK_PASSWORDS")
                .map(|list| {
                    list.split(',')
                        .map(|p| p.trim().to_owned())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.unlock_passwords),
            pdfium_library_path: parsed("WANDLER_PDFIUM_PATH").map(PathBuf::from),
        }
    }

    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_hours * 3600)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes.max(1) * 60)
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => default,
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(key, value = %value, error = %err, "ignoring malformed setting");
                default
            }
        },
    }
}

/// `value` when it lies in `range`, otherwise `default`.
fn within<T>(key: &str, value: T, range: RangeInclusive<T>, default: T) -> T
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        value
    } else {
        warn!(key, %value, "ignoring out-of-range setting");
        default
    }
}

/// `$XDG_DATA_HOME/wandler/artifacts`, then `~/.local/share`, then `/tmp`.
fn default_storage_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local").join("share")
    } else {
        PathBuf::from("/tmp")
    };
    base.join("wandler").join("artifacts")
}
