//! Server configuration.

use anyhow::{Context, bail};
use clap::Args;
use resizr_transform::ResizeLimits;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory holding both cache tiers.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// JPEG encoder quality, 1 to 100.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Origin fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Longest output edge a request may ask for.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Largest output area a request may ask for, in pixels.
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cachedir")
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_jpeg_quality() -> u8 {
    70
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_max_dimension() -> u32 {
    ResizeLimits::default().max_dimension
}

fn default_max_pixels() -> u64 {
    ResizeLimits::default().max_pixels
}

/// Largest edge the JPEG encoder accepts.
const JPEG_MAX_DIMENSION: u32 = 65535;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            port: default_port(),
            bind_address: default_bind_address(),
            jpeg_quality: default_jpeg_quality(),
            fetch_timeout_secs: default_fetch_timeout(),
            max_dimension: default_max_dimension(),
            max_pixels: default_max_pixels(),
        }
    }
}

/// Settings given on the command line or through the environment. They take
/// precedence over the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Cache directory
    #[arg(long = "cachedir", env = "RESIZR_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Listen port
    #[arg(long, env = "RESIZR_PORT")]
    pub port: Option<u16>,

    /// Listen address
    #[arg(long = "bind", env = "RESIZR_BIND")]
    pub bind_address: Option<String>,

    /// JPEG quality (1-100)
    #[arg(long = "quality", env = "RESIZR_JPEG_QUALITY")]
    pub jpeg_quality: Option<u8>,

    /// Origin fetch timeout in seconds
    #[arg(long = "fetch-timeout", env = "RESIZR_FETCH_TIMEOUT")]
    pub fetch_timeout_secs: Option<u64>,

    /// Longest output edge in pixels
    #[arg(long = "max-dimension", env = "RESIZR_MAX_DIMENSION")]
    pub max_dimension: Option<u32>,

    /// Largest output area in pixels
    #[arg(long = "max-pixels", env = "RESIZR_MAX_PIXELS")]
    pub max_pixels: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load from `path` when given, then apply overrides and validate.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(cache_dir) = overrides.cache_dir {
            self.cache_dir = cache_dir;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(quality) = overrides.jpeg_quality {
            self.jpeg_quality = quality;
        }
        if let Some(timeout) = overrides.fetch_timeout_secs {
            self.fetch_timeout_secs = timeout;
        }
        if let Some(max_dimension) = overrides.max_dimension {
            self.max_dimension = max_dimension;
        }
        if let Some(max_pixels) = overrides.max_pixels {
            self.max_pixels = max_pixels;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            bail!("jpeg_quality must be between 1 and 100, got {}", self.jpeg_quality);
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be positive");
        }
        if !(1..=JPEG_MAX_DIMENSION).contains(&self.max_dimension) {
            bail!(
                "max_dimension must be between 1 and {}, got {}",
                JPEG_MAX_DIMENSION,
                self.max_dimension
            );
        }
        if self.max_pixels == 0 {
            bail!("max_pixels must be positive");
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind address {:?}", self.bind_address))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn resize_limits(&self) -> ResizeLimits {
        ResizeLimits {
            max_dimension: self.max_dimension,
            max_pixels: self.max_pixels,
        }
    }
}
