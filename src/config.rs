//! Configuration management for the preview server.
//!
//! Settings come from command-line arguments via clap, with environment
//! variable fallbacks under the `PREVIEW_` prefix:
//!
//! - `PREVIEW_HOST` - Server bind address (default: 0.0.0.0)
//! - `PREVIEW_PORT` - Server port (default: 8000)
//! - `PREVIEW_TILE_SIZE` - Output tile edge in pixels (default: 256)
//! - `PREVIEW_CACHE_MAX_AGE` - Tile Cache-Control max-age, 0 = no-cache (default: 0)
//! - `PREVIEW_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)
//! - `PREVIEW_STRETCH_LOW` / `PREVIEW_STRETCH_HIGH` - Stretch percentiles (default: 2 / 98)
//! - `PREVIEW_REGISTER` - Previews to register at startup, `id=path`, comma-separated
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use raster_preview::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! println!("Listening on {}", config.bind_address());
//! ```

use clap::Parser;

use crate::preview::ContrastStretch;
use crate::tile::DEFAULT_TILE_SIZE;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default tile Cache-Control max-age (0 sends `no-cache`).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 0;

/// Largest accepted output tile edge.
pub const MAX_TILE_SIZE: u32 = 4096;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Raster Preview - on-demand map tiles for local GeoTIFFs.
///
/// Register a raster under an id, then fetch its extent and Web Mercator
/// PNG tiles with a per-tile contrast stretch.
#[derive(Parser, Debug, Clone)]
#[command(name = "raster-preview")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PREVIEW_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PREVIEW_PORT")]
    pub port: u16,

    // =========================================================================
    // Rendering Configuration
    // =========================================================================
    /// Output tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "PREVIEW_TILE_SIZE")]
    pub tile_size: u32,

    /// Percentile mapped to black.
    #[arg(long, default_value_t = 2.0, env = "PREVIEW_STRETCH_LOW")]
    pub stretch_low: f64,

    /// Percentile mapped to white.
    #[arg(long, default_value_t = 98.0, env = "PREVIEW_STRETCH_HIGH")]
    pub stretch_high: f64,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age for tiles in seconds (0 = no-cache).
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "PREVIEW_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "PREVIEW_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Startup Registrations
    // =========================================================================
    /// Previews to register at startup as `id=path` (repeatable or comma-separated).
    #[arg(long = "register", env = "PREVIEW_REGISTER", value_delimiter = ',')]
    pub register: Vec<String>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            return Err(format!(
                "tile_size must be between 1 and {}",
                MAX_TILE_SIZE
            ));
        }

        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.stretch_low) || !in_range(self.stretch_high) {
            return Err("stretch percentiles must be between 0 and 100".to_string());
        }
        if self.stretch_low >= self.stretch_high {
            return Err("stretch_low must be below stretch_high".to_string());
        }

        self.registrations()?;

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Stretch settings for the preview service.
    pub fn stretch(&self) -> ContrastStretch {
        ContrastStretch::new(self.stretch_low, self.stretch_high)
    }

    /// Startup registrations as `(id, path)` pairs.
    ///
    /// Blank entries are skipped. The path may itself contain `=`.
    pub fn registrations(&self) -> Result<Vec<(String, String)>, String> {
        self.register
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((id, path)) if !id.trim().is_empty() && !path.trim().is_empty() => {
                    Ok((id.trim().to_string(), path.trim().to_string()))
                }
                _ => Err(format!(
                    "invalid registration '{}', expected id=path",
                    entry
                )),
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
