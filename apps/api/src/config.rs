use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; asset paths that do not exist are tolerated at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    /// TrueType handwriting font. Missing → built-in Helvetica.
    pub font_path: PathBuf,
    pub font_name: String,
    /// Page background texture. Missing → no background.
    pub background_path: PathBuf,
    /// Where generated PDFs are kept until downloaded.
    pub output_dir: PathBuf,
    /// Resolution of the PNG export path.
    pub raster_dpi: u16,
    /// Directory holding the pdfium shared library; system search path when unset.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            host: env_or("HOST", "127.0.0.1"),
            port: env_or("PORT", "5001")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            font_path: PathBuf::from(env_or("FONT_PATH", "handwrite.ttf")),
            font_name: env_or("FONT_NAME", "HandwriteFont"),
            background_path: PathBuf::from(env_or("BACKGROUND_PATH", "base.jpg")),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("handwrite")),
            raster_dpi: parse_dpi(&env_or("RASTER_DPI", "300"))?,
            pdfium_library_dir: std::env::var("PDFIUM_LIBRARY_DIR").ok().map(PathBuf::from),
        })
    }
}

/// At this bound an A4 page is about 140 megapixels.
pub const MAX_RASTER_DPI: u16 = 1200;

fn parse_dpi(raw: &str) -> Result<u16> {
    let dpi = raw
        .trim()
        .parse::<u16>()
        .context("RASTER_DPI must be a positive integer")?;
    if dpi == 0 || dpi > MAX_RASTER_DPI {
        bail!("RASTER_DPI must be between 1 and {MAX_RASTER_DPI}, got {dpi}");
    }
    Ok(dpi)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpi_default_parses() {
        assert_eq!(parse_dpi("300").unwrap(), 300);
        assert_eq!(parse_dpi(" 72 ").unwrap(), 72);
    }

    #[test]
    fn test_zero_dpi_rejected() {
        let err = parse_dpi("0").unwrap_err();
        assert!(err.to_string().contains("between 1 and"));
    }

    #[test]
    fn test_out_of_range_dpi_rejected() {
        assert!(parse_dpi("2400").is_err());
        assert!(parse_dpi("-5").is_err());
        assert!(parse_dpi("high").is_err());
    }
}
