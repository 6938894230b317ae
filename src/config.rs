// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Every section and field has a default, so a partial or missing file still
// yields a usable configuration.

use anyhow::{Context, Result};
use ash::vk;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::backend::SwapchainConfig;
use crate::renderer::RendererConfig;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub shaders: ShaderConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Iro Engine".to_string(),
            width: 800,
            height: 600,
            fullscreen: false,
            resizable: true,
        }
    }
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// "mailbox", "fifo", "fifo_relaxed" or "immediate"
    pub present_mode: String,
    pub clear_color: [f32; 4],
    pub max_frames_in_flight: usize,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            present_mode: "mailbox".to_string(),
            clear_color: [0.0, 0.68, 1.0, 1.0],
            max_frames_in_flight: 2,
        }
    }
}

/// SPIR-V locations, relative to the working directory
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/ui.vert.spv"),
            fragment: PathBuf::from("shaders/ui.frag.spv"),
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    /// Default filter for env_logger; RUST_LOG still wins
    pub log_level: String,
    pub show_fps: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: cfg!(debug_assertions),
            log_level: "info".to_string(),
            show_fps: true,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get present mode as Vulkan enum
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        match self.graphics.present_mode.to_lowercase().as_str() {
            "immediate" => vk::PresentModeKHR::IMMEDIATE,
            "mailbox" => vk::PresentModeKHR::MAILBOX,
            "fifo" => vk::PresentModeKHR::FIFO,
            "fifo_relaxed" => vk::PresentModeKHR::FIFO_RELAXED,
            _ => {
                log::warn!(
                    "Unknown present mode '{}', defaulting to MAILBOX",
                    self.graphics.present_mode
                );
                vk::PresentModeKHR::MAILBOX
            }
        }
    }

    /// At least one frame slot, whatever the file says
    pub fn max_frames_in_flight(&self) -> usize {
        self.graphics.max_frames_in_flight.max(1)
    }

    pub fn renderer(&self) -> RendererConfig {
        RendererConfig {
            max_frames_in_flight: self.max_frames_in_flight(),
            clear_color: self.graphics.clear_color,
            swapchain: SwapchainConfig {
                preferred_present_mode: self.present_mode(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert!(config.window.resizable);
        assert_eq!(config.present_mode(), vk::PresentModeKHR::MAILBOX);
        assert_eq!(config.max_frames_in_flight(), 2);
        assert_eq!(config.shaders.vertex, PathBuf::from("shaders/ui.vert.spv"));
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [window]
            title = "Test"
            fullscreen = true

            [graphics]
            present_mode = "FIFO"
            clear_color = [1.0, 0.0, 0.0, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.window.title, "Test");
        assert!(config.window.fullscreen);
        assert_eq!(config.window.width, 800);
        assert_eq!(config.present_mode(), vk::PresentModeKHR::FIFO);

        let renderer = config.renderer();
        assert_eq!(renderer.clear_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            renderer.swapchain.preferred_present_mode,
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn unknown_present_mode_falls_back_to_mailbox() {
        let config = Config::parse("[graphics]\npresent_mode = \"vsync-ish\"").unwrap();
        assert_eq!(config.present_mode(), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn zero_frames_in_flight_is_clamped() {
        let config = Config::parse("[graphics]\nmax_frames_in_flight = 0").unwrap();
        assert_eq!(config.max_frames_in_flight(), 1);
        assert_eq!(config.renderer().max_frames_in_flight, 1);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Config::parse("[window\nwidth = 3").is_err());
        assert!(Config::parse("[window]\nwidth = \"wide\"").is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = Config::load_from_path("no/such/config.toml").unwrap();
        assert_eq!(config.graphics.max_frames_in_flight, 2);
    }

    #[test]
    fn shipped_config_parses() {
        let content = include_str!("../config.toml");
        let config = Config::parse(content).unwrap();
        assert_eq!(config.window.title, "Iro Engine");
        assert_eq!(config.present_mode(), vk::PresentModeKHR::MAILBOX);
    }
}
