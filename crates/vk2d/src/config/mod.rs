//! Renderer configuration
//!
//! Serializable configuration for the window, shaders, and frame pacing.
//! Supports TOML files with sensible defaults so applications can run
//! without any config file present.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path that failed to load
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Config file contents are not valid TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A referenced file does not exist
    #[error("missing file: {0}")]
    MissingFile(String),
}

/// Shader loading parameters for the rendering system
///
/// Paths point at precompiled SPIR-V bytecode; compilation happens outside
/// the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Validate that both shader files exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !Path::new(&self.vertex_shader_path).exists() {
            return Err(ConfigError::MissingFile(self.vertex_shader_path.clone()));
        }
        if !Path::new(&self.fragment_shader_path).exists() {
            return Err(ConfigError::MissingFile(self.fragment_shader_path.clone()));
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex_shader_path: "shaders/shape.vert.spv".to_string(),
            fragment_shader_path: "shaders/shape.frag.spv".to_string(),
        }
    }
}

/// Initial window parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial framebuffer width in pixels
    pub width: u32,
    /// Initial framebuffer height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "vk2d".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Top-level renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name reported to the Vulkan driver
    pub application_name: String,
    /// Clear color applied at the start of each frame (RGBA)
    pub clear_color: [f32; 4],
    /// Shader file locations
    pub shaders: ShaderConfig,
    /// Window creation parameters
    pub window: WindowConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "vk2d application".to_string(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            shaders: ShaderConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = RendererConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.clear_color[3], 1.0);
        assert!(config.shaders.vertex_shader_path.ends_with(".spv"));
    }

    #[test]
    fn parses_partial_toml() {
        let toml_str = r#"
            application_name = "demo"

            [window]
            title = "demo window"
            width = 1024
            height = 768
        "#;
        let config: RendererConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.application_name, "demo");
        assert_eq!(config.window.width, 1024);
        // Unspecified sections fall back to defaults
        assert!(config.shaders.fragment_shader_path.ends_with(".spv"));
    }

    #[test]
    fn validate_reports_missing_shader() {
        let shaders = ShaderConfig::new("does/not/exist.vert.spv", "does/not/exist.frag.spv");
        assert!(matches!(
            shaders.validate(),
            Err(ConfigError::MissingFile(_))
        ));
    }
}
