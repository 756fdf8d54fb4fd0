//! Scene configuration.
//!
//! Loaded from a JSON file (`config/scene.json` by default). Every section and
//! field is optional; anything missing takes the value from `Default`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/scene.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub passes: PassConfig,
    pub loader: LoaderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding the compiled shaders and DDS textures.
    pub directory: PathBuf,
    /// Texture sampled by the underwater post-process.
    pub underwater_texture: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("assets"),
            underwater_texture: "grass.dds".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub look_at: [f32; 3],
    pub up: [f32; 3],
    /// Vertical field of view for landscape outputs; doubled for portrait.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 5.0, -10.0],
            look_at: [0.0, 5.0, 1.0],
            up: [0.0, 1.0, 0.0],
            fov_y_degrees: 70.0,
            near: 0.01,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub position: [f32; 4],
    pub colour: [f32; 4],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [-10.0, 100.0, -10.0, 1.0],
            colour: [0.2, 0.3, 0.6, 1.0],
        }
    }
}

/// Optional passes and rasteriser mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    pub underwater: bool,
    pub snakes: bool,
    /// Ray-cast implicit shapes, drawn on the cube before the primitives.
    pub implicit_shapes: bool,
    pub fractals: bool,
    pub wireframe: bool,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            underwater: true,
            snakes: false,
            implicit_shapes: false,
            fractals: false,
            wireframe: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Worker threads for asset reads; 0 lets rayon pick.
    pub worker_threads: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, .. } => write!(f, "failed to read {}", path.display()),
            ConfigError::Parse { path, .. } => write!(f, "failed to parse {}", path.display()),
            ConfigError::Invalid(msg) => write!(f, "invalid scene config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl SceneConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Loads and validates `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`SceneConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                log::info!("no scene config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;
        if !(cam.fov_y_degrees > 0.0 && cam.fov_y_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_y_degrees {} outside (0, 180)",
                cam.fov_y_degrees
            )));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return Err(ConfigError::Invalid(format!(
                "camera planes near={} far={} must satisfy 0 < near < far",
                cam.near, cam.far
            )));
        }
        if cam.eye == cam.look_at {
            return Err(ConfigError::Invalid("camera.eye equals camera.look_at".to_string()));
        }
        let forward = Vec3::from(cam.look_at) - Vec3::from(cam.eye);
        let up = Vec3::from(cam.up);
        if up.length_squared() <= f32::EPSILON {
            return Err(ConfigError::Invalid("camera.up is a zero vector".to_string()));
        }
        if forward.normalize().cross(up.normalize()).length_squared() <= f32::EPSILON {
            return Err(ConfigError::Invalid(format!(
                "camera.up {:?} is parallel to the view direction",
                cam.up
            )));
        }
        if self.assets.underwater_texture.is_empty() {
            return Err(ConfigError::Invalid("assets.underwater_texture is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        let config = SceneConfig::from_json("{}").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert!(config.passes.underwater);
        assert!(!config.passes.snakes);
        assert!(!config.passes.implicit_shapes);
        assert!(!config.passes.fractals);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = SceneConfig::from_json(
            r#"{ "passes": { "snakes": true }, "assets": { "underwater_texture": "caustics.dds" } }"#,
        )
        .unwrap();
        assert!(config.passes.snakes);
        assert!(config.passes.underwater);
        assert_eq!(config.assets.underwater_texture, "caustics.dds");
        assert_eq!(config.assets.directory, PathBuf::from("assets"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("reef-scene-config-that-does-not-exist.json");
        let config = SceneConfig::load_or_default(&path).unwrap();
        assert_eq!(config, SceneConfig::default());
        assert!(matches!(SceneConfig::load(&path), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn zero_up_vector_is_rejected() {
        let mut config = SceneConfig::default();
        config.camera.up = [0.0, 0.0, 0.0];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("zero")));
    }

    #[test]
    fn up_parallel_to_view_direction_is_rejected() {
        let mut config = SceneConfig::default();
        // Default camera looks down +z.
        config.camera.up = [0.0, 0.0, 2.0];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("parallel")));
        config.camera.up = [0.0, 0.0, -1.0];
        assert!(config.validate().is_err());

        config.camera.up = [0.0, 1.0, 1.0];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_camera_planes_are_rejected() {
        let mut config = SceneConfig::default();
        config.camera.near = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
