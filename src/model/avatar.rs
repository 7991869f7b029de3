use std::{collections::BTreeMap, fmt::Display, path::Path, time::Duration};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{Transform, Vector3};
use crate::scheduler::seconds;

/// Phoneme keys to blend shape names, as shipped with the default avatar.
pub static DEFAULT_PHONEME_MAPPINGS: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    [
        ("a", "vrc_v_aa"),
        ("e", "vrc_v_ee"),
        ("i", "vrc_v_ih"),
        ("o", "vrc_v_oh"),
        ("u", "vrc_v_ou"),
        ("th", "vrc_v_th"),
        ("s", "vrc_v_ss"),
        ("r", "vrc_v_rr"),
        ("p", "vrc_v_pp"),
        ("f", "vrc_v_ff"),
        ("d", "vrc_v_dd"),
        ("ch", "vrc_v_ch"),
        ("n", "vrc_v_nn"),
        ("k", "vrc_v_kk"),
        ("sil", "vrc_v_sil"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
});

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: String,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "Unable to read config {path}: {source}"),
            Self::Parse(e) => write!(f, "Unable to parse config: {e}"),
            Self::Invalid { field, reason } => write!(f, "Invalid config value {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            Self::Invalid { .. } => None,
        }
    }
}

/// Static description of the avatar. Loaded once at startup and never
/// modified afterwards.
///
/// Every field has a default, so a config file only needs to contain the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub node_name_root: String,
    pub node_name_mesh: String,
    pub node_name_camera: String,
    pub node_name_head: String,
    /// Texture applied to the mesh node by the renderer.
    pub texture_name: String,
    /// Height of the view the avatar is shown in. Used for scaling.
    pub container_height: f32,
    pub initial_position: Vector3,
    pub initial_euler_angles: Vector3,
    /// Blend shapes driven together for a blink, left eye first.
    pub blink_targets: Vec<String>,
    pub phoneme_mappings: BTreeMap<String, String>,

    pub animation: AnimationSettings,
    pub head: HeadSettings,
    pub speech: SpeechSettings,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            node_name_root: "root".to_string(),
            node_name_mesh: "Mesh".to_string(),
            node_name_camera: "Camera.001".to_string(),
            node_name_head: "mixamorig_Head".to_string(),
            texture_name: "phong22".to_string(),
            container_height: 300.0,
            initial_position: Vector3::new(0.2, 0.2, -3.0 * 1.23),
            initial_euler_angles: Vector3::new(0.15, 0.0, -0.25),
            blink_targets: vec!["vrc_blink_left".to_string(), "vrc_blink_right".to_string()],
            phoneme_mappings: DEFAULT_PHONEME_MAPPINGS.clone(),

            animation: AnimationSettings::default(),
            head: HeadSettings::default(),
            speech: SpeechSettings::default(),
        }
    }
}

impl AvatarConfig {
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<Self>(data).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.animation;
        check_range(
            "animation.idle_blink_interval",
            a.idle_blink_min,
            a.idle_blink_max,
            a.idle_blink,
        )?;
        check_seconds("animation.blink_duration", a.blink_duration)?;
        check_seconds("animation.shape_key_duration", a.shape_key_duration)?;

        let h = &self.head;
        check_range(
            "head.idle_interval",
            h.idle_interval_min,
            h.idle_interval_max,
            h.idle_motion,
        )?;
        check_seconds("head.idle_step_duration", h.idle_step_duration)?;
        check_seconds("head.turn_duration", h.turn_duration)?;
        check_seconds("head.gesture_step_duration", h.gesture_step_duration)?;
        check_degrees("head.idle_max_step", h.idle_max_step)?;
        check_degrees("head.idle_max_angle", h.idle_max_angle)?;
        check_degrees("head.turn_angle", h.turn_angle)?;
        check_degrees("head.gesture_angle", h.gesture_angle)?;
        if h.gesture_repeats > MAX_GESTURE_REPEATS {
            return Err(ConfigError::Invalid {
                field: "head.gesture_repeats",
                reason: format!(
                    "must be at most {MAX_GESTURE_REPEATS}, got {}",
                    h.gesture_repeats
                ),
            });
        }

        let s = &self.speech;
        if !(MIN_WORDS_PER_MINUTE..=MAX_WORDS_PER_MINUTE).contains(&s.words_per_minute) {
            return Err(ConfigError::Invalid {
                field: "speech.words_per_minute",
                reason: format!(
                    "must be between {MIN_WORDS_PER_MINUTE} and {MAX_WORDS_PER_MINUTE}, got {}",
                    s.words_per_minute
                ),
            });
        }
        check_seconds("speech.start_delay", s.start_delay)?;

        if !(self.container_height.is_finite() && self.container_height >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "container_height",
                reason: format!("must not be negative, got {}", self.container_height),
            });
        }

        Ok(())
    }

    /// Transform applied to the root node when the scene is loaded.
    pub fn initial_transform(&self) -> Transform {
        Transform {
            position: self.initial_position,
            euler_angles: self.initial_euler_angles,
            scale: Vector3::splat(self.container_height / 100.0),
        }
    }
}

/// Longest accepted timing value, in seconds.
pub const MAX_SECONDS: f32 = 3600.0;
pub const MIN_WORDS_PER_MINUTE: f32 = 1.0;
pub const MAX_WORDS_PER_MINUTE: f32 = 10_000.0;
pub const MAX_GESTURE_REPEATS: u32 = 100;

fn check_seconds(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=MAX_SECONDS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be between 0 and {MAX_SECONDS} seconds, got {value}"),
        })
    }
}

fn check_degrees(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a finite angle, got {value}"),
        })
    }
}

/// `enabled` ranges drive a repeating timer and need a positive upper bound.
fn check_range(field: &'static str, min: f32, max: f32, enabled: bool) -> Result<(), ConfigError> {
    check_seconds(field, min)?;
    check_seconds(field, max)?;

    if min > max {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("min {min} is greater than max {max}"),
        });
    }
    if enabled && max <= 0.0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "max must be greater than 0".to_string(),
        });
    }

    Ok(())
}

/// Timings for the shape key animator. All values are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Whether the idle blink loop runs at all.
    pub idle_blink: bool,
    pub idle_blink_min: f32,
    pub idle_blink_max: f32,
    pub blink_duration: f32,
    /// Duration for shape keys triggered by commands.
    pub shape_key_duration: f32,
    /// Seed for the idle timers. Random when unset.
    pub seed: Option<u64>,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            idle_blink: true,
            idle_blink_min: 2.0,
            idle_blink_max: 5.0,
            blink_duration: 0.1,
            shape_key_duration: 0.1,
            seed: None,
        }
    }
}

impl AnimationSettings {
    pub fn blink_duration(&self) -> Duration {
        seconds(self.blink_duration)
    }

    pub fn shape_key_duration(&self) -> Duration {
        seconds(self.shape_key_duration)
    }
}

/// Head motion settings. Angles are in degrees, times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadSettings {
    pub idle_motion: bool,
    pub idle_interval_min: f32,
    pub idle_interval_max: f32,
    /// Largest single idle turn.
    pub idle_max_step: f32,
    /// Idle turns never take the head further than this from center.
    pub idle_max_angle: f32,
    pub idle_step_duration: f32,
    pub turn_angle: f32,
    pub turn_duration: f32,
    pub gesture_angle: f32,
    pub gesture_step_duration: f32,
    /// How many down-up (or left-right) pairs a nod or shake has.
    pub gesture_repeats: u32,
}

impl Default for HeadSettings {
    fn default() -> Self {
        Self {
            idle_motion: true,
            idle_interval_min: 2.0,
            idle_interval_max: 5.0,
            idle_max_step: 10.0,
            idle_max_angle: 15.0,
            idle_step_duration: 1.0,
            turn_angle: 15.0,
            turn_duration: 2.0,
            gesture_angle: 10.0,
            gesture_step_duration: 0.5,
            gesture_repeats: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub words_per_minute: f32,
    /// Delay between starting the mouth animation and starting the audio, in seconds.
    pub start_delay: f32,
    pub voice: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            words_per_minute: 250.0,
            start_delay: 0.1,
            voice: "en-US".to_string(),
        }
    }
}

impl SpeechSettings {
    pub fn start_delay(&self) -> Duration {
        seconds(self.start_delay)
    }
}
