use facecam_core::provision::CASCADE_MODEL_FILE;
use facecam_core::ROTATION_180_VERTICAL_FIX_PX;
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Requested capture resolution.
    pub capture_width: u32,
    pub capture_height: u32,
    /// Local directory the cascade model is provisioned into.
    pub model_dir: PathBuf,
    /// Bundled cascade model copied into `model_dir` on first use.
    pub bundled_model: PathBuf,
    /// Resize frames to the working resolution before detection.
    pub downscale: bool,
    /// Per-device offset for the 180° correction overlay.
    pub rotation_180_fix_px: f64,
}

impl Config {
    /// Load configuration from `FACECAM_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("facecam");

        let model_dir = std::env::var("FACECAM_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("models"));

        let bundled_model = std::env::var("FACECAM_BUNDLED_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/usr/share/facecam").join(CASCADE_MODEL_FILE));

        Self {
            camera_device: std::env::var("FACECAM_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            capture_width: env_u32("FACECAM_CAPTURE_WIDTH", 640),
            capture_height: env_u32("FACECAM_CAPTURE_HEIGHT", 480),
            model_dir,
            bundled_model,
            downscale: std::env::var("FACECAM_DOWNSCALE")
                .map(|v| v != "0")
                .unwrap_or(true),
            rotation_180_fix_px: env_f64(
                "FACECAM_ROTATION_180_FIX_PX",
                ROTATION_180_VERTICAL_FIX_PX,
            ),
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
