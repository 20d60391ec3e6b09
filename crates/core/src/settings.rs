use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Pacing of every engine suspension point, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub inter_action_ms: u64,
    pub click_pulse_ms: u64,
    pub double_click_gap_ms: u64,
    pub move_duration_ms: u64,
    pub wait_ms: u64,
    pub type_speed_ms: u64,
    pub frame_ms: u64,
    /// Random variation applied to the inter-action pause (0.3 = +/-30%)
    pub jitter: f64,
    /// Longest uninterrupted sleep before the cancel flag is rechecked
    pub cancel_slice_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            inter_action_ms: 300,
            click_pulse_ms: 150,
            double_click_gap_ms: 100,
            move_duration_ms: 1000,
            wait_ms: 1000,
            type_speed_ms: 80,
            frame_ms: 16,
            jitter: 0.0,
            cancel_slice_ms: 25,
        }
    }
}

impl Timings {
    /// Every duration divided by `factor`; frame rate and slices untouched.
    pub fn scaled(&self, factor: u64) -> Self {
        let f = factor.max(1);
        Self {
            inter_action_ms: self.inter_action_ms / f,
            click_pulse_ms: self.click_pulse_ms / f,
            double_click_gap_ms: self.double_click_gap_ms / f,
            move_duration_ms: self.move_duration_ms / f,
            wait_ms: self.wait_ms / f,
            type_speed_ms: self.type_speed_ms / f,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub workflows_dir: PathBuf,
    pub last_workflow: Option<String>,
    pub timings: Timings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workflows_dir: PathBuf::from("workflows"),
            last_workflow: None,
            timings: Timings::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(path, json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let s: Settings = serde_json::from_str(r#"{"timings":{"jitter":0.2}}"#).unwrap();
        assert_eq!(s.timings.jitter, 0.2);
        assert_eq!(s.timings.inter_action_ms, 300);
        assert_eq!(s.workflows_dir, PathBuf::from("workflows"));
    }

    #[test]
    fn scaled_keeps_frame_rate() {
        let t = Timings::default().scaled(4);
        assert_eq!(t.inter_action_ms, 75);
        assert_eq!(t.frame_ms, 16);
    }

    #[test]
    fn missing_file_is_default() {
        let s = Settings::load(Path::new("/definitely/not/here/settings.json"));
        assert!(s.last_workflow.is_none());
    }
}
