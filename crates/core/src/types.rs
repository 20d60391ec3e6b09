use serde::{Deserialize, Serialize};

/// 2D coordinate relative to the bound container's top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Layout-box bounding rectangle (page coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Centre of `self`, expressed relative to `origin`'s top-left.
    pub fn center_within(&self, origin: &Rect) -> Point {
        Point {
            x: self.x - origin.x + self.w / 2.0,
            y: self.y - origin.y + self.h / 2.0,
        }
    }
}

/// Visual state of the simulated cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentState {
    pub position: Point,
    pub is_clicking: bool,
    pub is_typing: bool,
    pub workflow_name: String,
}

/// Runner lifecycle as shown by the TUI banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Stopping,
}

/// Command from TUI to the runner thread
pub enum Command {
    /// Execute the workflow at this catalog index
    Run(usize),
    /// Reset both the agent cursor and the application store
    Reset,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_relative_to_origin() {
        let container = Rect::new(100.0, 50.0, 800.0, 600.0);
        let icon = Rect::new(140.0, 90.0, 64.0, 64.0);
        assert_eq!(icon.center_within(&container), Point::new(72.0, 72.0));
    }
}
