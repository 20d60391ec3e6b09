use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::Rect;

pub const APP_ATTR: &str = "data-app-id";
pub const DOCK_ATTR: &str = "data-dock-app-id";
pub const CELL_ATTR: &str = "data-cell-id";

/// Attribute selector: `[name="value"]` or bare `[name]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    pub attr: String,
    pub value: Option<String>,
}

impl Selector {
    pub fn attr(attr: &str, value: &str) -> Self {
        Self { attr: attr.to_string(), value: Some(value.to_string()) }
    }

    /// Desktop icon of an app.
    pub fn app_icon(app_id: &str) -> Self {
        Self::attr(APP_ATTR, app_id)
    }

    pub fn dock_icon(app_id: &str) -> Self {
        Self::attr(DOCK_ATTR, app_id)
    }

    pub fn cell(cell_id: &str) -> Self {
        Self::attr(CELL_ATTR, cell_id)
    }

    /// Parse `[name="value"]`, `[name='value']`, `[name=value]` or `[name]`.
    pub fn parse(s: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r#"^\s*\[\s*([A-Za-z_][\w-]*)\s*(?:=\s*(?:"([^"]*)"|'([^']*)'|([^\]\s]+))\s*)?\]\s*$"#)
                .expect("selector regex is valid")
        });
        let caps = re.captures(s)?;
        let attr = caps.get(1)?.as_str().to_string();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().to_string());
        Some(Self { attr, value })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "[{}=\"{}\"]", self.attr, v),
            None => write!(f, "[{}]", self.attr),
        }
    }
}

/// The layout box the engine's coordinates are relative to.
pub trait Container: Send + Sync {
    fn bounds(&self) -> Rect;
    /// Bounding box of the first element matching `selector`, in the same
    /// coordinate space as `bounds`.
    fn query(&self, selector: &Selector) -> Option<Rect>;
}

/// Fixed set of addressable elements.
#[derive(Debug, Clone, Default)]
pub struct StaticLayout {
    bounds: Rect,
    elements: HashMap<Selector, Rect>,
}

impl StaticLayout {
    pub fn new(bounds: Rect) -> Self {
        Self { bounds, elements: HashMap::new() }
    }

    pub fn with(mut self, selector: Selector, rect: Rect) -> Self {
        self.insert(selector, rect);
        self
    }

    pub fn insert(&mut self, selector: Selector, rect: Rect) {
        // Bare-attribute lookups must find valued elements too.
        self.elements
            .entry(Selector { attr: selector.attr.clone(), value: None })
            .or_insert(rect);
        self.elements.insert(selector, rect);
    }

    pub fn elements(&self) -> impl Iterator<Item = (&Selector, &Rect)> {
        self.elements.iter().filter(|(s, _)| s.value.is_some())
    }

    /// The demo desktop: icons down the left edge, a dock along the
    /// bottom, a spreadsheet window with a 6x12 grid and a text editor
    /// bold button.
    pub fn demo_desktop() -> Self {
        let mut layout = Self::new(Rect::new(0.0, 0.0, 1280.0, 800.0));

        let desktop = ["terminal", "textedit", "numbers", "notes", "mail", "messages", "calendar"];
        for (i, app) in desktop.iter().enumerate() {
            layout.insert(Selector::app_icon(app), Rect::new(24.0, 40.0 + i as f64 * 96.0, 72.0, 72.0));
        }

        let dock = ["safari", "terminal", "textedit", "numbers", "notes", "mail", "messages", "calendar"];
        let dock_x = 640.0 - dock.len() as f64 * 32.0;
        for (i, app) in dock.iter().enumerate() {
            layout.insert(Selector::dock_icon(app), Rect::new(dock_x + i as f64 * 64.0, 736.0, 56.0, 56.0));
        }

        for (c, col) in ('A'..='F').enumerate() {
            for row in 1..=12 {
                layout.insert(
                    Selector::cell(&format!("{}{}", col, row)),
                    Rect::new(300.0 + c as f64 * 110.0, 160.0 + (row - 1) as f64 * 28.0, 110.0, 28.0),
                );
            }
        }

        layout.insert(
            Selector { attr: "data-format-bold".into(), value: None },
            Rect::new(320.0, 110.0, 28.0, 28.0),
        );
        layout
    }
}

impl Container for StaticLayout {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn query(&self, selector: &Selector) -> Option<Rect> {
        self.elements.get(selector).copied()
    }
}
