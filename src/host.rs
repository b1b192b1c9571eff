//! What the search component needs from the application embedding it.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Critical,
}

/// A message-bar style notice for the user.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub message: String,
}

pub const NOTIFICATION_TITLE: &str = "PostGIS Search";

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            title: NOTIFICATION_TITLE.to_string(),
            message: message.into(),
        }
    }
}

/// The map canvas.
pub trait Viewport {
    fn extent(&self) -> Rect;
    /// Current scale denominator (2000 means 1:2000).
    fn scale(&self) -> f64;
    /// Authority id of the display CRS, e.g. `EPSG:3857`.
    fn destination_crs(&self) -> String;
    fn set_extent(&mut self, extent: Rect);
    fn refresh(&mut self);
}

/// Coordinate transforms between reference systems.
pub trait Reprojector {
    fn transform(&self, point: Point, source_srid: i32, destination_crs: &str)
        -> Result<Point, String>;
}

/// The autocomplete popup.
pub trait SuggestionSurface {
    /// Replaces the list and shows it; an empty list hides it.
    fn set_suggestions(&mut self, suggestions: &[String]);
}

/// The search text field.
pub trait TextBox {
    fn set_text(&mut self, text: &str);
}

pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

/// Everything at once, for hosts that implement all of it on one type.
pub trait Host: Viewport + Reprojector + SuggestionSurface + TextBox + Notifier {}

impl<T> Host for T where T: Viewport + Reprojector + SuggestionSurface + TextBox + Notifier {}
