//! A headless host: suggestions and map moves are printed, the map is just
//! an extent and a scale kept in memory.

use std::f64::consts::PI;

use crate::geometry::{Point, Rect};
use crate::host::{
    Level, Notification, Notifier, Reprojector, SuggestionSurface, TextBox, Viewport,
};

const EARTH_RADIUS: f64 = 6_378_137.0;

pub struct ConsoleHost {
    extent: Rect,
    scale: f64,
    crs: String,
    text: String,
}

impl ConsoleHost {
    pub fn new(extent: Rect, scale: f64, crs: impl Into<String>) -> Self {
        Self {
            extent,
            scale,
            crs: crs.into(),
            text: String::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Viewport for ConsoleHost {
    fn extent(&self) -> Rect {
        self.extent
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn destination_crs(&self) -> String {
        self.crs.clone()
    }

    fn set_extent(&mut self, extent: Rect) {
        if self.extent.width() > 0.0 {
            self.scale *= extent.width() / self.extent.width();
        }
        self.extent = extent;
    }

    fn refresh(&mut self) {
        let e = self.extent;
        println!(
            "map: {:.3},{:.3},{:.3},{:.3} at 1:{:.0}",
            e.xmin, e.ymin, e.xmax, e.ymax, self.scale
        );
    }
}

impl Reprojector for ConsoleHost {
    fn transform(
        &self,
        point: Point,
        source_srid: i32,
        destination_crs: &str,
    ) -> Result<Point, String> {
        transform(point, source_srid, destination_crs)
    }
}

impl SuggestionSurface for ConsoleHost {
    fn set_suggestions(&mut self, suggestions: &[String]) {
        if suggestions.is_empty() {
            println!("(no suggestions)");
        }
        for (i, s) in suggestions.iter().enumerate() {
            println!("{:>3}  {}", i, s);
        }
    }
}

impl TextBox for ConsoleHost {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        println!("search: {}", text);
    }
}

impl Notifier for ConsoleHost {
    fn notify(&mut self, notification: Notification) {
        let tag = match notification.level {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Critical => "error",
        };
        eprintln!("[{}] {}: {}", tag, notification.title, notification.message);
    }
}

fn epsg_code(crs: &str) -> Option<i32> {
    crs.strip_prefix("EPSG:")
        .or_else(|| crs.strip_prefix("epsg:"))
        .and_then(|code| code.parse().ok())
}

/// Identity plus WGS 84 / Web Mercator in both directions.
pub fn transform(point: Point, source_srid: i32, destination_crs: &str) -> Result<Point, String> {
    let target = epsg_code(destination_crs)
        .ok_or_else(|| format!("unsupported destination CRS {}", destination_crs))?;
    match (source_srid, target) {
        (s, t) if s == t => Ok(point),
        (4326, 3857) => {
            if point.y.abs() >= 90.0 {
                return Err(format!("latitude {} cannot be projected", point.y));
            }
            let x = EARTH_RADIUS * point.x.to_radians();
            let y = EARTH_RADIUS * (PI / 4.0 + point.y.to_radians() / 2.0).tan().ln();
            Ok(Point::new(x, y))
        }
        (3857, 4326) => {
            let lon = (point.x / EARTH_RADIUS).to_degrees();
            let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
            Ok(Point::new(lon, lat))
        }
        (s, t) => Err(format!("no transform from EPSG:{} to EPSG:{}", s, t)),
    }
}
