//! From a chosen suggestion to a new map extent.

use tracing::debug;

use crate::config::SearchConfiguration;
use crate::error::SearchError;
use crate::expression::Expression;
use crate::geometry::{Geometry, Point, Rect};
use crate::host::{Reprojector, Viewport};
use crate::models::{FieldValue, SearchResult};

/// Target scale when no scale expression is configured or it fails.
pub const DEFAULT_SCALE: f64 = 2000.0;

/// The reprojected centroid of a result in the display CRS.
pub fn locate<V, R>(
    result: &SearchResult,
    viewport: &V,
    reprojector: &R,
) -> Result<Point, SearchError>
where
    V: Viewport + ?Sized,
    R: Reprojector + ?Sized,
{
    let geometry = Geometry::from_wkt(&result.geometry)
        .map_err(|e| SearchError::Transform(format!("unreadable geometry: {}", e)))?;
    let dst = viewport.destination_crs();
    let projected = geometry
        .try_map_points(|p| reprojector.transform(p, result.srid, &dst))
        .map_err(SearchError::Transform)?;
    projected
        .centroid()
        .ok_or_else(|| SearchError::Transform("geometry has no centroid".to_string()))
}

/// Exact bbox from the bbox expression when it yields one, otherwise the
/// current extent rescaled about `centroid`.
pub fn target_extent<V: Viewport + ?Sized>(
    result: &SearchResult,
    centroid: Point,
    config: &SearchConfiguration,
    viewport: &V,
) -> Rect {
    if let Some(rect) = config
        .bbox_expr
        .as_ref()
        .and_then(|expr| evaluate_bbox(expr, result))
    {
        debug!(?rect, "zooming to bbox");
        return rect;
    }

    let target_scale = config
        .scale_expr
        .as_ref()
        .and_then(|expr| evaluate_scale(expr, result))
        .unwrap_or(DEFAULT_SCALE);
    let current_scale = viewport.scale();
    let extent = viewport.extent();
    if !(current_scale.is_finite() && current_scale > 0.0) {
        // Nothing to scale against; just recentre.
        return extent.scale(1.0, centroid);
    }
    debug!(target_scale, current_scale, "zooming to scale");
    extent.scale(target_scale / current_scale, centroid)
}

fn evaluate_bbox(expr: &Expression, result: &SearchResult) -> Option<Rect> {
    match expr.evaluate(&result.extra_data) {
        Ok(FieldValue::Null) => None,
        Ok(value) => Rect::from_bbox_str(&value.to_string()),
        Err(e) => {
            debug!(error = %e, "bbox expression failed");
            None
        }
    }
}

fn evaluate_scale(expr: &Expression, result: &SearchResult) -> Option<f64> {
    match expr.evaluate(&result.extra_data) {
        Ok(value) => value.as_f64().filter(|s| s.is_finite() && *s > 0.0),
        Err(e) => {
            debug!(error = %e, "scale expression failed");
            None
        }
    }
}
