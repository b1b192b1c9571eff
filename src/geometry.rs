//! Planar geometry needed to turn a search result into a map extent:
//! well-known-text parsing, centroids and rectangles.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Rect {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Rect {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.xmin + self.width() / 2.0,
            self.ymin + self.height() / 2.0,
        )
    }

    /// Resizes by `factor` and re-centres on `center`.
    pub fn scale(&self, factor: f64, center: Point) -> Rect {
        let half_w = self.width() * factor / 2.0;
        let half_h = self.height() * factor / 2.0;
        Rect::new(
            center.x - half_w,
            center.y - half_h,
            center.x + half_w,
            center.y + half_h,
        )
    }

    /// Parses `"xmin,ymin,xmax,ymax"`. Anything other than exactly four
    /// finite numbers yields `None`.
    pub fn from_bbox_str(text: &str) -> Option<Rect> {
        let coords: Vec<&str> = text.split(',').collect();
        if coords.len() != 4 {
            return None;
        }
        let mut values = [0.0; 4];
        for (slot, raw) in values.iter_mut().zip(&coords) {
            let v: f64 = raw.trim().parse().ok()?;
            if !v.is_finite() {
                return None;
            }
            *slot = v;
        }
        Some(Rect::new(values[0], values[1], values[2], values[3]))
    }
}

/// Geometries as returned by `ST_AsText`. Single and multi variants share a
/// representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Points(Vec<Point>),
    Lines(Vec<Vec<Point>>),
    /// Each polygon is its rings; the first ring is the exterior.
    Polygons(Vec<Vec<Vec<Point>>>),
    Collection(Vec<Geometry>),
}

type PointMapper<'f> = dyn FnMut(Point) -> Result<Point, String> + 'f;

impl Geometry {
    /// Curve types (`CIRCULARSTRING`, `CURVEPOLYGON`, ...) are not read.
    pub fn from_wkt(text: &str) -> Result<Geometry, String> {
        let text = text.trim();
        // EWKT prefix, e.g. "SRID=4326;POINT(1 2)"
        let text = match text.find(';') {
            Some(idx) if text[..idx].to_ascii_uppercase().starts_with("SRID=") => {
                &text[idx + 1..]
            }
            _ => text,
        };

        let mut cur = Cursor::new(text);
        let geometry = cur.geometry()?;
        cur.finish()?;
        Ok(geometry)
    }

    /// Applies `f` to every vertex, stopping at the first failure.
    pub fn try_map_points<F>(&self, mut f: F) -> Result<Geometry, String>
    where
        F: FnMut(Point) -> Result<Point, String>,
    {
        self.map_with(&mut f)
    }

    fn map_with(&self, f: &mut PointMapper<'_>) -> Result<Geometry, String> {
        Ok(match self {
            Geometry::Points(points) => Geometry::Points(map_ring(points, f)?),
            Geometry::Lines(lines) => Geometry::Lines(
                lines
                    .iter()
                    .map(|line| map_ring(line, &mut *f))
                    .collect::<Result<Vec<_>, String>>()?,
            ),
            Geometry::Polygons(polygons) => {
                let mut mapped = Vec::with_capacity(polygons.len());
                for rings in polygons {
                    mapped.push(
                        rings
                            .iter()
                            .map(|ring| map_ring(ring, &mut *f))
                            .collect::<Result<Vec<_>, String>>()?,
                    );
                }
                Geometry::Polygons(mapped)
            }
            Geometry::Collection(members) => Geometry::Collection(
                members
                    .iter()
                    .map(|member| member.map_with(&mut *f))
                    .collect::<Result<Vec<_>, String>>()?,
            ),
        })
    }

    /// Area-weighted for polygons, length-weighted for lines, mean for
    /// points. Degenerate shapes fall back to the next lower dimension; a
    /// collection is weighted by its highest-dimension members.
    pub fn centroid(&self) -> Option<Point> {
        match self {
            Geometry::Points(points) => mean(points.iter()),
            Geometry::Lines(lines) => {
                line_centroid(lines.iter()).or_else(|| mean(lines.iter().flatten()))
            }
            Geometry::Polygons(polygons) => polygon_centroid(polygons)
                .or_else(|| line_centroid(polygons.iter().flatten()))
                .or_else(|| mean(polygons.iter().flatten().flatten())),
            Geometry::Collection(members) => {
                let mut parts = Parts::default();
                for member in members {
                    parts.add(member);
                }
                let rings = parts.polygons.iter().flatten();
                polygon_centroid(&parts.polygons)
                    .or_else(|| line_centroid(parts.lines.iter().chain(rings.clone())))
                    .or_else(|| {
                        mean(
                            parts
                                .points
                                .iter()
                                .chain(parts.lines.iter().flatten())
                                .chain(rings.flatten()),
                        )
                    })
            }
        }
    }
}

/// Members of a collection split by dimension.
#[derive(Default)]
struct Parts {
    points: Vec<Point>,
    lines: Vec<Vec<Point>>,
    polygons: Vec<Vec<Vec<Point>>>,
}

impl Parts {
    fn add(&mut self, geometry: &Geometry) {
        match geometry {
            Geometry::Points(points) => self.points.extend_from_slice(points),
            Geometry::Lines(lines) => self.lines.extend(lines.iter().cloned()),
            Geometry::Polygons(polygons) => self.polygons.extend(polygons.iter().cloned()),
            Geometry::Collection(members) => {
                for member in members {
                    self.add(member);
                }
            }
        }
    }
}

fn map_ring(ring: &[Point], f: &mut PointMapper<'_>) -> Result<Vec<Point>, String> {
    ring.iter().map(|p| f(*p)).collect()
}

fn mean<'a>(points: impl Iterator<Item = &'a Point>) -> Option<Point> {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for p in points {
        sx += p.x;
        sy += p.y;
        n += 1;
    }
    (n > 0).then(|| Point::new(sx / n as f64, sy / n as f64))
}

fn line_centroid<'a>(lines: impl Iterator<Item = &'a Vec<Point>>) -> Option<Point> {
    let (mut sx, mut sy, mut total) = (0.0, 0.0, 0.0);
    for line in lines {
        for seg in line.windows(2) {
            let len = (seg[1].x - seg[0].x).hypot(seg[1].y - seg[0].y);
            sx += (seg[0].x + seg[1].x) / 2.0 * len;
            sy += (seg[0].y + seg[1].y) / 2.0 * len;
            total += len;
        }
    }
    (total > 0.0).then(|| Point::new(sx / total, sy / total))
}

/// Signed shoelace area and first moments of a ring.
fn ring_moments(ring: &[Point]) -> (f64, f64, f64) {
    let (mut a, mut cx, mut cy) = (0.0, 0.0, 0.0);
    for seg in ring.windows(2) {
        let cross = seg[0].x * seg[1].y - seg[1].x * seg[0].y;
        a += cross;
        cx += (seg[0].x + seg[1].x) * cross;
        cy += (seg[0].y + seg[1].y) * cross;
    }
    (a / 2.0, cx / 6.0, cy / 6.0)
}

fn polygon_centroid(polygons: &[Vec<Vec<Point>>]) -> Option<Point> {
    let (mut area, mut mx, mut my) = (0.0, 0.0, 0.0);
    for rings in polygons {
        for (idx, ring) in rings.iter().enumerate() {
            let (a, cx, cy) = ring_moments(ring);
            // Orientation-independent: exterior adds, holes subtract.
            let sign = if (a >= 0.0) == (idx == 0) { 1.0 } else { -1.0 };
            area += sign * a;
            mx += sign * cx;
            my += sign * cy;
        }
    }
    (area.abs() > f64::EPSILON).then(|| Point::new(mx / area, my / area))
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", c, self.pos))
        }
    }

    fn word(&mut self) -> &'a str {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn number(&mut self) -> Result<f64, String> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
            .unwrap_or(rest.len());
        let raw = &rest[..len];
        let value = raw
            .parse::<f64>()
            .map_err(|_| format!("invalid coordinate '{}'", raw))?;
        self.pos += len;
        Ok(value)
    }

    /// `x y`, ignoring any Z/M ordinates.
    fn point(&mut self) -> Result<Point, String> {
        let x = self.number()?;
        let y = self.number()?;
        while !matches!(self.peek(), Some(',') | Some(')') | None) {
            self.number()?;
        }
        Ok(Point::new(x, y))
    }

    fn point_group(&mut self) -> Result<Point, String> {
        self.expect('(')?;
        let p = self.point()?;
        self.expect(')')?;
        Ok(p)
    }

    /// Multipoint members come both as `1 2` and `(1 2)`.
    fn point_or_group(&mut self) -> Result<Point, String> {
        if self.peek() == Some('(') {
            self.point_group()
        } else {
            self.point()
        }
    }

    /// `( item, item, ... )`
    fn list<T, F>(&mut self, mut item: F) -> Result<Vec<T>, String>
    where
        F: FnMut(&mut Self) -> Result<T, String>,
    {
        self.expect('(')?;
        let mut items = vec![item(self)?];
        while self.eat(',') {
            items.push(item(self)?);
        }
        self.expect(')')?;
        Ok(items)
    }

    /// A tagged geometry: type word, optional Z/M, then the body.
    fn geometry(&mut self) -> Result<Geometry, String> {
        let kind = self.word().to_ascii_uppercase();
        let mut dims = self.word().to_ascii_uppercase();
        if matches!(dims.as_str(), "Z" | "M" | "ZM") {
            dims = self.word().to_ascii_uppercase();
        }
        if dims == "EMPTY" {
            return Err(format!("{} is empty", kind));
        }
        if !dims.is_empty() {
            return Err(format!("unexpected '{}' after {}", dims, kind));
        }

        Ok(match kind.as_str() {
            "POINT" => Geometry::Points(vec![self.point_group()?]),
            "MULTIPOINT" => Geometry::Points(self.list(Cursor::point_or_group)?),
            "LINESTRING" => Geometry::Lines(vec![self.list(Cursor::point)?]),
            "MULTILINESTRING" => Geometry::Lines(self.list(|c| c.list(Cursor::point))?),
            "POLYGON" => Geometry::Polygons(vec![self.list(|c| c.list(Cursor::point))?]),
            "MULTIPOLYGON" => {
                Geometry::Polygons(self.list(|c| c.list(|c| c.list(Cursor::point)))?)
            }
            "GEOMETRYCOLLECTION" => Geometry::Collection(self.list(Cursor::geometry)?),
            "" => return Err("missing geometry type".to_string()),
            other => return Err(format!("unsupported geometry type {}", other)),
        })
    }

    fn finish(&mut self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(format!("trailing '{}' at offset {}", c, self.pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(p: Point, x: f64, y: f64) {
        assert!((p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9, "{:?}", p);
    }

    #[test]
    fn parses_points_with_and_without_z() {
        let g = Geometry::from_wkt("POINT(1.5 -2)").unwrap();
        assert_eq!(g, Geometry::Points(vec![Point::new(1.5, -2.0)]));
        let g = Geometry::from_wkt("POINT Z (1 2 3)").unwrap();
        assert_eq!(g, Geometry::Points(vec![Point::new(1.0, 2.0)]));
        let g = Geometry::from_wkt("SRID=27700;point(10 20)").unwrap();
        assert_eq!(g, Geometry::Points(vec![Point::new(10.0, 20.0)]));
    }

    #[test]
    fn parses_both_multipoint_forms() {
        let bare = Geometry::from_wkt("MULTIPOINT(0 0, 2 2)").unwrap();
        let grouped = Geometry::from_wkt("MULTIPOINT((0 0),(2 2))").unwrap();
        assert_eq!(bare, grouped);
        assert_close(bare.centroid().unwrap(), 1.0, 1.0);
    }

    #[test]
    fn line_centroid_is_length_weighted() {
        let g = Geometry::from_wkt("LINESTRING(0 0, 10 0, 10 1)").unwrap();
        let c = g.centroid().unwrap();
        assert_close(c, (5.0 * 10.0 + 10.0 * 1.0) / 11.0, 0.5 / 11.0);
    }

    #[test]
    fn polygon_centroid_accounts_for_holes() {
        let square = Geometry::from_wkt("POLYGON((0 0, 4 0, 4 4, 0 4, 0 0))").unwrap();
        assert_close(square.centroid().unwrap(), 2.0, 2.0);

        // Hole in the right half pulls the centroid left.
        let holed = Geometry::from_wkt(
            "POLYGON((0 0, 4 0, 4 4, 0 4, 0 0),(2 0, 4 0, 4 4, 2 4, 2 0))",
        )
        .unwrap();
        assert_close(holed.centroid().unwrap(), 1.0, 2.0);
    }

    #[test]
    fn multipolygon_centroid_weights_by_area() {
        let g = Geometry::from_wkt(
            "MULTIPOLYGON(((0 0, 2 0, 2 2, 0 2, 0 0)),((10 0, 11 0, 11 1, 10 1, 10 0)))",
        )
        .unwrap();
        let c = g.centroid().unwrap();
        assert_close(c, (1.0 * 4.0 + 10.5 * 1.0) / 5.0, (1.0 * 4.0 + 0.5) / 5.0);
    }

    #[test]
    fn rejects_bad_wkt() {
        for bad in ["", "POINT EMPTY", "CIRCLE(1 2)", "POINT(1)", "POINT(1 2", "POINT(1 2) x"] {
            assert!(Geometry::from_wkt(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn collection_centroid_uses_the_highest_dimension() {
        let g = Geometry::from_wkt(
            "GEOMETRYCOLLECTION(POINT(100 100), LINESTRING(50 50, 60 50), POLYGON((0 0, 2 0, 2 2, 0 2, 0 0)))",
        )
        .unwrap();
        assert_close(g.centroid().unwrap(), 1.0, 1.0);

        let g = Geometry::from_wkt("GEOMETRYCOLLECTION(POINT(0 0), LINESTRING(0 4, 4 4))").unwrap();
        assert_close(g.centroid().unwrap(), 2.0, 4.0);

        let g = Geometry::from_wkt(
            "GEOMETRYCOLLECTION(POINT(0 0), GEOMETRYCOLLECTION(MULTIPOINT(2 2, 4 4)))",
        )
        .unwrap();
        assert_close(g.centroid().unwrap(), 2.0, 2.0);
    }

    #[test]
    fn collections_map_through_members() {
        let g = Geometry::from_wkt("GEOMETRYCOLLECTION(POINT(1 1), LINESTRING(0 0, 2 0))").unwrap();
        let moved = g.try_map_points(|p| Ok(Point::new(p.x, p.y + 10.0))).unwrap();
        assert_eq!(
            moved,
            Geometry::Collection(vec![
                Geometry::Points(vec![Point::new(1.0, 11.0)]),
                Geometry::Lines(vec![vec![Point::new(0.0, 10.0), Point::new(2.0, 10.0)]]),
            ])
        );
    }

    #[test]
    fn curves_are_not_read() {
        for curve in [
            "CIRCULARSTRING(0 0, 1 1, 2 0)",
            "GEOMETRYCOLLECTION(POINT(0 0), CIRCULARSTRING(0 0, 1 1, 2 0))",
            "GEOMETRYCOLLECTION EMPTY",
        ] {
            assert!(Geometry::from_wkt(curve).is_err(), "accepted {:?}", curve);
        }
    }

    #[test]
    fn maps_every_vertex() {
        let g = Geometry::from_wkt("LINESTRING(1 1, 2 2)").unwrap();
        let moved = g.try_map_points(|p| Ok(Point::new(p.x + 1.0, p.y))).unwrap();
        assert_eq!(
            moved,
            Geometry::Lines(vec![vec![Point::new(2.0, 1.0), Point::new(3.0, 2.0)]])
        );
        assert!(g.try_map_points(|_| Err("boom".into())).is_err());
    }

    #[test]
    fn rect_scales_about_a_point() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);
        let scaled = r.scale(0.5, Point::new(10.0, 10.0));
        assert_eq!(scaled, Rect::new(-15.0, -2.5, 35.0, 22.5));
    }

    #[test]
    fn bbox_strings_need_four_finite_numbers() {
        assert_eq!(
            Rect::from_bbox_str("10,20,30,40"),
            Some(Rect::new(10.0, 20.0, 30.0, 40.0))
        );
        assert_eq!(
            Rect::from_bbox_str(" 1.5 , -2,3e2,4 "),
            Some(Rect::new(1.5, -2.0, 300.0, 4.0))
        );
        assert_eq!(Rect::from_bbox_str("1,2,3"), None);
        assert_eq!(Rect::from_bbox_str("1,2,3,x"), None);
        assert_eq!(Rect::from_bbox_str("1,2,3,inf"), None);
        assert_eq!(Rect::from_bbox_str(""), None);
    }
}
