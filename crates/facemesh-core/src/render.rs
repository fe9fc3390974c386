//! Landmark rendering onto a [`BgrImage`].

use crate::connections::{Connection, ContourPart, TESSELLATION};
use crate::frame::BgrImage;
use crate::types::{DrawStyle, LandmarkSet};
use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

/// A color in B,G,R order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bgr(pub [u8; 3]);

impl Bgr {
    pub const fn new(b: u8, g: u8, r: u8) -> Self {
        Self([b, g, r])
    }

    // The canvas stores B,G,R inside an `Rgb` buffer, so no swap here.
    fn pixel(self) -> Rgb<u8> {
        Rgb(self.0)
    }
}

const WHITE: Bgr = Bgr::new(224, 224, 224);
const GREEN: Bgr = Bgr::new(48, 255, 48);
const RED: Bgr = Bgr::new(48, 48, 255);
const GRAY: Bgr = Bgr::new(128, 128, 128);

const TESSELLATION_THICKNESS: u32 = 1;
const CONTOUR_THICKNESS: u32 = 2;

/// Color of individual landmark markers (pure green).
pub const LANDMARK_COLOR: Bgr = Bgr::new(0, 255, 0);
pub const LANDMARK_RADIUS: u32 = 2;
/// Stroke width when the landmark spec is used for lines. Point markers are
/// always filled, so [`draw_points`] ignores it.
pub const LANDMARK_THICKNESS: u32 = 1;

/// Color, stroke thickness and marker radius for one drawing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawingSpec {
    pub color: Bgr,
    pub thickness: u32,
    pub circle_radius: u32,
}

impl DrawingSpec {
    pub fn landmarks() -> Self {
        Self {
            color: LANDMARK_COLOR,
            thickness: LANDMARK_THICKNESS,
            circle_radius: LANDMARK_RADIUS,
        }
    }
}

pub fn default_tessellation_spec() -> DrawingSpec {
    DrawingSpec {
        color: GRAY,
        thickness: TESSELLATION_THICKNESS,
        circle_radius: 0,
    }
}

/// Per-part contour styles: light lips and oval, green left side, red right side.
pub fn default_contour_styles() -> Vec<(ContourPart, DrawingSpec)> {
    ContourPart::ALL
        .iter()
        .map(|&part| {
            let color = match part {
                ContourPart::Lips | ContourPart::FaceOval => WHITE,
                ContourPart::LeftEye | ContourPart::LeftEyebrow => GREEN,
                ContourPart::RightEye | ContourPart::RightEyebrow => RED,
            };
            let spec = DrawingSpec {
                color,
                thickness: CONTOUR_THICKNESS,
                circle_radius: 0,
            };
            (part, spec)
        })
        .collect()
}

/// Map a normalized coordinate to a pixel, or `None` if it lies outside [0, 1].
pub fn normalized_to_pixel(x: f32, y: f32, width: u32, height: u32) -> Option<(i32, i32)> {
    let inside = |v: f32| (0.0..=1.0).contains(&v);
    if !inside(x) || !inside(y) || width == 0 || height == 0 {
        return None;
    }
    let px = ((x * width as f32).floor() as u32).min(width - 1);
    let py = ((y * height as f32).floor() as u32).min(height - 1);
    Some((px as i32, py as i32))
}

/// Draw a filled circle of `spec.circle_radius` at every on-image landmark.
///
/// `spec.thickness` only applies to lines and is not used here.
pub fn draw_points(image: &mut BgrImage, landmarks: &LandmarkSet, spec: &DrawingSpec) {
    let (w, h) = (image.width(), image.height());
    let color = spec.color.pixel();
    let canvas = image.canvas_mut();
    for lm in landmarks.points() {
        if let Some(center) = normalized_to_pixel(lm.x, lm.y, w, h) {
            draw_filled_circle_mut(canvas, center, spec.circle_radius as i32, color);
        }
    }
}

/// Draw a line for every connection whose endpoints both exist and lie on the image.
pub fn draw_connections(
    image: &mut BgrImage,
    landmarks: &LandmarkSet,
    connections: &[Connection],
    spec: &DrawingSpec,
) {
    let (w, h) = (image.width(), image.height());
    let to_px = |idx: usize| {
        landmarks
            .get(idx)
            .and_then(|lm| normalized_to_pixel(lm.x, lm.y, w, h))
    };

    let canvas = image.canvas_mut();
    let color = spec.color.pixel();
    for &(a, b) in connections {
        if let (Some(start), Some(end)) = (to_px(a), to_px(b)) {
            draw_thick_line(canvas, start, end, spec.thickness, color);
        }
    }
}

/// Render landmarks onto a copy of `image` in the requested style.
pub fn render(image: &BgrImage, landmarks: &LandmarkSet, style: DrawStyle) -> BgrImage {
    let mut out = image.clone();
    match style {
        DrawStyle::Points => draw_points(&mut out, landmarks, &DrawingSpec::landmarks()),
        DrawStyle::Mesh => {
            draw_connections(&mut out, landmarks, &TESSELLATION, &default_tessellation_spec())
        }
        DrawStyle::Contours => {
            for (part, spec) in default_contour_styles() {
                draw_connections(&mut out, landmarks, part.connections(), &spec);
            }
        }
    }
    out
}

/// Line segment widened by drawing parallel copies along its normal.
fn draw_thick_line(canvas: &mut image::RgbImage, start: (i32, i32), end: (i32, i32), thickness: u32, color: Rgb<u8>) {
    let (x0, y0) = (start.0 as f32, start.1 as f32);
    let (x1, y1) = (end.0 as f32, end.1 as f32);

    let (dx, dy) = (x1 - x0, y1 - y0);
    let len = (dx * dx + dy * dy).sqrt();
    let (nx, ny) = if len > 0.0 { (-dy / len, dx / len) } else { (0.0, 0.0) };

    let thickness = thickness.max(1);
    let half = (thickness - 1) as f32 / 2.0;
    for k in 0..thickness {
        let off = k as f32 - half;
        draw_line_segment_mut(
            canvas,
            (x0 + nx * off, y0 + ny * off),
            (x1 + nx * off, y1 + ny * off),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NormalizedLandmark, MESH_LANDMARKS, TOTAL_LANDMARKS};

    fn count_changed(a: &BgrImage, b: &BgrImage) -> usize {
        a.as_raw()
            .chunks(3)
            .zip(b.as_raw().chunks(3))
            .filter(|(p, q)| p != q)
            .count()
    }

    /// Landmarks on a ring so that every connection is drawable.
    fn ring_face() -> LandmarkSet {
        let pts = (0..TOTAL_LANDMARKS)
            .map(|i| {
                let t = i as f32 / TOTAL_LANDMARKS as f32 * std::f32::consts::TAU;
                let r = 0.2 + 0.15 * ((i * 7 % 11) as f32 / 11.0);
                NormalizedLandmark::new(0.5 + r * t.cos(), 0.5 + r * t.sin(), 0.0)
            })
            .collect();
        LandmarkSet::new(pts)
    }

    #[test]
    fn test_normalized_to_pixel() {
        assert_eq!(normalized_to_pixel(0.0, 0.0, 100, 50), Some((0, 0)));
        assert_eq!(normalized_to_pixel(0.5, 0.5, 100, 50), Some((50, 25)));
        assert_eq!(normalized_to_pixel(1.0, 1.0, 100, 50), Some((99, 49)));
        assert_eq!(normalized_to_pixel(1.01, 0.5, 100, 50), None);
        assert_eq!(normalized_to_pixel(0.5, -0.1, 100, 50), None);
        assert_eq!(normalized_to_pixel(f32::NAN, 0.5, 100, 50), None);
    }

    #[test]
    fn test_draw_points_marks_landmark() {
        let mut img = BgrImage::new(40, 40);
        let set = LandmarkSet::new(vec![NormalizedLandmark::new(0.5, 0.5, 0.0)]);
        draw_points(&mut img, &set, &DrawingSpec::landmarks());
        assert_eq!(img.get_pixel(20, 20), LANDMARK_COLOR.0);
        assert_eq!(img.get_pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_draw_points_ignores_thickness() {
        let set = LandmarkSet::new(vec![NormalizedLandmark::new(0.5, 0.5, 0.0)]);
        let mut thin = BgrImage::new(40, 40);
        draw_points(&mut thin, &set, &DrawingSpec::landmarks());
        let mut thick = BgrImage::new(40, 40);
        let spec = DrawingSpec { thickness: 5, ..DrawingSpec::landmarks() };
        draw_points(&mut thick, &set, &spec);
        assert_eq!(thin, thick);
    }

    #[test]
    fn test_draw_points_skips_off_image() {
        let mut img = BgrImage::new(20, 20);
        let set = LandmarkSet::new(vec![NormalizedLandmark::new(1.5, 0.5, 0.0)]);
        draw_points(&mut img, &set, &DrawingSpec::landmarks());
        assert_eq!(count_changed(&img, &BgrImage::new(20, 20)), 0);
    }

    #[test]
    fn test_draw_connections_draws_line() {
        let mut img = BgrImage::new(50, 50);
        let set = LandmarkSet::new(vec![
            NormalizedLandmark::new(0.1, 0.5, 0.0),
            NormalizedLandmark::new(0.9, 0.5, 0.0),
        ]);
        let spec = DrawingSpec { color: RED, thickness: 1, circle_radius: 0 };
        draw_connections(&mut img, &set, &[(0, 1)], &spec);
        for x in 5..45 {
            assert_eq!(img.get_pixel(x, 25), RED.0, "x = {x}");
        }
    }

    #[test]
    fn test_draw_connections_skips_missing_index() {
        let mut img = BgrImage::new(30, 30);
        let set = LandmarkSet::new(vec![NormalizedLandmark::new(0.5, 0.5, 0.0)]);
        draw_connections(&mut img, &set, &[(0, 400)], &default_tessellation_spec());
        assert_eq!(count_changed(&img, &BgrImage::new(30, 30)), 0);
    }

    #[test]
    fn test_thick_line_is_wider() {
        let set = LandmarkSet::new(vec![
            NormalizedLandmark::new(0.1, 0.5, 0.0),
            NormalizedLandmark::new(0.9, 0.5, 0.0),
        ]);
        let blank = BgrImage::new(60, 60);

        let mut thin = blank.clone();
        draw_connections(&mut thin, &set, &[(0, 1)], &DrawingSpec { color: WHITE, thickness: 1, circle_radius: 0 });
        let mut thick = blank.clone();
        draw_connections(&mut thick, &set, &[(0, 1)], &DrawingSpec { color: WHITE, thickness: 2, circle_radius: 0 });

        assert!(count_changed(&blank, &thick) > count_changed(&blank, &thin));
    }

    #[test]
    fn test_render_styles_differ() {
        let img = BgrImage::new(200, 200);
        let face = ring_face();

        let points = render(&img, &face, DrawStyle::Points);
        let mesh = render(&img, &face, DrawStyle::Mesh);
        let contours = render(&img, &face, DrawStyle::Contours);

        assert!(count_changed(&img, &points) > 0);
        assert!(count_changed(&img, &mesh) > 0);
        assert!(count_changed(&img, &contours) > 0);
        assert_ne!(mesh, contours);
        assert_ne!(points, contours);
    }

    #[test]
    fn test_mesh_ignores_iris_landmarks() {
        let img = BgrImage::new(200, 200);
        let full = ring_face();
        let mut mesh_only = full.clone();
        mesh_only.truncate(MESH_LANDMARKS);

        assert_eq!(render(&img, &full, DrawStyle::Mesh), render(&img, &mesh_only, DrawStyle::Mesh));
    }

    #[test]
    fn test_mesh_skips_lip_gap() {
        // Lips stacked vertically with a wide gap; everything else far to the left.
        let mut pts = vec![NormalizedLandmark::new(0.05, 0.5, 0.0); TOTAL_LANDMARKS];
        pts[13] = NormalizedLandmark::new(0.8, 0.2, 0.0);
        pts[14] = NormalizedLandmark::new(0.8, 0.8, 0.0);
        let out = render(&BgrImage::new(100, 100), &LandmarkSet::new(pts), DrawStyle::Mesh);

        assert_eq!(out.get_pixel(80, 50), [0, 0, 0]);
    }

    #[test]
    fn test_render_leaves_input_untouched() {
        let img = BgrImage::new(64, 64);
        let _ = render(&img, &ring_face(), DrawStyle::Contours);
        assert_eq!(img, BgrImage::new(64, 64));
    }

    #[test]
    fn test_contour_styles_cover_all_parts() {
        let styles = default_contour_styles();
        assert_eq!(styles.len(), ContourPart::ALL.len());
        assert!(styles.iter().all(|(_, s)| s.thickness == CONTOUR_THICKNESS));
    }
}
