//! End-to-end sheet detection on synthetic frames.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use geo::{Area, ConvexHull, MultiPoint};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;
use imageproc::rect::Rect;
use papertrace_vision::{CornerConfig, DetectError, Frame, Quad, detect_corners, find_paper_corners};

const SHEET: [(i32, i32); 4] = [(40, 30), (170, 50), (160, 170), (30, 150)];
const SHEET_AREA: f64 = 15_800.0;

fn sheet_frame() -> RgbaImage {
    let mut img = RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255]));
    let outline: Vec<PixelPoint<i32>> = SHEET.iter().map(|&(x, y)| PixelPoint::new(x, y)).collect();
    draw_polygon_mut(&mut img, &outline, Rgba([255, 255, 255, 255]));
    img
}

fn hull_area(corners: &[(f64, f64)]) -> f64 {
    MultiPoint::from(corners.to_vec()).convex_hull().unsigned_area()
}

fn nearest_distance(quad: &Quad, (x, y): (i32, i32)) -> f64 {
    let target = papertrace_vision::Point::new(f64::from(x), f64::from(y));
    quad.corners()
        .iter()
        .map(|c| c.distance(target))
        .fold(f64::INFINITY, f64::min)
}

#[test]
fn convex_sheet_found_with_matching_area() {
    let img = sheet_frame();
    let frame = Frame::from_image(&img).unwrap();
    let quad = detect_corners(&frame, &CornerConfig::default())
        .unwrap()
        .expect("sheet should be found");

    let corners: Vec<(f64, f64)> = quad.corners().iter().map(|p| (p.x, p.y)).collect();
    let area = hull_area(&corners);
    assert!(
        (area - SHEET_AREA).abs() / SHEET_AREA < 0.08,
        "hull area {area} differs from {SHEET_AREA} by more than 8%"
    );

    for vertex in SHEET {
        let d = nearest_distance(&quad, vertex);
        assert!(d < 6.0, "no detected corner near {vertex:?} (closest {d:.1}px)");
    }
}

#[test]
fn buffer_api_writes_eight_floats() {
    let img = sheet_frame();
    let mut out = [f32::NAN; 10];
    let found = find_paper_corners(img.as_raw(), img.width(), img.height(), &mut out).unwrap();
    assert!(found);
    assert!(out[..8].iter().all(|v| v.is_finite()));
    assert!(out[8..].iter().all(|v| v.is_nan()));

    let corners: Vec<(f64, f64)> = out[..8]
        .chunks_exact(2)
        .map(|c| (f64::from(c[0]), f64::from(c[1])))
        .collect();
    let area = hull_area(&corners);
    assert!((area - SHEET_AREA).abs() / SHEET_AREA < 0.08, "hull area {area}");
}

#[test]
fn pencil_marks_on_sheet_do_not_disturb_detection() {
    let mut img = sheet_frame();
    draw_filled_rect_mut(&mut img, Rect::at(70, 80).of_size(60, 4), Rgba([30, 30, 30, 255]));
    draw_filled_rect_mut(&mut img, Rect::at(95, 60).of_size(4, 70), Rgba([30, 30, 30, 255]));

    let frame = Frame::from_image(&img).unwrap();
    let quad = detect_corners(&frame, &CornerConfig::default())
        .unwrap()
        .expect("sheet should be found");
    for vertex in SHEET {
        assert!(nearest_distance(&quad, vertex) < 6.0, "missing corner near {vertex:?}");
    }
}

#[test]
fn empty_table_reports_not_found() {
    let img = RgbaImage::from_pixel(120, 90, Rgba([10, 10, 10, 255]));
    let mut out = [0.0f32; 8];
    let found = find_paper_corners(img.as_raw(), 120, 90, &mut out).unwrap();
    assert!(!found);
    assert_eq!(out, [0.0; 8]);
}

#[test]
fn malformed_frames_rejected() {
    let mut out = [0.0f32; 8];
    assert!(matches!(
        find_paper_corners(&[], 10, 10, &mut out),
        Err(DetectError::EmptyFrame)
    ));
    assert!(matches!(
        find_paper_corners(&[0; 40], 10, 0, &mut out),
        Err(DetectError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        find_paper_corners(&[0; 40], 10, 10, &mut out),
        Err(DetectError::BufferSizeMismatch {
            expected: 400,
            actual: 40
        })
    ));
}
