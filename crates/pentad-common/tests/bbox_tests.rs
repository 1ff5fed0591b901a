//! Tests for BoundingBox validation and overlap.

use pentad_common::bbox::{BboxError, BoundingBox};

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
    assert_eq!(bbox.min_x, -180.0);
    assert_eq!(bbox.min_y, -90.0);
    assert_eq!(bbox.max_x, 180.0);
    assert_eq!(bbox.max_y, 90.0);
}

#[test]
fn test_bbox_try_new_pentad() {
    // A 5 arc-minute pentad near Pretoria
    let bbox = BoundingBox::try_new(28.0, -25.75, 28.083333, -25.666667).unwrap();
    assert!(bbox.width() > 0.08 && bbox.width() < 0.09);
    assert!(bbox.height() > 0.08 && bbox.height() < 0.09);
}

#[test]
fn test_bbox_try_new_degenerate_y() {
    let result = BoundingBox::try_new(0.0, 5.0, 1.0, 5.0);
    assert!(matches!(result, Err(BboxError::EmptyY { .. })));
}

#[test]
fn test_bbox_try_new_infinite() {
    let result = BoundingBox::try_new(0.0, 0.0, f64::INFINITY, 1.0);
    assert!(matches!(
        result,
        Err(BboxError::NonFinite { bound: "max_x", .. })
    ));
}

// ============================================================================
// Overlap tests
// ============================================================================

#[test]
fn test_touching_edges_do_not_intersect() {
    let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let b = BoundingBox::new(1.0, 0.0, 2.0, 1.0);
    assert!(!a.intersects(&b));
    assert!(a.intersection(&b).is_none());
}

#[test]
fn test_contained_intersection_is_inner() {
    let outer = BoundingBox::new(-10.0, -10.0, 10.0, 10.0);
    let inner = BoundingBox::new(-1.0, -2.0, 3.0, 4.0);
    assert_eq!(outer.intersection(&inner), Some(inner));
}

#[test]
fn test_contains_point_edges() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(bbox.contains_point(0.0, 0.0));
    assert!(bbox.contains_point(10.0, 10.0));
    assert!(!bbox.contains_point(10.01, 5.0));
}

#[test]
fn test_center_and_size() {
    let bbox = BoundingBox::new(2.0, 4.0, 6.0, 10.0);
    assert_eq!(bbox.center(), (4.0, 7.0));
    assert_eq!((bbox.width(), bbox.height()), (4.0, 6.0));
}

#[test]
fn test_transposed() {
    let bbox = BoundingBox::new(-25.75, 28.0, -25.666667, 28.083333);
    let t = bbox.transposed();
    assert_eq!(t.min_x, 28.0);
    assert_eq!(t.min_y, -25.75);
    assert_eq!(t.max_x, 28.083333);
    assert_eq!(t.max_y, -25.666667);
}
