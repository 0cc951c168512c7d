//! Polygon validation and center computation.

use geo::BoundingRect as _;

use crate::{LatLng, RegionError};

/// Minimum number of distinct vertices in a region polygon.
pub const MIN_VERTICES: usize = 3;

/// Validates a polygon and returns its vertices without a closing
/// duplicate of the first vertex.
///
/// Repeated vertices are kept in the output but counted once.
///
/// # Errors
///
/// * [`RegionError::InvalidCoordinate`] if any vertex is out of range
/// * [`RegionError::TooFewVertices`] if fewer than [`MIN_VERTICES`]
///   distinct vertices remain
pub fn normalize_polygon(mut vertices: Vec<LatLng>) -> Result<Vec<LatLng>, RegionError> {
    if let Some(bad) = vertices.iter().find(|p| !p.is_valid()) {
        return Err(RegionError::InvalidCoordinate {
            lat: bad.lat,
            lng: bad.lng,
        });
    }

    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    let distinct = vertices
        .iter()
        .enumerate()
        .filter(|(i, p)| !vertices[..*i].contains(p))
        .count();
    if distinct < MIN_VERTICES {
        return Err(RegionError::TooFewVertices { count: distinct });
    }

    Ok(vertices)
}

/// Center of the polygon's bounding box.
///
/// Returns `None` for an empty polygon.
#[must_use]
pub fn bounding_box_center(vertices: &[LatLng]) -> Option<LatLng> {
    let coords: Vec<geo::Coord<f64>> = vertices
        .iter()
        .map(|p| geo::coord! { x: p.lng, y: p.lat })
        .collect();

    geo::MultiPoint::from(coords)
        .bounding_rect()
        .map(|rect| {
            let center = rect.center();
            LatLng::new(center.y, center.x)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_bounding_box_midpoint() {
        let vertices = vec![
            LatLng::new(-3.0, -62.0),
            LatLng::new(-3.0, -60.0),
            LatLng::new(-5.0, -61.0),
        ];
        let center = bounding_box_center(&vertices).unwrap();
        assert!((center.lat - -4.0).abs() < 1e-9);
        assert!((center.lng - -61.0).abs() < 1e-9);
    }

    #[test]
    fn center_of_empty_polygon_is_none() {
        assert!(bounding_box_center(&[]).is_none());
    }

    #[test]
    fn closing_vertex_is_dropped() {
        let vertices = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 1.0),
            LatLng::new(0.0, 0.0),
        ];
        assert_eq!(normalize_polygon(vertices).unwrap().len(), 3);
    }

    #[test]
    fn rejects_degenerate_polygons() {
        let closed_line = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(0.0, 0.0),
        ];
        assert_eq!(
            normalize_polygon(closed_line),
            Err(RegionError::TooFewVertices { count: 2 })
        );
    }

    #[test]
    fn repeated_vertices_count_once() {
        let point = LatLng::new(2.0, 3.0);
        assert_eq!(
            normalize_polygon(vec![point; 4]),
            Err(RegionError::TooFewVertices { count: 1 })
        );

        let with_repeat = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(0.0, 0.0),
        ];
        assert_eq!(
            normalize_polygon(with_repeat),
            Err(RegionError::TooFewVertices { count: 2 })
        );
    }

    #[test]
    fn rejects_out_of_range_vertices() {
        let vertices = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 181.0),
            LatLng::new(1.0, 1.0),
        ];
        assert!(matches!(
            normalize_polygon(vertices),
            Err(RegionError::InvalidCoordinate { .. })
        ));
    }
}
