use crate::types::{Bounds, DistrictLayer, HospitalLayer, HospitalSite};
use anyhow::{anyhow, Result};
use geo::algorithm::bounding_rect::BoundingRect;

/// Derived metric for one figure: unit price times the per-district count
/// for the selected hospital, plus the sum for display. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Revenue {
    pub per_district: Vec<f64>,
    pub total: f64,
}

pub fn compute_bounds(layer: &DistrictLayer) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;

    for district in &layer.districts {
        let rect = match district.geometry.bounding_rect() {
            Some(rect) => rect,
            None => continue,
        };
        match &mut bounds {
            Some(bounds) => {
                bounds.min_lon = bounds.min_lon.min(rect.min().x);
                bounds.min_lat = bounds.min_lat.min(rect.min().y);
                bounds.max_lon = bounds.max_lon.max(rect.max().x);
                bounds.max_lat = bounds.max_lat.max(rect.max().y);
            }
            None => {
                bounds = Some(Bounds {
                    min_lon: rect.min().x,
                    min_lat: rect.min().y,
                    max_lon: rect.max().x,
                    max_lat: rect.max().y,
                });
            }
        }
    }

    bounds
}

/// Elementwise multiply, no rounding. A zero or negative unit price is
/// accepted and produces zero/negative revenue. A column the layer does
/// not carry is an error.
pub fn compute_revenue(layer: &DistrictLayer, column: &str, unit_price: f64) -> Result<Revenue> {
    let mut per_district = Vec::with_capacity(layer.districts.len());

    for (index, district) in layer.districts.iter().enumerate() {
        let count = district
            .counts
            .get(column)
            .copied()
            .ok_or_else(|| anyhow!("District {} has no column '{}'", index, column))?;
        per_district.push(unit_price * count);
    }

    let total = per_district.iter().sum();
    Ok(Revenue { per_district, total })
}

/// Exact-match filter on institution name. An unknown name yields an
/// empty subset, not an error.
pub fn select_hospital_points<'a>(layer: &'a HospitalLayer, name: &str) -> Vec<&'a HospitalSite> {
    layer.sites.iter().filter(|site| site.name == name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::District;
    use geo::{polygon, MultiPolygon, Point};
    use std::collections::HashMap;

    fn district(counts: &[(&str, f64)], x0: f64, y0: f64) -> District {
        District {
            geometry: MultiPolygon::new(vec![polygon![
                (x: x0, y: y0),
                (x: x0 + 0.2, y: y0),
                (x: x0 + 0.2, y: y0 + 0.1),
                (x: x0, y: y0 + 0.1),
            ]]),
            counts: counts
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
        }
    }

    #[test]
    fn revenue_is_exact_elementwise_product() {
        let layer = DistrictLayer {
            districts: vec![
                district(&[("서울대학교병원", 100.0)], 126.9, 37.5),
                district(&[("서울대학교병원", 3.5)], 127.0, 37.6),
            ],
        };
        let revenue = compute_revenue(&layer, "서울대학교병원", 500.0).unwrap();
        assert_eq!(revenue.per_district, vec![50_000.0, 1_750.0]);
        assert_eq!(revenue.total, 51_750.0);
    }

    #[test]
    fn negative_and_zero_prices_pass_through() {
        let layer = DistrictLayer {
            districts: vec![district(&[("서울대학교병원", 10.0)], 126.9, 37.5)],
        };
        let zero = compute_revenue(&layer, "서울대학교병원", 0.0).unwrap();
        assert_eq!(zero.total, 0.0);
        let negative = compute_revenue(&layer, "서울대학교병원", -2.0).unwrap();
        assert_eq!(negative.per_district, vec![-20.0]);
        assert_eq!(negative.total, -20.0);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let layer = DistrictLayer {
            districts: vec![district(&[("서울대학교병원", 10.0)], 126.9, 37.5)],
        };
        assert!(compute_revenue(&layer, "없는병원", 1.0).is_err());
    }

    #[test]
    fn bounds_cover_all_districts() {
        let layer = DistrictLayer {
            districts: vec![
                district(&[("서울대학교병원", 1.0)], 126.8, 37.4),
                district(&[("서울대학교병원", 1.0)], 127.1, 37.6),
            ],
        };
        let bounds = compute_bounds(&layer).unwrap();
        assert_eq!(bounds.min_lon, 126.8);
        assert_eq!(bounds.min_lat, 37.4);
        assert_eq!(bounds.max_lon, 127.3);
        assert_eq!(bounds.max_lat, 37.7);

        let center = bounds.center();
        assert!((center.lon - 127.05).abs() < 1e-12);
        assert!((center.lat - 37.55).abs() < 1e-12);
    }

    #[test]
    fn empty_layer_has_no_bounds() {
        assert!(compute_bounds(&DistrictLayer::default()).is_none());
    }

    #[test]
    fn unknown_hospital_selects_empty_subset() {
        let layer = HospitalLayer {
            sites: vec![HospitalSite {
                name: "서울대학교병원".to_string(),
                point: Point::new(126.99, 37.58),
            }],
        };
        assert!(select_hospital_points(&layer, "없는병원").is_empty());
        assert_eq!(select_hospital_points(&layer, "서울대학교병원").len(), 1);
    }

    #[test]
    fn duplicate_names_are_all_selected() {
        let layer = HospitalLayer {
            sites: vec![
                HospitalSite {
                    name: "삼성서울병원".to_string(),
                    point: Point::new(127.08, 37.49),
                },
                HospitalSite {
                    name: "삼성서울병원".to_string(),
                    point: Point::new(127.09, 37.50),
                },
            ],
        };
        assert_eq!(select_hospital_points(&layer, "삼성서울병원").len(), 2);
    }
}
