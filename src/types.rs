use geo::{MultiPolygon, Point};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct District {
    pub geometry: MultiPolygon<f64>,
    // Map<Hospital display name, patient count>
    pub counts: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct DistrictLayer {
    pub districts: Vec<District>,
}

#[derive(Debug, Clone)]
pub struct HospitalSite {
    pub name: String,
    pub point: Point<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct HospitalLayer {
    pub sites: Vec<HospitalSite>,
}

/// Total bounding box of a layer, in lon/lat degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn center(&self) -> MapCenter {
        MapCenter {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}
