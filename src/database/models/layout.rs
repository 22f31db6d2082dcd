use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::catalog::{FenceType, GateType};
use super::job::{Job, Parcel};
use super::{require_feet, require_text, trimmed, FieldErrors, GeoPoint, ListFilter, Reference, Resource, Stamp};

const EARTH_RADIUS_FEET: f64 = 20_902_231.0;

/// Great-circle length of a drawn polyline, in feet.
pub fn polyline_length_feet(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_feet(pair[0], pair[1]))
        .sum()
}

fn haversine_feet(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_FEET * h.sqrt().asin()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FenceSegment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub parcel_id: Option<Uuid>,
    pub fence_type_id: Option<Uuid>,
    pub label: Option<String>,
    pub coordinates: Vec<GeoPoint>,
    pub length_feet: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FenceSegmentInput {
    pub job_id: Uuid,
    pub parcel_id: Option<Uuid>,
    pub fence_type_id: Option<Uuid>,
    pub label: Option<String>,
    pub coordinates: Vec<GeoPoint>,
    /// Measured length; derived from the coordinates when omitted.
    pub length_feet: Option<f64>,
}

impl Resource for FenceSegment {
    const TABLE: &'static str = "fence_segments";
    const LABEL: &'static str = "Fence segment";
    const PATH: &'static str = "/api/fence-segments";
    const LIST_FILTERS: &'static [ListFilter] = &[
        ListFilter { route: "by-job", column: "job_id" },
        ListFilter { route: "by-parcel", column: "parcel_id" },
    ];

    type Input = FenceSegmentInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: FenceSegmentInput, stamp: Stamp) -> Self {
        let mut segment = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            job_id: Uuid::nil(),
            parcel_id: None,
            fence_type_id: None,
            label: None,
            coordinates: Vec::new(),
            length_feet: 0.0,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        segment.apply_input(input, stamp.now);
        segment
    }

    fn apply_input(&mut self, input: FenceSegmentInput, now: DateTime<Utc>) {
        self.job_id = input.job_id;
        self.parcel_id = input.parcel_id;
        self.fence_type_id = input.fence_type_id;
        self.label = trimmed(input.label);
        self.length_feet = input
            .length_feet
            .unwrap_or_else(|| (polyline_length_feet(&input.coordinates) * 100.0).round() / 100.0);
        self.coordinates = input.coordinates;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.coordinates.len() < 2 {
            errors.insert("coordinates".to_string(), "A fence segment needs at least two points".to_string());
        } else if self.coordinates.iter().any(|p| !p.is_valid()) {
            errors.insert("coordinates".to_string(), "Coordinates out of range".to_string());
        }
        require_feet(&mut errors, "length_feet", self.length_feet);
        errors
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new(Job::TABLE, Job::LABEL, self.job_id)];
        if let Some(parcel_id) = self.parcel_id {
            refs.push(Reference::new(Parcel::TABLE, Parcel::LABEL, parcel_id));
        }
        if let Some(fence_type_id) = self.fence_type_id {
            refs.push(Reference::new(FenceType::TABLE, FenceType::LABEL, fence_type_id));
        }
        refs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatePosition {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub fence_segment_id: Option<Uuid>,
    pub gate_type_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub rotation_degrees: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatePositionInput {
    pub job_id: Uuid,
    pub fence_segment_id: Option<Uuid>,
    pub gate_type_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub rotation_degrees: f64,
}

impl Resource for GatePosition {
    const TABLE: &'static str = "gate_positions";
    const LABEL: &'static str = "Gate position";
    const PATH: &'static str = "/api/gate-positions";
    const LIST_FILTERS: &'static [ListFilter] = &[
        ListFilter { route: "by-job", column: "job_id" },
        ListFilter { route: "by-segment", column: "fence_segment_id" },
    ];

    type Input = GatePositionInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: GatePositionInput, stamp: Stamp) -> Self {
        let mut gate = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            job_id: Uuid::nil(),
            fence_segment_id: None,
            gate_type_id: None,
            latitude: 0.0,
            longitude: 0.0,
            rotation_degrees: 0.0,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        gate.apply_input(input, stamp.now);
        gate
    }

    fn apply_input(&mut self, input: GatePositionInput, now: DateTime<Utc>) {
        self.job_id = input.job_id;
        self.fence_segment_id = input.fence_segment_id;
        self.gate_type_id = input.gate_type_id;
        self.latitude = input.latitude;
        self.longitude = input.longitude;
        self.rotation_degrees = input.rotation_degrees.rem_euclid(360.0);
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let point = GeoPoint { latitude: self.latitude, longitude: self.longitude };
        if !point.is_valid() {
            errors.insert("latitude".to_string(), "Coordinates out of range".to_string());
        }
        errors
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new(Job::TABLE, Job::LABEL, self.job_id)];
        if let Some(segment_id) = self.fence_segment_id {
            refs.push(Reference::new(FenceSegment::TABLE, FenceSegment::LABEL, segment_id));
        }
        if let Some(gate_type_id) = self.gate_type_id {
            refs.push(Reference::new(GateType::TABLE, GateType::LABEL, gate_type_id));
        }
        refs
    }
}

/// Free-form map drawing (GeoJSON) attached to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drawing {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub name: String,
    pub geometry: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DrawingInput {
    pub job_id: Uuid,
    pub name: String,
    pub geometry: Value,
}

impl Resource for Drawing {
    const TABLE: &'static str = "drawings";
    const LABEL: &'static str = "Drawing";
    const PATH: &'static str = "/api/drawings";
    const LIST_FILTERS: &'static [ListFilter] = &[ListFilter { route: "by-job", column: "job_id" }];

    type Input = DrawingInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: DrawingInput, stamp: Stamp) -> Self {
        let mut drawing = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            job_id: Uuid::nil(),
            name: String::new(),
            geometry: Value::Null,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        drawing.apply_input(input, stamp.now);
        drawing
    }

    fn apply_input(&mut self, input: DrawingInput, now: DateTime<Utc>) {
        self.job_id = input.job_id;
        self.name = input.name.trim().to_string();
        self.geometry = input.geometry;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name);
        if !self.geometry.is_object() {
            errors.insert("geometry".to_string(), "Geometry must be a GeoJSON object".to_string());
        }
        errors
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new(Job::TABLE, Job::LABEL, self.job_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_length_is_derived_from_coordinates() {
        // One thousandth of a degree of latitude is roughly 364.8 feet.
        let segment = FenceSegment::from_input(
            FenceSegmentInput {
                job_id: Uuid::new_v4(),
                coordinates: vec![
                    GeoPoint { latitude: 45.0, longitude: -122.0 },
                    GeoPoint { latitude: 45.001, longitude: -122.0 },
                ],
                ..Default::default()
            },
            Stamp::new(Uuid::new_v4()),
        );
        assert!((segment.length_feet - 364.8).abs() < 1.0, "got {}", segment.length_feet);
        assert!(segment.validate().is_empty());
    }

    #[test]
    fn explicit_length_wins_and_single_point_is_invalid() {
        let segment = FenceSegment::from_input(
            FenceSegmentInput {
                job_id: Uuid::new_v4(),
                coordinates: vec![GeoPoint { latitude: 45.0, longitude: -122.0 }],
                length_feet: Some(120.0),
                ..Default::default()
            },
            Stamp::new(Uuid::new_v4()),
        );
        assert_eq!(segment.length_feet, 120.0);
        assert!(segment.validate().contains_key("coordinates"));
    }

    #[test]
    fn gate_references_include_optional_links() {
        let job_id = Uuid::new_v4();
        let segment_id = Uuid::new_v4();
        let gate = GatePosition::from_input(
            GatePositionInput {
                job_id,
                fence_segment_id: Some(segment_id),
                rotation_degrees: -90.0,
                ..Default::default()
            },
            Stamp::new(Uuid::new_v4()),
        );
        assert_eq!(gate.rotation_degrees, 270.0);
        assert_eq!(
            gate.references(),
            vec![
                Reference::new("jobs", "Job", job_id),
                Reference::new("fence_segments", "Fence segment", segment_id),
            ]
        );
    }
}
