use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_non_negative_f64, require_text, trimmed, FieldErrors, GeoPoint, ListFilter, Reference, Resource, Stamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Draft,
    Quoted,
    Approved,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub status: JobStatus,
    pub notes: Option<String>,
    pub is_sample: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobInput {
    pub name: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub status: JobStatus,
    pub notes: Option<String>,
}

impl Resource for Job {
    const TABLE: &'static str = "jobs";
    const LABEL: &'static str = "Job";
    const PATH: &'static str = "/api/jobs";

    type Input = JobInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: JobInput, stamp: Stamp) -> Self {
        let mut job = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            name: String::new(),
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            address: None,
            status: JobStatus::Draft,
            notes: None,
            is_sample: false,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        job.apply_input(input, stamp.now);
        job
    }

    fn apply_input(&mut self, input: JobInput, now: DateTime<Utc>) {
        self.name = input.name.trim().to_string();
        self.customer_name = trimmed(input.customer_name);
        self.customer_email = trimmed(input.customer_email);
        self.customer_phone = trimmed(input.customer_phone);
        self.address = trimmed(input.address);
        self.status = input.status;
        self.notes = input.notes;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name);
        if let Some(email) = &self.customer_email {
            if crate::auth::validate_email_format(email).is_err() {
                errors.insert("customer_email".to_string(), "Invalid email format".to_string());
            }
        }
        errors
    }
}

/// Land parcel a job fences, with its surveyed boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub job_id: Uuid,
    pub apn: Option<String>,
    pub address: Option<String>,
    pub boundary: Vec<GeoPoint>,
    pub area_square_feet: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParcelInput {
    pub job_id: Uuid,
    pub apn: Option<String>,
    pub address: Option<String>,
    pub boundary: Vec<GeoPoint>,
    pub area_square_feet: Option<f64>,
    pub notes: Option<String>,
}

impl Resource for Parcel {
    const TABLE: &'static str = "parcels";
    const LABEL: &'static str = "Parcel";
    const PATH: &'static str = "/api/parcels";
    const LIST_FILTERS: &'static [ListFilter] = &[ListFilter { route: "by-job", column: "job_id" }];

    type Input = ParcelInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: ParcelInput, stamp: Stamp) -> Self {
        let mut parcel = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            job_id: Uuid::nil(),
            apn: None,
            address: None,
            boundary: Vec::new(),
            area_square_feet: None,
            notes: None,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        parcel.apply_input(input, stamp.now);
        parcel
    }

    fn apply_input(&mut self, input: ParcelInput, now: DateTime<Utc>) {
        self.job_id = input.job_id;
        self.apn = trimmed(input.apn);
        self.address = trimmed(input.address);
        self.boundary = input.boundary;
        self.area_square_feet = input.area_square_feet;
        self.notes = input.notes;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(area) = self.area_square_feet {
            require_non_negative_f64(&mut errors, "area_square_feet", area);
        }
        if self.boundary.iter().any(|p| !p.is_valid()) {
            errors.insert("boundary".to_string(), "Coordinates out of range".to_string());
        }
        errors
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new(Job::TABLE, Job::LABEL, self.job_id)]
    }
}
