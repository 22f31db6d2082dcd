use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    require_feet, require_money, require_text, trimmed, FieldErrors, ListFilter, Reference, Resource,
    Stamp,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FenceType {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub material: Option<String>,
    pub style: Option<String>,
    pub color: Option<String>,
    pub height_feet: f64,
    pub price_per_linear_foot: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FenceTypeInput {
    pub name: String,
    pub description: Option<String>,
    pub material: Option<String>,
    pub style: Option<String>,
    pub color: Option<String>,
    pub height_feet: f64,
    pub price_per_linear_foot: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Default for FenceTypeInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            material: None,
            style: None,
            color: None,
            height_feet: 0.0,
            price_per_linear_foot: Decimal::ZERO,
            is_active: true,
        }
    }
}

impl Resource for FenceType {
    const TABLE: &'static str = "fence_types";
    const LABEL: &'static str = "Fence type";
    const PATH: &'static str = "/api/fence-types";

    type Input = FenceTypeInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: FenceTypeInput, stamp: Stamp) -> Self {
        let mut fence = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            name: String::new(),
            description: None,
            material: None,
            style: None,
            color: None,
            height_feet: 0.0,
            price_per_linear_foot: Decimal::ZERO,
            is_active: true,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        fence.apply_input(input, stamp.now);
        fence
    }

    fn apply_input(&mut self, input: FenceTypeInput, now: DateTime<Utc>) {
        self.name = input.name.trim().to_string();
        self.description = trimmed(input.description);
        self.material = trimmed(input.material);
        self.style = trimmed(input.style);
        self.color = trimmed(input.color);
        self.height_feet = input.height_feet;
        self.price_per_linear_foot = input.price_per_linear_foot;
        self.is_active = input.is_active;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name);
        require_feet(&mut errors, "height_feet", self.height_feet);
        require_money(&mut errors, "price_per_linear_foot", self.price_per_linear_foot);
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateType {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub width_feet: f64,
    pub height_feet: f64,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateTypeInput {
    pub name: String,
    pub description: Option<String>,
    pub width_feet: f64,
    pub height_feet: f64,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Default for GateTypeInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            width_feet: 0.0,
            height_feet: 0.0,
            price: Decimal::ZERO,
            is_active: true,
        }
    }
}

impl Resource for GateType {
    const TABLE: &'static str = "gate_types";
    const LABEL: &'static str = "Gate type";
    const PATH: &'static str = "/api/gate-types";

    type Input = GateTypeInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: GateTypeInput, stamp: Stamp) -> Self {
        let mut gate = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            name: String::new(),
            description: None,
            width_feet: 0.0,
            height_feet: 0.0,
            price: Decimal::ZERO,
            is_active: true,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        gate.apply_input(input, stamp.now);
        gate
    }

    fn apply_input(&mut self, input: GateTypeInput, now: DateTime<Utc>) {
        self.name = input.name.trim().to_string();
        self.description = trimmed(input.description);
        self.width_feet = input.width_feet;
        self.height_feet = input.height_feet;
        self.price = input.price;
        self.is_active = input.is_active;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name);
        require_feet(&mut errors, "width_feet", self.width_feet);
        require_feet(&mut errors, "height_feet", self.height_feet);
        require_money(&mut errors, "price", self.price);
        errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Post,
    Rail,
    Panel,
    Picket,
    Hardware,
    Concrete,
    #[default]
    Other,
}

/// Bill-of-materials item, optionally tied to the fence type it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub category: ComponentCategory,
    pub unit: String,
    pub unit_cost: Decimal,
    pub fence_type_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComponentInput {
    pub name: String,
    pub sku: Option<String>,
    pub category: ComponentCategory,
    pub unit: Option<String>,
    pub unit_cost: Decimal,
    pub fence_type_id: Option<Uuid>,
}

impl Resource for Component {
    const TABLE: &'static str = "components";
    const LABEL: &'static str = "Component";
    const PATH: &'static str = "/api/components";
    const LIST_FILTERS: &'static [ListFilter] = &[ListFilter { route: "by-fence-type", column: "fence_type_id" }];

    type Input = ComponentInput;

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn from_input(input: ComponentInput, stamp: Stamp) -> Self {
        let mut component = Self {
            id: stamp.id,
            organization_id: stamp.organization_id,
            name: String::new(),
            sku: None,
            category: ComponentCategory::Other,
            unit: String::new(),
            unit_cost: Decimal::ZERO,
            fence_type_id: None,
            created_at: stamp.now,
            updated_at: stamp.now,
        };
        component.apply_input(input, stamp.now);
        component
    }

    fn apply_input(&mut self, input: ComponentInput, now: DateTime<Utc>) {
        self.name = input.name.trim().to_string();
        self.sku = trimmed(input.sku);
        self.category = input.category;
        self.unit = trimmed(input.unit).unwrap_or_else(|| "each".to_string());
        self.unit_cost = input.unit_cost;
        self.fence_type_id = input.fence_type_id;
        self.updated_at = now;
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name);
        require_money(&mut errors, "unit_cost", self.unit_cost);
        errors
    }

    fn references(&self) -> Vec<Reference> {
        self.fence_type_id
            .map(|id| Reference::new(FenceType::TABLE, FenceType::LABEL, id))
            .into_iter()
            .collect()
    }
}
