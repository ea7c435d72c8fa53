//! Domain values handed across the repository boundary.
//!
//! Ids are optional: `None` marks a value that exists only in memory and is
//! inserted on the next save.

use serde::Serialize;
use serde_json::json;

pub const RECOMMEND_EVENT_NAME: &str = "recommend_coffee";
pub const COFFEE_EVENT_TYPE: &str = "coffee";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Flavour {
    pub id: Option<i32>,
    pub name: String,
}

impl Flavour {
    /// A flavour not yet stored; the owning coffee's save inserts it.
    pub fn pending(name: impl Into<String>) -> Self { Self { id: None, name: name.into() } }

    pub fn is_pending(&self) -> bool { self.id.is_none() }
}

impl From<models::flavour::Model> for Flavour {
    fn from(m: models::flavour::Model) -> Self { Self { id: Some(m.id), name: m.name } }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Coffee {
    pub id: Option<i32>,
    pub name: String,
    pub brand: String,
    pub recommendations: i32,
    pub flavours: Vec<Flavour>,
}

impl Coffee {
    pub fn new(name: impl Into<String>, brand: impl Into<String>, flavours: Vec<Flavour>) -> Self {
        Self { id: None, name: name.into(), brand: brand.into(), recommendations: 0, flavours }
    }

    pub fn from_parts(model: models::coffee::Model, flavours: Vec<models::flavour::Model>) -> Self {
        Self {
            id: Some(model.id),
            name: model.name,
            brand: model.brand,
            recommendations: model.recommendations,
            flavours: flavours.into_iter().map(Flavour::from).collect(),
        }
    }

    /// Overwrite the fields present in `patch`, keep the rest.
    pub fn apply(&mut self, patch: CoffeePatch) {
        if let Some(name) = patch.name { self.name = name; }
        if let Some(brand) = patch.brand { self.brand = brand; }
        if let Some(flavours) = patch.flavours { self.flavours = flavours; }
    }
}

/// Partial update with flavour names already resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoffeePatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub flavours: Option<Vec<Flavour>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl NewEvent {
    pub fn recommend_coffee(coffee_id: Option<i32>) -> Self {
        Self {
            name: RECOMMEND_EVENT_NAME.to_string(),
            event_type: COFFEE_EVENT_TYPE.to_string(),
            payload: json!({ "coffeeId": coffee_id }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl From<models::event::Model> for Event {
    fn from(m: models::event::Model) -> Self {
        Self { id: m.id, name: m.name, event_type: m.event_type, payload: m.payload }
    }
}
