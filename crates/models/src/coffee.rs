use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{coffee_flavour, flavour};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coffee")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub brand: String,
    #[sea_orm(default_value = 0)]
    pub recommendations: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

// coffee <-> flavour goes through the junction table
impl Related<flavour::Entity> for Entity {
    fn to() -> RelationDef { coffee_flavour::Relation::Flavour.def() }
    fn via() -> Option<RelationDef> { Some(coffee_flavour::Relation::Coffee.def().rev()) }
}

impl ActiveModelBehavior for ActiveModel {}
