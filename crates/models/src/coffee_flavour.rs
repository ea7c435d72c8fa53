use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{coffee, flavour};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coffee_flavours_flavour")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub coffee_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub flavour_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Coffee, Flavour }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Coffee => Entity::belongs_to(coffee::Entity)
                .from(Column::CoffeeId)
                .to(coffee::Column::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .into(),
            Relation::Flavour => Entity::belongs_to(flavour::Entity)
                .from(Column::FlavourId)
                .to(flavour::Column::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
