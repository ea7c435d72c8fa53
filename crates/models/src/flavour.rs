use sea_orm::{entity::prelude::*, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::{coffee, coffee_flavour, errors};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flavour")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl Related<coffee::Entity> for Entity {
    fn to() -> RelationDef { coffee_flavour::Relation::Coffee.def() }
    fn via() -> Option<RelationDef> { Some(coffee_flavour::Relation::Flavour.def().rev()) }
}

impl ActiveModelBehavior for ActiveModel {}

/// Exact-match lookup by the flavour's natural key.
pub async fn find_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Name.eq(name))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}
