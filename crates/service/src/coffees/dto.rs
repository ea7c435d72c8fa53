use serde::Deserialize;

pub use common::pagination::PaginationQuery as PaginationQueryDto;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreateCoffeeDto {
    pub name: String,
    pub brand: String,
    pub flavours: Vec<String>,
}

/// Every field optional; `flavours: None` leaves the association alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateCoffeeDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub flavours: Option<Vec<String>>,
}
