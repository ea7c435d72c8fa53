//! Service layer providing the coffee catalog operations on top of models.
//! - Separates business logic from data access through repository traits.
//! - Reuses entity definitions in the `models` crate.

pub mod errors;
pub mod coffees;
