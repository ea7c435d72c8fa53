pub mod errors;
pub mod db;
pub mod coffee;
pub mod flavour;
pub mod coffee_flavour;
pub mod event;

#[cfg(test)]
mod tests;
