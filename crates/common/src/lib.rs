pub mod utils;
pub mod pagination;
