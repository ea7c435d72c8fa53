/// Query-shape tests against sea-orm's mock connection
pub mod entity_tests;
