pub mod handler_tests;
pub mod resource_tests;
pub mod schema_tests;
