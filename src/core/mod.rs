// Core modules implementing option typing, coercion, and schema projection.
pub mod alias;
pub mod coerce;
pub mod diagnostic;
pub mod error;
pub mod job;
pub mod option_type;
pub mod overrides;
pub mod preset;
pub mod registry;
pub mod schema;
pub mod store;
pub mod value;
