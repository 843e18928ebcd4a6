//! Live-schema introspection. PostgreSQL is the only supported source,
//! mirroring the emitter's platform restriction.

pub mod postgres;

pub use postgres::introspect_schema;
