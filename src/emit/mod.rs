//! DDL emitters. PostgreSQL is the only supported platform (see spec
//! non-goals): the data model is vendor-neutral, the emitter is not.

pub mod postgres;

pub use postgres::emit_diff;
