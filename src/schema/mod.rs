//! The schema model: Column, Index, UniqueConstraint, ForeignKeyConstraint,
//! Sequence, Table, Schema — see spec §3.

pub mod column;
pub mod foreign_key;
pub mod index;
pub mod schema;
pub mod sequence;
pub mod table;

pub use column::Column;
pub use foreign_key::ForeignKeyConstraint;
pub use index::{Index, UniqueConstraint};
pub use schema::{Schema, SchemaConfig};
pub use sequence::Sequence;
pub use table::Table;
