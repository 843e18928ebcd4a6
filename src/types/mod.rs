//! Scalar column-type variants, the process-wide type registry, and the
//! PostgreSQL-specific mapping between DB type names and logical types.

mod postgres;

pub use postgres::{ColumnMetadata, mapped_db_type_names, sql_declaration};

use crate::error::GormiteError;
use std::sync::OnceLock;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The closed set of logical column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
pub enum LogicalType {
    AsciiString,
    Bigint,
    Binary,
    Blob,
    Boolean,
    Date,
    DateImmutable,
    DateInterval,
    DateTime,
    DateTimeImmutable,
    DateTimeTz,
    DateTimeTzImmutable,
    Decimal,
    Float,
    Guid,
    Integer,
    Json,
    SimpleArray,
    SmallFloat,
    SmallInt,
    String,
    Text,
    Time,
    TimeImmutable,
}

/// Process-wide registry mapping [`LogicalType`] tags to themselves —
/// mirrors the source's instance registry, but since every "instance" here
/// is just the enum tag, registration only guards against re-registering a
/// tag and records whether the registry has been read yet.
///
/// Extension is only permitted before the first [`TypeRegistry::get`] call;
/// after that the registry is treated as immutable (§5 of the design).
pub struct TypeRegistry {
    known: Vec<LogicalType>,
    locked: std::sync::atomic::AtomicBool,
}

impl TypeRegistry {
    fn with_builtins() -> Self {
        use strum::IntoEnumIterator;
        Self {
            known: LogicalType::iter().collect(),
            locked: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn has(&self, ty: LogicalType) -> bool {
        self.known.contains(&ty)
    }

    pub fn get(&self, ty: LogicalType) -> Result<LogicalType, GormiteError> {
        self.locked.store(true, std::sync::atomic::Ordering::Relaxed);
        if self.has(ty) {
            Ok(ty)
        } else {
            Err(GormiteError::NotFound {
                kind: "logical type",
                name: format!("{ty:?}"),
            })
        }
    }

    /// Registers an additional tag. Fails once the registry has been read
    /// from (via [`TypeRegistry::get`]), or if the tag is already known.
    pub fn register(&mut self, ty: LogicalType) -> Result<(), GormiteError> {
        if self.locked.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(GormiteError::UnsupportedFeature(
                "type registry is locked after first lookup".to_string(),
            ));
        }
        if self.has(ty) {
            return Err(GormiteError::DuplicateName {
                kind: "logical type",
                name: format!("{ty:?}"),
            });
        }
        self.known.push(ty);
        Ok(())
    }
}

static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Returns the process-wide type registry, prefilled with the built-in
/// variants on first access.
pub fn registry() -> &'static TypeRegistry {
    REGISTRY.get_or_init(TypeRegistry::with_builtins)
}

/// Maps a PostgreSQL DB type name to its logical type, per the table in
/// spec §6 / `InitializeDoctrineTypeMappings`.
pub fn from_db_type_name(name: &str) -> Result<LogicalType, GormiteError> {
    postgres::from_db_type_name(name)
}
