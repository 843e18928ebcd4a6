//! Sequences and auto-increment detection.

#[derive(Debug, Clone)]
pub struct Sequence {
    pub name: String,
    pub allocation_size: i64,
    pub initial_value: i64,
    pub cache: Option<i64>,
}

impl Sequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allocation_size: 1,
            initial_value: 1,
            cache: None,
        }
    }

    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Whether `sequence_shortest_name` is the auto-increment sequence for a
/// table with the given shortest name and single-column integer PK.
///
/// Per spec §4.4: a sequence is auto-increment for a table iff the table
/// has a single-column PK of type Integer and the sequence's shortest name
/// equals `"{table}__{column}__seq"`.
pub fn is_autoincrement_sequence_name(
    sequence_shortest_name: &str,
    table_shortest_name: &str,
    pk_column_name: &str,
) -> bool {
    sequence_shortest_name == format!("{table_shortest_name}__{pk_column_name}__seq")
}
