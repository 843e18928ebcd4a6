//! Identifier and asset base: quote parsing, case folding, namespace
//! splitting, and name generation for anonymous constraints.

use crc32fast::Hasher;

const QUOTE_CHARS: [char; 3] = ['`', '"', '['];

/// Any named schema object — table, column, index, FK, sequence.
///
/// Holds `(namespace, name, quoted)` exactly as ingested, so DDL emission
/// can recover the original casing/quoting while every lookup elsewhere in
/// the crate goes through [`Asset::normalized_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    name: String,
    namespace: Option<String>,
    quoted: bool,
}

impl Asset {
    /// Ingests `raw` per the quoting/namespace rule: a leading `` ` ``, `"`,
    /// or `[` marks the name quoted and strips all quote characters; a `.`
    /// splits off the namespace prefix.
    pub fn new(raw: &str) -> Self {
        let quoted = raw
            .chars()
            .next()
            .map(|c| QUOTE_CHARS.contains(&c))
            .unwrap_or(false);

        let trimmed: String = raw
            .chars()
            .filter(|c| !matches!(c, '`' | '"' | '[' | ']'))
            .collect();

        let (namespace, name) = match trimmed.split_once('.') {
            Some((ns, rest)) => (Some(ns.to_string()), rest.to_string()),
            None => (None, trimmed),
        };

        Self {
            name,
            namespace,
            quoted,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Fully qualified name as ingested (namespace + name, original case).
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Lowercased qualified name — the key used for every lookup/comparison.
    pub fn normalized_name(&self) -> String {
        self.qualified_name().to_lowercase()
    }

    pub fn is_in_default_namespace(&self, default_namespace: &str) -> bool {
        match &self.namespace {
            None => true,
            Some(ns) => ns == default_namespace,
        }
    }

    /// The local name if in `default_namespace`, else the full qualified
    /// name — both lowercased.
    pub fn shortest_name(&self, default_namespace: &str) -> String {
        if self.is_in_default_namespace(default_namespace) {
            self.name.to_lowercase()
        } else {
            self.qualified_name().to_lowercase()
        }
    }

    /// Quoted representation for DDL, quoting each dotted segment only when
    /// the asset was ingested quoted or the segment is a reserved keyword.
    pub fn quoted_name(&self, is_reserved_keyword: impl Fn(&str) -> bool) -> String {
        let quote = |segment: &str| -> String {
            if self.quoted || is_reserved_keyword(segment) {
                format!("\"{}\"", segment.replace('"', "\"\""))
            } else {
                segment.to_string()
            }
        };

        match &self.namespace {
            Some(ns) => format!("{}.{}", quote(ns), quote(&self.name)),
            None => quote(&self.name),
        }
    }
}

/// Generates a deterministic identifier for an anonymous index, FK, or
/// unique constraint from a list of column names.
///
/// For each column, its CRC32 checksum is rendered as lowercase hex without
/// padding; all hex strings are concatenated, prefixed with `prefix + "_"`,
/// upper-cased, and truncated to `max_size` bytes.
pub fn generate_identifier_name(columns: &[&str], prefix: &str, max_size: usize) -> String {
    let hash: String = columns
        .iter()
        .map(|col| {
            let mut hasher = Hasher::new();
            hasher.update(col.as_bytes());
            format!("{:x}", hasher.finalize())
        })
        .collect();

    let full = format!("{prefix}_{hash}").to_uppercase();
    full.chars().take(max_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_backtick_quotes_and_marks_quoted() {
        let a = Asset::new("`Weird Name`");
        assert!(a.is_quoted());
        assert_eq!(a.name(), "Weird Name");
    }

    #[test]
    fn splits_namespace_on_dot() {
        let a = Asset::new("public.users");
        assert_eq!(a.namespace(), Some("public"));
        assert_eq!(a.name(), "users");
        assert_eq!(a.qualified_name(), "public.users");
    }

    #[test]
    fn shortest_name_drops_default_namespace() {
        let a = Asset::new("public.Users");
        assert_eq!(a.shortest_name("public"), "users");
        assert_eq!(a.shortest_name("other"), "public.users");
    }

    #[test]
    fn normalized_name_is_lowercase() {
        let a = Asset::new("Public.Users");
        assert_eq!(a.normalized_name(), "public.users");
    }

    #[test]
    fn generate_identifier_name_is_deterministic() {
        let a = generate_identifier_name(&["user_id", "email"], "app_user", 63);
        let b = generate_identifier_name(&["user_id", "email"], "app_user", 63);
        assert_eq!(a, b);
        assert!(a.len() <= 63);
    }

    #[test]
    fn generate_identifier_name_truncates_to_max_size() {
        let long = generate_identifier_name(&["a", "b", "c", "d", "e"], "table_with_a_long_prefix", 16);
        assert_eq!(long.len(), 16);
    }
}
