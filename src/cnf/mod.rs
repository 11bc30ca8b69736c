use std::sync::LazyLock;

/// The name of the root query type when the document has no schema definition
pub const DEFAULT_QUERY_TYPE: &str = "Query";

/// The name of the root mutation type when the document has no schema definition
pub const DEFAULT_MUTATION_TYPE: &str = "Mutation";

/// The column which is re-derived from the row key on every read
pub const ID_COLUMN: &str = "id";

/// The input and output field which carries a row versionstamp
pub const VERSIONSTAMP_FIELD: &str = "versionstamp";

/// The field of an entry type which holds the row itself
pub const ENTRY_VALUE_FIELD: &str = "value";

/// The argument of an operation directive which names the target table
pub const DIRECTIVE_TABLE_ARGUMENT: &str = "table";

/// The maximum depth of a GraphQL query (defaults to 64)
pub static GRAPHQL_DEPTH_LIMIT: LazyLock<usize> =
	lazy_env_parse!("KVQL_GRAPHQL_DEPTH_LIMIT", usize, 64);

/// The maximum complexity of a GraphQL query (defaults to 10000)
pub static GRAPHQL_COMPLEXITY_LIMIT: LazyLock<usize> =
	lazy_env_parse!("KVQL_GRAPHQL_COMPLEXITY_LIMIT", usize, 10_000);

/// Whether GraphQL introspection queries are allowed (defaults to true)
pub static GRAPHQL_INTROSPECTION: LazyLock<bool> =
	lazy_env_parse!("KVQL_GRAPHQL_INTROSPECTION", bool, true);
