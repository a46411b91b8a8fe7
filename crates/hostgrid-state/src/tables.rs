//! redb table definitions for the Hostgrid record store.

use redb::TableDefinition;

/// All records, keyed by `{kind}:{id}` (e.g. `subdomain:acme`).
pub const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");
