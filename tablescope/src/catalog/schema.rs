use crate::postgres_client_wrapper::FromRow;
use tokio_postgres::Row;

use super::define_catalog_query;

pub struct SchemaResult {
    pub name: String,
}

impl FromRow for SchemaResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(SchemaResult {
            name: row.try_get(0)?,
        })
    }
}

// `pg\_%` also covers the pg_temp_N and pg_toast_temp_N namespaces.
//language=postgresql
define_catalog_query!(get_schemas, SchemaResult, r#"
select n.nspname::text
from pg_namespace n
where n.nspname not in ('information_schema', 'pg_catalog', 'pg_toast')
  and n.nspname not like 'pg\_%'
order by n.nspname;
"#, ());
