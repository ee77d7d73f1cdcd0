use crate::postgres_client_wrapper::FromRow;
use tokio_postgres::Row;

use super::define_catalog_query;

#[derive(Debug, Eq, PartialEq)]
pub struct TablesResult {
    pub table_name: String,
}

impl FromRow for TablesResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(TablesResult {
            table_name: row.try_get(0)?,
        })
    }
}

//language=postgresql
define_catalog_query!(get_tables, TablesResult, r#"
select c.relname::text
from pg_class c
         join pg_namespace n on n.oid = c.relnamespace
where n.nspname = $1
  and c.relkind in ('r', 'p')
order by c.relname;
"#, (schema: &str));
