use crate::models::ForeignKeyDescriptor;
use crate::postgres_client_wrapper::FromRow;
use tokio_postgres::Row;

use super::define_catalog_query;

pub struct ForeignKeyResult {
    pub constraint_name: String,
    pub source_column_name: String,
    pub target_schema_name: String,
    pub target_table_name: String,
    pub target_column_name: String,
}

impl FromRow for ForeignKeyResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(Self {
            constraint_name: row.try_get(0)?,
            source_column_name: row.try_get(1)?,
            target_schema_name: row.try_get(2)?,
            target_table_name: row.try_get(3)?,
            target_column_name: row.try_get(4)?,
        })
    }
}

impl From<ForeignKeyResult> for ForeignKeyDescriptor {
    fn from(value: ForeignKeyResult) -> Self {
        ForeignKeyDescriptor {
            constraint_name: value.constraint_name,
            source_column: value.source_column_name,
            target_schema: value.target_schema_name,
            target_table: value.target_table_name,
            target_column: value.target_column_name,
        }
    }
}

// Only single column constraints, a composite key cannot be followed from one value.
//language=postgresql
define_catalog_query!(get_foreign_keys_for_column, ForeignKeyResult, r#"
select con.conname::text                as constraint_name,
       source_attr.attname::text        as source_column_name,
       target_ns.nspname::text          as target_schema_name,
       target_tab.relname::text         as target_table_name,
       target_attr.attname::text        as target_column_name
from pg_constraint con
         join pg_class source_tab on source_tab.oid = con.conrelid
         join pg_namespace source_ns on source_ns.oid = source_tab.relnamespace
         join pg_class target_tab on target_tab.oid = con.confrelid
         join pg_namespace target_ns on target_ns.oid = target_tab.relnamespace
         join pg_attribute source_attr
              on source_attr.attrelid = con.conrelid and source_attr.attnum = con.conkey[1]
         join pg_attribute target_attr
              on target_attr.attrelid = con.confrelid and target_attr.attnum = con.confkey[1]
where con.contype = 'f'
  and array_length(con.conkey, 1) = 1
  and source_ns.nspname = $1
  and source_tab.relname = $2
  and source_attr.attname = $3
order by con.conname;
"#, (schema: &str, table: &str, column: &str));
