use crate::postgres_client_wrapper::FromRow;
use tokio_postgres::Row;

use super::define_catalog_query;

pub struct PrimaryKeyColumnResult {
    pub column_name: String,
}

impl FromRow for PrimaryKeyColumnResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(PrimaryKeyColumnResult {
            column_name: row.try_get(0)?,
        })
    }
}

//language=postgresql
define_catalog_query!(get_primary_key_columns, PrimaryKeyColumnResult, r#"
select attr.attname::text
from pg_constraint con
         join pg_class cl on cl.oid = con.conrelid
         join pg_namespace ns on ns.oid = cl.relnamespace
         join unnest(con.conkey) with ordinality as key (attnum, position) on true
         join pg_attribute attr on attr.attrelid = con.conrelid and attr.attnum = key.attnum
where con.contype = 'p'
  and ns.nspname = $1
  and cl.relname = $2
order by key.position;
"#, (schema: &str, table: &str));

pub struct ConstraintDefinitionResult {
    pub constraint_name: String,
    pub definition: String,
}

impl FromRow for ConstraintDefinitionResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(ConstraintDefinitionResult {
            constraint_name: row.try_get(0)?,
            definition: row.try_get(1)?,
        })
    }
}

// Primary key first, then check, foreign key, unique and exclusion constraints.
//language=postgresql
define_catalog_query!(get_constraint_definitions, ConstraintDefinitionResult, r#"
select con.conname::text,
       pg_get_constraintdef(con.oid)
from pg_constraint con
         join pg_class cl on cl.oid = con.conrelid
         join pg_namespace ns on ns.oid = cl.relnamespace
where ns.nspname = $1
  and cl.relname = $2
  and con.contype in ('p', 'c', 'f', 'u', 'x')
order by con.contype = 'p' desc, con.contype, con.conname;
"#, (schema: &str, table: &str));
