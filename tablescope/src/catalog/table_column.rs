use crate::models::ColumnDescriptor;
use crate::postgres_client_wrapper::FromRow;
use tokio_postgres::Row;

use super::define_catalog_query;

pub struct TableColumnsResult {
    pub column_name: String,
    pub data_type: String,
    pub type_name: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub ordinal_position: i32,
}

impl FromRow for TableColumnsResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(TableColumnsResult {
            column_name: row.try_get(0)?,
            data_type: row.try_get(1)?,
            type_name: row.try_get(2)?,
            is_nullable: row.try_get(3)?,
            default_value: row.try_get(4)?,
            ordinal_position: row.try_get(5)?,
        })
    }
}

impl TableColumnsResult {
    pub fn to_column_descriptor(&self) -> ColumnDescriptor {
        ColumnDescriptor {
            name: self.column_name.clone(),
            declared_type: self.data_type.clone(),
            udt_name: self.type_name.clone(),
            is_nullable: self.is_nullable,
            default_expr: self.default_value.clone(),
            ordinal_position: self.ordinal_position,
        }
    }
}

//language=postgresql
define_catalog_query!(get_columns, TableColumnsResult, r#"
select attr.attname::text                               as column_name,
       format_type(attr.atttypid, attr.atttypmod)       as data_type,
       typ.typname::text                                as type_name,
       not attr.attnotnull                              as is_nullable,
       pg_get_expr(def.adbin, def.adrelid)              as default_value,
       attr.attnum::int4                                as ordinal_position
from pg_attribute attr
         join pg_class cl on cl.oid = attr.attrelid
         join pg_namespace ns on ns.oid = cl.relnamespace
         join pg_type typ on typ.oid = attr.atttypid
         left join pg_attrdef def on def.adrelid = attr.attrelid and def.adnum = attr.attnum
where ns.nspname = $1
  and cl.relname = $2
  and attr.attnum > 0
  and not attr.attisdropped
order by attr.attnum;
"#, (schema: &str, table: &str));
