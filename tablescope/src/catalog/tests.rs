use super::*;
use crate::test_helpers::TestHelper;
use indoc::indoc;
use similar_asserts::assert_eq;
use tablescope_test_macros::pg_test;

const FIXTURE: &str = r#"
create schema sales;

create table sales.customer(
    id serial primary key,
    name text not null,
    email varchar(255) unique
);

create table sales."Order"(
    order_no bigint generated always as identity primary key,
    customer_id int not null references sales.customer(id),
    total numeric(10, 2) not null default 0 check (total >= 0),
    dropped_later int
);

alter table sales."Order" drop column dropped_later;

create table sales.order_line(
    order_no bigint not null,
    line int not null,
    constraint order_line_pkey primary key (order_no, line)
);

create table sales.line_note(
    order_no bigint,
    line int,
    note text,
    foreign key (order_no, line) references sales.order_line(order_no, line)
);

create view sales.big_orders as select * from sales."Order" where total > 1000;
"#;

#[pg_test(arg(postgres = 12))]
#[pg_test(arg(postgres = 16))]
async fn lists_schemas_and_tables(helper: &TestHelper) {
    helper.execute_not_query(FIXTURE).await;
    let reader = CatalogReader::new(helper.get_conn());

    let schemas = reader.list_schemas().await.unwrap();
    assert_eq!(schemas, vec!["public".to_string(), "sales".to_string()]);

    let tables = reader.list_tables("sales").await.unwrap();
    assert_eq!(
        tables,
        vec![
            "Order".to_string(),
            "customer".to_string(),
            "line_note".to_string(),
            "order_line".to_string(),
        ]
    );
}

#[pg_test(arg(postgres = 16))]
async fn lists_columns_in_ordinal_order(helper: &TestHelper) {
    helper.execute_not_query(FIXTURE).await;
    let reader = CatalogReader::new(helper.get_conn());

    let columns = reader.list_columns("sales", "Order").await.unwrap();

    assert_eq!(
        columns,
        vec![
            ColumnDescriptor {
                name: "order_no".to_string(),
                declared_type: "bigint".to_string(),
                udt_name: "int8".to_string(),
                is_nullable: false,
                default_expr: None,
                ordinal_position: 1,
            },
            ColumnDescriptor {
                name: "customer_id".to_string(),
                declared_type: "integer".to_string(),
                udt_name: "int4".to_string(),
                is_nullable: false,
                default_expr: None,
                ordinal_position: 2,
            },
            ColumnDescriptor {
                name: "total".to_string(),
                declared_type: "numeric(10,2)".to_string(),
                udt_name: "numeric".to_string(),
                is_nullable: false,
                default_expr: Some("0".to_string()),
                ordinal_position: 3,
            },
        ]
    );

    assert!(reader.list_columns("sales", "does_not_exist").await.unwrap().is_empty());
}

#[pg_test(arg(postgres = 16))]
async fn reads_primary_keys(helper: &TestHelper) {
    helper.execute_not_query(FIXTURE).await;
    let reader = CatalogReader::new(helper.get_conn());

    assert_eq!(reader.primary_key("sales", "customer").await.unwrap(), vec!["id".to_string()]);
    assert_eq!(
        reader.primary_key("sales", "order_line").await.unwrap(),
        vec!["order_no".to_string(), "line".to_string()]
    );
    assert!(reader.primary_key("sales", "line_note").await.unwrap().is_empty());

    assert_eq!(
        reader.row_key("sales", "Order").await.unwrap(),
        RowKey::PrimaryKey("order_no".to_string())
    );
    assert_eq!(
        reader.row_key("sales", "line_note").await.unwrap(),
        RowKey::Conventional("id".to_string())
    );
    assert!(matches!(
        reader.row_key("sales", "order_line").await,
        Err(crate::TablescopeError::CompositePrimaryKey { .. })
    ));
}

#[pg_test(arg(postgres = 12))]
#[pg_test(arg(postgres = 16))]
async fn finds_single_column_foreign_keys(helper: &TestHelper) {
    helper.execute_not_query(FIXTURE).await;
    let reader = CatalogReader::new(helper.get_conn());

    let foreign_key = reader.find_foreign_key("sales", "Order", "customer_id").await.unwrap();
    assert_eq!(
        foreign_key,
        Some(ForeignKeyDescriptor {
            constraint_name: "Order_customer_id_fkey".to_string(),
            source_column: "customer_id".to_string(),
            target_schema: "sales".to_string(),
            target_table: "customer".to_string(),
            target_column: "id".to_string(),
        })
    );

    assert_eq!(reader.find_foreign_key("sales", "Order", "total").await.unwrap(), None);
    assert_eq!(reader.find_foreign_key("sales", "line_note", "order_no").await.unwrap(), None);
    assert_eq!(reader.find_foreign_key("sales", "nope", "nope").await.unwrap(), None);
}

#[pg_test(arg(postgres = 16))]
async fn builds_table_definitions(helper: &TestHelper) {
    helper.execute_not_query(FIXTURE).await;
    let reader = CatalogReader::new(helper.get_conn());
    let quoter = reader.load_identifier_quoter().await.unwrap();

    let definition = reader.table_definition(&quoter, "sales", "customer").await;

    assert_eq!(
        definition,
        indoc! {r#"
        create table sales.customer (
            id integer not null default nextval('sales.customer_id_seq'::regclass),
            name text not null,
            email character varying(255),
            constraint customer_pkey PRIMARY KEY (id),
            constraint customer_email_key UNIQUE (email)
        );"#}
    );

    assert_eq!(reader.table_definition(&quoter, "sales", "does_not_exist").await, "");
    assert_eq!(reader.table_definition(&quoter, "sales", "").await, "");
}

#[pg_test(arg(postgres = 16))]
async fn loads_keywords_from_the_server(helper: &TestHelper) {
    let reader = CatalogReader::new(helper.get_conn());
    let quoter = reader.load_identifier_quoter().await.unwrap();

    assert_eq!(
        quoter.quote("select", crate::AttemptedKeywordUsage::ColumnName).unwrap(),
        "\"select\""
    );
    assert_eq!(
        quoter.quote("customer", crate::AttemptedKeywordUsage::ColumnName).unwrap(),
        "customer"
    );
}
