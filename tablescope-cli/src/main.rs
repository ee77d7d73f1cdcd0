use crate::cli::{Commands, TableArgs};
use clap::Parser;
use serde_json::Value;
use tablescope::{DatabaseValue, PostgresClientWrapper, RecordValues, Result, TableBrowser};
use tracing::{debug, instrument};
use tracing_subscriber::EnvFilter;

mod cli;

#[cfg(all(test, feature = "pg_tests"))]
use tablescope::test_helpers;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let output = run(cli).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[instrument(skip_all)]
async fn run(cli: cli::Cli) -> Result<Value> {
    let connection = PostgresClientWrapper::new(&cli.db.get_connection_string()).await?;
    let browser = TableBrowser::with_options(&connection, cli.browser_options()).await?;

    debug!("Running {:?}", cli.command);

    let output = match cli.command {
        Commands::Schemas => serde_json::to_value(browser.list_schemas().await?)?,
        Commands::Tables { schema } => serde_json::to_value(browser.list_tables(&schema).await?)?,
        Commands::Columns(TableArgs { schema, table }) => {
            serde_json::to_value(browser.list_columns(&schema, &table).await?)?
        }
        Commands::Definition(TableArgs { schema, table }) => {
            Value::String(browser.table_definition(&schema, &table).await)
        }
        Commands::Count {
            table: TableArgs { schema, table },
            filter,
        } => {
            let filter = filter.filter()?;
            serde_json::to_value(browser.count(&schema, &table, filter.as_ref()).await?)?
        }
        Commands::Page {
            table: TableArgs { schema, table },
            page,
            sort,
            filter,
        } => {
            let sort = sort.sort()?;
            let filter = filter.filter()?;
            let view = browser
                .browse(&schema, &table, page.pagination(), sort.as_ref(), filter.as_ref())
                .await?;
            serde_json::to_value(view)?
        }
        Commands::Insert {
            table: TableArgs { schema, table },
            values,
        } => {
            let values = RecordValues::from_json_str(&values)?;
            serde_json::to_value(browser.insert(&schema, &table, &values).await)?
        }
        Commands::Update {
            table: TableArgs { schema, table },
            id,
            values,
        } => {
            let values = RecordValues::from_json_str(&values)?;
            let id = DatabaseValue::from(id);
            serde_json::to_value(browser.update(&schema, &table, &id, &values).await)?
        }
        Commands::Delete {
            table: TableArgs { schema, table },
            ids,
        } => {
            let ids = ids.into_iter().map(DatabaseValue::from).collect::<Vec<_>>();
            serde_json::to_value(browser.delete(&schema, &table, &ids).await)?
        }
        Commands::ResolveLink {
            table: TableArgs { schema, table },
            column,
            value,
        } => {
            let value = DatabaseValue::from(value);
            serde_json::to_value(browser.resolve_link(&schema, &table, &column, &value).await?)?
        }
        Commands::RelatedOptions {
            table: TableArgs { schema, table },
            column,
            search,
        } => serde_json::to_value(
            browser
                .related_options(&schema, &table, &column, search.as_deref())
                .await?,
        )?,
    };

    Ok(output)
}

#[cfg(all(test, feature = "pg_tests"))]
mod tests {
    use super::*;
    use crate::cli::{Cli, DbArgs, FilterArgs, PageArgs, SortArgs};
    use serde_json::json;
    use tablescope::DEFAULT_RELATED_OPTIONS_LIMIT;
    use tablescope::test_helpers::TestHelper;
    use tablescope_test_macros::pg_test;

    fn cli_for(helper: &TestHelper, command: Commands) -> Cli {
        Cli {
            db: DbArgs::from_test_helper(helper),
            case_sensitive_patterns: false,
            related_options_limit: DEFAULT_RELATED_OPTIONS_LIMIT,
            command,
        }
    }

    fn people() -> TableArgs {
        TableArgs {
            schema: "public".to_string(),
            table: "people".to_string(),
        }
    }

    const PEOPLE: &str = r#"
        create table people(id serial primary key, name text not null, age int);
        insert into people(name, age) values ('Alice', 17), ('Bob', 18), ('Carol', 40);
    "#;

    #[pg_test(arg(postgres = 16))]
    async fn lists_tables_and_pages_with_filter(helper: &TestHelper) {
        helper.execute_not_query(PEOPLE).await;

        let tables = run(cli_for(helper, Commands::Tables { schema: "public".to_string() }))
            .await
            .unwrap();
        assert_eq!(tables, json!(["people"]));

        let page = run(cli_for(
            helper,
            Commands::Page {
                table: people(),
                page: PageArgs::default(),
                sort: SortArgs {
                    sort_column: Some("age".to_string()),
                    sort_direction: Some("asc".to_string()),
                },
                filter: FilterArgs {
                    filter_column: Some("age".to_string()),
                    filter_operator: Some("gte".to_string()),
                    filter_value: Some("18".to_string()),
                },
            },
        ))
        .await
        .unwrap();

        assert_eq!(page["total_records"], json!(2));
        assert_eq!(page["rows"][0]["name"], json!("Bob"));
        assert_eq!(page["rows"][1]["name"], json!("Carol"));
    }

    #[pg_test(arg(postgres = 16))]
    async fn edits_rows_through_json_payloads(helper: &TestHelper) {
        helper.execute_not_query(PEOPLE).await;

        let inserted = run(cli_for(
            helper,
            Commands::Insert {
                table: people(),
                values: r#"{"name": "Dave", "age": "52"}"#.to_string(),
            },
        ))
        .await
        .unwrap();
        assert_eq!(inserted["success"], json!(true));
        assert_eq!(inserted["data"]["age"], json!(52));

        let updated = run(cli_for(
            helper,
            Commands::Update {
                table: people(),
                id: "4".to_string(),
                values: r#"{"age": 53}"#.to_string(),
            },
        ))
        .await
        .unwrap();
        assert_eq!(updated["data"]["name"], json!("Dave"));
        assert_eq!(updated["data"]["age"], json!(53));

        let deleted = run(cli_for(
            helper,
            Commands::Delete {
                table: people(),
                ids: vec!["1".to_string(), "4".to_string()],
            },
        ))
        .await
        .unwrap();
        assert_eq!(deleted["deleted"], json!(2));

        let remaining: i64 = helper.get_single_result("select count(*) from people").await;
        assert_eq!(remaining, 2);
    }

    #[pg_test(arg(postgres = 16))]
    async fn rejects_payloads_that_are_not_objects(helper: &TestHelper) {
        helper.execute_not_query(PEOPLE).await;

        let result = run(cli_for(
            helper,
            Commands::Insert {
                table: people(),
                values: "[1]".to_string(),
            },
        ))
        .await;

        assert!(result.is_err());
    }
}
