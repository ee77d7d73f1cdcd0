use clap::{Args, Parser, Subcommand};
use tablescope::{
    FilterSpec, Pagination, PatternMatching, Result, SortSpec, TableBrowserOptions,
    DEFAULT_RELATED_OPTIONS_LIMIT,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about)]
#[command(propagate_version = true)]
/// Browse, filter and edit any Postgres table without writing SQL.
///
/// Every command prints its result as JSON on stdout. Logging goes to stderr and is
/// controlled through RUST_LOG.
pub struct Cli {
    #[command(flatten)]
    pub db: DbArgs,

    /// Make the contains, starts_with and ends_with filters case sensitive
    #[arg(long, global = true)]
    pub case_sensitive_patterns: bool,

    /// The most options related-options returns
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_RELATED_OPTIONS_LIMIT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub related_options_limit: u32,

    #[clap(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub(crate) fn browser_options(&self) -> TableBrowserOptions {
        TableBrowserOptions {
            pattern_matching: if self.case_sensitive_patterns {
                PatternMatching::CaseSensitive
            } else {
                PatternMatching::CaseInsensitive
            },
            related_options_limit: self.related_options_limit,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DbArgs {
    /// The host of the database to browse
    #[arg(long, env = "TABLESCOPE_DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// The port of the database to browse
    #[arg(long, env = "TABLESCOPE_DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// The username to use when connecting to the database
    #[arg(long, env = "TABLESCOPE_DB_USER")]
    pub db_user: String,

    /// The password to use when connecting to the database
    #[arg(long, env = "TABLESCOPE_DB_PASSWORD", hide_env_values = true)]
    pub db_password: String,

    /// The name of the database to browse
    #[arg(long, env = "TABLESCOPE_DB_NAME")]
    pub db_name: String,
}

impl DbArgs {
    pub(crate) fn get_connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.db_host, self.db_port, self.db_user, self.db_password, self.db_name
        )
    }

    #[cfg(all(test, feature = "pg_tests"))]
    pub(crate) fn from_test_helper(helper: &tablescope::test_helpers::TestHelper) -> Self {
        Self {
            db_host: "localhost".to_string(),
            db_port: helper.port,
            db_user: "postgres".to_string(),
            db_password: "passw0rd".to_string(),
            db_name: helper.test_db_name.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the user schemas of the database
    Schemas,
    /// List the tables of a schema
    Tables {
        #[arg(long, default_value = "public")]
        schema: String,
    },
    /// List the columns of a table
    Columns(TableArgs),
    /// Print a create table statement for a table
    Definition(TableArgs),
    /// Count the rows of a table matching the filter
    Count {
        #[command(flatten)]
        table: TableArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Read one page of a table together with its columns and total row count
    Page {
        #[command(flatten)]
        table: TableArgs,
        #[command(flatten)]
        page: PageArgs,
        #[command(flatten)]
        sort: SortArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Insert a row, given as a JSON object of column to value
    Insert {
        #[command(flatten)]
        table: TableArgs,
        /// The values to insert, e.g. '{"name": "Alice", "age": 42}'
        #[arg(long, default_value = "{}")]
        values: String,
    },
    /// Update the row with the given key, given as a JSON object of column to value
    Update {
        #[command(flatten)]
        table: TableArgs,
        /// The key of the row to update
        #[arg(long)]
        id: String,
        /// The values to set, e.g. '{"age": 43}'
        #[arg(long)]
        values: String,
    },
    /// Delete the rows with the given keys
    Delete {
        #[command(flatten)]
        table: TableArgs,
        /// A key of a row to delete. Can be given multiple times
        #[arg(long = "id")]
        ids: Vec<String>,
    },
    /// Fetch the row a foreign key value points at
    ResolveLink {
        #[command(flatten)]
        table: TableArgs,
        #[arg(long)]
        column: String,
        #[arg(long)]
        value: String,
    },
    /// List the values a foreign key column can take
    RelatedOptions {
        #[command(flatten)]
        table: TableArgs,
        #[arg(long)]
        column: String,
        /// Only list values containing this text
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TableArgs {
    #[arg(long, default_value = "public")]
    pub schema: String,

    #[arg(long)]
    pub table: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// The page to read, starting at 1
    #[arg(long)]
    pub page: Option<String>,

    /// The number of rows per page
    #[arg(long)]
    pub page_size: Option<String>,
}

impl PageArgs {
    pub(crate) fn pagination(&self) -> Pagination {
        Pagination::parse(self.page.as_deref(), self.page_size.as_deref())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SortArgs {
    #[arg(long)]
    pub sort_column: Option<String>,

    /// asc or desc
    #[arg(long)]
    pub sort_direction: Option<String>,
}

impl SortArgs {
    pub(crate) fn sort(&self) -> Result<Option<SortSpec>> {
        SortSpec::parse(self.sort_column.as_deref(), self.sort_direction.as_deref())
    }
}

/// A filter is only applied when all three parts are given.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub filter_column: Option<String>,

    /// One of eq, neq, contains, starts_with, ends_with, gt, gte, lt, lte
    #[arg(long)]
    pub filter_operator: Option<String>,

    #[arg(long)]
    pub filter_value: Option<String>,
}

impl FilterArgs {
    pub(crate) fn filter(&self) -> Result<Option<FilterSpec>> {
        FilterSpec::parse(
            self.filter_column.as_deref(),
            self.filter_operator.as_deref(),
            self.filter_value.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tablescope::{OperatorKind, SortDirection};

    const CONNECTION: [&str; 7] = [
        "tablescope",
        "--db-user",
        "postgres",
        "--db-password",
        "secret",
        "--db-name",
        "shop",
    ];

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(CONNECTION.iter().chain(args.iter())).unwrap()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn builds_connection_string() {
        let cli = parse(&["schemas"]);

        assert_eq!(
            cli.db.get_connection_string(),
            "host=localhost port=5432 user=postgres password=secret dbname=shop"
        );
        assert_eq!(cli.browser_options(), TableBrowserOptions::default());
    }

    #[test]
    fn parses_page_arguments() {
        let cli = parse(&[
            "page",
            "--table",
            "people",
            "--page",
            "2",
            "--page-size",
            "abc",
            "--sort-column",
            "name",
            "--sort-direction",
            "DESC",
            "--filter-column",
            "age",
            "--filter-operator",
            "gte",
            "--filter-value",
            "18",
            "--case-sensitive-patterns",
        ]);

        let Commands::Page { table, page, sort, filter } = &cli.command else {
            panic!("expected the page command, got {:?}", cli.command);
        };

        assert_eq!(table.schema, "public");
        assert_eq!(table.table, "people");
        assert_eq!(page.pagination(), Pagination::new(2, 100));
        assert_eq!(
            sort.sort().unwrap(),
            Some(SortSpec::new("name", SortDirection::Descending))
        );
        assert_eq!(
            filter.filter().unwrap(),
            Some(FilterSpec::new("age", OperatorKind::GreaterOrEqual, "18"))
        );
        assert_eq!(cli.browser_options().pattern_matching, PatternMatching::CaseSensitive);
    }

    #[test]
    fn partial_filters_are_ignored_but_unknown_operators_are_not() {
        let partial = FilterArgs {
            filter_column: Some("age".to_string()),
            ..FilterArgs::default()
        };
        assert_eq!(partial.filter().unwrap(), None);

        let unknown = FilterArgs {
            filter_column: Some("age".to_string()),
            filter_operator: Some("like".to_string()),
            filter_value: Some("1".to_string()),
        };
        assert!(unknown.filter().is_err());
    }

    #[test]
    fn related_options_limit_must_be_positive() {
        let cli = parse(&["--related-options-limit", "5", "schemas"]);
        assert_eq!(cli.browser_options().related_options_limit, 5);

        for invalid in ["0", "-1"] {
            let extra = ["--related-options-limit", invalid, "schemas"];
            let args = CONNECTION.iter().chain(extra.iter());
            assert!(Cli::try_parse_from(args).is_err(), "{invalid} was accepted");
        }
    }

    #[test]
    fn delete_takes_repeated_ids() {
        let cli = parse(&["delete", "--table", "people", "--id", "1", "--id", "2"]);

        let Commands::Delete { ids, .. } = &cli.command else {
            panic!("expected the delete command, got {:?}", cli.command);
        };
        assert_eq!(ids, &["1", "2"]);
    }
}
