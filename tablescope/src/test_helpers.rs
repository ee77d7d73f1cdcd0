use crate::postgres_client_wrapper::{FromRow, PostgresClientWrapper};
use crate::table_browser::{TableBrowser, TableBrowserOptions};
use std::panic::{RefUnwindSafe, UnwindSafe};
use tokio_postgres::types::FromSqlOwned;
use uuid::Uuid;

/// A helper for running tests that require a database.
///
/// This will automatically create a new database for each test,
/// and drop it when the test is done, if the test succeeded.
///
/// All the methods on this struct unwraps errors directly to make it easier to write tests.
pub struct TestHelper {
    /// The name of the test database
    pub test_db_name: String,
    /// The main connected used against the database
    main_connection: PostgresClientWrapper,
    /// An identifier for the test helper
    helper_name: String,
    /// The port of the Postgres instance that was connected to.
    pub port: u16,
    /// If the database was cleaned up nicely
    cleaned_up_nicely: bool,
}

impl Drop for TestHelper {
    /// Drops the test helper, cleaning up the database if the test succeeded.
    fn drop(&mut self) {
        if self.cleaned_up_nicely {
            return;
        }

        if std::thread::panicking() {
            eprintln!("Thread is panicking when dropping test helper. Leaving database '{}' ({}) around to be inspected", self.test_db_name, self.helper_name);
        } else {
            let db_name = self.test_db_name.clone();
            let port = self.port;
            std::thread::spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                runtime.block_on(cleanup(&db_name, port));
            })
            .join()
            .expect("Failed to run test helper cleanup from drop");
        }
    }
}

impl RefUnwindSafe for TestHelper {}

impl UnwindSafe for TestHelper {}

/// The port the local Postgres instance of the given major version listens on.
pub fn port_for_version(major_version: u16) -> u16 {
    5400 + major_version
}

/// Creates a new test helper, using a random database name.
/// This will connect to Postgres 16 on port 5416.
pub async fn get_test_helper(name: &str) -> TestHelper {
    get_test_helper_on_port(name, port_for_version(16)).await
}

/// Creates a new test helper, using a random database name and a specific port.
pub async fn get_test_helper_on_port(name: &str, port: u16) -> TestHelper {
    let id = Uuid::new_v4().simple().to_string();

    let test_db_name = format!("test_db_{}", id);
    {
        let conn = get_test_connection_on_port("postgres", port).await;

        conn.execute_non_query(&format!("create database {}", test_db_name))
            .await
            .expect("Failed to create test database");
    }

    let conn = get_test_connection_on_port(&test_db_name, port).await;

    TestHelper {
        test_db_name,
        main_connection: conn,
        helper_name: name.to_string(),
        port,
        cleaned_up_nicely: false,
    }
}

impl TestHelper {
    /// Executes a query that does not return any results.
    pub async fn execute_not_query(&self, sql: &str) {
        self.get_conn()
            .execute_non_query(sql)
            .await
            .unwrap_or_else(|e| panic!("Failed to execute non query: {:?}\n{}", e, sql));
    }

    /// Executes a query that returns results.
    pub async fn get_results<T: FromRow>(&self, sql: &str) -> Vec<T> {
        self.get_conn()
            .get_results(sql, &[])
            .await
            .unwrap_or_else(|e| panic!("Failed to get results for query: {:?}\n{}", e, sql))
    }

    /// Executes a query that returns a single column.
    pub async fn get_single_results<T: FromSqlOwned>(&self, sql: &str) -> Vec<T> {
        self.get_results::<(T,)>(sql).await.into_iter().map(|t| t.0).collect()
    }

    /// Executes a query that returns a single row result.
    pub async fn get_result<T: FromRow>(&self, sql: &str) -> T {
        let results = self.get_results(sql).await;
        assert_eq!(results.len(), 1, "Expected one result, got {}", results.len());
        results.into_iter().next().unwrap()
    }

    /// Executes a query that returns a single column of a single row result.
    pub async fn get_single_result<T: FromSqlOwned>(&self, sql: &str) -> T {
        let result = self.get_result::<(T,)>(sql).await;
        result.0
    }

    /// Gets the underlying connection to the database.
    pub fn get_conn(&self) -> &PostgresClientWrapper {
        &self.main_connection
    }

    /// Creates a browser over the test database with default options.
    pub async fn browser(&self) -> TableBrowser<'_> {
        self.browser_with_options(TableBrowserOptions::default()).await
    }

    pub async fn browser_with_options(&self, options: TableBrowserOptions) -> TableBrowser<'_> {
        TableBrowser::with_options(self.get_conn(), options)
            .await
            .expect("Failed to create table browser")
    }

    /// Stops the test helper, cleaning up the database.
    pub async fn stop(mut self) {
        cleanup(&self.test_db_name, self.port).await;
        self.cleaned_up_nicely = true;
    }
}

/// Gets a connection to the specified database on the specified port.
async fn get_test_connection_on_port(database_name: &str, port: u16) -> PostgresClientWrapper {
    let connection_string = format!("host=localhost port={port} user=postgres password=passw0rd dbname={database_name}");

    PostgresClientWrapper::new(&connection_string)
        .await
        .expect("Connection to test database failed. Is postgres running?")
}

async fn cleanup(db_name: &str, port: u16) {
    let conn = get_test_connection_on_port("postgres", port).await;
    let version: i32 = conn
        .get_single_result::<String>("show server_version_num;", &[])
        .await
        .unwrap()
        .parse()
        .unwrap();
    if version >= 130000 {
        conn.execute_non_query(&format!("drop database {} with (force);", db_name))
            .await
            .expect("Failed to drop test database");
    } else {
        conn.execute(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid != pg_backend_pid()",
            &[&db_name],
        )
        .await
        .expect("Failed to terminate connections to test database");
        conn.execute_non_query(&format!("drop database {};", db_name))
            .await
            .expect("Failed to drop test database");
    }
}

#[cfg(all(test, feature = "pg_tests"))]
mod tests {
    use super::*;
    use std::hint::black_box;
    use std::panic::catch_unwind;
    use tablescope_test_macros::pg_test;
    use tokio::test;

    #[test]
    async fn creates_and_drops_database() {
        let (test_database_name, port) = {
            let helper = get_test_helper("helper").await;
            let port = helper.port;
            let test_database_name = helper.test_db_name.clone();
            let db_name: String = helper.get_single_result("select current_database()::text;").await;
            assert_eq!(db_name, helper.test_db_name);
            let databases: Vec<String> = helper
                .get_single_results("select datname::text from pg_database where datistemplate = false;")
                .await;

            assert!(databases.contains(&helper.test_db_name));

            drop(helper);

            (test_database_name, port)
        };

        let conn = get_test_connection_on_port("postgres", port).await;
        let databases = conn
            .get_single_results::<String>("select datname::text from pg_database where datistemplate = false;", &[])
            .await
            .unwrap();
        assert!(!databases.contains(&test_database_name));
    }

    #[test]
    async fn database_if_left_around_on_panic() {
        let helper = get_test_helper("helper").await;
        let port = helper.port;
        let test_database_name = helper.test_db_name.clone();

        catch_unwind(move || {
            black_box(&helper);
            panic!("Panic in test");
        })
        .unwrap_err();

        let conn = get_test_connection_on_port("postgres", port).await;
        let databases = conn
            .get_single_results::<String>("select datname::text from pg_database where datistemplate = false;", &[])
            .await
            .unwrap();
        assert!(databases.contains(&test_database_name));

        cleanup(&test_database_name, port).await;
    }

    #[pg_test(arg(postgres = 14), arg(postgres = 15))]
    async fn injects_multiple_expected_versions(pg14: &TestHelper, pg15: &TestHelper) {
        assert_eq!(pg14.get_conn().version(), 140);
        assert_eq!(pg15.get_conn().version(), 150);
    }

    macro_rules! test_injected_version {
        ($name:ident, $version:expr) => {
            #[pg_test(arg(postgres = $version))]
            async fn $name(helper: &TestHelper) {
                assert_eq!(helper.get_conn().version(), $version * 10);
            }
        };
    }

    test_injected_version!(test_injected_version_12, 12);
    test_injected_version!(test_injected_version_16, 16);
}
