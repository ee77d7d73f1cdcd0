use anyhow::Result;
use tablescope::PostgresClientWrapper;

/// The ports of the local Postgres instances the integration tests run against.
const TEST_INSTANCE_PORTS: [u16; 5] = [5412, 5413, 5414, 5415, 5416];

#[tokio::main]
async fn main() -> Result<()> {
    for port in TEST_INSTANCE_PORTS {
        let conn_str = format!(
            "host=localhost port={} user=postgres password=passw0rd dbname=postgres",
            port
        );
        let conn = match PostgresClientWrapper::new(&conn_str).await {
            Ok(conn) => conn,
            Err(e) => {
                println!("Skipping port {}: {}", port, e);
                continue;
            }
        };

        let databases = conn
            .get_single_results::<String>(
                "select datname::text from pg_database where datname like $1",
                &[&"test\\_db\\_%"],
            )
            .await?;

        for db_name in databases {
            println!("Dropping database {}", db_name);

            // Generated test database names never need quoting.
            if conn.version() >= 130 {
                conn.execute_non_query(&format!("drop database {} with (force);", db_name))
                    .await?;
            } else {
                conn.execute(
                    "select pg_terminate_backend(pid) from pg_stat_activity where datname = $1 and pid != pg_backend_pid()",
                    &[&db_name],
                )
                .await?;
                conn.execute_non_query(&format!("drop database {};", db_name))
                    .await?;
            }
        }

        println!("Finished port {}", port);
    }

    Ok(())
}
