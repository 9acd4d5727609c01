//! Migration passes against a real Postgres.
//!
//! These need Docker and are ignored by default:
//!
//! ```sh
//! cargo test -p accrete --test postgres -- --ignored
//! ```

use accrete::{
    ColumnDefinition, ColumnType, Connector, MigrationBuilder, MigrationError, MigrationRunner,
    Outcome, PgConnector, PostgresBuilder, PostgresInspector, SchemaInspector, TableSchema,
    UnsupportedReason, Value,
};
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

async fn start() -> (ContainerAsync<Postgres>, PgConnector) {
    let node = Postgres::default().start().await.unwrap();
    let host = node.get_host().await.unwrap();
    let port = node.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    // The container reports ready slightly before it accepts connections.
    let mut attempts = 0;
    let conn = loop {
        match PgConnector::connect(&url).await {
            Ok(conn) => break conn,
            Err(e) if attempts < 20 => {
                attempts += 1;
                tracing::debug!("Connection attempt {} failed: {}, retrying...", attempts, e);
                tokio::time::sleep(std::time::Duration::from_millis(250)).await;
            }
            Err(e) => panic!("could not connect to postgres: {e}"),
        }
    };
    (node, conn)
}

fn users() -> TableSchema {
    TableSchema::new(
        "users",
        vec![
            ColumnDefinition::new("id", ColumnType::Integer)
                .primary_key()
                .auto_increment(),
            ColumnDefinition::new("name", ColumnType::Text).not_null(),
            ColumnDefinition::new("email", ColumnType::Text)
                .not_null()
                .unique(),
        ],
    )
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_users_scenario() {
    let (_node, conn) = start().await;
    let runner = MigrationRunner::postgres(&conn);

    let first = runner.run(&[users()], false).await.unwrap();
    assert_eq!(first.created_tables(), vec!["users"]);

    let names: Vec<String> = PostgresInspector
        .list_columns(&conn, "users")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["id", "name", "email"]);

    let second = runner.run(&[users()], false).await.unwrap();
    assert!(matches!(&second.outcomes[..], [Outcome::NoChange { .. }]));
    assert!(second.statements.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_adds_columns_to_populated_table() {
    let (_node, conn) = start().await;
    conn.execute("CREATE TABLE users (id BIGINT PRIMARY KEY)", &[])
        .await
        .unwrap();
    conn.execute("INSERT INTO users (id) VALUES ($1)", &[Value::Integer(7)])
        .await
        .unwrap();

    let schema = TableSchema::new(
        "users",
        vec![
            ColumnDefinition::new("id", ColumnType::Integer).primary_key(),
            ColumnDefinition::new("active", ColumnType::Boolean)
                .not_null()
                .default_value(true),
            ColumnDefinition::new("bio", ColumnType::Text),
        ],
    );
    let report = MigrationRunner::postgres(&conn)
        .run(&[schema], false)
        .await
        .unwrap();
    assert_eq!(
        report.added_columns(),
        vec![("users", "active"), ("users", "bio")]
    );

    let rows = conn
        .query("SELECT id, active, bio FROM users", &[])
        .await
        .unwrap();
    assert_eq!(
        rows[0].values(),
        &[Value::Integer(7), Value::Boolean(true), Value::Null]
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_every_column_type_round_trips() {
    let (_node, conn) = start().await;

    let mut columns = vec![ColumnDefinition::new("id", ColumnType::Integer).primary_key()];
    for ty in ColumnType::ALL {
        columns.push(ColumnDefinition::new(format!("{ty}_col"), ty));
    }
    let schema = TableSchema::new("everything", columns);
    MigrationRunner::postgres(&conn)
        .run(&[schema.clone()], false)
        .await
        .unwrap();

    let existing = PostgresInspector
        .list_columns(&conn, "everything")
        .await
        .unwrap();
    for (declared, actual) in schema.columns.iter().zip(&existing) {
        assert_eq!(declared.name, actual.name);
        assert!(
            PostgresBuilder.declared_type_matches(declared.column_type, &actual.declared_type),
            "{} declared {} but catalog says {}",
            declared.name,
            declared.column_type,
            actual.declared_type
        );
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_not_null_without_default_is_refused() {
    let (_node, conn) = start().await;
    conn.execute("CREATE TABLE users (id BIGINT PRIMARY KEY)", &[])
        .await
        .unwrap();

    let schema = TableSchema::new(
        "users",
        vec![
            ColumnDefinition::new("id", ColumnType::Integer).primary_key(),
            ColumnDefinition::new("email", ColumnType::Text).not_null(),
        ],
    );
    let report = MigrationRunner::postgres(&conn)
        .run(&[schema], false)
        .await
        .unwrap();
    assert!(matches!(
        &report.outcomes[..],
        [Outcome::Failed {
            error: MigrationError::Unsupported(e),
            ..
        }] if e.reason == UnsupportedReason::NotNullWithoutDefault
    ));
    assert!(report.statements.is_empty());
}
