use super::*;
use proptest::prelude::*;

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

fn with_defaults() -> TableSchema {
    TableSchema::new(
        "profile",
        vec![
            ColumnDefinition::new("active", ColumnType::Boolean)
                .not_null()
                .default_value(true),
            ColumnDefinition::new("score", ColumnType::Real).default_value(1.5),
            ColumnDefinition::new("nickname", ColumnType::Text).default_value("it's"),
            ColumnDefinition::new("created_at", ColumnType::DateTime)
                .default_value(jiff::Timestamp::UNIX_EPOCH),
            ColumnDefinition::new("avatar", ColumnType::Blob).default_value(vec![0xde, 0xad]),
        ],
    )
}

#[test]
fn snapshot_sqlite_create_table() {
    let sql = SqliteBuilder.build_create_table(&users()).unwrap();
    insta::assert_snapshot!(sql, @r#"
CREATE TABLE "users" (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "name" TEXT NOT NULL,
    "email" TEXT NOT NULL UNIQUE
);
"#);
}

#[test]
fn snapshot_postgres_create_table() {
    let sql = PostgresBuilder.build_create_table(&users()).unwrap();
    insta::assert_snapshot!(sql, @r#"
CREATE TABLE "users" (
    "id" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    "name" TEXT NOT NULL,
    "email" TEXT NOT NULL UNIQUE
);
"#);
}

#[test]
fn snapshot_sqlite_defaults() {
    let sql = SqliteBuilder.build_create_table(&with_defaults()).unwrap();
    insta::assert_snapshot!(sql, @r#"
CREATE TABLE "profile" (
    "active" INTEGER NOT NULL DEFAULT 1,
    "score" REAL DEFAULT 1.5,
    "nickname" TEXT DEFAULT 'it''s',
    "created_at" TEXT DEFAULT '1970-01-01T00:00:00Z',
    "avatar" BLOB DEFAULT X'dead'
);
"#);
}

#[test]
fn snapshot_postgres_defaults() {
    let sql = PostgresBuilder.build_create_table(&with_defaults()).unwrap();
    insta::assert_snapshot!(sql, @r#"
CREATE TABLE "profile" (
    "active" BOOLEAN NOT NULL DEFAULT TRUE,
    "score" DOUBLE PRECISION DEFAULT 1.5,
    "nickname" TEXT DEFAULT 'it''s',
    "created_at" TIMESTAMPTZ DEFAULT '1970-01-01T00:00:00Z',
    "avatar" BYTEA DEFAULT '\xdead'
);
"#);
}

#[test]
fn test_sqlite_text_primary_key_is_not_null() {
    let schema = TableSchema::new(
        "tag",
        vec![ColumnDefinition::new("slug", ColumnType::Text).primary_key()],
    );
    assert_eq!(
        SqliteBuilder.build_create_table(&schema).unwrap(),
        "CREATE TABLE \"tag\" (\n    \"slug\" TEXT PRIMARY KEY NOT NULL\n);"
    );
    assert_eq!(
        PostgresBuilder.build_create_table(&schema).unwrap(),
        "CREATE TABLE \"tag\" (\n    \"slug\" TEXT PRIMARY KEY\n);"
    );
}

#[test]
fn test_create_table_rejects_invalid_schema() {
    let schema = TableSchema::new(
        "post_like",
        vec![
            ColumnDefinition::new("user_id", ColumnType::Integer).primary_key(),
            ColumnDefinition::new("post_id", ColumnType::Integer).primary_key(),
        ],
    );
    for result in [
        SqliteBuilder.build_create_table(&schema),
        PostgresBuilder.build_create_table(&schema),
    ] {
        assert!(matches!(
            result,
            Err(SchemaValidationError::MultiplePrimaryKeys { .. })
        ));
    }
}

#[test]
fn test_add_nullable_column() {
    let col = ColumnDefinition::new("bio", ColumnType::Text);
    assert_eq!(
        SqliteBuilder.build_add_column("users", &col).unwrap(),
        "ALTER TABLE \"users\" ADD COLUMN \"bio\" TEXT;"
    );
    assert_eq!(
        PostgresBuilder.build_add_column("users", &col).unwrap(),
        "ALTER TABLE \"users\" ADD COLUMN \"bio\" TEXT;"
    );
}

#[test]
fn test_add_not_null_column_with_default() {
    let col = ColumnDefinition::new("verified", ColumnType::Boolean)
        .not_null()
        .default_value(false);
    assert_eq!(
        SqliteBuilder.build_add_column("users", &col).unwrap(),
        "ALTER TABLE \"users\" ADD COLUMN \"verified\" INTEGER NOT NULL DEFAULT 0;"
    );
    assert_eq!(
        PostgresBuilder.build_add_column("users", &col).unwrap(),
        "ALTER TABLE \"users\" ADD COLUMN \"verified\" BOOLEAN NOT NULL DEFAULT FALSE;"
    );
}

fn unsupported_reason(result: Result<String, BuildError>) -> Option<UnsupportedReason> {
    match result {
        Err(BuildError::Unsupported(e)) => Some(e.reason),
        _ => None,
    }
}

#[test]
fn test_add_not_null_without_default_is_unsupported() {
    let col = ColumnDefinition::new("email", ColumnType::Text).not_null();
    assert_eq!(
        unsupported_reason(SqliteBuilder.build_add_column("users", &col)),
        Some(UnsupportedReason::NotNullWithoutDefault)
    );
    assert_eq!(
        unsupported_reason(PostgresBuilder.build_add_column("users", &col)),
        Some(UnsupportedReason::NotNullWithoutDefault)
    );
}

#[test]
fn test_add_primary_key_is_unsupported() {
    let col = ColumnDefinition::new("id", ColumnType::Integer).primary_key();
    assert_eq!(
        unsupported_reason(PostgresBuilder.build_add_column("users", &col)),
        Some(UnsupportedReason::PrimaryKey)
    );

    let col = col.auto_increment();
    assert_eq!(
        unsupported_reason(SqliteBuilder.build_add_column("users", &col)),
        Some(UnsupportedReason::AutoIncrement)
    );
}

#[test]
fn test_add_unique_column_depends_on_dialect() {
    let col = ColumnDefinition::new("handle", ColumnType::Text).unique();
    assert_eq!(
        unsupported_reason(SqliteBuilder.build_add_column("users", &col)),
        Some(UnsupportedReason::Unique)
    );
    assert_eq!(
        PostgresBuilder.build_add_column("users", &col).unwrap(),
        "ALTER TABLE \"users\" ADD COLUMN \"handle\" TEXT UNIQUE;"
    );
}

#[test]
fn test_add_column_validates_default() {
    let col = ColumnDefinition::new("age", ColumnType::Integer).default_value("ten");
    assert!(matches!(
        SqliteBuilder.build_add_column("users", &col),
        Err(BuildError::Validation(SchemaValidationError::IncompatibleDefault { .. }))
    ));
}

#[test]
fn test_unsupported_error_message() {
    let col = ColumnDefinition::new("email", ColumnType::Text).not_null();
    let err = SqliteBuilder.build_add_column("users", &col).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot add column email to table users: a NOT NULL column needs a default to be added"
    );
}

#[test]
fn test_map_type_round_trips() {
    for ty in ColumnType::ALL {
        let sqlite = SqliteBuilder.map_type(ty);
        assert!(
            SqliteBuilder.declared_type_matches(ty, sqlite),
            "sqlite: {ty} -> {sqlite}"
        );
        let pg = PostgresBuilder.map_type(ty);
        assert!(
            PostgresBuilder.declared_type_matches(ty, pg),
            "postgres: {ty} -> {pg}"
        );
    }
}

#[test]
fn test_postgres_catalog_spellings() {
    let b = PostgresBuilder;
    assert!(b.declared_type_matches(ColumnType::Integer, "bigint"));
    assert!(b.declared_type_matches(ColumnType::Real, "double precision"));
    assert!(b.declared_type_matches(ColumnType::DateTime, "timestamp with time zone"));
    assert!(b.declared_type_matches(ColumnType::Boolean, "boolean"));
    assert!(b.declared_type_matches(ColumnType::Blob, "bytea"));
    assert!(!b.declared_type_matches(ColumnType::Boolean, "bigint"));
}

#[test]
fn test_quotes_reserved_and_odd_names() {
    let schema = TableSchema::new(
        "order",
        vec![ColumnDefinition::new("gro\"up", ColumnType::Text)],
    );
    assert_eq!(
        SqliteBuilder.build_create_table(&schema).unwrap(),
        "CREATE TABLE \"order\" (\n    \"gro\"\"up\" TEXT\n);"
    );
}

fn arb_column_type() -> impl Strategy<Value = ColumnType> {
    proptest::sample::select(ColumnType::ALL.to_vec())
}

fn arb_columns() -> impl Strategy<Value = Vec<ColumnDefinition>> {
    proptest::collection::hash_set("[a-z][a-z0-9_]{0,8}", 1..10).prop_flat_map(|names| {
        let names: Vec<String> = names.into_iter().collect();
        let n = names.len();
        (
            Just(names),
            proptest::collection::vec((arb_column_type(), any::<bool>(), any::<bool>()), n),
        )
            .prop_map(|(names, attrs)| {
                names
                    .into_iter()
                    .zip(attrs)
                    .map(|(name, (ty, nullable, unique))| {
                        let mut col = ColumnDefinition::new(name, ty);
                        col.nullable = nullable;
                        col.unique = unique;
                        col
                    })
                    .collect()
            })
    })
}

proptest! {
    #[test]
    fn prop_create_table_keeps_declared_order(columns in arb_columns()) {
        let schema = TableSchema::new("prop_table", columns);
        for builder in [&SqliteBuilder as &dyn MigrationBuilder, &PostgresBuilder] {
            let sql = builder.build_create_table(&schema).unwrap();
            let positions: Vec<usize> = schema
                .columns
                .iter()
                .map(|c| sql.find(&format!("\n    {} ", quote_ident(&c.name))).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn prop_ddl_is_additive(columns in arb_columns()) {
        let schema = TableSchema::new("prop_table", columns);
        for builder in [&SqliteBuilder as &dyn MigrationBuilder, &PostgresBuilder] {
            let mut statements = vec![builder.build_create_table(&schema).unwrap()];
            statements.extend(
                schema
                    .columns
                    .iter()
                    .filter_map(|c| builder.build_add_column(&schema.name, c).ok()),
            );
            for sql in statements {
                let upper = sql.to_uppercase();
                prop_assert!(upper.starts_with("CREATE TABLE ") || upper.starts_with("ALTER TABLE "));
                prop_assert!(!upper.contains(" DROP "));
                prop_assert!(!upper.contains(" ALTER COLUMN "));
                prop_assert!(!upper.contains(" RENAME "));
            }
        }
    }
}
