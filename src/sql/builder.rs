//! Builds parameterized INSERT, SELECT, UPDATE, DELETE and CREATE TABLE from a resolved schema.

use crate::config::{ColumnType, Schema};
use crate::sql::params::{placeholder, BindValue};
use crate::whitelist::Args;

/// Quote identifier for PostgreSQL (safe: only from schema or whitelisted keys).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl Statement {
    fn new() -> Self {
        Statement {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a parameter and return its rendered placeholder.
    fn push_param(&mut self, column_type: Option<ColumnType>, v: &serde_json::Value) -> String {
        let bind = BindValue::from_json(v);
        let ph = placeholder(self.params.len() + 1, column_type, &bind);
        self.params.push(bind);
        ph
    }
}

/// Column list for RETURNING / SELECT: declared columns, numeric as text so it decodes; `*` when none are declared.
pub fn returning_list(schema: &Schema) -> String {
    if schema.columns.is_empty() {
        return "*".to_string();
    }
    schema
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            if c.type_ == ColumnType::Decimal {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Equality conjunction over `filter`; null values become IS NULL. Empty filter yields no clause.
fn where_clause(q: &mut Statement, schema: &Schema, filter: &Args) -> String {
    let parts: Vec<String> = filter
        .iter()
        .map(|(col, val)| {
            if val.is_null() {
                format!("{} IS NULL", quoted(col))
            } else {
                let v = schema.coerce(col, val);
                let ph = q.push_param(schema.column_type(col), &v);
                format!("{} = {}", quoted(col), ph)
            }
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT matching rows, newest primary key first.
pub fn select(schema: &Schema, filter: &Args) -> Statement {
    let mut q = Statement::new();
    let where_sql = where_clause(&mut q, schema, filter);
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} DESC",
        returning_list(schema),
        quoted(&schema.table_name),
        where_sql,
        quoted(&schema.primary_key)
    );
    q
}

/// INSERT one row from `values`, returning it.
pub fn insert(schema: &Schema, values: &Args) -> Statement {
    let mut q = Statement::new();
    let table = quoted(&schema.table_name);
    let returning = returning_list(schema);
    if values.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning);
        return q;
    }
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (name, val) in values {
        let v = schema.coerce(name, val);
        placeholders.push(q.push_param(schema.column_type(name), &v));
        cols.push(quoted(name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        returning
    );
    q
}

/// UPDATE matching rows with `values`, returning them. With nothing to set this is a plain SELECT.
pub fn update(schema: &Schema, filter: &Args, values: &Args) -> Statement {
    if values.is_empty() {
        return select(schema, filter);
    }
    let mut q = Statement::new();
    let sets: Vec<String> = values
        .iter()
        .map(|(name, val)| {
            let v = schema.coerce(name, val);
            let ph = q.push_param(schema.column_type(name), &v);
            format!("{} = {}", quoted(name), ph)
        })
        .collect();
    let where_sql = where_clause(&mut q, schema, filter);
    q.sql = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        quoted(&schema.table_name),
        sets.join(", "),
        where_sql,
        returning_list(schema)
    );
    q
}

/// DELETE matching rows. No payload comes back.
pub fn delete(schema: &Schema, filter: &Args) -> Statement {
    let mut q = Statement::new();
    let where_sql = where_clause(&mut q, schema, filter);
    q.sql = format!("DELETE FROM {}{}", quoted(&schema.table_name), where_sql);
    q
}

/// CREATE TABLE IF NOT EXISTS from the declared columns.
pub fn create_table(schema: &Schema) -> Statement {
    let mut defs: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quoted(&c.name), c.type_.pg_definition()))
        .collect();
    let pk_is_serial = schema
        .column_type(&schema.primary_key)
        .map(ColumnType::is_serial)
        .unwrap_or(false);
    if !pk_is_serial {
        defs.push(format!("PRIMARY KEY ({})", quoted(&schema.primary_key)));
    }
    let mut q = Statement::new();
    q.sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quoted(&schema.table_name),
        defs.join(", ")
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_schema_str;
    use serde_json::json;

    fn schema() -> Schema {
        load_schema_str(
            r#"{
                "table_name": "widgets",
                "primary_key": "widget_id",
                "columns": [["widget_id", "increments"], ["widget_name", "string"],
                            ["price", "decimal"], ["widgets_created", "timestamp"]],
                "whitelist": {"default": ["widget_name"]}
            }"#,
        )
        .unwrap()
    }

    fn args(v: serde_json::Value) -> Args {
        v.as_object().cloned().unwrap()
    }

    const COLS: &str = r#""widget_id", "widget_name", "price"::text AS "price", "widgets_created""#;

    #[test]
    fn select_by_key_orders_descending() {
        let q = select(&schema(), &args(json!({"widget_id": "7"})));
        assert_eq!(
            q.sql,
            format!(
                r#"SELECT {} FROM "widgets" WHERE "widget_id" = $1::integer ORDER BY "widget_id" DESC"#,
                COLS
            )
        );
        assert_eq!(q.params, vec![BindValue::I64(7)]);
    }

    #[test]
    fn select_without_filter_has_no_where() {
        let q = select(&schema(), &Args::new());
        assert_eq!(q.sql, format!(r#"SELECT {} FROM "widgets" ORDER BY "widget_id" DESC"#, COLS));
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_casts_and_stamps() {
        let q = insert(&schema(), &args(json!({"widget_name": "a", "widgets_created": 1.5})));
        assert_eq!(
            q.sql,
            format!(
                r#"INSERT INTO "widgets" ("widget_name", "widgets_created") VALUES ($1::varchar, to_timestamp($2::double precision)) RETURNING {}"#,
                COLS
            )
        );
        assert_eq!(q.params, vec![BindValue::Text("a".into()), BindValue::F64(1.5)]);
    }

    #[test]
    fn insert_with_nothing_uses_defaults() {
        let q = insert(&schema(), &Args::new());
        assert!(q.sql.starts_with(r#"INSERT INTO "widgets" DEFAULT VALUES RETURNING"#));
    }

    #[test]
    fn update_numbers_set_params_before_where() {
        let q = update(
            &schema(),
            &args(json!({"widget_id": 3})),
            &args(json!({"widget_name": "b"})),
        );
        assert_eq!(
            q.sql,
            format!(
                r#"UPDATE "widgets" SET "widget_name" = $1::varchar WHERE "widget_id" = $2::integer RETURNING {}"#,
                COLS
            )
        );
        assert_eq!(q.params, vec![BindValue::Text("b".into()), BindValue::I64(3)]);
    }

    #[test]
    fn empty_update_degrades_to_select() {
        let s = schema();
        let filter = args(json!({"widget_id": 3}));
        assert_eq!(update(&s, &filter, &Args::new()), select(&s, &filter));
    }

    #[test]
    fn delete_and_null_predicates() {
        let q = delete(&schema(), &args(json!({"widget_name": null})));
        assert_eq!(q.sql, r#"DELETE FROM "widgets" WHERE "widget_name" IS NULL"#);
        assert!(q.params.is_empty());
    }

    #[test]
    fn create_table_uses_declared_types() {
        let q = create_table(&schema());
        assert_eq!(
            q.sql,
            r#"CREATE TABLE IF NOT EXISTS "widgets" ("widget_id" SERIAL PRIMARY KEY, "widget_name" VARCHAR(255), "price" NUMERIC(8, 2), "widgets_created" TIMESTAMPTZ)"#
        );
    }

    #[test]
    fn create_table_adds_key_for_non_serial_pk() {
        let s = load_schema_str(
            r#"{"table_name": "tags", "primary_key": "tag", "columns": [["tag", "string"]]}"#,
        )
        .unwrap();
        assert_eq!(
            create_table(&s).sql,
            r#"CREATE TABLE IF NOT EXISTS "tags" ("tag" VARCHAR(255), PRIMARY KEY ("tag"))"#
        );
    }
}
