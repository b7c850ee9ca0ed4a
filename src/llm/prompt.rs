use crate::db::models::SchemaColumn;

pub const NO_SCHEMA_MARKER: &str = "No schema information available";

/// Fixed instruction sent as the system prompt with every generation request.
pub fn system_prompt(dialect: &str) -> String {
    format!(
        r#"You are an expert SQL generator. Your task is to convert natural language queries into valid {dialect} SQL statements.

Rules:
1. Only generate SELECT statements unless explicitly asked for INSERT, UPDATE, or DELETE
2. Always use proper {dialect} syntax
3. Use table and column names exactly as provided in the schema
4. Include appropriate WHERE clauses, JOINs, GROUP BY, ORDER BY as needed
5. Return only the SQL statement without any explanation or markdown formatting
6. If the query is ambiguous, make reasonable assumptions based on common business logic
7. Use LIMIT clause for queries that might return large result sets
8. Never include SQL comments

Schema information will be provided in the format:
Table: table_name
Columns:
  - column1 (type)
  - column2 (type)
"#
    )
}

/// Renders the stored columns grouped by table, tables in first-seen order.
pub fn render_schema(columns: &[SchemaColumn]) -> String {
    if columns.is_empty() {
        return NO_SCHEMA_MARKER.to_string();
    }

    // Vec rather than a map: table order must follow the stored order.
    let mut tables: Vec<(&str, Option<&str>, Vec<String>)> = Vec::new();
    for column in columns {
        let mut line = format!("{} ({})", column.column_name, column.data_type);
        if let Some(comment) = column.column_comment.as_deref().filter(|c| !c.is_empty()) {
            line.push_str(&format!(" -- {}", comment));
        }

        match tables.iter_mut().find(|(name, _, _)| *name == column.table_name) {
            Some((_, _, lines)) => lines.push(line),
            None => tables.push((
                column.table_name.as_str(),
                column.table_comment.as_deref(),
                vec![line],
            )),
        }
    }

    let mut schema_info = String::from("Database Schema:\n");
    for (table_name, table_comment, lines) in tables {
        schema_info.push_str(&format!("\nTable: {}", table_name));
        if let Some(comment) = table_comment.filter(|c| !c.is_empty()) {
            schema_info.push_str(&format!(" -- {}", comment));
        }
        schema_info.push_str("\nColumns:\n");
        for line in lines {
            schema_info.push_str(&format!("  - {}\n", line));
        }
    }

    schema_info
}

/// Full user prompt: schema block, the question, then the request trailer.
pub fn build_prompt(question: &str, columns: &[SchemaColumn], dialect: &str) -> String {
    format!(
        "\n{}\n\nNatural Language Query: {}\n\nGenerate a {} SQL query for this request:\n",
        render_schema(columns),
        question,
        dialect
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(table: &str, name: &str, data_type: &str) -> SchemaColumn {
        SchemaColumn {
            table_name: table.to_string(),
            column_name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: "YES".to_string(),
            column_comment: None,
            table_comment: None,
        }
    }

    #[test]
    fn empty_schema_uses_marker() {
        let prompt = build_prompt("how many users?", &[], "DuckDB");
        assert!(prompt.contains(NO_SCHEMA_MARKER));
        assert!(prompt.contains("Natural Language Query: how many users?"));
        assert!(prompt.trim_end().ends_with("Generate a DuckDB SQL query for this request:"));
    }

    #[test]
    fn groups_columns_under_table_headers_in_first_seen_order() {
        let mut users_id = column("users", "id", "INTEGER");
        users_id.table_comment = Some("Registered users".to_string());
        let mut email = column("users", "email", "VARCHAR");
        email.column_comment = Some("Login address".to_string());
        email.table_comment = Some("Registered users".to_string());

        let columns = vec![
            users_id,
            column("orders", "id", "INTEGER"),
            email,
            column("orders", "total", "DECIMAL(10,2)"),
        ];

        let schema = render_schema(&columns);
        let expected = "Database Schema:\n\
            \nTable: users -- Registered users\nColumns:\n  - id (INTEGER)\n  - email (VARCHAR) -- Login address\n\
            \nTable: orders\nColumns:\n  - id (INTEGER)\n  - total (DECIMAL(10,2))\n";
        assert_eq!(schema, expected);
    }

    #[test]
    fn prompt_mentions_every_table() {
        let columns = vec![
            column("customers", "id", "INTEGER"),
            column("customers", "name", "VARCHAR"),
            column("customers", "email", "VARCHAR"),
            column("invoices", "id", "INTEGER"),
            column("invoices", "total", "DECIMAL(10,2)"),
        ];
        let prompt = build_prompt("total invoiced per customer", &columns, "DuckDB");
        assert!(prompt.contains("Table: customers"));
        assert!(prompt.contains("Table: invoices"));
        assert!(!prompt.contains(NO_SCHEMA_MARKER));
    }

    #[test]
    fn system_prompt_names_the_dialect() {
        assert!(system_prompt("MySQL").contains("valid MySQL SQL statements"));
    }
}
