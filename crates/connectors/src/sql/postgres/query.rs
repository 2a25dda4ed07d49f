use crate::destination::Cell;

/// Postgres caps a statement at this many bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quotes `table` or `schema.table`.
pub fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Rows per statement so a multi-row insert stays under the parameter cap.
pub fn rows_per_statement(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).max(1)
}

/// Renders `INSERT INTO t (c1, c2) VALUES (CAST($1::text AS ty1), ...), ...`.
/// Every parameter is bound as text and cast to the declared column type;
/// a [`Cell::Default`] renders as `DEFAULT` and takes no parameter.
pub fn render_insert(table: &str, columns: &[(String, String)], rows: &[Vec<Cell>]) -> String {
    let mut sql = String::with_capacity(64 + rows.len() * columns.len() * 24);
    sql.push_str("INSERT INTO ");
    sql.push_str(&quote_table(table));
    sql.push_str(" (");
    let quoted: Vec<String> = columns.iter().map(|(c, _)| quote_identifier(c)).collect();
    sql.push_str(&quoted.join(", "));
    sql.push_str(") VALUES ");

    let mut placeholder = 1;
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (j, ((_, sql_type), cell)) in columns.iter().zip(row).enumerate() {
            if j > 0 {
                sql.push_str(", ");
            }
            match cell {
                Cell::Value(_) => {
                    sql.push_str(&format!("CAST(${placeholder}::text AS {sql_type})"));
                    placeholder += 1;
                }
                Cell::Default => sql.push_str("DEFAULT"),
            }
        }
        sql.push(')');
    }
    sql
}
