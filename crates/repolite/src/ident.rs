//! Bracket-quoted T-SQL identifiers.
//!
//! Names are always wrapped in `[...]`; a `]` inside the name is escaped as `]]`.

/// Quote one identifier part: `Name` → `[Name]`.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('[');
    for ch in name.chars() {
        if ch == ']' {
            out.push(']');
        }
        out.push(ch);
    }
    out.push(']');
    out
}

/// Quote a column, optionally qualified by a table alias: `[c0].[Name]`.
pub fn qualified_column(alias: Option<&str>, name: &str) -> String {
    match alias {
        Some(alias) => format!("{}.{}", quote_ident(alias), quote_ident(name)),
        None => quote_ident(name),
    }
}

/// Quote a schema-qualified table: `[dbo].[Users]`.
pub fn qualified_table(schema: &str, table: &str) -> String {
    if schema.is_empty() {
        quote_ident(table)
    } else {
        format!("{}.{}", quote_ident(schema), quote_ident(table))
    }
}
