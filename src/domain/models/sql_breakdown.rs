//! Literal identifiers extracted from an SQL statement.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column and table names a statement references, aliases excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlBreakdown {
    /// Literal column names
    #[serde(default)]
    pub column_names: Vec<String>,
    /// Referenced tables
    #[serde(default)]
    pub table_names: Vec<String>,
}

impl SqlBreakdown {
    /// Whether nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.column_names.is_empty() && self.table_names.is_empty()
    }

    /// Drop names that the statement only introduces through `AS`.
    pub fn without_aliases(mut self, sql: &str) -> Self {
        let aliases = alias_map(sql);
        let wrapped: Vec<String> = aliases.values().map(|c| c.to_ascii_lowercase()).collect();
        self.column_names.retain(|name| {
            let name = name.to_ascii_lowercase();
            !aliases.contains_key(&name) || wrapped.contains(&name)
        });
        self
    }
}

/// Map of lowercase `AS` alias to the literal column it wraps.
///
/// `SUM(oi.item_total) AS total_revenue` maps `total_revenue` to
/// `item_total`. Aliases over expressions without a column are skipped.
pub fn alias_map(sql: &str) -> HashMap<String, String> {
    let tokens = tokenize(sql);
    let mut aliases = HashMap::new();

    for (index, token) in tokens.iter().enumerate() {
        if !token.eq_ignore_ascii_case("AS") {
            continue;
        }
        let Some(alias) = tokens.get(index + 1).filter(|t| is_identifier(t)) else {
            continue;
        };

        // Walk back to the start of the select item, tracking parentheses.
        let mut depth = 0i32;
        let mut column = None;
        for previous in tokens[..index].iter().rev() {
            match previous.as_str() {
                ")" => depth += 1,
                "(" => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                "," if depth == 0 => break,
                t if depth == 0 && is_clause_keyword(t) => break,
                t if column.is_none() && is_identifier(t) && !is_function_name(&tokens, t) => {
                    column = Some(t.rsplit('.').next().unwrap_or(t).to_string());
                }
                _ => {}
            }
        }

        // `p.category AS category` renames nothing.
        if let Some(column) = column.filter(|c| !c.eq_ignore_ascii_case(alias)) {
            aliases.insert(alias.to_ascii_lowercase(), column);
        }
    }

    aliases
}

fn tokenize(sql: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for ch in sql.chars() {
        if in_quote {
            if ch == '\'' {
                in_quote = false;
            }
            continue;
        }
        match ch {
            '\'' => {
                flush(&mut current, &mut tokens);
                in_quote = true;
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' || c == '"' || c == '`' => {
                if c != '"' && c != '`' {
                    current.push(c);
                }
            }
            '(' | ')' | ',' => {
                flush(&mut current, &mut tokens);
                tokens.push(ch.to_string());
            }
            _ => flush(&mut current, &mut tokens),
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

fn is_identifier(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && !is_clause_keyword(token)
        && !token.eq_ignore_ascii_case("AS")
        && !token.eq_ignore_ascii_case("DISTINCT")
}

fn is_clause_keyword(token: &str) -> bool {
    const KEYWORDS: [&str; 10] = [
        "SELECT", "FROM", "WHERE", "JOIN", "ON", "GROUP", "ORDER", "BY", "HAVING", "WITH",
    ];
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(token))
}

/// A token immediately followed by `(` is a function call, not a column.
fn is_function_name(tokens: &[String], candidate: &str) -> bool {
    tokens
        .windows(2)
        .any(|pair| pair[0] == candidate && pair[1] == "(")
}
