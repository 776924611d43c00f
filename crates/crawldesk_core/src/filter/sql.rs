//! SQLite rendering of filter predicates.
//!
//! Column names come from schema contracts and are quoted; operands are
//! always bound as parameters.

use crate::filter::{CompareOp, Predicate};
use rusqlite::types::Value as SqlValue;

/// Rendered `WHERE` clause plus its positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFilter {
    /// Empty when there are no predicates, otherwise `" WHERE ..."`.
    pub clause: String,
    pub params: Vec<SqlValue>,
}

/// Renders a conjunction of predicates.
pub fn render(predicates: &[Predicate]) -> SqlFilter {
    if predicates.is_empty() {
        return SqlFilter::default();
    }

    let mut params = Vec::new();
    let parts: Vec<String> = predicates
        .iter()
        .map(|predicate| render_one(predicate, &mut params))
        .collect();
    SqlFilter {
        clause: format!(" WHERE {}", parts.join(" AND ")),
        params,
    }
}

fn render_one(predicate: &Predicate, params: &mut Vec<SqlValue>) -> String {
    match predicate {
        Predicate::Compare { column, op, value } => render_compare(column, *op, value, params),
        Predicate::In {
            column,
            values,
            negated,
        } => {
            if values.is_empty() {
                let constant = if *negated { "1 = 1" } else { "1 = 0" };
                return constant.to_string();
            }
            let placeholders = vec!["?"; values.len()].join(", ");
            params.extend(values.iter().cloned());
            if *negated {
                format!("(\"{column}\" IS NULL OR \"{column}\" NOT IN ({placeholders}))")
            } else {
                format!("\"{column}\" IN ({placeholders})")
            }
        }
        Predicate::Contains { column, needle } => {
            params.push(SqlValue::Text(format!("%{}%", escape_like(needle))));
            format!("\"{column}\" LIKE ? ESCAPE '\\'")
        }
        Predicate::Or(children) => {
            if children.is_empty() {
                return "1 = 0".to_string();
            }
            let parts: Vec<String> = children
                .iter()
                .map(|child| render_one(child, params))
                .collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

fn render_compare(
    column: &str,
    op: CompareOp,
    value: &SqlValue,
    params: &mut Vec<SqlValue>,
) -> String {
    if matches!(value, SqlValue::Null) {
        return match op {
            CompareOp::Ne => format!("\"{column}\" IS NOT NULL"),
            _ => format!("\"{column}\" IS NULL"),
        };
    }

    params.push(value.clone());
    match op {
        CompareOp::Eq => format!("\"{column}\" = ?"),
        CompareOp::Ne => format!("(\"{column}\" IS NULL OR \"{column}\" <> ?)"),
        CompareOp::Gt => format!("\"{column}\" > ?"),
        CompareOp::Gte => format!("\"{column}\" >= ?"),
        CompareOp::Lt => format!("\"{column}\" < ?"),
        CompareOp::Lte => format!("\"{column}\" <= ?"),
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::render;
    use crate::filter::{CompareOp, Predicate};
    use rusqlite::types::Value as SqlValue;

    #[test]
    fn empty_predicates_render_no_clause() {
        let filter = render(&[]);
        assert!(filter.clause.is_empty());
        assert!(filter.params.is_empty());
    }

    #[test]
    fn predicates_are_joined_with_and_and_bound_in_order() {
        let filter = render(&[
            Predicate::Compare {
                column: "score".to_string(),
                op: CompareOp::Gte,
                value: SqlValue::Integer(3),
            },
            Predicate::Or(vec![
                Predicate::contains("title", "50%"),
                Predicate::contains("summary", "a_b"),
            ]),
        ]);
        assert_eq!(
            filter.clause,
            " WHERE \"score\" >= ? AND (\"title\" LIKE ? ESCAPE '\\' OR \"summary\" LIKE ? ESCAPE '\\')"
        );
        assert_eq!(
            filter.params,
            vec![
                SqlValue::Integer(3),
                SqlValue::Text("%50\\%%".to_string()),
                SqlValue::Text("%a\\_b%".to_string()),
            ]
        );
    }

    #[test]
    fn null_comparisons_use_is_null() {
        let filter = render(&[Predicate::Compare {
            column: "author".to_string(),
            op: CompareOp::Ne,
            value: SqlValue::Null,
        }]);
        assert_eq!(filter.clause, " WHERE \"author\" IS NOT NULL");
        assert!(filter.params.is_empty());
    }

    #[test]
    fn empty_membership_lists_are_constant() {
        let filter = render(&[
            Predicate::In {
                column: "id".to_string(),
                values: Vec::new(),
                negated: false,
            },
            Predicate::In {
                column: "id".to_string(),
                values: Vec::new(),
                negated: true,
            },
        ]);
        assert_eq!(filter.clause, " WHERE 1 = 0 AND 1 = 1");
    }
}
