//! Searchable behavior - free-text LIKE search over declared fields
//!
//! A term expands into one OR group of substring predicates over the
//! model's own columns, plus an OR'd existential sub-query per searched
//! relation. A missing term leaves the query untouched.

use crate::model::Searchable;
use crate::query::QueryBuilder;

/// Apply a free-text search term to a query. `None` is a no-op.
pub fn apply_search<M: Searchable>(
    query: QueryBuilder<M>,
    term: Option<&str>,
) -> QueryBuilder<M> {
    let term = match term {
        Some(term) => term,
        None => return query,
    };

    let pattern = format!("%{}%", escape_like(term));
    let (columns, relations) = partition_fields::<M>();

    let mut query = if columns.is_empty() {
        query
    } else {
        query.where_group(|mut group| {
            for column in &columns {
                group = group.or_like(&M::qualified_column(column), &pattern);
            }
            group
        })
    };

    for (relation, fields) in relations {
        let target = match M::search_relation(relation) {
            Some(target) => target,
            None => {
                tracing::warn!(
                    "searchable field references unknown relation '{}' on {}",
                    relation,
                    M::table_name()
                );
                continue;
            }
        };

        let subquery = QueryBuilder::<()>::new()
            .select("1")
            .from(target.table)
            .where_raw(&format!(
                "{}.{} = {}.{}",
                target.table,
                target.foreign_key,
                M::table_name(),
                M::primary_key_name()
            ))
            .where_group(|mut group| {
                for field in &fields {
                    group = group.or_like(&format!("{}.{}", target.table, field), &pattern);
                }
                group
            });

        query = query.or_where_exists(subquery);
    }

    query
}

/// Split the declared fields into bare columns and relation fields grouped
/// by relation name, both in declaration order
fn partition_fields<M: Searchable>() -> (Vec<&'static str>, Vec<(&'static str, Vec<&'static str>)>) {
    let mut columns = Vec::new();
    let mut relations: Vec<(&'static str, Vec<&'static str>)> = Vec::new();

    for &field in M::searchable_fields() {
        match field.rsplit_once('.') {
            None => columns.push(field),
            Some((relation, column)) => {
                match relations.iter_mut().find(|(name, _)| *name == relation) {
                    Some((_, fields)) => fields.push(column),
                    None => relations.push((relation, vec![column])),
                }
            }
        }
    }

    (columns, relations)
}

/// Escape LIKE wildcard characters so the term matches literally
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("plain"), "plain");
    }
}
