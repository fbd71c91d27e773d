//! Default ordering behavior - deterministic sort order on every query

use crate::model::HasDefaultOrder;
use crate::query::QueryBuilder;

/// Append the model's declared ORDER BY clauses, table-qualified, in
/// declaration order. An empty declaration adds nothing.
pub fn apply_default_order<M: HasDefaultOrder>(mut query: QueryBuilder<M>) -> QueryBuilder<M> {
    for (column, direction) in M::default_order() {
        query = query.order_by_direction(&M::qualified_column(column), direction.clone());
    }
    query
}

/// Default query for the model with its ordering applied
pub fn query<M: HasDefaultOrder>() -> QueryBuilder<M> {
    apply_default_order(QueryBuilder::for_model())
}
