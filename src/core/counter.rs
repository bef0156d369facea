//! Bounded counters updated in place by the database.
//!
//! Seat occupancy and voucher usage are both "add a delta, stay within bounds" counters.
//! Instead of reading the value, checking it and writing it back (which loses updates
//! under concurrency), the bound check is folded into a single conditional statement:
//!
//! `UPDATE t SET counter = counter + :delta WHERE id = :id AND counter >= -:delta AND counter <= ceiling - :delta`
//!
//! Exactly one affected row means the delta was applied; zero means the row is missing
//! or the bound would have been violated, and the caller re-reads to find out which.

use crate::errors::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    sea_query::{Condition, Expr},
};

/// Upper bound for a counter column.
#[derive(Debug, Clone, Copy)]
pub enum Ceiling<C> {
    /// Bounded by another (non-null) column of the same row
    Column(C),
    /// Bounded by a nullable column; NULL means unbounded
    OptionalColumn(C),
}

/// Identifies the counter to update: the row key, the counter, its ceiling, and the
/// timestamp column stamped on every successful change.
#[derive(Debug, Clone, Copy)]
pub struct BoundedCounter<C> {
    pub id: C,
    pub counter: C,
    pub ceiling: Ceiling<C>,
    pub touched_at: C,
}

impl<C> BoundedCounter<C>
where
    C: ColumnTrait,
    C::EntityName: EntityTrait<Column = C>,
{
    /// Atomically adds `delta` to the counter of row `id` if the result stays within
    /// `[0, ceiling]`, stamping `touched_at` with `now`. Returns whether the update was applied.
    pub async fn apply<D>(&self, db: &D, id: i64, delta: i32, now: DateTime<Utc>) -> Result<bool>
    where
        D: ConnectionTrait,
    {
        // Bounds are compared in i64 so `-delta` cannot overflow for i32::MIN
        let delta = i64::from(delta);
        let ceiling = match self.ceiling {
            Ceiling::Column(col) => {
                Condition::all().add(Expr::col(self.counter).lte(Expr::col(col).sub(delta)))
            }
            Ceiling::OptionalColumn(col) => Condition::any()
                .add(Expr::col(col).is_null())
                .add(Expr::col(self.counter).lte(Expr::col(col).sub(delta))),
        };

        let result = <C::EntityName as EntityTrait>::update_many()
            .col_expr(self.counter, Expr::col(self.counter).add(delta))
            .col_expr(self.touched_at, Expr::value(now))
            .filter(self.id.eq(id))
            .filter(Expr::col(self.counter).gte(-delta))
            .filter(ceiling)
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
