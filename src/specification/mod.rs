//! Composable listing filters and pagination.
//!
//! A [`Predicate`] renders into a Postgres `WHERE` clause for the sqlx stores
//! and evaluates directly against rows for the in-memory store, so both
//! backends answer a listing identically.

mod page;
mod predicate;

pub use page::{Direction, Page, PageDefaults, PageParams, Pageable, Sort};
pub use predicate::{Filterable, Predicate, Relation, Value};

/// Filters, sorts and pages rows held in memory.
pub fn select<R, I>(rows: I, spec: &Predicate, pageable: &Pageable) -> Page<R>
where
    R: Filterable,
    I: IntoIterator<Item = R>,
{
    let mut matched: Vec<R> = rows.into_iter().filter(|r| spec.matches(r)).collect();
    if let Some(sort) = pageable.sort {
        matched.sort_by(|a, b| {
            let ord = a.field(sort.column).cmp(&b.field(sort.column));
            match sort.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }
    let total = matched.len() as u64;
    let content = matched
        .into_iter()
        .skip(pageable.offset() as usize)
        .take(pageable.limit() as usize)
        .collect();
    Page::new(content, pageable, total)
}
