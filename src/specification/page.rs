use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::error::{AppError, AppResult};

pub const MAX_PAGE_SIZE: u32 = 2000;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub direction: Direction,
}

impl Sort {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            direction: Direction::Asc,
        }
    }
}

/// Per-endpoint fallback when the request omits `size` or `sort`.
#[derive(Debug, Clone, Copy)]
pub struct PageDefaults {
    pub size: u32,
    pub sort: Option<Sort>,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self {
            size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pageable {
    pub page: u32,
    pub size: u32,
    pub sort: Option<Sort>,
}

impl Pageable {
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    /// Appends `ORDER BY`, `LIMIT` and `OFFSET`. Unsorted pages are ordered by id
    /// and sorted ones use it as a tiebreaker, so pages never overlap.
    pub fn push_order_and_limit(&self, qb: &mut QueryBuilder<'_, Postgres>, id_column: &str) {
        qb.push(" ORDER BY ");
        match self.sort {
            Some(sort) => {
                qb.push(sort.column).push(" ").push(sort.direction.sql());
                if sort.column != id_column {
                    qb.push(", ").push(id_column).push(" ASC");
                }
            }
            None => {
                qb.push(id_column).push(" ASC");
            }
        }
        qb.push(" LIMIT ");
        qb.push_bind(self.limit());
        qb.push(" OFFSET ");
        qb.push_bind(self.offset());
    }
}

/// Raw `?page=&size=&sort=field,dir` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl PageParams {
    /// `fields` maps API sort names to columns; anything else is rejected.
    pub fn resolve(
        &self,
        defaults: PageDefaults,
        fields: &[(&str, &'static str)],
    ) -> AppResult<Pageable> {
        let size = match self.size {
            None | Some(0) => defaults.size,
            Some(n) => n.min(MAX_PAGE_SIZE),
        };
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => defaults.sort,
            Some(raw) => Some(parse_sort(raw, fields)?),
        };
        Ok(Pageable {
            page: self.page.unwrap_or(0),
            size,
            sort,
        })
    }
}

fn parse_sort(raw: &str, fields: &[(&str, &'static str)]) -> AppResult<Sort> {
    let (name, dir) = match raw.split_once(',') {
        Some((name, dir)) => (name.trim(), dir.trim()),
        None => (raw, "asc"),
    };
    let direction = if dir.eq_ignore_ascii_case("asc") {
        Direction::Asc
    } else if dir.eq_ignore_ascii_case("desc") {
        Direction::Desc
    } else {
        return Err(AppError::invalid("sort", format!("unknown sort direction '{dir}'")));
    };
    let column = fields
        .iter()
        .find(|(api, _)| *api == name)
        .map(|(_, column)| *column)
        .ok_or_else(|| AppError::invalid("sort", format!("cannot sort by '{name}'")))?;
    Ok(Sort { column, direction })
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let size = u64::from(pageable.size.max(1));
        Self {
            content,
            page: pageable.page,
            size: pageable.size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
