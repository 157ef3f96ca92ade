use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

/// A column value a predicate can compare against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Timestamp(OffsetDateTime),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(v: OffsetDateTime) -> Self {
        Value::Timestamp(v)
    }
}

/// Join table linking rows of one table to ids of another entity.
///
/// Renders as `key IN (SELECT owner FROM table WHERE target = $n)`.
#[derive(Debug, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub key: &'static str,
    pub table: &'static str,
    pub owner: &'static str,
    pub target: &'static str,
}

/// Rows that a [`Predicate`] can be evaluated against in process.
pub trait Filterable {
    fn field(&self, column: &str) -> Option<Value>;

    /// Ids linked to this row through `relation`.
    fn related(&self, _relation: &str) -> &[Uuid] {
        &[]
    }
}

/// Composable filter over a listing.
///
/// Column names are always compile-time constants, so rendering them into SQL
/// verbatim is safe; every value goes through a bind parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Predicate {
    #[default]
    True,
    Eq(&'static str, Value),
    /// Case-insensitive substring match.
    Like(&'static str, String),
    /// Inclusive bounds; a missing bound is open.
    Range {
        column: &'static str,
        lower: Option<Value>,
        upper: Option<Value>,
    },
    Related(&'static Relation, Uuid),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Eq(column, value.into())
    }

    pub fn eq_opt<V: Into<Value>>(column: &'static str, value: Option<V>) -> Self {
        value.map_or(Predicate::True, |v| Predicate::eq(column, v))
    }

    /// Blank needles match everything.
    pub fn like_opt(column: &'static str, needle: Option<&str>) -> Self {
        match needle.map(str::trim) {
            Some(n) if !n.is_empty() => Predicate::Like(column, n.to_string()),
            _ => Predicate::True,
        }
    }

    pub fn range_opt<V: Into<Value>>(
        column: &'static str,
        lower: Option<V>,
        upper: Option<V>,
    ) -> Self {
        if lower.is_none() && upper.is_none() {
            return Predicate::True;
        }
        Predicate::Range {
            column,
            lower: lower.map(Into::into),
            upper: upper.map(Into::into),
        }
    }

    pub fn related(relation: &'static Relation, id: Uuid) -> Self {
        Predicate::Related(relation, id)
    }

    /// Conjunction. Nested `And`s are flattened and `True` operands vanish.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::And(mut a), Predicate::And(b)) => {
                a.extend(b);
                Predicate::And(a)
            }
            (Predicate::And(mut a), p) => {
                a.push(p);
                Predicate::And(a)
            }
            (p, Predicate::And(mut b)) => {
                b.insert(0, p);
                Predicate::And(b)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Predicate {
        parts.into_iter().fold(Predicate::True, Predicate::and)
    }

    pub fn is_true(&self) -> bool {
        match self {
            Predicate::True => true,
            Predicate::And(parts) => parts.iter().all(Predicate::is_true),
            _ => false,
        }
    }

    pub fn matches<R: Filterable + ?Sized>(&self, row: &R) -> bool {
        match self {
            Predicate::True => true,
            Predicate::Eq(column, expected) => row.field(column).as_ref() == Some(expected),
            Predicate::Like(column, needle) => match row.field(column) {
                Some(Value::Text(s)) => s.to_lowercase().contains(&needle.to_lowercase()),
                _ => false,
            },
            Predicate::Range {
                column,
                lower,
                upper,
            } => match row.field(column) {
                Some(v) => {
                    lower.as_ref().map_or(true, |l| &v >= l)
                        && upper.as_ref().map_or(true, |u| &v <= u)
                }
                None => false,
            },
            Predicate::Related(relation, id) => row.related(relation.name).contains(id),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(row)),
        }
    }

    /// Appends ` WHERE ...` unless the predicate matches everything.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.is_true() {
            return;
        }
        qb.push(" WHERE ");
        self.push_sql(qb);
    }

    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::True => {
                qb.push("TRUE");
            }
            Predicate::Eq(column, value) => {
                qb.push(*column).push(" = ");
                push_value(qb, value);
            }
            Predicate::Like(column, needle) => {
                qb.push(*column).push(" ILIKE ");
                qb.push_bind(format!("%{}%", escape_like(needle)));
            }
            Predicate::Range {
                column,
                lower,
                upper,
            } => {
                qb.push("(");
                match (lower, upper) {
                    (Some(l), Some(u)) => {
                        qb.push(*column).push(" >= ");
                        push_value(qb, l);
                        qb.push(" AND ").push(*column).push(" <= ");
                        push_value(qb, u);
                    }
                    (Some(l), None) => {
                        qb.push(*column).push(" >= ");
                        push_value(qb, l);
                    }
                    (None, Some(u)) => {
                        qb.push(*column).push(" <= ");
                        push_value(qb, u);
                    }
                    (None, None) => {
                        qb.push(*column).push(" IS NOT NULL");
                    }
                }
                qb.push(")");
            }
            Predicate::Related(relation, id) => {
                qb.push(relation.key)
                    .push(" IN (SELECT ")
                    .push(relation.owner)
                    .push(" FROM ")
                    .push(relation.table)
                    .push(" WHERE ")
                    .push(relation.target)
                    .push(" = ");
                qb.push_bind(*id);
                qb.push(")");
            }
            Predicate::And(parts) => {
                let parts: Vec<&Predicate> = parts.iter().filter(|p| !p.is_true()).collect();
                if parts.is_empty() {
                    qb.push("TRUE");
                    return;
                }
                qb.push("(");
                for (i, part) in parts.into_iter().enumerate() {
                    if i > 0 {
                        qb.push(" AND ");
                    }
                    part.push_sql(qb);
                }
                qb.push(")");
            }
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Int(v) => qb.push_bind(*v),
        Value::Text(v) => qb.push_bind(v.clone()),
        Value::Uuid(v) => qb.push_bind(*v),
        Value::Timestamp(v) => qb.push_bind(*v),
    };
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    static MEMBERSHIP: Relation = Relation {
        name: "memberships",
        key: "id",
        table: "memberships",
        owner: "item_id",
        target: "member_id",
    };

    #[derive(Debug, Clone)]
    struct Row {
        id: Uuid,
        kind: &'static str,
        title: &'static str,
        at: OffsetDateTime,
        members: Vec<Uuid>,
    }

    impl Filterable for Row {
        fn field(&self, column: &str) -> Option<Value> {
            match column {
                "id" => Some(self.id.into()),
                "kind" => Some(self.kind.into()),
                "title" => Some(self.title.into()),
                "at" => Some(self.at.into()),
                _ => None,
            }
        }

        fn related(&self, relation: &str) -> &[Uuid] {
            match relation {
                "memberships" => &self.members,
                _ => &[],
            }
        }
    }

    fn rows(member: Uuid) -> Vec<Row> {
        vec![
            Row {
                id: Uuid::new_v4(),
                kind: "A",
                title: "Rust for Beginners",
                at: datetime!(2024-01-01 0:00 UTC),
                members: vec![member],
            },
            Row {
                id: Uuid::new_v4(),
                kind: "B",
                title: "Advanced rust",
                at: datetime!(2024-03-01 0:00 UTC),
                members: vec![],
            },
            Row {
                id: Uuid::new_v4(),
                kind: "A",
                title: "Java basics",
                at: datetime!(2024-06-01 0:00 UTC),
                members: vec![member],
            },
        ]
    }

    fn ids(rows: &[Row], p: &Predicate) -> Vec<Uuid> {
        rows.iter().filter(|r| p.matches(*r)).map(|r| r.id).collect()
    }

    #[test]
    fn and_drops_identity_and_flattens() {
        let a = Predicate::eq("kind", "A");
        let b = Predicate::like_opt("title", Some("rust"));
        assert_eq!(Predicate::True.and(a.clone()), a);
        assert_eq!(a.clone().and(Predicate::True), a);

        let c = Predicate::eq("id", Uuid::nil());
        let flat = a.clone().and(b.clone()).and(c.clone());
        assert_eq!(flat, Predicate::And(vec![a, b, c]));
    }

    #[test]
    fn absent_filters_are_identity() {
        assert!(Predicate::eq_opt::<&str>("kind", None).is_true());
        assert!(Predicate::like_opt("title", Some("   ")).is_true());
        assert!(Predicate::range_opt::<OffsetDateTime>("at", None, None).is_true());
        assert!(Predicate::all(Vec::new()).is_true());
    }

    #[test]
    fn conjunction_is_commutative_and_associative() {
        let member = Uuid::new_v4();
        let data = rows(member);
        let f1 = Predicate::eq("kind", "A");
        let f2 = Predicate::like_opt("title", Some("RUST"));
        let f3 = Predicate::related(&MEMBERSHIP, member);

        let ab = ids(&data, &f1.clone().and(f2.clone()));
        let ba = ids(&data, &f2.clone().and(f1.clone()));
        assert_eq!(ab, ba);

        let left = ids(&data, &f1.clone().and(f2.clone()).and(f3.clone()));
        let right = ids(&data, &f1.clone().and(f2.clone().and(f3.clone())));
        assert_eq!(left, right);

        let sequential: Vec<Uuid> = data
            .iter()
            .filter(|r| f1.matches(*r))
            .filter(|r| f2.matches(*r))
            .map(|r| r.id)
            .collect();
        assert_eq!(ab, sequential);
        assert_eq!(ab, vec![data[0].id]);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let data = rows(Uuid::new_v4());
        let p = Predicate::range_opt(
            "at",
            Some(datetime!(2024-01-01 0:00 UTC)),
            Some(datetime!(2024-03-01 0:00 UTC)),
        );
        assert_eq!(ids(&data, &p), vec![data[0].id, data[1].id]);

        let open = Predicate::range_opt("at", Some(datetime!(2024-02-01 0:00 UTC)), None);
        assert_eq!(ids(&data, &open), vec![data[1].id, data[2].id]);
    }

    #[test]
    fn related_matches_linked_rows_only() {
        let member = Uuid::new_v4();
        let data = rows(member);
        let p = Predicate::related(&MEMBERSHIP, member);
        assert_eq!(ids(&data, &p), vec![data[0].id, data[2].id]);
        assert!(ids(&data, &Predicate::related(&MEMBERSHIP, Uuid::new_v4())).is_empty());
    }

    #[test]
    fn unknown_column_never_matches() {
        let data = rows(Uuid::new_v4());
        assert!(ids(&data, &Predicate::eq("missing", "A")).is_empty());
    }

    #[test]
    fn renders_where_clause_with_binds() {
        let member = Uuid::new_v4();
        let p = Predicate::eq("kind", "A")
            .and(Predicate::like_opt("title", Some("50%_off")))
            .and(Predicate::related(&MEMBERSHIP, member));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM items");
        p.push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT id FROM items WHERE (kind = $1 AND title ILIKE $2 AND id IN \
             (SELECT item_id FROM memberships WHERE member_id = $3))"
        );
    }

    #[test]
    fn identity_renders_no_where_clause() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM items");
        Predicate::True.push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT id FROM items");
    }

    #[test]
    fn renders_half_open_range() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM items");
        Predicate::range_opt::<OffsetDateTime>("at", None, Some(datetime!(2024-01-01 0:00 UTC)))
            .push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT id FROM items WHERE (at <= $1)");
    }

    #[test]
    fn like_escapes_wildcards() {
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
    }
}
