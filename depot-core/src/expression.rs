use crate::{EntityDef, SelectClause, Value};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Like,
    Add,
    Subtract,
    Multiply,
    Divide,
    BitwiseAnd,
    BitwiseOr,
}

impl BinaryOp {
    /// Operator text, spacing included.
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOp::Equal => " = ",
            BinaryOp::NotEqual => " <> ",
            BinaryOp::Less => " < ",
            BinaryOp::LessEqual => " <= ",
            BinaryOp::Greater => " > ",
            BinaryOp::GreaterEqual => " >= ",
            BinaryOp::Like => " LIKE ",
            BinaryOp::Add => " + ",
            BinaryOp::Subtract => " - ",
            BinaryOp::Multiply => " * ",
            BinaryOp::Divide => " / ",
            BinaryOp::BitwiseAnd => " & ",
            BinaryOp::BitwiseOr => " | ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicOp::And => " AND ",
            LogicOp::Or => " OR ",
        }
    }
}

/// A field of an entity used as an expression.
#[derive(Debug, Clone, Copy)]
pub struct ColumnExp {
    pub entity: &'static EntityDef,
    pub field: &'static str,
}

/// Matches the full text index `index` of `entity` against `query`.
#[derive(Debug, Clone)]
pub struct FullTextMatch {
    pub entity: &'static EntityDef,
    pub index: &'static str,
    pub query: String,
}

/// SQL expression tree.
///
/// Every `Value` (and every element of an `In`) becomes one placeholder.
#[derive(Debug, Clone)]
pub enum Expression {
    Column(ColumnExp),
    Value(Value),
    /// Inlined verbatim.
    Literal(Cow<'static, str>),
    Function {
        name: Cow<'static, str>,
        arguments: Vec<Expression>,
    },
    Binary {
        lhs: Box<Expression>,
        op: BinaryOp,
        rhs: Box<Expression>,
    },
    Logic {
        op: LogicOp,
        conditions: Vec<Expression>,
    },
    Not(Box<Expression>),
    In {
        column: Box<Expression>,
        values: Vec<Value>,
    },
    IsNull(Box<Expression>),
    Exists(Box<SelectClause>),
    /// A subquery, rendered parenthesized.
    Select(Box<SelectClause>),
    FullText(FullTextMatch),
}

impl Expression {
    pub fn column(entity: &'static EntityDef, field: &'static str) -> Self {
        Expression::Column(ColumnExp { entity, field })
    }
    pub fn value(value: impl Into<Value>) -> Self {
        Expression::Value(value.into())
    }
    pub fn literal(text: impl Into<Cow<'static, str>>) -> Self {
        Expression::Literal(text.into())
    }
    pub fn function(name: impl Into<Cow<'static, str>>, arguments: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.into(),
            arguments,
        }
    }
    pub fn binary(lhs: Expression, op: BinaryOp, rhs: Expression) -> Self {
        Expression::Binary {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        }
    }
    pub fn and(conditions: Vec<Expression>) -> Self {
        Expression::Logic {
            op: LogicOp::And,
            conditions,
        }
    }
    pub fn or(conditions: Vec<Expression>) -> Self {
        Expression::Logic {
            op: LogicOp::Or,
            conditions,
        }
    }
    pub fn exists(select: SelectClause) -> Self {
        Expression::Exists(select.into())
    }
    pub fn select(select: SelectClause) -> Self {
        Expression::Select(select.into())
    }
    pub fn full_text(
        entity: &'static EntityDef,
        index: &'static str,
        query: impl Into<String>,
    ) -> Self {
        Expression::FullText(FullTextMatch {
            entity,
            index,
            query: query.into(),
        })
    }

    pub fn eq(self, rhs: impl Into<Expression>) -> Self {
        Self::binary(self, BinaryOp::Equal, rhs.into())
    }
    pub fn ne(self, rhs: impl Into<Expression>) -> Self {
        Self::binary(self, BinaryOp::NotEqual, rhs.into())
    }
    pub fn lt(self, rhs: impl Into<Expression>) -> Self {
        Self::binary(self, BinaryOp::Less, rhs.into())
    }
    pub fn le(self, rhs: impl Into<Expression>) -> Self {
        Self::binary(self, BinaryOp::LessEqual, rhs.into())
    }
    pub fn gt(self, rhs: impl Into<Expression>) -> Self {
        Self::binary(self, BinaryOp::Greater, rhs.into())
    }
    pub fn ge(self, rhs: impl Into<Expression>) -> Self {
        Self::binary(self, BinaryOp::GreaterEqual, rhs.into())
    }
    pub fn like(self, rhs: impl Into<Expression>) -> Self {
        Self::binary(self, BinaryOp::Like, rhs.into())
    }
    pub fn not(self) -> Self {
        Expression::Not(self.into())
    }
    pub fn is_null(self) -> Self {
        Expression::IsNull(self.into())
    }
    pub fn in_values<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        Expression::In {
            column: self.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Append every entity referenced by this expression, subqueries
    /// included, in order of appearance and without repetitions.
    pub fn collect_entities(&self, out: &mut Vec<&'static EntityDef>) {
        match self {
            Expression::Column(c) => push_entity(out, c.entity),
            Expression::Value(..) | Expression::Literal(..) => {}
            Expression::Function { arguments, .. } => {
                arguments.iter().for_each(|a| a.collect_entities(out))
            }
            Expression::Binary { lhs, rhs, .. } => {
                lhs.collect_entities(out);
                rhs.collect_entities(out);
            }
            Expression::Logic { conditions, .. } => {
                conditions.iter().for_each(|c| c.collect_entities(out))
            }
            Expression::Not(e) | Expression::IsNull(e) => e.collect_entities(out),
            Expression::In { column, .. } => column.collect_entities(out),
            Expression::Exists(select) | Expression::Select(select) => {
                select.collect_entities(out)
            }
            Expression::FullText(m) => push_entity(out, m.entity),
        }
    }
}

/// Add `entity` (and the tables it reads from) unless already present.
pub(crate) fn push_entity(out: &mut Vec<&'static EntityDef>, entity: &'static EntityDef) {
    if out.contains(&entity) {
        return;
    }
    out.push(entity);
    if let Some(shadow) = entity.computed.and_then(|c| c.shadow_of) {
        push_entity(out, shadow);
    }
    for shadow in entity
        .fields
        .iter()
        .filter_map(|f| f.computed.and_then(|c| c.shadow_of))
    {
        push_entity(out, shadow);
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Value(value)
    }
}

impl From<ColumnExp> for Expression {
    fn from(value: ColumnExp) -> Self {
        Expression::Column(value)
    }
}

macro_rules! impl_expression_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Expression {
                fn from(value: $source) -> Self {
                    Expression::Value(value.into())
                }
            }
        )+
    };
}

impl_expression_from!(bool, i8, i16, i32, i64, f32, f64, String, &str);
