use crate::{
    Entity, EntityDef, Expression, FieldDef, Key, KeySet, MultiKey, Result, Value,
    error::configuration_error, expression::push_entity,
};
use std::mem;

/// Restricts the rows a statement touches.
#[derive(Debug, Clone)]
pub enum WhereClause {
    Condition(Expression),
    Key(Key),
    MultiKey(MultiKey),
    KeySet(KeySet),
}

impl WhereClause {
    pub fn collect_entities(&self, out: &mut Vec<&'static EntityDef>) {
        match self {
            WhereClause::Condition(e) => e.collect_entities(out),
            WhereClause::Key(k) => push_entity(out, k.entity()),
            WhereClause::MultiKey(k) => push_entity(out, k.entity()),
            WhereClause::KeySet(k) => push_entity(out, k.entity()),
        }
    }
}

impl From<Expression> for WhereClause {
    fn from(value: Expression) -> Self {
        WhereClause::Condition(value)
    }
}

impl From<Key> for WhereClause {
    fn from(value: Key) -> Self {
        WhereClause::Key(value)
    }
}

impl From<MultiKey> for WhereClause {
    fn from(value: MultiKey) -> Self {
        WhereClause::MultiKey(value)
    }
}

impl From<KeySet> for WhereClause {
    fn from(value: KeySet) -> Self {
        WhereClause::KeySet(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub join_type: JoinType,
    pub entity: &'static EntityDef,
    pub condition: Expression,
}

impl Join {
    pub fn new(entity: &'static EntityDef, condition: Expression) -> Self {
        Self {
            join_type: JoinType::Inner,
            entity,
            condition,
        }
    }
    pub fn left_outer(mut self) -> Self {
        self.join_type = JoinType::LeftOuter;
        self
    }
    pub fn right_outer(mut self) -> Self {
        self.join_type = JoinType::RightOuter;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct OrderBy {
    pub values: Vec<(Expression, Order)>,
}

impl OrderBy {
    pub fn ascending(expression: Expression) -> Self {
        Self {
            values: vec![(expression, Order::Asc)],
        }
    }
    pub fn descending(expression: Expression) -> Self {
        Self {
            values: vec![(expression, Order::Desc)],
        }
    }
    pub fn then(mut self, expression: Expression, order: Order) -> Self {
        self.values.push((expression, order));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupBy {
    pub values: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: u32,
    pub count: u32,
}

impl Limit {
    pub fn new(offset: u32, count: u32) -> Self {
        Self { offset, count }
    }
}

/// Replaces the tables a select reads from.
#[derive(Debug, Clone)]
pub struct FromOverride {
    pub entities: Vec<&'static EntityDef>,
}

/// Supplies the expression a field is selected from.
///
/// As a [`Clause::FieldOverride`] it replaces a concrete column, as a
/// [`Clause::FieldDefinition`] it defines a computed field.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub field: &'static str,
    pub expression: Expression,
}

/// A query clause.
#[derive(Debug, Clone)]
pub enum Clause {
    Where(WhereClause),
    Join(Join),
    OrderBy(OrderBy),
    GroupBy(GroupBy),
    Limit(Limit),
    ForUpdate,
    FromOverride(FromOverride),
    FieldOverride(FieldDefinition),
    FieldDefinition(FieldDefinition),
}

impl Clause {
    pub fn where_(condition: impl Into<WhereClause>) -> Self {
        Clause::Where(condition.into())
    }
    pub fn field_override(field: &'static str, expression: Expression) -> Self {
        Clause::FieldOverride(FieldDefinition { field, expression })
    }
    pub fn field_definition(field: &'static str, expression: Expression) -> Self {
        Clause::FieldDefinition(FieldDefinition { field, expression })
    }
    pub fn from_override(entities: impl IntoIterator<Item = &'static EntityDef>) -> Self {
        Clause::FromOverride(FromOverride {
            entities: entities.into_iter().collect(),
        })
    }
}

/// A field assigned its value by a [`FieldDefinition`] clause.
#[derive(Debug, Clone)]
pub struct Definition {
    pub field: &'static str,
    pub expression: Expression,
    /// Set for a `FieldOverride`, unset for a `FieldDefinition`.
    pub is_override: bool,
}

/// A `SELECT` over an entity.
#[derive(Debug, Clone)]
pub struct SelectClause {
    pub entity: &'static EntityDef,
    pub fields: Vec<&'static str>,
    pub where_clause: Option<WhereClause>,
    pub joins: Vec<Join>,
    pub order_by: Option<OrderBy>,
    pub group_by: Option<GroupBy>,
    pub limit: Option<Limit>,
    pub for_update: bool,
    pub from_override: Option<FromOverride>,
    pub definitions: Vec<Definition>,
}

impl SelectClause {
    /// Select every field of `entity`.
    pub fn new(entity: &'static EntityDef, clauses: impl IntoIterator<Item = Clause>) -> Result<Self> {
        Self::with_fields(entity, entity.fields.iter().map(|f| f.name), clauses)
    }

    pub fn with_fields(
        entity: &'static EntityDef,
        fields: impl IntoIterator<Item = &'static str>,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> Result<Self> {
        let mut result = Self {
            entity,
            fields: fields.into_iter().collect(),
            where_clause: None,
            joins: Vec::new(),
            order_by: None,
            group_by: None,
            limit: None,
            for_update: false,
            from_override: None,
            definitions: Vec::new(),
        };
        for field in &result.fields {
            entity.field(field)?;
        }
        fn set_once<T>(slot: &mut Option<T>, value: T, kind: &str) -> Result<()> {
            if slot.replace(value).is_some() {
                return Err(configuration_error(format!(
                    "Query can't contain more than one {} clause",
                    kind
                )));
            }
            Ok(())
        }
        for clause in clauses {
            match clause {
                Clause::Where(v) => set_once(&mut result.where_clause, v, "Where")?,
                Clause::Join(v) => result.joins.push(v),
                Clause::OrderBy(v) => set_once(&mut result.order_by, v, "OrderBy")?,
                Clause::GroupBy(v) => set_once(&mut result.group_by, v, "GroupBy")?,
                Clause::Limit(v) => set_once(&mut result.limit, v, "Limit")?,
                Clause::ForUpdate => {
                    if mem::replace(&mut result.for_update, true) {
                        return Err(configuration_error(
                            "Query can't contain more than one ForUpdate clause",
                        ));
                    }
                }
                Clause::FromOverride(v) => {
                    set_once(&mut result.from_override, v, "FromOverride")?
                }
                Clause::FieldOverride(v) | Clause::FieldDefinition(v)
                    if result.definitions.iter().any(|d| d.field == v.field) =>
                {
                    return Err(configuration_error(format!(
                        "Field {} is defined more than once",
                        v.field
                    )));
                }
                Clause::FieldOverride(v) => result.definitions.push(Definition {
                    field: v.field,
                    expression: v.expression,
                    is_override: true,
                }),
                Clause::FieldDefinition(v) => result.definitions.push(Definition {
                    field: v.field,
                    expression: v.expression,
                    is_override: false,
                }),
            }
        }
        Ok(result)
    }

    pub fn definition(&self, field: &str) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.field == field)
    }

    pub fn collect_entities(&self, out: &mut Vec<&'static EntityDef>) {
        push_entity(out, self.entity);
        for d in &self.definitions {
            d.expression.collect_entities(out);
        }
        if let Some(from) = &self.from_override {
            from.entities.iter().for_each(|e| push_entity(out, *e));
        }
        for join in &self.joins {
            push_entity(out, join.entity);
            join.condition.collect_entities(out);
        }
        if let Some(w) = &self.where_clause {
            w.collect_entities(out);
        }
        if let Some(group_by) = &self.group_by {
            group_by.values.iter().for_each(|e| e.collect_entities(out));
        }
        if let Some(order_by) = &self.order_by {
            order_by
                .values
                .iter()
                .for_each(|(e, _)| e.collect_entities(out));
        }
    }
}

fn ensure_table(entity: &'static EntityDef, statement: &str) -> Result<()> {
    if entity.has_table() {
        Ok(())
    } else {
        Err(configuration_error(format!(
            "Can't {} computed entity {}",
            statement, entity.name
        )))
    }
}

/// An `INSERT` of one record.
#[derive(Debug, Clone)]
pub struct InsertClause {
    pub entity: &'static EntityDef,
    pub values: Vec<(&'static FieldDef, Value)>,
    /// Columns left to the database, rendered as `DEFAULT`.
    pub identity_fields: Vec<&'static str>,
}

impl InsertClause {
    pub fn new<E: Entity>(record: &E) -> Result<Self> {
        let entity = E::entity_def();
        ensure_table(entity, "insert into")?;
        let values = record.column_values()?;
        let identity_fields = values
            .iter()
            .filter(|(f, v)| f.is_identity() && f.is_unset(v))
            .map(|(f, _)| f.name)
            .collect();
        Ok(Self {
            entity,
            values,
            identity_fields,
        })
    }

    pub fn is_identity(&self, field: &str) -> bool {
        self.identity_fields.iter().any(|f| *f == field)
    }
}

/// An `UPDATE`, it always requires a where clause to be rendered.
#[derive(Debug, Clone)]
pub struct UpdateClause {
    pub entity: &'static EntityDef,
    pub where_clause: Option<WhereClause>,
    pub assignments: Vec<(&'static FieldDef, Expression)>,
}

impl UpdateClause {
    pub fn new<N: AsRef<str>>(
        entity: &'static EntityDef,
        where_clause: Option<WhereClause>,
        assignments: impl IntoIterator<Item = (N, Expression)>,
    ) -> Result<Self> {
        ensure_table(entity, "update")?;
        let assignments = assignments
            .into_iter()
            .map(|(n, e)| {
                let field = entity.field(n.as_ref())?;
                if !field.is_column() {
                    return Err(configuration_error(format!(
                        "Can't update computed field {} of {}",
                        field.name, entity.name
                    )));
                }
                Ok((field, e))
            })
            .collect::<Result<Vec<_>>>()?;
        if assignments.is_empty() {
            return Err(configuration_error(format!(
                "Update of {} does not assign any field",
                entity.name
            )));
        }
        Ok(Self {
            entity,
            where_clause,
            assignments,
        })
    }

    /// Assign `fields` their current values in `record`.
    pub fn with_record<E: Entity, N: AsRef<str>>(
        where_clause: Option<WhereClause>,
        record: &E,
        fields: impl IntoIterator<Item = N>,
    ) -> Result<Self> {
        let assignments = fields
            .into_iter()
            .map(|n| {
                let value = record.get_field(n.as_ref())?;
                Ok((n, Expression::Value(value)))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(E::entity_def(), where_clause, assignments)
    }

    pub fn collect_entities(&self, out: &mut Vec<&'static EntityDef>) {
        push_entity(out, self.entity);
        for (_, e) in &self.assignments {
            e.collect_entities(out);
        }
        if let Some(w) = &self.where_clause {
            w.collect_entities(out);
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteClause {
    pub entity: &'static EntityDef,
    pub where_clause: WhereClause,
}

impl DeleteClause {
    pub fn new(entity: &'static EntityDef, where_clause: impl Into<WhereClause>) -> Result<Self> {
        ensure_table(entity, "delete from")?;
        Ok(Self {
            entity,
            where_clause: where_clause.into(),
        })
    }
}

/// A complete statement the build and bind passes run over.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectClause),
    Insert(InsertClause),
    Update(UpdateClause),
    Delete(DeleteClause),
}

impl Statement {
    pub fn entity(&self) -> &'static EntityDef {
        match self {
            Statement::Select(v) => v.entity,
            Statement::Insert(v) => v.entity,
            Statement::Update(v) => v.entity,
            Statement::Delete(v) => v.entity,
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Statement::Select(s) if !s.for_update)
    }

    /// Entities referenced by the statement, main entity first.
    pub fn entities(&self) -> Vec<&'static EntityDef> {
        let mut result = Vec::new();
        match self {
            Statement::Select(v) => v.collect_entities(&mut result),
            Statement::Insert(v) => push_entity(&mut result, v.entity),
            Statement::Update(v) => v.collect_entities(&mut result),
            Statement::Delete(v) => {
                push_entity(&mut result, v.entity);
                v.where_clause.collect_entities(&mut result);
            }
        }
        result
    }
}

impl From<SelectClause> for Statement {
    fn from(value: SelectClause) -> Self {
        Statement::Select(value)
    }
}

impl From<InsertClause> for Statement {
    fn from(value: InsertClause) -> Self {
        Statement::Insert(value)
    }
}

impl From<UpdateClause> for Statement {
    fn from(value: UpdateClause) -> Self {
        Statement::Update(value)
    }
}

impl From<DeleteClause> for Statement {
    fn from(value: DeleteClause) -> Self {
        Statement::Delete(value)
    }
}
