use crate::{
    DeleteClause, DepotTypes, Driver, Expression, FieldSource, InsertClause, Key, KeySet, MultiKey,
    Query, Result, Scope, SelectClause, Statement, UpdateClause, Value, WhereClause,
    error::configuration_error,
};
use std::mem;

/// Walks a statement in the order the build pass renders it and collects
/// the value of every placeholder.
///
/// Each method mirrors the `SqlWriter` method of the same node, the two
/// share the [`Scope`] deciding how fields resolve.
pub struct Binder<'a> {
    types: &'a DepotTypes,
    scope: Scope<'a>,
    values: Vec<Value>,
}

impl<'a> Binder<'a> {
    pub fn new(types: &'a DepotTypes) -> Self {
        Self {
            types,
            scope: Scope::default(),
            values: Vec::new(),
        }
    }

    /// Run `f` with overrides switched to `enabled`, restoring them after.
    fn with_overrides<R>(&mut self, enabled: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = mem::replace(&mut self.scope.enable_overrides, enabled);
        let result = f(self);
        self.scope.enable_overrides = saved;
        result
    }

    /// Values in placeholder order.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn bind_statement(&mut self, statement: &'a Statement) -> Result<()> {
        match statement {
            Statement::Select(v) => self.bind_select(v),
            Statement::Insert(v) => {
                self.bind_insert(v);
                Ok(())
            }
            Statement::Update(v) => self.bind_update(v),
            Statement::Delete(v) => self.bind_delete(v),
        }
    }

    fn bind_rhs_column(&mut self, entity: &'static crate::EntityDef, field: &str) -> Result<()> {
        if let FieldSource::Definition(expression) = self.scope.resolve(entity, field)? {
            self.with_overrides(false, |binder| binder.bind_expression(expression))?;
        }
        Ok(())
    }

    pub fn bind_expression(&mut self, value: &'a Expression) -> Result<()> {
        match value {
            Expression::Column(v) => self.bind_rhs_column(v.entity, v.field)?,
            Expression::Value(v) => self.values.push(v.clone()),
            Expression::Literal(..) => {}
            Expression::Function { arguments, .. } => {
                for argument in arguments {
                    self.bind_expression(argument)?;
                }
            }
            Expression::Binary { lhs, rhs, .. } => {
                self.bind_expression(lhs)?;
                self.bind_expression(rhs)?;
            }
            Expression::Logic { conditions, .. } => {
                for condition in conditions {
                    self.bind_expression(condition)?;
                }
            }
            Expression::Not(v) | Expression::IsNull(v) => self.bind_expression(v)?,
            Expression::In { column, values } => {
                self.types.check_in_size(values.len())?;
                if !values.is_empty() {
                    self.bind_expression(column)?;
                    self.values.extend(values.iter().cloned());
                }
            }
            Expression::Exists(v) | Expression::Select(v) => self.bind_select(v)?,
            Expression::FullText(v) => self.values.push(Value::Varchar(Some(v.query.clone()))),
        }
        Ok(())
    }

    fn bind_where(&mut self, value: &'a WhereClause) -> Result<()> {
        match value {
            WhereClause::Condition(v) => self.bind_expression(v),
            WhereClause::Key(v) => self.bind_key(v),
            WhereClause::MultiKey(v) => self.bind_multi_key(v),
            WhereClause::KeySet(v) => self.bind_key_set(v),
        }
    }

    /// Null key values render `IS NULL` and bind nothing.
    fn bind_key(&mut self, value: &'a Key) -> Result<()> {
        self.with_overrides(true, |binder| {
            for (field, v) in value.fields() {
                binder.bind_rhs_column(value.entity(), field.name)?;
                if !v.is_null() {
                    binder.values.push(v.clone());
                }
            }
            Ok(())
        })
    }

    fn bind_multi_key(&mut self, value: &'a MultiKey) -> Result<()> {
        self.types.check_in_size(value.multi_values().len())?;
        if value.multi_values().is_empty() {
            return Ok(());
        }
        self.with_overrides(true, |binder| {
            for (field, v) in value.singles() {
                binder.bind_rhs_column(value.entity(), field.name)?;
                if !v.is_null() {
                    binder.values.push(v.clone());
                }
            }
            binder.bind_rhs_column(value.entity(), value.multi_field().name)?;
            binder.values.extend(value.multi_values().iter().cloned());
            Ok(())
        })
    }

    fn bind_key_set(&mut self, value: &'a KeySet) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        let entity = value.entity();
        let mut key_fields = entity.primary_key_fields();
        match (key_fields.next(), key_fields.next()) {
            (Some(field), None) => {
                self.types.check_in_size(value.len())?;
                self.bind_rhs_column(entity, field.name)?;
                self.values
                    .extend(value.keys().iter().map(|k| k.values()[0].clone()));
            }
            _ => {
                for key in value.keys() {
                    self.bind_key(key)?;
                }
            }
        }
        Ok(())
    }

    fn bind_select(&mut self, value: &'a SelectClause) -> Result<()> {
        self.scope.push(value.entity, &value.definitions)?;
        let result = self.bind_select_body(value);
        self.scope.pop();
        result
    }

    fn bind_select_body(&mut self, value: &'a SelectClause) -> Result<()> {
        self.with_overrides(true, |binder| {
            value
                .fields
                .iter()
                .try_for_each(|field| binder.bind_rhs_column(value.entity, field))
        })?;
        for join in &value.joins {
            self.bind_expression(&join.condition)?;
        }
        if let Some(where_clause) = &value.where_clause {
            self.bind_where(where_clause)?;
        }
        if let Some(group_by) = &value.group_by {
            for v in &group_by.values {
                self.bind_expression(v)?;
            }
        }
        if let Some(order_by) = &value.order_by {
            for (v, _) in &order_by.values {
                self.bind_expression(v)?;
            }
        }
        if let Some(limit) = &value.limit {
            self.values.push(Value::Int64(Some(limit.count as i64)));
            self.values.push(Value::Int64(Some(limit.offset as i64)));
        }
        Ok(())
    }

    fn bind_insert(&mut self, value: &'a InsertClause) {
        self.values.extend(
            value
                .values
                .iter()
                .filter(|(field, _)| !value.is_identity(field.name))
                .map(|(_, v)| v.clone()),
        );
    }

    fn bind_update(&mut self, value: &'a UpdateClause) -> Result<()> {
        for (_, expression) in &value.assignments {
            self.bind_expression(expression)?;
        }
        if let Some(where_clause) = &value.where_clause {
            self.bind_where(where_clause)?;
        }
        Ok(())
    }

    fn bind_delete(&mut self, value: &'a DeleteClause) -> Result<()> {
        self.bind_where(&value.where_clause)
    }
}

/// Collect the values of `statement` and check them against the number of
/// placeholders the build pass wrote.
pub fn collect_bindings(
    types: &DepotTypes,
    statement: &Statement,
    placeholders: u32,
) -> Result<Vec<Value>> {
    let mut binder = Binder::new(types);
    binder.bind_statement(statement)?;
    let values = binder.into_values();
    if values.len() != placeholders as usize {
        return Err(configuration_error(format!(
            "Bound {} values for {} placeholders on {}",
            values.len(),
            placeholders,
            statement.entity().name
        )));
    }
    Ok(values)
}

/// Bind `values` into the prepared `query` at positions 1, 2, ...
pub fn bind_values<D: Driver>(query: &mut Query<D>, values: Vec<Value>) -> Result<()> {
    for (i, value) in values.into_iter().enumerate() {
        query.bind_index(value, i as u64 + 1)?;
    }
    Ok(())
}
