use crate::MockProvider;
use depot_core::{Error, QueryResult, Result, RowLabeled, RowsAffected, TableMeta, Value};
use parking_lot::Mutex;
use std::{
    cmp::Ordering,
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use thiserror::Error as ThisError;

/// Failures the mock database can be told to raise.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum MockError {
    #[error("Lost connection to the mock database: {0}")]
    Transient(String),
    #[error("Duplicate entry '{0}'")]
    Duplicate(String),
    #[error("Mock database failure: {0}")]
    Other(String),
}

/// A statement received by the mock database.
#[derive(Debug, Clone, PartialEq)]
pub struct MockStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Default, Clone)]
struct MockTable {
    columns: Vec<String>,
    indexes: Vec<String>,
    primary_key: Vec<String>,
    /// Column sets whose non null values must be distinct.
    unique: Vec<Vec<String>>,
    /// Values by lower case column name.
    rows: Vec<HashMap<String, Value>>,
}

impl MockTable {
    fn position(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }
}

#[derive(Default)]
struct MockState {
    tables: HashMap<String, MockTable>,
    log: Vec<MockStatement>,
    scripted_rows: Vec<(String, Vec<RowLabeled>)>,
    scripted_affected: Vec<(String, u64)>,
    scripted_once: VecDeque<(String, u64)>,
    failures: VecDeque<(String, MockError)>,
    last_id: i64,
    acquired: usize,
    released: usize,
    failed: usize,
}

/// In memory database understanding the SQL the generic writer produces.
///
/// Tables, columns, indexes and primary keys are tracked from the DDL it
/// receives. Inserts, key lookups, updates and deletes whose conditions are
/// plain `column = ?` comparisons run against the stored rows, inserting a
/// duplicate primary key fails like a real database would. Anything more
/// elaborate answers with the scripted responses, or with nothing.
#[derive(Clone, Default)]
pub struct MockDatabase {
    state: Arc<Mutex<MockState>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(&self) -> MockProvider {
        MockProvider::new(self.clone())
    }

    /// Every statement received so far.
    pub fn statements(&self) -> Vec<MockStatement> {
        self.state.lock().log.clone()
    }

    /// The SQL of every statement received so far.
    pub fn sql_log(&self) -> Vec<String> {
        self.state.lock().log.iter().map(|s| s.sql.clone()).collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    /// Answer statements containing `pattern` with `rows`.
    pub fn respond(&self, pattern: impl Into<String>, rows: Vec<RowLabeled>) {
        self.state.lock().scripted_rows.push((pattern.into(), rows));
    }

    /// Report `rows_affected` for statements containing `pattern`.
    pub fn respond_affected(&self, pattern: impl Into<String>, rows_affected: u64) {
        self.state
            .lock()
            .scripted_affected
            .push((pattern.into(), rows_affected));
    }

    /// Report `rows_affected` for the next statement containing `pattern`
    /// only, without running it.
    pub fn respond_affected_once(&self, pattern: impl Into<String>, rows_affected: u64) {
        self.state
            .lock()
            .scripted_once
            .push_back((pattern.into(), rows_affected));
    }

    /// Fail the next statement containing `pattern`.
    pub fn fail_next(&self, pattern: impl Into<String>, error: MockError) {
        self.state.lock().failures.push_back((pattern.into(), error));
    }

    pub fn table_metadata(&self, table: &str) -> Option<TableMeta> {
        let state = self.state.lock();
        let table = state.tables.get(&table.to_lowercase())?;
        Some(TableMeta {
            columns: table.columns.clone(),
            indexes: table.indexes.clone(),
            has_primary_key: !table.primary_key.is_empty(),
        })
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state.lock().tables.contains_key(&table.to_lowercase())
    }

    /// The rows stored in `table`, labeled with its columns.
    pub fn rows(&self, table: &str) -> Vec<RowLabeled> {
        let state = self.state.lock();
        let Some(table) = state.tables.get(&table.to_lowercase()) else {
            return Vec::new();
        };
        let labels: Arc<[String]> = table.columns.clone().into();
        table
            .rows
            .iter()
            .map(|row| {
                let values = table
                    .columns
                    .iter()
                    .map(|c| row.get(&c.to_lowercase()).cloned().unwrap_or_default())
                    .collect();
                RowLabeled::new(labels.clone(), values)
            })
            .collect()
    }

    /// Connections handed out by the provider.
    pub fn acquired(&self) -> usize {
        self.state.lock().acquired
    }

    /// Connections returned healthy.
    pub fn released(&self) -> usize {
        self.state.lock().released
    }

    /// Connections returned after a failure.
    pub fn failed(&self) -> usize {
        self.state.lock().failed
    }

    pub(crate) fn connection_acquired(&self) {
        self.state.lock().acquired += 1;
    }

    pub(crate) fn connection_released(&self) {
        self.state.lock().released += 1;
    }

    pub(crate) fn connection_failed(&self) {
        self.state.lock().failed += 1;
    }

    /// Run one statement, `values` fill its placeholders in order.
    pub fn execute(&self, sql: &str, values: Vec<Value>) -> Result<Vec<QueryResult>> {
        let mut state = self.state.lock();
        state.log.push(MockStatement {
            sql: sql.to_owned(),
            values: values.clone(),
        });
        if let Some(i) = state.failures.iter().position(|(p, _)| sql.contains(p.as_str())) {
            if let Some((_, error)) = state.failures.remove(i) {
                return Err(Error::new(error));
            }
        }
        if let Some(i) = state
            .scripted_once
            .iter()
            .position(|(p, _)| sql.contains(p.as_str()))
        {
            if let Some((_, rows_affected)) = state.scripted_once.remove(i) {
                return Ok(vec![RowsAffected::new(rows_affected).into()]);
            }
        }
        if let Some((_, rows)) = state
            .scripted_rows
            .iter()
            .find(|(p, _)| sql.contains(p.as_str()))
        {
            return Ok(rows.iter().cloned().map(QueryResult::Row).collect());
        }
        if let Some((_, rows_affected)) = state
            .scripted_affected
            .iter()
            .find(|(p, _)| sql.contains(p.as_str()))
        {
            return Ok(vec![RowsAffected::new(*rows_affected).into()]);
        }
        let tokens = tokenize(sql);
        match parse(&tokens) {
            Some(statement) => state.run(statement, values),
            None => {
                log::debug!("Mock database does not interpret: {}", sql);
                Ok(Vec::new())
            }
        }
    }
}

impl MockState {
    fn table(&mut self, name: &str) -> Result<&mut MockTable> {
        self.tables.get_mut(&name.to_lowercase()).ok_or_else(|| {
            Error::new(MockError::Other(format!("Table '{}' doesn't exist", name)))
        })
    }

    fn run(&mut self, statement: Parsed, values: Vec<Value>) -> Result<Vec<QueryResult>> {
        let mut values = values.into_iter();
        let affected = |n: usize| Ok(vec![RowsAffected::new(n as u64).into()]);
        match statement {
            Parsed::CreateTable {
                table,
                columns,
                primary_key,
                unique,
            } => {
                let key = table.to_lowercase();
                if self.tables.contains_key(&key) {
                    return Err(Error::new(MockError::Other(format!(
                        "Table '{}' already exists",
                        table
                    ))));
                }
                self.tables.insert(
                    key,
                    MockTable {
                        columns,
                        primary_key,
                        unique,
                        ..Default::default()
                    },
                );
                affected(0)
            }
            Parsed::CreateIndex {
                table,
                name,
                columns,
            } => {
                let table = self.table(&table)?;
                table.indexes.push(name);
                table.unique.extend(columns);
                affected(0)
            }
            Parsed::AddColumn { table, column } => {
                let table = self.table(&table)?;
                if table.position(&column).is_some() {
                    return Err(Error::new(MockError::Other(format!(
                        "Duplicate column name '{}'",
                        column
                    ))));
                }
                table.columns.push(column);
                affected(0)
            }
            Parsed::DropColumn { table, column } => {
                let table = self.table(&table)?;
                let Some(i) = table.position(&column) else {
                    return Err(Error::new(MockError::Other(format!(
                        "Can't drop '{}', check that it exists",
                        column
                    ))));
                };
                table.columns.remove(i);
                let key = column.to_lowercase();
                table.rows.iter_mut().for_each(|r| {
                    r.remove(&key);
                });
                affected(0)
            }
            Parsed::RenameColumn { table, old, new } => {
                let table = self.table(&table)?;
                let Some(i) = table.position(&old) else {
                    return Err(Error::new(MockError::Other(format!(
                        "Unknown column '{}'",
                        old
                    ))));
                };
                let (old, new_key) = (old.to_lowercase(), new.to_lowercase());
                table.columns[i] = new;
                for row in &mut table.rows {
                    if let Some(v) = row.remove(&old) {
                        row.insert(new_key.clone(), v);
                    }
                }
                affected(0)
            }
            Parsed::AddPrimaryKey { table, columns } => {
                self.table(&table)?.primary_key = columns;
                affected(0)
            }
            Parsed::DropPrimaryKey { table } => {
                self.table(&table)?.primary_key.clear();
                affected(0)
            }
            Parsed::AlterColumn { table } => {
                self.table(&table)?;
                affected(0)
            }
            Parsed::Insert {
                table,
                columns,
                values: items,
            } => {
                let mut generated = None;
                let mut row = HashMap::new();
                for (column, item) in columns.iter().zip(items) {
                    let value = match item {
                        InsertValue::Placeholder => values.next().unwrap_or_default(),
                        InsertValue::Default => {
                            self.last_id += 1;
                            generated = Some(self.last_id);
                            Value::Int64(Some(self.last_id))
                        }
                        InsertValue::Other => Value::Null,
                    };
                    row.insert(column.to_lowercase(), value);
                }
                let table = self.table(&table)?;
                let constraints = (!table.primary_key.is_empty())
                    .then_some(&table.primary_key)
                    .into_iter()
                    .chain(&table.unique);
                for columns in constraints {
                    let key: Vec<Value> = columns
                        .iter()
                        .map(|c| row.get(&c.to_lowercase()).cloned().unwrap_or_default())
                        .collect();
                    if key.iter().any(Value::is_null) {
                        continue;
                    }
                    let duplicate = table.rows.iter().any(|r| {
                        columns.iter().zip(&key).all(|(c, v)| {
                            same_value(r.get(&c.to_lowercase()).unwrap_or(&Value::Null), v)
                        })
                    });
                    if duplicate {
                        let key = key.iter().map(ToString::to_string).collect::<Vec<_>>();
                        return Err(Error::new(MockError::Duplicate(key.join("-"))));
                    }
                }
                table.rows.push(row);
                Ok(vec![
                    RowsAffected {
                        rows_affected: 1,
                        last_affected_id: generated,
                    }
                    .into(),
                ])
            }
            Parsed::Select {
                table,
                columns,
                conditions,
                limit,
            } => {
                let conditions = bind_conditions(conditions, &mut values);
                let (count, offset) = if limit {
                    let mut next = || values.next().as_ref().and_then(Value::as_i64);
                    let count = next().unwrap_or(i64::MAX) as usize;
                    (count, next().unwrap_or_default() as usize)
                } else {
                    (usize::MAX, 0)
                };
                let table = self.table(&table)?;
                let labels: Arc<[String]> = columns.clone().into();
                Ok(table
                    .rows
                    .iter()
                    .filter(|r| matches_conditions(r, &conditions))
                    .skip(offset)
                    .take(count)
                    .map(|r| {
                        let values = columns
                            .iter()
                            .map(|c| r.get(&c.to_lowercase()).cloned().unwrap_or_default())
                            .collect();
                        RowLabeled::new(labels.clone(), values).into()
                    })
                    .collect())
            }
            Parsed::Update {
                table,
                assignments,
                conditions,
            } => {
                let assignments: Vec<(String, Option<Value>)> = assignments
                    .into_iter()
                    .map(|(c, placeholder)| {
                        let value = placeholder.then(|| values.next().unwrap_or_default());
                        (c.to_lowercase(), value)
                    })
                    .collect();
                let conditions = bind_conditions(conditions, &mut values);
                let table = self.table(&table)?;
                let mut count = 0;
                for row in table
                    .rows
                    .iter_mut()
                    .filter(|r| matches_conditions(r, &conditions))
                {
                    count += 1;
                    for (column, value) in &assignments {
                        if let Some(value) = value {
                            row.insert(column.clone(), value.clone());
                        }
                    }
                }
                affected(count)
            }
            Parsed::Delete { table, conditions } => {
                let conditions = bind_conditions(conditions, &mut values);
                let table = self.table(&table)?;
                let before = table.rows.len();
                table.rows.retain(|r| !matches_conditions(r, &conditions));
                affected(before - table.rows.len())
            }
        }
    }
}

/// Integers compare by value whatever their width.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Varchar(Some(a)), Value::Varchar(Some(b))) => Some(a.cmp(b)),
        _ => Some(a.as_i64()?.cmp(&b.as_i64()?)),
    }
}

struct BoundCondition {
    column: String,
    comparison: Comparison,
    values: Vec<Value>,
}

fn bind_conditions(
    conditions: Vec<Condition>,
    values: &mut impl Iterator<Item = Value>,
) -> Vec<BoundCondition> {
    conditions
        .into_iter()
        .map(|c| BoundCondition {
            column: c.column.to_lowercase(),
            comparison: c.comparison,
            values: values.by_ref().take(c.values).collect(),
        })
        .collect()
}

fn matches_conditions(row: &HashMap<String, Value>, conditions: &[BoundCondition]) -> bool {
    conditions.iter().all(|c| {
        let actual = row.get(&c.column).unwrap_or(&Value::Null);
        if let Comparison::Null = c.comparison {
            return actual.is_null();
        }
        if actual.is_null() {
            return false;
        }
        let Some(expected) = c.values.first() else {
            return false;
        };
        match c.comparison {
            Comparison::Any => c.values.iter().any(|v| same_value(actual, v)),
            Comparison::NotEqual => !same_value(actual, expected),
            Comparison::Ordered(accepted) => {
                compare(actual, expected).is_some_and(|o| accepted.contains(&o))
            }
            Comparison::Null => false,
        }
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Word(String),
    Placeholder,
    Symbol(char),
    Literal(String),
}

fn tokenize(sql: &str) -> Vec<Token> {
    let mut result = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '"' | '`' | '\'' => {
                let mut text = String::new();
                while let Some(v) = chars.next() {
                    if v == c {
                        if chars.peek() == Some(&c) {
                            chars.next();
                            text.push(c);
                        } else {
                            break;
                        }
                    } else {
                        text.push(v);
                    }
                }
                result.push(if c == '\'' {
                    Token::Literal(text)
                } else {
                    Token::Ident(text)
                });
            }
            '?' => result.push(Token::Placeholder),
            '$' if chars.peek().is_some_and(char::is_ascii_digit) => {
                while chars.peek().is_some_and(char::is_ascii_digit) {
                    chars.next();
                }
                result.push(Token::Placeholder);
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&v) = chars.peek() {
                    if !(v.is_alphanumeric() || v == '_') {
                        break;
                    }
                    word.push(v);
                    chars.next();
                }
                result.push(Token::Word(word));
            }
            c => result.push(Token::Symbol(c)),
        }
    }
    result
}

#[derive(Debug)]
enum InsertValue {
    Placeholder,
    Default,
    Other,
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    /// `= ?` or `IN (?, ...)`.
    Any,
    Null,
    NotEqual,
    /// Orderings accepted by `<`, `<=`, `>` or `>=`.
    Ordered(&'static [Ordering]),
}

/// A column compared to placeholders.
#[derive(Debug)]
struct Condition {
    column: String,
    comparison: Comparison,
    /// Placeholders consumed, zero for `IS NULL`.
    values: usize,
}

#[derive(Debug)]
enum Parsed {
    CreateTable {
        table: String,
        columns: Vec<String>,
        primary_key: Vec<String>,
        unique: Vec<Vec<String>>,
    },
    CreateIndex {
        table: String,
        name: String,
        /// Set for unique indexes.
        columns: Option<Vec<String>>,
    },
    AddColumn {
        table: String,
        column: String,
    },
    DropColumn {
        table: String,
        column: String,
    },
    RenameColumn {
        table: String,
        old: String,
        new: String,
    },
    AddPrimaryKey {
        table: String,
        columns: Vec<String>,
    },
    DropPrimaryKey {
        table: String,
    },
    AlterColumn {
        table: String,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<InsertValue>,
    },
    Select {
        table: String,
        columns: Vec<String>,
        conditions: Vec<Condition>,
        /// Followed by `LIMIT ? OFFSET ?`.
        limit: bool,
    },
    Update {
        table: String,
        /// Column and whether it is assigned a placeholder.
        assignments: Vec<(String, bool)>,
        conditions: Vec<Condition>,
    },
    Delete {
        table: String,
        conditions: Vec<Condition>,
    },
}

struct Parser<'t> {
    tokens: &'t [Token],
    position: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn is_done(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword) => {
                self.position += 1;
                true
            }
            _ => false,
        }
    }

    fn symbol(&mut self, symbol: char) -> bool {
        if self.peek() == Some(&Token::Symbol(symbol)) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> Option<String> {
        match self.advance()? {
            Token::Ident(v) | Token::Word(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// `column` or `table.column`, returning the column.
    fn column(&mut self) -> Option<String> {
        let mut column = self.identifier()?;
        while self.symbol('.') {
            column = self.identifier()?;
        }
        Some(column)
    }

    fn identifier_list(&mut self) -> Option<Vec<String>> {
        self.symbol('(').then_some(())?;
        let mut result = Vec::new();
        loop {
            result.push(self.identifier()?);
            if !self.symbol(',') {
                break;
            }
        }
        self.symbol(')').then_some(result)
    }

    /// Skip an expression up to a `,` or `)` at depth zero, or a keyword.
    fn skip_expression(&mut self, stop: &[&str]) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::Symbol('(') => depth += 1,
                Token::Symbol(')') if depth == 0 => return,
                Token::Symbol(')') => depth -= 1,
                Token::Symbol(',') if depth == 0 => return,
                Token::Word(w) if depth == 0 && stop.iter().any(|s| w.eq_ignore_ascii_case(s)) => {
                    return;
                }
                _ => {}
            }
            self.position += 1;
        }
    }

    fn table_declaration(&mut self) -> Option<String> {
        let table = self.identifier()?;
        if self.keyword("AS") {
            self.identifier()?;
        }
        Some(table)
    }

    fn placeholder(&mut self) -> bool {
        if self.peek() == Some(&Token::Placeholder) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Conjunctions of simple conditions, possibly parenthesized.
    fn conditions(&mut self) -> Option<Vec<Condition>> {
        let mut result = Vec::new();
        if !self.keyword("WHERE") {
            return Some(result);
        }
        loop {
            let mut depth = 0;
            while self.symbol('(') {
                depth += 1;
            }
            let column = self.column()?;
            let mut comparison = Comparison::Any;
            let values = if self.symbol('=') {
                self.placeholder().then_some(1)?
            } else if self.symbol('<') || self.symbol('>') {
                let less = self.tokens[self.position - 1] == Token::Symbol('<');
                let orderings: &'static [Ordering] = if self.symbol('>') {
                    comparison = Comparison::NotEqual;
                    &[]
                } else if self.symbol('=') {
                    if less {
                        &[Ordering::Less, Ordering::Equal]
                    } else {
                        &[Ordering::Greater, Ordering::Equal]
                    }
                } else if less {
                    &[Ordering::Less]
                } else {
                    &[Ordering::Greater]
                };
                if !orderings.is_empty() {
                    comparison = Comparison::Ordered(orderings);
                }
                self.placeholder().then_some(1)?
            } else if self.keyword("IN") {
                self.symbol('(').then_some(())?;
                let mut count = 0;
                loop {
                    self.placeholder().then_some(())?;
                    count += 1;
                    if !self.symbol(',') {
                        break;
                    }
                }
                self.symbol(')').then_some(count)?
            } else if self.keyword("IS") && self.keyword("NULL") {
                comparison = Comparison::Null;
                0
            } else {
                return None;
            };
            result.push(Condition {
                column,
                comparison,
                values,
            });
            for _ in 0..depth {
                self.symbol(')').then_some(())?;
            }
            if !self.keyword("AND") {
                return Some(result);
            }
        }
    }

    /// `LIMIT ? OFFSET ?`, returning whether it was there.
    fn limit(&mut self) -> Option<bool> {
        if !self.keyword("LIMIT") {
            return Some(false);
        }
        (self.placeholder() && self.keyword("OFFSET") && self.placeholder()).then_some(true)
    }

    fn create(&mut self) -> Option<Parsed> {
        if self.keyword("TABLE") {
            let table = self.identifier()?;
            self.symbol('(').then_some(())?;
            let mut columns = Vec::new();
            let mut primary_key = Vec::new();
            let mut unique = Vec::new();
            loop {
                if self.keyword("PRIMARY") {
                    self.keyword("KEY").then_some(())?;
                    primary_key = self.identifier_list()?;
                } else {
                    let column = self.identifier()?;
                    let start = self.position;
                    self.skip_expression(&[]);
                    let definition = &self.tokens[start..self.position];
                    if definition
                        .iter()
                        .any(|t| matches!(t, Token::Word(w) if w.eq_ignore_ascii_case("UNIQUE")))
                    {
                        unique.push(vec![column.clone()]);
                    }
                    columns.push(column);
                }
                if !self.symbol(',') {
                    break;
                }
            }
            return Some(Parsed::CreateTable {
                table,
                columns,
                primary_key,
                unique,
            });
        }
        let unique = self.keyword("UNIQUE");
        self.keyword("INDEX").then_some(())?;
        let name = self.identifier()?;
        self.keyword("ON").then_some(())?;
        let table = self.identifier()?;
        let columns = self.identifier_list()?;
        Some(Parsed::CreateIndex {
            table,
            name,
            columns: unique.then_some(columns),
        })
    }

    fn alter(&mut self) -> Option<Parsed> {
        self.keyword("TABLE").then_some(())?;
        let table = self.identifier()?;
        if self.keyword("ADD") {
            if self.keyword("PRIMARY") {
                self.keyword("KEY").then_some(())?;
                let columns = self.identifier_list()?;
                return Some(Parsed::AddPrimaryKey { table, columns });
            }
            self.keyword("COLUMN");
            let column = self.identifier()?;
            return Some(Parsed::AddColumn { table, column });
        }
        if self.keyword("DROP") {
            if self.keyword("PRIMARY") || self.keyword("CONSTRAINT") {
                return Some(Parsed::DropPrimaryKey { table });
            }
            self.keyword("COLUMN");
            let column = self.identifier()?;
            return Some(Parsed::DropColumn { table, column });
        }
        if self.keyword("RENAME") {
            self.keyword("COLUMN").then_some(())?;
            let old = self.identifier()?;
            self.keyword("TO").then_some(())?;
            let new = self.identifier()?;
            return Some(Parsed::RenameColumn { table, old, new });
        }
        if self.keyword("CHANGE") {
            let old = self.identifier()?;
            let new = self.identifier()?;
            if old.eq_ignore_ascii_case(&new) {
                return Some(Parsed::AlterColumn { table });
            }
            return Some(Parsed::RenameColumn { table, old, new });
        }
        Some(Parsed::AlterColumn { table })
    }

    fn insert(&mut self) -> Option<Parsed> {
        self.keyword("INTO").then_some(())?;
        let table = self.identifier()?;
        let columns = self.identifier_list()?;
        self.keyword("VALUES").then_some(())?;
        self.symbol('(').then_some(())?;
        let mut values = Vec::new();
        loop {
            if self.peek() == Some(&Token::Placeholder) {
                self.position += 1;
                values.push(InsertValue::Placeholder);
            } else if self.keyword("DEFAULT") {
                values.push(InsertValue::Default);
            } else {
                self.skip_expression(&[]);
                values.push(InsertValue::Other);
            }
            if !self.symbol(',') {
                break;
            }
        }
        (self.symbol(')') && columns.len() == values.len()).then_some(Parsed::Insert {
            table,
            columns,
            values,
        })
    }

    fn select(&mut self) -> Option<Parsed> {
        let mut columns = Vec::new();
        loop {
            let column = self.column()?;
            if self.keyword("AS") {
                self.identifier()?;
            }
            columns.push(column);
            if !self.symbol(',') {
                break;
            }
        }
        self.keyword("FROM").then_some(())?;
        let table = self.table_declaration()?;
        let conditions = self.conditions()?;
        let limit = self.limit()?;
        if self.keyword("FOR") {
            self.keyword("UPDATE").then_some(())?;
        }
        self.is_done().then_some(Parsed::Select {
            table,
            columns,
            conditions,
            limit,
        })
    }

    fn update(&mut self) -> Option<Parsed> {
        let table = self.table_declaration()?;
        self.keyword("SET").then_some(())?;
        let mut assignments = Vec::new();
        loop {
            let column = self.column()?;
            self.symbol('=').then_some(())?;
            let start = self.position;
            self.skip_expression(&["WHERE"]);
            let placeholder =
                self.position == start + 1 && self.tokens[start] == Token::Placeholder;
            assignments.push((column, placeholder));
            if !self.symbol(',') {
                break;
            }
        }
        let conditions = self.conditions()?;
        self.is_done().then_some(Parsed::Update {
            table,
            assignments,
            conditions,
        })
    }

    fn delete(&mut self) -> Option<Parsed> {
        self.keyword("FROM").then_some(())?;
        let table = self.table_declaration()?;
        let conditions = self.conditions()?;
        self.is_done()
            .then_some(Parsed::Delete { table, conditions })
    }
}

fn parse(tokens: &[Token]) -> Option<Parsed> {
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    if parser.keyword("CREATE") {
        parser.create()
    } else if parser.keyword("ALTER") {
        parser.alter()
    } else if parser.keyword("INSERT") {
        parser.insert()
    } else if parser.keyword("SELECT") {
        parser.select()
    } else if parser.keyword("UPDATE") {
        parser.update()
    } else if parser.keyword("DELETE") {
        parser.delete()
    } else {
        None
    }
}
