use crate::{DepotTypes, Scope};
use std::ops::{Deref, DerefMut};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
    SqlFieldDefinition,
    SqlInsertInto,
    SqlInsertIntoValues,
    SqlJoin,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectGroupBy,
    SqlSelectOrderBy,
    SqlSelectWhere,
    SqlUpdate,
    SqlUpdateSet,
}

/// State of the build pass.
#[derive(Debug)]
pub struct Context<'a> {
    /// Placeholders written so far.
    pub counter: u32,
    pub fragment: Fragment,
    /// Qualify columns with the table abbreviation, or else with the table name.
    pub use_abbreviations: bool,
    pub types: &'a DepotTypes,
    pub scope: Scope<'a>,
}

impl<'a> Context<'a> {
    pub fn new(types: &'a DepotTypes) -> Self {
        Self {
            counter: 0,
            fragment: Fragment::None,
            use_abbreviations: true,
            types,
            scope: Scope::default(),
        }
    }

    /// Run `f` with field overrides switched to `enabled`, restoring them
    /// after.
    pub fn with_overrides<R>(&mut self, enabled: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.scope.enable_overrides, enabled);
        let result = f(self);
        self.scope.enable_overrides = saved;
        result
    }

    /// Whether a select written now is nested in another statement.
    pub fn is_inner(&self) -> bool {
        self.fragment != Fragment::None
    }

    /// Whether computed fields get an alias naming the field.
    pub fn alias_declaration(&self) -> bool {
        self.fragment == Fragment::SqlSelect
    }

    pub fn switch_fragment<'s>(&'s mut self, fragment: Fragment) -> ContextUpdater<'s, 'a> {
        let previous = std::mem::replace(&mut self.fragment, fragment);
        ContextUpdater {
            previous,
            context: self,
        }
    }
}

/// Restores the previous fragment when dropped.
pub struct ContextUpdater<'s, 'a> {
    previous: Fragment,
    context: &'s mut Context<'a>,
}

impl<'s, 'a> Deref for ContextUpdater<'s, 'a> {
    type Target = Context<'a>;
    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl<'s, 'a> DerefMut for ContextUpdater<'s, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl<'s, 'a> Drop for ContextUpdater<'s, 'a> {
    fn drop(&mut self) {
        self.context.fragment = self.previous;
    }
}
