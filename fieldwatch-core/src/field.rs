//! # Field accessors
//!
//! A field accessor names one field of a source type and knows how to read
//! its current value. Accessors are validated once, at subscription time, by
//! a pluggable [`FieldResolver`] that turns the accessor's expression into a
//! stable field name.
//!
//! - [`Field`]: a `const`-constructible selector backed by a function pointer
//!   (what `#[derive(Observable)]` generates)
//! - [`DynField`]: a selector built at runtime from a string and a closure
//! - [`IdentifierResolver`]: the default resolver

use crate::error::{Result, WatchError};
use std::{fmt, sync::Arc};

/// Something that selects a single readable field of `S`.
pub trait FieldAccessor<S: ?Sized>: Send + Sync + 'static {
    /// Type of the field's value.
    type Value: 'static;

    /// The accessor expression as written by the caller, e.g. `"enabled"`.
    fn expression(&self) -> &str;

    /// The complete set of field names `S` declares, when known.
    fn declared_fields(&self) -> Option<&'static [&'static str]> {
        None
    }

    /// Reads the field's current value from `source`.
    fn read(&self, source: &S) -> Self::Value;
}

/// Types that declare the names of their observable fields.
pub trait FieldSet {
    /// Observable field names, in declaration order.
    const FIELDS: &'static [&'static str];
}

/// A compile-time field selector.
pub struct Field<S: ?Sized, V> {
    name: &'static str,
    fields: Option<&'static [&'static str]>,
    get: fn(&S) -> V,
}

impl<S: ?Sized, V> Field<S, V> {
    /// Creates a selector for `name`, read through `get`.
    pub const fn new(name: &'static str, get: fn(&S) -> V) -> Self {
        Self {
            name,
            fields: None,
            get,
        }
    }

    /// Creates a selector that also carries the owning type's declared field set.
    pub const fn declared(
        name: &'static str,
        fields: &'static [&'static str],
        get: fn(&S) -> V,
    ) -> Self {
        Self {
            name,
            fields: Some(fields),
            get,
        }
    }

    /// The selected field's name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<S: ?Sized, V> Clone for Field<S, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized, V> Copy for Field<S, V> {}

impl<S: ?Sized, V> fmt::Debug for Field<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

impl<S, V> FieldAccessor<S> for Field<S, V>
where
    S: ?Sized + 'static,
    V: 'static,
{
    type Value = V;

    fn expression(&self) -> &str {
        self.name
    }

    fn declared_fields(&self) -> Option<&'static [&'static str]> {
        self.fields
    }

    fn read(&self, source: &S) -> V {
        (self.get)(source)
    }
}

/// A field selector assembled at runtime.
pub struct DynField<S: ?Sized, V> {
    expression: String,
    get: Arc<dyn Fn(&S) -> V + Send + Sync>,
}

impl<S: ?Sized, V> DynField<S, V> {
    /// Creates a selector from an expression and a reader closure.
    pub fn new<F>(expression: impl Into<String>, get: F) -> Self
    where
        F: Fn(&S) -> V + Send + Sync + 'static,
    {
        Self {
            expression: expression.into(),
            get: Arc::new(get),
        }
    }
}

impl<S: ?Sized, V> Clone for DynField<S, V> {
    fn clone(&self) -> Self {
        Self {
            expression: self.expression.clone(),
            get: Arc::clone(&self.get),
        }
    }
}

impl<S: ?Sized, V> fmt::Debug for DynField<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynField")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

impl<S, V> FieldAccessor<S> for DynField<S, V>
where
    S: ?Sized + 'static,
    V: 'static,
{
    type Value = V;

    fn expression(&self) -> &str {
        &self.expression
    }

    fn read(&self, source: &S) -> V {
        (self.get)(source)
    }
}

/// Maps an accessor expression to a stable field name.
///
/// Closures with the matching signature are resolvers too.
pub trait FieldResolver: Send + Sync + 'static {
    /// Resolves `expression`, optionally checking it against `declared` field names.
    fn resolve(&self, expression: &str, declared: Option<&[&str]>) -> Result<String>;
}

impl<F> FieldResolver for F
where
    F: Fn(&str, Option<&[&str]>) -> Result<String> + Send + Sync + 'static,
{
    fn resolve(&self, expression: &str, declared: Option<&[&str]>) -> Result<String> {
        self(expression, declared)
    }
}

/// The default resolver: the expression must be one plain field identifier.
///
/// Member paths (`a.b`), calls (`len()`) and anything else that is not a
/// single identifier are rejected, as are names outside the declared field
/// set when one is available. A leading `r#` is stripped.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentifierResolver;

impl FieldResolver for IdentifierResolver {
    fn resolve(&self, expression: &str, declared: Option<&[&str]>) -> Result<String> {
        if expression.is_empty() {
            return Err(WatchError::accessor(expression, "expression is empty"));
        }
        if expression.contains('.') {
            return Err(WatchError::accessor(
                expression,
                "member paths are not supported; select a single field",
            ));
        }
        if expression.contains('(') {
            return Err(WatchError::accessor(
                expression,
                "method calls are not field accessors",
            ));
        }

        let name = expression.strip_prefix("r#").unwrap_or(expression);
        if !is_identifier(name) {
            return Err(WatchError::accessor(expression, "not a field identifier"));
        }

        if let Some(fields) = declared {
            if !fields.contains(&name) {
                return Err(WatchError::accessor(
                    expression,
                    format!("`{name}` is not a declared field"),
                ));
            }
        }

        Ok(name.to_owned())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    name != "_" && chars.all(|c| c == '_' || c.is_alphanumeric())
}
