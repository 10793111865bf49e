//! Secondary index specifications.
//!
//! A secondary index is a store hash named after the index. Each field is an
//! entity identity and each value is the lower-cased indexed value:
//!
//! ```text
//! HSET roles 1 admin
//! HSET roles 2 user
//! HSET roles 3 admin
//! ```
//!
//! Index entries are advisory. Nothing ties an entry to the entity it
//! names: callers keep the indexed value consistent with the entity, and
//! deleting an entity leaves its entries behind (they are skipped on read).

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

type ValueFn<T> = dyn Fn(&T) -> String + Send + Sync;

/// Where the indexed value of an item comes from.
enum IndexValue<T> {
    /// The same value for every item.
    Fixed(String),
    /// Read from each item through an accessor.
    Derived(Arc<ValueFn<T>>),
}

impl<T> Clone for IndexValue<T> {
    fn clone(&self) -> Self {
        match self {
            IndexValue::Fixed(value) => IndexValue::Fixed(value.clone()),
            IndexValue::Derived(f) => IndexValue::Derived(Arc::clone(f)),
        }
    }
}

/// One index registration for a write: index name plus value source.
///
/// ```
/// use redis_cache_kit::IndexSpec;
///
/// struct User { id: u32, role: String }
///
/// let by_role = IndexSpec::derived("roles", |u: &User| u.role.clone());
/// let tenant = IndexSpec::<User>::fixed("tenants", "acme");
///
/// let user = User { id: 1, role: "Admin".into() };
/// assert_eq!(by_role.value_for(&user), "admin");
/// assert_eq!(tenant.value_for(&user), "acme");
/// ```
pub struct IndexSpec<T> {
    name: String,
    value: IndexValue<T>,
}

impl<T> IndexSpec<T> {
    /// Index every item under the same `value`.
    pub fn fixed(name: impl Into<String>, value: impl Into<String>) -> Self {
        IndexSpec {
            name: name.into(),
            value: IndexValue::Fixed(value.into()),
        }
    }

    /// Index each item under the value returned by `accessor`.
    pub fn derived<F>(name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        IndexSpec {
            name: name.into(),
            value: IndexValue::Derived(Arc::new(accessor)),
        }
    }

    /// Build fixed specs from parallel lists of index names and values.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if the lists differ in length.
    pub fn zip<N, V>(names: &[N], values: &[V]) -> Result<Vec<Self>>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        if names.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "{} index names but {} index values",
                names.len(),
                values.len()
            )));
        }

        Ok(names
            .iter()
            .zip(values)
            .map(|(name, value)| IndexSpec::fixed(name.as_ref(), value.as_ref()))
            .collect())
    }

    /// Index (hash) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased value stored for `item`.
    pub fn value_for(&self, item: &T) -> String {
        match &self.value {
            IndexValue::Fixed(value) => value.to_lowercase(),
            IndexValue::Derived(accessor) => accessor(item).to_lowercase(),
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument(
                "index name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl<T> Clone for IndexSpec<T> {
    fn clone(&self) -> Self {
        IndexSpec {
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T> fmt::Debug for IndexSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.value {
            IndexValue::Fixed(value) => value.as_str(),
            IndexValue::Derived(_) => "<derived>",
        };
        f.debug_struct("IndexSpec")
            .field("name", &self.name)
            .field("value", &value)
            .finish()
    }
}
