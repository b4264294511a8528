//! Deferred values.
//!
//! A [`LazyValue<T>`] is a promise of zero or more `T`s which is only
//! computed when a consumer asks for it. Declaring, cloning or combining lazy
//! values never runs the underlying computation, so a value wired up during
//! the declaration phase observes every mutation made before it is finally
//! consumed at execution time.
//!
//! Nothing is cached. Every call to [`LazyValue::evaluate`] re-runs the whole
//! chain of closures, so consumers must be fine with repeated resolution.

use std::any::type_name;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Error, Result};

type Thunk<T> = Arc<dyn Fn(&str) -> Result<Vec<T>> + Send + Sync>;

/// A deferred computation producing a sequence of `T`.
///
/// A single value is represented as a sequence of length one. The evaluation
/// closure is shared, so cloning is cheap and both clones evaluate the same
/// computation. A single instance should not be evaluated from several
/// threads at once unless the captured state is itself synchronized.
pub struct LazyValue<T> {
    label: Arc<str>,
    thunk: Thunk<T>,
}

impl<T> Clone for LazyValue<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            thunk: self.thunk.clone(),
        }
    }
}

impl<T> Debug for LazyValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LazyValue({})", self.label)
    }
}

fn default_label<T>() -> Arc<str> {
    format!("provider of {}", type_name::<T>()).into()
}

impl<T> LazyValue<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a lazy value from an arbitrary fallible computation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Result<Vec<T>> + Send + Sync + 'static,
    {
        Self {
            label: default_label::<T>(),
            thunk: Arc::new(move |_| f()),
        }
    }

    /// Wraps a value which is already known.
    pub fn of(value: T) -> Self
    where
        T: Clone,
    {
        Self::from_fn(move || Ok(vec![value.clone()]))
    }

    /// Wraps a list of values which are already known.
    pub fn of_many(values: impl IntoIterator<Item = T>) -> Self
    where
        T: Clone,
    {
        let values: Vec<T> = values.into_iter().collect();
        Self::from_fn(move || Ok(values.clone()))
    }

    /// A single-shot provider. Yielding `None` makes the evaluation fail with
    /// [`Error::MissingValue`].
    pub fn provider<F>(f: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self::try_provider(move || Ok(f()))
    }

    /// Like [`LazyValue::provider`], for closures which can fail.
    pub fn try_provider<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Option<T>> + Send + Sync + 'static,
    {
        Self {
            label: default_label::<T>(),
            thunk: Arc::new(move |label| match f() {
                Ok(Some(value)) => Ok(vec![value]),
                Ok(None) => Err(Error::missing(label)),
                Err(err) => Err(Error::Provider(err)),
            }),
        }
    }

    /// A provider of a sequence. An empty sequence is a valid result.
    pub fn sequence<F, I>(f: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        Self::from_fn(move || Ok(f().into_iter().collect()))
    }

    /// Attaches a human readable label used in diagnostics.
    ///
    /// For single-shot providers the label is what [`Error::MissingValue`]
    /// reports.
    pub fn describe(mut self, label: impl Into<String>) -> Self {
        self.label = label.into().into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the computation and returns every produced value.
    pub fn evaluate(&self) -> Result<Vec<T>> {
        tracing::trace!(value = %self.label, "evaluating lazy value");
        (self.thunk)(&self.label)
    }

    /// Runs the computation and expects exactly one value.
    pub fn evaluate_one(&self) -> Result<T> {
        let mut values = self.evaluate()?;
        if values.len() > 1 {
            return Err(Error::TooManyValues {
                description: self.label.to_string(),
                count: values.len(),
            });
        }
        values.pop().ok_or_else(|| Error::missing(self.label.as_ref()))
    }

    pub fn map<U, F>(self, f: F) -> LazyValue<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.try_map(move |value| Ok(f(value)))
    }

    pub fn try_map<U, F>(self, f: F) -> LazyValue<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        self.flat_map(move |value| Ok(vec![f(value)?]))
    }

    /// Maps every value to a sequence and concatenates the results. The
    /// first failing element aborts the whole evaluation.
    pub fn flat_map<U, F>(self, f: F) -> LazyValue<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> Result<Vec<U>> + Send + Sync + 'static,
    {
        let thunk = self.thunk;
        LazyValue {
            label: self.label,
            thunk: Arc::new(move |label| {
                let mut acc = Vec::new();
                for value in thunk(label)? {
                    acc.extend(f(value)?);
                }
                Ok(acc)
            }),
        }
    }

    /// Combines two lazy values. Both are evaluated, left first, only when
    /// the result is.
    pub fn zip_with<U, V, F>(self, other: LazyValue<U>, f: F) -> LazyValue<V>
    where
        U: Send + Sync + 'static,
        V: Send + Sync + 'static,
        F: Fn(Vec<T>, Vec<U>) -> Result<Vec<V>> + Send + Sync + 'static,
    {
        let label = format!("{} with {}", self.label, other.label);
        let (lhs_label, lhs) = (self.label, self.thunk);
        let (rhs_label, rhs) = (other.label, other.thunk);
        LazyValue {
            label: label.into(),
            thunk: Arc::new(move |_| f(lhs(&lhs_label)?, rhs(&rhs_label)?)),
        }
    }
}

impl<I> LazyValue<I>
where
    I: IntoIterator + Send + Sync + 'static,
    I::Item: Send + Sync + 'static,
{
    /// Turns a lazy value of collections into a lazy value of their
    /// elements.
    pub fn flatten(self) -> LazyValue<I::Item> {
        self.flat_map(|items| Ok(items.into_iter().collect()))
    }
}
