//! Explicit method table
//!
//! Maps method names to the params/result types they are expected to be
//! registered with. A dispatcher built with a table refuses to start if the
//! registry and the table disagree.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;

/// Params and result type of a registered method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    params: &'static str,
    result: &'static str,
}

impl MethodSignature {
    pub fn of<P, R>() -> Self {
        Self {
            params: type_name::<P>(),
            result: type_name::<R>(),
        }
    }

    pub fn params(&self) -> &'static str {
        self.params
    }

    pub fn result(&self) -> &'static str {
        self.result
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> {}", self.params, self.result)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    entries: BTreeMap<String, MethodSignature>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a method taking `P` and returning `R`.
    pub fn method<P, R>(mut self, name: impl Into<String>) -> Self {
        self.entries.insert(name.into(), MethodSignature::of::<P, R>());
        self
    }

    /// Declare a method registered with `add_no_params`.
    pub fn no_params<R>(self, name: impl Into<String>) -> Self {
        self.method::<(), R>(name)
    }

    pub fn get(&self, name: &str) -> Option<&MethodSignature> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::registry::{MethodRegistry, RegistryError};
    use crate::validator::typed;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct AddParams {
        a: i64,
        b: i64,
    }

    fn registry() -> MethodRegistry {
        MethodRegistry::new()
            .add("add", typed::<AddParams>(), |_ctx, p: AddParams| async move {
                Ok::<_, RpcError>(p.a + p.b)
            })
            .unwrap()
            .add_no_params("ping", |_ctx| async { Ok::<_, RpcError>("pong") })
            .unwrap()
    }

    #[test]
    fn test_matching_table_verifies() {
        let table = MethodTable::new()
            .method::<AddParams, i64>("add")
            .no_params::<&'static str>("ping");
        assert_eq!(table.len(), 2);
        assert!(registry().verify(&table).is_ok());
    }

    #[test]
    fn test_signature_mismatch() {
        let table = MethodTable::new()
            .method::<AddParams, f64>("add")
            .no_params::<&'static str>("ping");
        match registry().verify(&table) {
            Err(RegistryError::SignatureMismatch { name, expected, actual }) => {
                assert_eq!(name, "add");
                assert_eq!(expected.result(), "f64");
                assert_eq!(actual.result(), "i64");
            }
            other => panic!("expected signature mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unlisted_and_missing_methods() {
        let partial = MethodTable::new().method::<AddParams, i64>("add");
        assert_eq!(
            registry().verify(&partial),
            Err(RegistryError::UnlistedMethod("ping".to_string()))
        );

        let extra = MethodTable::new()
            .method::<AddParams, i64>("add")
            .no_params::<&'static str>("ping")
            .no_params::<()>("shutdown");
        assert_eq!(
            registry().verify(&extra),
            Err(RegistryError::MissingMethod("shutdown".to_string()))
        );
    }
}
