//! Yield normalization
//!
//! Classifies a yielded value into a closed [`Yieldable`] and turns it into a
//! thunk the driver (or an aggregate) can start. Values that are not
//! yieldable pass through unchanged as [`Normalized::Inert`].

use super::aggregate::aggregate;
use super::driver::drive_thunk;
use super::promise::{adapt, Thenable};
use super::runtime::Runtime;
use super::thunk::Thunk;
use crate::errors::ErrorInfo;
use crate::types::{Coroutine, Factory, Val};
use std::collections::BTreeMap;

/* ===================== Classification ===================== */

/// Plain collection that fans out member by member
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    List(Vec<Val>),
    Map(BTreeMap<String, Val>),
}

impl Collection {
    pub fn len(&self) -> usize {
        match self {
            Collection::List(items) => items.len(),
            Collection::Map(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a computation can yield, by shape
#[derive(Debug, Clone, PartialEq)]
pub enum Yieldable {
    Factory(Factory),
    Computation(Coroutine),
    Promise(Thenable),
    Thunk(Thunk),
    Collection(Collection),
    Inert(Val),
}

impl Yieldable {
    pub fn classify(value: Val) -> Self {
        match value {
            Val::Factory(factory) => Yieldable::Factory(factory),
            Val::Computation(computation) => Yieldable::Computation(computation),
            Val::Promise(promise) => Yieldable::Promise(promise),
            Val::Thunk(thunk) => Yieldable::Thunk(thunk),
            Val::List(items) => Yieldable::Collection(Collection::List(items)),
            Val::Map(entries) => Yieldable::Collection(Collection::Map(entries)),
            other => Yieldable::Inert(other),
        }
    }
}

/* ===================== Normalization ===================== */

/// Result of normalizing a yielded value
#[derive(Debug)]
pub enum Normalized {
    Thunk(Thunk),
    Inert(Val),
}

/// Normalize a value into a thunk
///
/// A yielded factory is invoked with the bound context and no arguments.
/// Fails only if that invocation fails.
pub fn normalize(value: Val, context: &Val, runtime: &Runtime) -> Result<Normalized, ErrorInfo> {
    let thunk = match Yieldable::classify(value) {
        Yieldable::Factory(factory) => {
            let computation = factory.instantiate(context, Vec::new())?;
            drive_thunk(computation, runtime.clone())
        }
        Yieldable::Computation(computation) => drive_thunk(computation, runtime.clone()),
        Yieldable::Promise(promise) => adapt(promise),
        Yieldable::Thunk(thunk) => thunk,
        Yieldable::Collection(collection) => aggregate(collection, context.clone(), runtime.clone()),
        Yieldable::Inert(value) => return Ok(Normalized::Inert(value)),
    };
    Ok(Normalized::Thunk(thunk))
}
