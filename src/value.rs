//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of multiplug.
//! The multiplug project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Plugin Values
//!
//! Values exchanged with plugins of any language. Everything that can be
//! expressed as data travels as a `serde_json::Value`; objects owned by a
//! plugin runtime (for example the state returned by a Python `initialize`)
//! travel as opaque [`MpObject`]s and are only ever handed back to the
//! plugin that produced them.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keyword arguments of a plugin call, ordered by name.
pub type MpKwargs = BTreeMap<String, MpValue>;

/// Opaque object owned by a plugin runtime.
#[derive(Clone)]
pub struct MpObject(Arc<dyn Any + Send + Sync>);

impl MpObject {
    pub fn new<T: Any + Send + Sync>(inner: T) -> Self {
        MpObject(Arc::new(inner))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for MpObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MpObject(..)")
    }
}

impl PartialEq for MpObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A value returned by or passed to a plugin.
#[derive(Clone, Debug, PartialEq)]
pub enum MpValue {
    Data(Value),
    Object(MpObject),
}

impl MpValue {
    pub fn null() -> Self {
        MpValue::Data(Value::Null)
    }

    pub fn str(s: impl Into<String>) -> Self {
        MpValue::Data(Value::String(s.into()))
    }

    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MpValue::Data(Value::Array(
            items.into_iter().map(|s| Value::String(s.into())).collect(),
        ))
    }

    pub fn table<R, I, S>(rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MpValue::Data(Value::Array(
            rows.into_iter()
                .map(|row| {
                    Value::Array(row.into_iter().map(|s| Value::String(s.into())).collect())
                })
                .collect(),
        ))
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            MpValue::Data(v) => Some(v),
            MpValue::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(Value::as_str)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MpValue::Data(Value::Null))
    }

    /// The elements of a list value, if every element is a string.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        self.as_data()?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// The rows of a nested value, if every cell is a string.
    pub fn as_string_table(&self) -> Option<Vec<Vec<String>>> {
        self.as_data()?
            .as_array()?
            .iter()
            .map(|row| {
                row.as_array()?
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .collect()
    }

    /// Text form used for TSV cells and shell arguments: strings verbatim,
    /// null as the empty string, everything else as compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            MpValue::Data(Value::String(s)) => s.clone(),
            MpValue::Data(Value::Null) => String::new(),
            MpValue::Data(other) => other.to_string(),
            MpValue::Object(_) => "<object>".to_string(),
        }
    }
}

impl From<Value> for MpValue {
    fn from(value: Value) -> Self {
        MpValue::Data(value)
    }
}

impl From<&str> for MpValue {
    fn from(value: &str) -> Self {
        MpValue::str(value)
    }
}

impl From<String> for MpValue {
    fn from(value: String) -> Self {
        MpValue::str(value)
    }
}

/// Shape of a constant, as declared by a contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MpShape {
    /// A single string.
    Scalar,
    /// An ordered list of strings.
    List,
    /// An ordered list of ordered string tuples.
    Nested,
}

impl MpShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            MpShape::Scalar => "scalar",
            MpShape::List => "list",
            MpShape::Nested => "nested",
        }
    }
}
