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

//! # Python Plugins
//!
//! Python plugins run in an interpreter embedded with PyO3. The file is
//! executed as a fresh module named after its stem. Public callables other
//! than classes are functions; public values other than modules are
//! constants.
//!
//! Values that map onto JSON cross the boundary as data. Anything else
//! (instances of plugin classes, for example) is wrapped into an opaque
//! [`MpObject`] and handed back to Python unchanged.

use std::ffi::CString;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyModule, PyString, PyTuple, PyType};
use pyo3::IntoPyObjectExt;
use serde_json::{Map, Number, Value};

use crate::contract::MpContract;
use crate::errors::{MpError, Result};
use crate::loader::{module_name, MpLoader};
use crate::module::{MpFunction, MpLanguage, MpMaterialized, MpSignature};
use crate::value::{MpKwargs, MpObject, MpValue};

fn py_error(module: &str, err: PyErr) -> MpError {
    MpError::plugin(module, err.to_string())
}

/// Converts a Python object to data, if it is made of JSON-like values only.
fn py_to_data(obj: &Bound<'_, PyAny>) -> Option<Value> {
    if obj.is_none() {
        return Some(Value::Null);
    }
    if obj.is_instance_of::<PyBool>() {
        return obj.extract::<bool>().ok().map(Value::Bool);
    }
    if obj.is_instance_of::<PyInt>() {
        return match obj.extract::<i64>() {
            Ok(i) => Some(Value::from(i)),
            Err(_) => obj.extract::<u64>().ok().map(Value::from),
        };
    }
    if obj.is_instance_of::<PyFloat>() {
        return obj
            .extract::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number);
    }
    if obj.is_instance_of::<PyString>() {
        return obj.extract::<String>().ok().map(Value::String);
    }
    if obj.is_instance_of::<PyList>() || obj.is_instance_of::<PyTuple>() {
        let items = obj.extract::<Vec<Bound<'_, PyAny>>>().ok()?;
        return items
            .iter()
            .map(py_to_data)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array);
    }
    if let Ok(dict) = obj.cast::<PyDict>() {
        let mut map = Map::new();
        for (key, value) in dict.iter() {
            let key = key.extract::<String>().ok()?;
            map.insert(key, py_to_data(&value)?);
        }
        return Some(Value::Object(map));
    }
    None
}

fn py_to_value(obj: &Bound<'_, PyAny>) -> MpValue {
    match py_to_data(obj) {
        Some(value) => MpValue::Data(value),
        None => MpValue::Object(MpObject::new(obj.clone().unbind())),
    }
}

fn data_to_py<'py>(py: Python<'py>, value: &Value) -> PyResult<Bound<'py, PyAny>> {
    match value {
        Value::Null => Ok(py.None().into_bound(py)),
        Value::Bool(b) => b.into_bound_py_any(py),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into_bound_py_any(py)
            } else if let Some(u) = n.as_u64() {
                u.into_bound_py_any(py)
            } else {
                n.as_f64().unwrap_or(f64::NAN).into_bound_py_any(py)
            }
        }
        Value::String(s) => s.into_bound_py_any(py),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| data_to_py(py, item))
                .collect::<PyResult<Vec<_>>>()?;
            Ok(PyList::new(py, items)?.into_any())
        }
        Value::Object(map) => {
            let dict = PyDict::new(py);
            for (key, item) in map {
                dict.set_item(key, data_to_py(py, item)?)?;
            }
            Ok(dict.into_any())
        }
    }
}

fn value_to_py<'py>(py: Python<'py>, module: &str, value: &MpValue) -> Result<Bound<'py, PyAny>> {
    match value {
        MpValue::Data(data) => data_to_py(py, data).map_err(|err| py_error(module, err)),
        MpValue::Object(object) => object
            .downcast_ref::<Py<PyAny>>()
            .map(|obj| obj.clone_ref(py).into_bound(py))
            .ok_or_else(|| {
                MpError::plugin(module, "object was not produced by a Python plugin")
            }),
    }
}

/// A function of a Python plugin.
pub struct MpPythonFunction {
    module: String,
    name: String,
    function: Py<PyAny>,
}

impl fmt::Debug for MpPythonFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MpPythonFunction({}.{})", self.module, self.name)
    }
}

impl MpFunction for MpPythonFunction {
    fn call(&self, args: &[MpValue], kwargs: &MpKwargs) -> Result<MpValue> {
        Python::attach(|py| {
            let args = args
                .iter()
                .map(|value| value_to_py(py, &self.module, value))
                .collect::<Result<Vec<_>>>()?;
            let args = PyTuple::new(py, args).map_err(|err| py_error(&self.module, err))?;
            let kw = PyDict::new(py);
            for (key, value) in kwargs {
                kw.set_item(key, value_to_py(py, &self.module, value)?)
                    .map_err(|err| py_error(&self.module, err))?;
            }
            let result = self
                .function
                .bind(py)
                .call(args, Some(&kw))
                .map_err(|err| py_error(&self.module, err))?;
            Ok(py_to_value(&result))
        })
    }

    fn signature(&self) -> Option<MpSignature> {
        Python::attach(|py| {
            let spec = py
                .import("inspect")
                .and_then(|inspect| inspect.getattr("getfullargspec"))
                .and_then(|getfullargspec| getfullargspec.call1((self.function.bind(py),)))
                .ok()?;
            let fixed_params = spec.getattr("args").ok()?.extract::<Vec<String>>().ok()?;
            let varargs = spec.getattr("varargs").ok()?;
            let varkw = spec.getattr("varkw").ok()?;
            Some(MpSignature {
                fixed_params,
                accepts_extra_positional: !varargs.is_none(),
                accepts_extra_keyword: !varkw.is_none(),
            })
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MpPythonLoader;

impl MpLoader for MpPythonLoader {
    fn language(&self) -> MpLanguage {
        MpLanguage::Python
    }

    fn materialize(&self, path: &Path, _contract: &MpContract) -> Result<MpMaterialized> {
        let module = module_name(path)?;
        let code = fs::read_to_string(path)?;
        let invalid = |err: std::ffi::NulError| MpError::plugin(&module, err.to_string());
        let code = CString::new(code).map_err(invalid)?;
        let file_name = CString::new(path.to_string_lossy().into_owned()).map_err(invalid)?;
        let module_cname = CString::new(module.clone()).map_err(invalid)?;

        Python::attach(|py| {
            let loaded = PyModule::from_code(py, &code, &file_name, &module_cname)
                .map_err(|err| py_error(&module, err))?;
            let mut materialized = MpMaterialized::new(module.clone(), path, MpLanguage::Python);
            for (key, value) in loaded.dict().iter() {
                let Ok(name) = key.extract::<String>() else {
                    continue;
                };
                if name.starts_with('_') {
                    continue;
                }
                if value.is_callable() {
                    if value.is_instance_of::<PyType>() {
                        continue;
                    }
                    let function = MpPythonFunction {
                        module: module.clone(),
                        name: name.clone(),
                        function: value.unbind(),
                    };
                    materialized.functions.insert(name, Arc::new(function));
                } else if !value.is_instance_of::<PyModule>() {
                    materialized.constants.insert(name, py_to_value(&value));
                }
            }
            log::debug!(
                "loaded python plugin '{}': {} functions, {} constants",
                module,
                materialized.functions.len(),
                materialized.constants.len()
            );
            Ok(materialized)
        })
    }
}
