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

//! # Compiled Plugin ABI
//!
//! Every function exported by a compiled plugin has the C signature
//!
//! ```c
//! char *name(const char *request);
//! ```
//!
//! `request` is the JSON document `{"args": [...], "kwargs": {...}}` and the
//! returned string is either `{"ok": <value>}` or `{"error": "<message>"}`.
//! Returned strings are released with the `multiplug_free` export.
//!
//! Functions are discovered from the dynamic export table of the library, so
//! no manifest is needed.

use std::ffi::{c_char, CStr, CString};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use object::{BinaryFormat, Object};
use serde_json::{json, Map, Value};

use crate::errors::{MpError, Result};
use crate::module::{MpFunction, MpLanguage, MpMaterialized};
use crate::value::{MpKwargs, MpValue};

/// Name of the export releasing strings returned by plugin functions.
pub const FREE_SYMBOL: &str = "multiplug_free";

type MpCallFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type MpFreeFn = unsafe extern "C" fn(*mut c_char);

/// Exports generated by the Nim runtime or the linker.
const RUNTIME_SYMBOLS: &[&str] = &[
    "NimMain",
    "PreMain",
    "PreMainInner",
    "NimMainInner",
    "NimMainModule",
    "NimDestroyGlobals",
    "cmdCount",
    "cmdLine",
    "gEnv",
    "rust_eh_personality",
];

/// How constants are laid out in a compiled library.
#[derive(Clone, Copy, Debug)]
pub enum MpConstantLayout<'a> {
    /// Every export starting with the prefix is a constant.
    Prefix(&'a str),
    /// One export returns an object holding every constant.
    Container(&'a str),
}

/// A loaded plugin library.
pub struct MpNativeLibrary {
    module: String,
    free: MpFreeFn,
    library: Library,
}

impl fmt::Debug for MpNativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpNativeLibrary")
            .field("module", &self.module)
            .finish()
    }
}

impl MpNativeLibrary {
    pub fn open(module: &str, artifact: &Path) -> Result<Arc<Self>> {
        // SAFETY: loading runs the library initializers; plugins are trusted code.
        let library = unsafe { Library::new(artifact) }.map_err(|err| {
            MpError::plugin(
                module,
                format!("failed to load '{}': {}", artifact.display(), err),
            )
        })?;
        // SAFETY: the symbol type is fixed by the plugin ABI.
        let free = unsafe {
            library
                .get::<MpFreeFn>(FREE_SYMBOL.as_bytes())
                .map(|symbol| *symbol)
                .map_err(|err| {
                    MpError::plugin(module, format!("missing export '{}': {}", FREE_SYMBOL, err))
                })?
        };
        Ok(Arc::new(MpNativeLibrary {
            module: module.to_string(),
            free,
            library,
        }))
    }

    /// Resolves one exported plugin function.
    pub fn function(self: &Arc<Self>, symbol: &str) -> Result<MpNativeFunction> {
        // SAFETY: the symbol type is fixed by the plugin ABI.
        let call = unsafe {
            self.library
                .get::<MpCallFn>(symbol.as_bytes())
                .map(|s| *s)
                .map_err(|err| {
                    MpError::plugin(&self.module, format!("missing export '{}': {}", symbol, err))
                })?
        };
        Ok(MpNativeFunction {
            library: Arc::clone(self),
            symbol: symbol.to_string(),
            call,
        })
    }
}

/// A function of a compiled plugin.
#[derive(Clone)]
pub struct MpNativeFunction {
    library: Arc<MpNativeLibrary>,
    symbol: String,
    call: MpCallFn,
}

impl fmt::Debug for MpNativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MpNativeFunction({}::{})", self.library.module, self.symbol)
    }
}

impl MpNativeFunction {
    fn invoke(&self, request: &Value) -> Result<Value> {
        let module = &self.library.module;
        let request = CString::new(request.to_string())
            .map_err(|err| MpError::plugin(module, format!("invalid request: {}", err)))?;

        // SAFETY: the plugin reads a NUL-terminated string and returns a
        // NUL-terminated string it allocated, or null.
        let raw = unsafe { (self.call)(request.as_ptr()) };
        if raw.is_null() {
            return Err(MpError::plugin(
                module,
                format!("function '{}' returned a null response", self.symbol),
            ));
        }
        // SAFETY: raw is non-null and owned by the plugin until released.
        let response = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        // SAFETY: raw was returned by this library and is released once.
        unsafe { (self.library.free)(raw) };

        parse_response(module, &self.symbol, &response)
    }
}

impl MpFunction for MpNativeFunction {
    fn call(&self, args: &[MpValue], kwargs: &MpKwargs) -> Result<MpValue> {
        let request = encode_request(&self.library.module, args, kwargs)?;
        self.invoke(&request).map(MpValue::Data)
    }
}

/// Builds the JSON request of a call.
pub fn encode_request(module: &str, args: &[MpValue], kwargs: &MpKwargs) -> Result<Value> {
    let to_data = |value: &MpValue| {
        value.as_data().cloned().ok_or_else(|| {
            MpError::plugin(module, "opaque objects cannot be passed to a compiled plugin")
        })
    };
    let args = args.iter().map(to_data).collect::<Result<Vec<_>>>()?;
    let mut map = Map::new();
    for (key, value) in kwargs {
        map.insert(key.clone(), to_data(value)?);
    }
    Ok(json!({ "args": args, "kwargs": map }))
}

/// Interprets the JSON response of a call.
pub fn parse_response(module: &str, symbol: &str, response: &str) -> Result<Value> {
    let mut value: Value = serde_json::from_str(response).map_err(|err| {
        MpError::plugin(
            module,
            format!("function '{}' returned invalid JSON: {}", symbol, err),
        )
    })?;
    if let Some(message) = value.get("error") {
        let message = message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string());
        return Err(MpError::plugin(
            module,
            format!("function '{}' failed: {}", symbol, message),
        ));
    }
    match value.get_mut("ok") {
        Some(ok) => Ok(ok.take()),
        None => Err(MpError::plugin(
            module,
            format!("function '{}' returned neither 'ok' nor 'error'", symbol),
        )),
    }
}

fn is_runtime_symbol(name: &str) -> bool {
    name.is_empty()
        || name == FREE_SYMBOL
        || name.starts_with('_')
        || name.starts_with("Nim")
        || RUNTIME_SYMBOLS.contains(&name)
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names of the plugin functions exported by a shared library.
pub fn exported_functions(artifact: &Path) -> Result<Vec<String>> {
    let data = fs::read(artifact)?;
    let file = object::File::parse(&*data).map_err(|err| {
        MpError::validation(format!("cannot parse '{}': {}", artifact.display(), err))
    })?;
    let strip_underscore = file.format() == BinaryFormat::MachO;
    let exports = file.exports().map_err(|err| {
        MpError::validation(format!(
            "cannot read the exports of '{}': {}",
            artifact.display(),
            err
        ))
    })?;

    let mut names: Vec<String> = exports
        .iter()
        .filter_map(|export| std::str::from_utf8(export.name()).ok())
        .map(|name| {
            if strip_underscore {
                name.strip_prefix('_').unwrap_or(name)
            } else {
                name
            }
        })
        .filter(|name| !is_runtime_symbol(name))
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Loads a compiled plugin and sorts its exports into functions and
/// constants.
pub fn materialize_library(
    module: &str,
    source: &Path,
    artifact: &Path,
    language: MpLanguage,
    layout: MpConstantLayout<'_>,
) -> Result<MpMaterialized> {
    let names = exported_functions(artifact)?;
    let library = MpNativeLibrary::open(module, artifact)?;
    let mut materialized = MpMaterialized::new(module, source, language);
    let no_args = MpKwargs::new();

    match layout {
        MpConstantLayout::Prefix("") | MpConstantLayout::Container("") => {
            materialized.constants_disabled = true;
            materialized
                .notes
                .push("constants definition mechanism disabled".to_string());
        }
        _ => {}
    }

    for name in names {
        let function = library.function(&name)?;
        match layout {
            MpConstantLayout::Prefix(prefix) if !prefix.is_empty() && name.starts_with(prefix) => {
                let value = function.call(&[], &no_args)?;
                materialized
                    .constants
                    .insert(name[prefix.len()..].to_string(), value);
            }
            MpConstantLayout::Container(container) if !container.is_empty() && name == container => {
                let value = function.invoke(&encode_request(module, &[], &no_args)?)?;
                let Value::Object(constants) = value else {
                    return Err(MpError::plugin(
                        module,
                        format!("constants container '{}' did not return an object", container),
                    ));
                };
                for (key, value) in constants {
                    if !key.starts_with('_') {
                        materialized.constants.insert(key, MpValue::Data(value));
                    }
                }
            }
            _ => {
                materialized.functions.insert(name, Arc::new(function));
            }
        }
    }
    log::debug!(
        "loaded {} plugin '{}': {} functions, {} constants",
        language,
        module,
        materialized.functions.len(),
        materialized.constants.len()
    );
    Ok(materialized)
}
