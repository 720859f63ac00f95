//! A plugin with a type error: building it must fail.

use std::ffi::c_char;

#[no_mangle]
pub extern "C" fn compute(_request: *const c_char) -> *mut c_char {
    let size: u64 = "eight hundred";
    size
}
