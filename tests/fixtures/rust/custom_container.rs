//! Genome size and GC content of a Fasta file, with the constants under a custom container export.

use std::ffi::{c_char, CStr, CString};
use std::fs;

fn respond(body: String) -> *mut c_char {
    CString::new(body)
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}

fn quote(text: &str) -> String {
    let mut quoted = String::from("\"");
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// First positional argument of a request, if it is a string.
fn first_arg(request: &str) -> Option<String> {
    let start = request.find("\"args\"")?;
    let rest = &request[start + "\"args\"".len()..];
    let rest = rest[rest.find('[')? + 1..].trim_start();
    let mut chars = rest.strip_prefix('"')?.chars();
    let mut arg = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(arg),
            '\\' => match chars.next()? {
                'n' => arg.push('\n'),
                't' => arg.push('\t'),
                other => arg.push(other),
            },
            c => arg.push(c),
        }
    }
    None
}

#[no_mangle]
pub extern "C" fn multiplug_free(response: *mut c_char) {
    if !response.is_null() {
        unsafe { drop(CString::from_raw(response)) };
    }
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn Metadata(_request: *const c_char) -> *mut c_char {
    respond(
        concat!(
            r#"{"ok": {"ID": "custom_container", "VERSION": "0.1.0", "#,
            r#""INPUT": "genomic sequence (Fasta)", "OUTPUT": ["genome_size", "GC_content"], "#,
            r#""METHOD": "count bases", "IMPLEMENTATION": "implemented in Rust", "#,
            r#""_BUFSIZE": 65536}}"#
        )
        .to_string(),
    )
}

#[no_mangle]
pub extern "C" fn compute(request: *const c_char) -> *mut c_char {
    let request = unsafe { CStr::from_ptr(request) }.to_string_lossy();
    let Some(filename) = first_arg(&request) else {
        return respond(r#"{"error": "compute needs a file name"}"#.to_string());
    };
    let text = match fs::read_to_string(&filename) {
        Ok(text) => text,
        Err(err) => {
            return respond(format!(
                r#"{{"error": {}}}"#,
                quote(&format!("{}: {}", filename, err))
            ))
        }
    };
    let mut size = 0u64;
    let mut gc = 0u64;
    for line in text.lines().filter(|line| !line.starts_with('>')) {
        for c in line.chars() {
            if c.is_ascii_alphabetic() {
                size += 1;
            }
            if matches!(c, 'G' | 'C' | 'g' | 'c') {
                gc += 1;
            }
        }
    }
    respond(format!(
        r#"{{"ok": [[{}, {}], []]}}"#,
        size,
        gc as f64 / size as f64
    ))
}
