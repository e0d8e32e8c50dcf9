//! Process-wide configuration attributes.
//!
//! A small named-value store readable and settable from any thread:
//!
//! - `"threads"` (int, default 0) - worker threads for large reads;
//!   0 means one per core, 1 forces serial.
//! - `"limit:channels"` (int, default 1024) - reject files claiming more
//!   channels than this.
//! - `"limit:imagesize_MB"` (int, default 32768) - reject files whose
//!   uncompressed pixel data would exceed this many megabytes.
//!
//! The limits are the hardening seam: format handlers consult them before
//! sizing any allocation from untrusted header fields.
//!
//! Read-only virtual attributes: `"format_list"` and `"extension_list"`
//! reflect the current format registry.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use openimg_core::AttrValue;
use tracing::warn;

const SETTABLE: &[&str] = &["threads", "limit:channels", "limit:imagesize_MB"];

fn store() -> &'static RwLock<HashMap<String, AttrValue>> {
    static STORE: OnceLock<RwLock<HashMap<String, AttrValue>>> = OnceLock::new();
    STORE.get_or_init(|| {
        RwLock::new(HashMap::from([
            ("threads".to_string(), AttrValue::Int(0)),
            ("limit:channels".to_string(), AttrValue::Int(1024)),
            ("limit:imagesize_MB".to_string(), AttrValue::Int(32768)),
        ]))
    })
}

fn read_store() -> RwLockReadGuard<'static, HashMap<String, AttrValue>> {
    match store().read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_store() -> RwLockWriteGuard<'static, HashMap<String, AttrValue>> {
    match store().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Sets a global attribute. Returns false (and changes nothing) for names
/// that are not settable.
pub fn attribute(name: &str, value: impl Into<AttrValue>) -> bool {
    if !SETTABLE.contains(&name) {
        warn!(name, "ignoring unknown global attribute");
        return false;
    }
    write_store().insert(name.to_string(), value.into());
    true
}

/// Reads a global attribute, including the registry-backed virtual ones.
pub fn getattribute(name: &str) -> Option<AttrValue> {
    match name {
        "format_list" => {
            let mut names = crate::registry::format_names();
            names.sort_unstable();
            Some(AttrValue::Str(names.join(",")))
        }
        "extension_list" => Some(AttrValue::Str(crate::registry::extension_list())),
        _ => read_store().get(name).cloned(),
    }
}

/// Integer lookup with a default for missing/mistyped values.
pub fn get_int_attribute(name: &str, default: i32) -> i32 {
    getattribute(name).and_then(|v| v.as_int()).unwrap_or(default)
}

/// Float lookup with a default for missing/mistyped values.
pub fn get_float_attribute(name: &str, default: f32) -> f32 {
    getattribute(name).and_then(|v| v.as_float()).unwrap_or(default)
}

/// String lookup with a default for missing values.
pub fn get_string_attribute(name: &str, default: &str) -> String {
    match getattribute(name) {
        Some(v) => v.to_string(),
        None => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_seeded() {
        assert_eq!(get_int_attribute("limit:channels", 0), 1024);
        assert!(get_int_attribute("limit:imagesize_MB", 0) > 0);
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(!attribute("no_such_knob", 7));
        assert_eq!(getattribute("no_such_knob"), None);
    }

    #[test]
    fn test_set_and_get() {
        assert!(attribute("threads", 2));
        assert_eq!(get_int_attribute("threads", -1), 2);
        assert!(attribute("threads", 0));
    }

    #[test]
    fn test_format_list_virtual() {
        let list = get_string_attribute("format_list", "");
        assert!(list.contains("pnm"));
        assert!(list.contains("null"));
    }
}
