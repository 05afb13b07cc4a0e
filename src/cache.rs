//! Thread-local compilation cache for rule regexes.
//!
//! A batch run applies the same small rule set to many files, so each
//! pattern would otherwise be recompiled once per file. Compiled regexes
//! are cached thread-locally, capped at 256 entries; the cache is cleared
//! and rebuilt on demand when the cap is reached.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get a compiled regex from the cache, or compile and cache it.
///
/// `Regex` is internally reference-counted, so the returned clone shares
/// the compiled program with the cached entry.
pub fn get_or_compile(pattern: &str) -> Result<Regex, regex::Error> {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        // Evict all if at capacity (simple but effective for batch workloads)
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Regex::new(pattern)?;
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    })
}

/// Clear the regex cache (mainly for testing).
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

/// Number of cached patterns on this thread.
pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}
