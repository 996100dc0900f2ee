use std::env;
use std::ffi::OsString;

const LOCALE_KEYS: [&str; 2] = ["LANG", "LC_ALL"];
const SANITIZED_LOCALE: &str = "C.UTF-8";

/// Scoped locale override for oracle invocations.
///
/// Shell expansions evaluated by the oracle inherit the ambient locale,
/// which changes the output of common tools and breaks byte comparisons of
/// expanded values. The guard forces `LANG`/`LC_ALL` to `C.UTF-8` and
/// restores the previous values when dropped, on all exit paths.
///
/// Mutating the environment is a process-wide side effect; callers must not
/// overlap oracle invocations (see the crate-level concurrency notes).
pub(crate) struct SanitizedEnvironment {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl SanitizedEnvironment {
    pub(crate) fn enter() -> Self {
        let saved = LOCALE_KEYS
            .iter()
            .map(|&key| {
                let previous = env::var_os(key);
                env::set_var(key, SANITIZED_LOCALE);
                (key, previous)
            })
            .collect();
        Self { saved }
    }
}

impl Drop for SanitizedEnvironment {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..) {
            match previous {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }
}
