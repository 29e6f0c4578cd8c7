//! Environment variable expansion for config and scenario files.

use regex_lite::{Captures, Regex};

/// Expand `${VAR_NAME}` patterns with environment variable values.
///
/// Unset variables are left as written so the parse error downstream
/// names the missing variable.
pub fn expand_env(s: &str) -> String {
    let Ok(re) = Regex::new(r"\$\{([^}]+)\}") else {
        return s.to_string();
    };

    re.replace_all(s, |caps: &Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
