//! Tracing bootstrap for the smoke binary.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,inbox_smoke=debug,inbox_runtime=debug";

/// Variables consulted for filter directives, highest precedence first.
const FILTER_KEYS: [&str; 2] = ["RUST_LOG", "INBOX_LOG"];

/// Install the global tracing subscriber and return the directives in effect.
pub fn init() -> String {
    let directives = resolve_directives(|key| env::var(key).ok());
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(EnvFilter::new(&directives))
        .try_init();
    directives
}

/// First non-blank directive set that parses, else the built-in default.
fn resolve_directives<F>(mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    FILTER_KEYS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn directives_from_pairs(pairs: &[(&str, &str)]) -> String {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        resolve_directives(|key| map.get(key).cloned())
    }

    #[test]
    fn rust_log_takes_precedence() {
        let directives = directives_from_pairs(&[("RUST_LOG", "warn"), ("INBOX_LOG", "trace")]);
        assert_eq!(directives, "warn");
    }

    #[test]
    fn falls_back_to_inbox_log_when_rust_log_is_blank() {
        let directives =
            directives_from_pairs(&[("RUST_LOG", "   "), ("INBOX_LOG", "inbox_runtime=trace")]);
        assert_eq!(directives, "inbox_runtime=trace");
    }

    #[test]
    fn skips_directives_that_do_not_parse() {
        let directives =
            directives_from_pairs(&[("RUST_LOG", "inbox_runtime=loud"), ("INBOX_LOG", "debug")]);
        assert_eq!(directives, "debug");
    }

    #[test]
    fn uses_default_when_unset() {
        assert_eq!(directives_from_pairs(&[]), DEFAULT_DIRECTIVES);
    }
}
