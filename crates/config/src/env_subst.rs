/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw config text.
///
/// A placeholder whose variable is unset and has no fallback is left as-is,
/// so a missing queue URL shows up verbatim in validation output.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with a caller-supplied lookup, so tests do not
/// have to mutate the process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: emit the remainder literally.
            result.push_str(&rest[start..]);
            return result;
        };

        let inner = &after[..end];
        let (name, fallback) = match inner.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (inner, None),
        };

        match (name.is_empty(), lookup(name), fallback) {
            (false, Some(value), _) => result.push_str(&value),
            (false, None, Some(fallback)) => result.push_str(fallback),
            _ => {
                result.push_str("${");
                result.push_str(inner);
                result.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "EBWORKER_QUEUE_URL" => Some("https://sqs.eu-west-1.amazonaws.com/1/jobs".into()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("default = \"${EBWORKER_QUEUE_URL}\"", lookup),
            "default = \"https://sqs.eu-west-1.amazonaws.com/1/jobs\""
        );
    }

    #[test]
    fn uses_fallback_for_unset_var() {
        assert_eq!(
            substitute_env_with("${EBWORKER_UNSET:-/internal/worker}", lookup),
            "/internal/worker"
        );
    }

    #[test]
    fn set_var_wins_over_fallback() {
        assert_eq!(
            substitute_env_with("${EBWORKER_QUEUE_URL:-nope}", lookup),
            "https://sqs.eu-west-1.amazonaws.com/1/jobs"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${EBWORKER_NONEXISTENT_XYZ}", lookup),
            "${EBWORKER_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn leaves_unterminated_placeholder() {
        assert_eq!(substitute_env_with("a ${OOPS", lookup), "a ${OOPS");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
