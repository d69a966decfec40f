/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(val) => result.push_str(&val),
                    None => {
                        result.push_str("${");
                        result.push_str(name);
                        result.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            // `${}` or an unterminated placeholder: emit literally.
            _ => {
                result.push_str("${");
                rest = after;
            },
        }
    }
    result.push_str(rest);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "MAPION_TEST_USER" => Some("operador".to_string()),
            "MAPION_TEST_HOST" => Some("api.example.com".to_string()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("username = \"${MAPION_TEST_USER}\"", lookup),
            "username = \"operador\""
        );
    }

    #[test]
    fn substitutes_multiple_vars_in_one_value() {
        assert_eq!(
            substitute_env_with("https://${MAPION_TEST_HOST}/u/${MAPION_TEST_USER}", lookup),
            "https://api.example.com/u/operador"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${MAPION_NONEXISTENT_XYZ}", lookup),
            "${MAPION_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn malformed_placeholders_are_literal() {
        assert_eq!(substitute_env_with("a ${ b", lookup), "a ${ b");
        assert_eq!(substitute_env_with("${}", lookup), "${}");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
