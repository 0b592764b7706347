// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;

/// Resolves `${VAR_NAME}` and `${VAR_NAME:-fallback}` references in a string
/// from environment variables.
///
/// A plain reference to an unset variable is an error. The `:-` form falls
/// back to the literal after the separator (possibly empty), which is how an
/// optional API key is written: `api_key: "${GEMINI_API_KEY:-}"`.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut body = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                body.push(c);
            }
            if !found_close || body.is_empty() {
                // Malformed interpolation -- treat literally
                result.push('$');
                result.push('{');
                result.push_str(&body);
                continue;
            }

            let (var_name, fallback) = match body.split_once(":-") {
                Some((name, fallback)) => (name, Some(fallback)),
                None => (body.as_str(), None),
            };

            match (std::env::var(var_name), fallback) {
                (Ok(value), _) if !value.is_empty() || fallback.is_none() => {
                    result.push_str(&value)
                }
                _ => match fallback {
                    Some(fallback) => result.push_str(fallback),
                    None => {
                        return Err(ConfigError::UndefinedVariable {
                            name: var_name.to_string(),
                        })
                    }
                },
            }
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
