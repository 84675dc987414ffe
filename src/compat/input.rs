//! Parsing of user-supplied project identifiers

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::compat::error::InputError;

/// Shape of a Modrinth project id or slug
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[\w!@$()`.+,"\-']{3,64}$"#).expect("identifier pattern is valid")
});

/// Extract project identifiers, one per line
///
/// A line may be a bare id/slug or a project URL such as
/// `https://modrinth.com/mod/sodium`, in which case the last path segment is
/// used. Blank lines are skipped and duplicates dropped, keeping first-seen
/// order. Any malformed line rejects the whole input.
pub fn parse_project_ids(input: &str) -> Result<Vec<String>, InputError> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let identifier = last_path_segment(line);
        if !IDENTIFIER.is_match(identifier) {
            return Err(InputError::InvalidIdentifier {
                line: index + 1,
                value: line.to_string(),
            });
        }

        if seen.insert(identifier.to_string()) {
            ids.push(identifier.to_string());
        }
    }

    if ids.is_empty() {
        return Err(InputError::Empty);
    }

    Ok(ids)
}

fn last_path_segment(line: &str) -> &str {
    let without_query = line
        .split(['?', '#'])
        .next()
        .unwrap_or(line)
        .trim_end_matches('/');

    without_query
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
}
