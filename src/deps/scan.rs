//! Best-effort static scan of generated source for imported modules.
//!
//! Each line is examined independently; only lines shaped like top-level
//! `import X` or `from X import ...` statements contribute. Conditional or
//! computed imports are invisible to this scan. False negatives are
//! possible; false positives are not.

use std::collections::BTreeSet;

/// Derive the dependency surface of a script from its source text.
///
/// Returns the deduplicated set of leading module names. An empty input
/// yields an empty set.
pub fn scan(code: &str) -> BTreeSet<String> {
    let mut modules = BTreeSet::new();
    for line in code.lines() {
        let clause = line
            .strip_prefix("import ")
            .or_else(|| line.strip_prefix("from "));
        if let Some(name) = clause.and_then(leading_module) {
            modules.insert(name);
        }
    }
    modules
}

/// First module name of an import clause: text up to the first `.` or
/// whitespace, with a trailing comma dropped.
fn leading_module(clause: &str) -> Option<String> {
    let token = clause.split_whitespace().next()?;
    let name = token
        .split('.')
        .next()
        .unwrap_or(token)
        .trim_end_matches(',');
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn import_and_from_lines_contribute_modules() {
        let code = "import os\nfrom collections import OrderedDict\n";
        assert_eq!(scan(code), set(&["os", "collections"]));
    }

    #[test]
    fn empty_input_yields_empty_set() {
        assert_eq!(scan(""), BTreeSet::new());
    }

    #[test]
    fn dotted_imports_reduce_to_the_top_level_module() {
        assert_eq!(scan("import os.path\nfrom os.path import join\n"), set(&["os"]));
    }

    #[test]
    fn duplicates_collapse() {
        let code = "import requests\nimport requests\nfrom requests import get\n";
        assert_eq!(scan(code), set(&["requests"]));
    }

    #[test]
    fn non_import_lines_are_ignored() {
        let code = "x = 1\nprint('import os')\n    import shutil\n# import sys\n";
        assert_eq!(scan(code), BTreeSet::new());
    }

    #[test]
    fn trailing_comma_in_multi_import_is_dropped() {
        assert_eq!(scan("import os, sys\n"), set(&["os"]));
    }

    #[test]
    fn aliased_import_keeps_the_module_name() {
        assert_eq!(scan("import numpy as np\n"), set(&["numpy"]));
    }
}
