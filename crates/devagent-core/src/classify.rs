//! Textual failure detection. Collaborators report failure only as text, so
//! the verdict is a pure function of the execution output.

use devagent_sandbox::ERROR_TAG;
use regex::{Regex, RegexSet};
use std::sync::LazyLock;

/// Case-sensitive markers; any match marks the output as failing.
pub const FAILURE_PATTERNS: [&str; 5] = [
    r"\[ERROR\]",
    r"Traceback \(most recent call last\)",
    r"Error:",
    r"Exception:",
    r"SyntaxError:",
];

static FAILURE_SET: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(FAILURE_PATTERNS).expect("failure patterns are valid regexes")
});

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bline (\d+)|\[stdin\]:(\d+)|<anonymous>:(\d+))")
        .expect("error line pattern is valid")
});

pub fn is_failure(output: &str) -> bool {
    FAILURE_SET.is_match(output)
}

/// Indices into [`FAILURE_PATTERNS`] that matched, for diagnostics.
pub fn matched_patterns(output: &str) -> Vec<&'static str> {
    FAILURE_SET
        .matches(output)
        .into_iter()
        .map(|idx| FAILURE_PATTERNS[idx])
        .collect()
}

/// First source line number mentioned by a failure report.
pub fn extract_error_line(output: &str) -> Option<u32> {
    let caps = ERROR_LINE.captures(output)?;
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .and_then(|m| m.as_str().parse().ok())
}

/// First non-empty line of a failure report, without the error tag.
pub fn error_summary(output: &str) -> &str {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix(ERROR_TAG).unwrap_or(line).trim_start())
        .unwrap_or("unknown error")
}

pub fn probable_cause(output: &str) -> &'static str {
    if output.contains("ReferenceError") {
        "Undefined variable or symbol usage."
    } else if output.contains("TypeError") {
        "Invalid operation on value type (often null/undefined access)."
    } else if output.contains("SyntaxError") {
        "The script contains invalid syntax."
    } else if output.contains("RangeError") || output.contains("RuntimeLimit") {
        "A value or resource limit was exceeded (invalid length, runaway loop or recursion)."
    } else if output.contains("generation failed") || output.contains("correction failed") {
        "The model could not be reached; the script is a placeholder."
    } else {
        "General execution failure; inspect the exact error text."
    }
}

#[cfg(test)]
mod tests {
    use super::{error_summary, extract_error_line, is_failure, matched_patterns, probable_cause};

    #[test]
    fn clean_output_passes() {
        assert!(!is_failure("Hello World"));
        assert!(!is_failure(""));
        assert!(!is_failure("error: lowercase is not a marker"));
    }

    #[test]
    fn each_marker_fails() {
        for output in [
            "[ERROR] boom",
            "Traceback (most recent call last):\n  File x",
            "ValueError: bad",
            "Exception: nope",
            "SyntaxError: unexpected token",
        ] {
            assert!(is_failure(output), "expected failure for {output:?}");
        }
    }

    #[test]
    fn markers_are_case_sensitive() {
        assert!(!is_failure("[error] boom"));
        assert!(!is_failure("traceback (most recent call last)"));
        assert!(!is_failure("ERROR: shouting"));
    }

    #[test]
    fn legitimate_text_can_false_positive() {
        assert!(is_failure("Report: Error: none found"));
    }

    #[test]
    fn verdict_is_stable() {
        let output = "[ERROR] failed evaluating <sandbox>: TypeError: x";
        assert_eq!(is_failure(output), is_failure(output));
        assert_eq!(matched_patterns(output), vec![r"\[ERROR\]", "Error:"]);
    }

    #[test]
    fn finds_error_lines() {
        assert_eq!(extract_error_line("SyntaxError: bad token at line 12, col 4"), Some(12));
        assert_eq!(extract_error_line("[stdin]:3\n    throw err"), Some(3));
        assert_eq!(extract_error_line("TypeError: nothing here"), None);
    }

    #[test]
    fn summary_skips_tag_and_blank_lines() {
        assert_eq!(error_summary("\n[ERROR] TypeError: x\nmore"), "TypeError: x");
        assert_eq!(error_summary("   "), "unknown error");
    }

    #[test]
    fn causes_follow_error_class() {
        assert!(probable_cause("ReferenceError: y is not defined").contains("Undefined"));
        assert!(probable_cause("RuntimeLimit: Maximum loop").contains("limit"));
        assert!(probable_cause("weird").contains("General"));
    }
}
