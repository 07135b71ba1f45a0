//! Harness generation
//!
//! Wraps user code into a complete program for one language. The language's
//! harness template receives the code verbatim at `{{code}}` and the test
//! cases, rendered through the case template, at `{{cases}}`. Generation is a
//! pure text transform: identical inputs always produce identical output.

use std::fmt::Write;

use thiserror::Error;

use crate::config::Language;
use crate::types::TestCase;

mod syntax;
mod template;

pub use syntax::check_balanced;
pub use template::{
    CASE_SLOTS, CaseTemplate, HARNESS_SLOTS, HarnessTemplate, Template, TemplateError,
};

/// Reasons user code is rejected before anything runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error("code is empty")]
    EmptyCode,

    #[error("code is {len} bytes, limit is {max}")]
    CodeTooLarge { len: usize, max: usize },

    #[error("no test cases to run")]
    NoTestCases,

    #[error("unexpected '{found}' on line {line}")]
    Unbalanced { found: char, line: usize },

    #[error("expected '{expected}' but found '{found}' on line {line}")]
    Mismatched {
        expected: char,
        found: char,
        line: usize,
    },

    #[error("'{delimiter}' opened on line {line} is never closed")]
    Unclosed { delimiter: char, line: usize },

    #[error("unterminated string literal starting on line {line}")]
    UnterminatedString { line: usize },

    #[error("unterminated block comment starting on line {line}")]
    UnterminatedComment { line: usize },
}

/// Render the test cases into the language's literal syntax
pub fn render_cases(language: &Language, cases: &[TestCase]) -> String {
    let harness = &language.harness;
    let mut out = String::new();
    let mut args = String::new();

    for (i, case) in cases.iter().enumerate() {
        if i > 0 {
            out.push_str(&harness.case_separator);
        }

        args.clear();
        for (j, arg) in case.args.iter().enumerate() {
            if j > 0 {
                args.push_str(", ");
            }
            let _ = write!(args, "{arg}");
        }

        let expected = case.expected.to_string();
        harness.case.render_into(&mut out, &[&args, &expected]);
    }

    out
}

/// Generate the harness program for `code` in `language`.
pub fn generate(
    language: &Language,
    code: &str,
    cases: &[TestCase],
) -> Result<String, HarnessError> {
    if code.trim().is_empty() {
        return Err(HarnessError::EmptyCode);
    }
    if cases.is_empty() {
        return Err(HarnessError::NoTestCases);
    }
    if language.harness.check_syntax {
        check_balanced(code, &language.harness.comments)?;
    }

    let cases = render_cases(language, cases);
    Ok(language.harness.template.render(&[code, &cases]))
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::config::Config;

    proptest! {
        #[test]
        fn rendered_cases_contain_every_expected_value(
            cases in prop::collection::vec(
                (prop::collection::vec(any::<i64>(), 1..4), any::<i64>()),
                1..8,
            )
        ) {
            let config = Config::default();
            let lang = config.get_language("python").unwrap();
            let cases: Vec<TestCase> = cases
                .into_iter()
                .map(|(args, expected)| TestCase::new(args, expected))
                .collect();
            let rendered = render_cases(lang, &cases);
            for case in &cases {
                let needle = format!("\"expected\": {}", case.expected);
                prop_assert!(rendered.contains(&needle));
            }
        }

        #[test]
        fn generate_never_panics(code in "\\PC*") {
            let config = Config::default();
            let lang = config.get_language("javascript").unwrap();
            let _ = generate(lang, &code, &TestCase::defaults());
        }
    }
}
