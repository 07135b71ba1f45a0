use judgebox::harness::{self, HarnessError};
use judgebox::{Config, RunError, Runner, TestCase};

use super::fixture_source;

#[test]
fn test_generate_embeds_code_and_cases_for_every_language() {
    let runner = Runner::with_defaults();
    let sources = [
        ("python", "add_correct.py"),
        ("javascript", "add_correct.js"),
        ("csharp", "add_correct.cs"),
    ];

    for (language, file) in sources {
        let code = fixture_source(file);
        let program = runner
            .generate(&code, language)
            .unwrap_or_else(|e| panic!("{language}: {e}"));

        assert!(program.contains(code.trim_end()), "{language}: code missing");
        assert!(program.contains("5, 7"), "{language}: first case missing");
        assert!(program.contains("-5, -3"), "{language}: second case missing");
        assert!(program.contains("-8"), "{language}: expected value missing");
        assert!(program.contains("passed "), "{language}: summary missing");
    }
}

#[test]
fn test_generate_is_deterministic() {
    let runner = Runner::with_defaults();
    let code = fixture_source("add_correct.js");

    let first = runner.generate(&code, "javascript").unwrap();
    let second = runner.generate(&code, "javascript").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_generate_rejects_unbalanced_csharp() {
    let runner = Runner::with_defaults();
    let code = fixture_source("add_unbalanced.cs");

    match runner.generate(&code, "csharp") {
        Err(RunError::Harness(HarnessError::Unclosed { delimiter, .. })) => {
            assert_eq!(delimiter, '{');
        }
        other => panic!("expected an unclosed delimiter, got {other:?}"),
    }
}

#[test]
fn test_generate_rejects_empty_code() {
    let runner = Runner::with_defaults();
    assert!(matches!(
        runner.generate("   \n", "python"),
        Err(RunError::Harness(HarnessError::EmptyCode))
    ));
}

#[test]
fn test_generate_with_custom_cases() {
    let config = Config::default();
    let python = config.get_language("python").unwrap();
    let cases = [TestCase::new([1, 2], 3), TestCase::new([0, 0], 0)];

    let program = harness::generate(python, &fixture_source("add_correct.py"), &cases).unwrap();
    assert!(program.contains(r#"{"args": [1, 2], "expected": 3}"#));
    assert!(program.contains(r#"{"args": [0, 0], "expected": 0}"#));
    assert!(!program.contains("5, 7"));
}

#[test]
fn test_code_with_slot_text_is_not_expanded() {
    let runner = Runner::with_defaults();
    let code = "def add(a, b):\n    # {{cases}}\n    return a + b\n";

    let program = runner.generate(code, "python").unwrap();
    assert_eq!(program.matches("# {{cases}}").count(), 1);
    assert_eq!(program.matches(r#""expected": 12"#).count(), 1);
}

#[test]
fn test_defaults_shared_across_languages() {
    assert_eq!(
        TestCase::defaults(),
        vec![TestCase::new([5, 7], 12), TestCase::new([-5, -3], -8)]
    );
}
