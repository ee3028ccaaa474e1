use graft_engine::ErrorKind;
use graft_syntax::{Module, SyntaxValidator, TreeSitterValidator};
use graft_test_utils::{method_region, python_block, removal_block, json_block, TempProject};
use pretty_assertions::assert_eq;

#[test]
fn test_add_class_to_header_only_module() {
    let project = TempProject::new();
    project.write("m.py", "# m.py\n");

    let report = project.apply(&python_block("m.py", "class A:\n    def f(self): return 1\n"));

    assert!(report.all_ok(), "{report:?}");
    let text = project.read("m.py");
    assert_eq!(text, "# m.py\nclass A:\n    def f(self): return 1\n");
    assert!(TreeSitterValidator.validate(&text).is_ok());
    let module = Module::parse(&text).unwrap();
    assert_eq!(module.nodes().iter().filter(|n| n.is_class_named("A")).count(), 1);
    let diff = report.records[0].unified_diff.as_deref().unwrap();
    assert!(diff.contains("+class A:"), "{diff}");
}

#[test]
fn test_replace_one_method_keeps_siblings() {
    let project = TempProject::new();
    project.write(
        "m.py",
        "class A:\n    def f(self):\n        return 0\n\n    def g(self):\n        return 2\n",
    );
    let body = format!(
        "class A:\n{}",
        method_region("    def f(self):\n        return 42\n")
    );

    let report = project.apply(&python_block("m.py", &body));

    assert!(report.all_ok(), "{report:?}");
    assert_eq!(
        project.read("m.py"),
        "class A:\n    def f(self):\n        return 42\n\n    def g(self):\n        return 2\n"
    );
}

#[test]
fn test_remove_function_by_json_block() {
    let project = TempProject::new();
    project.write("m.py", "def foo():\n    return 1\n\n\ndef bar():\n    return 2\n");

    let report = project.apply(&removal_block("m.py", &[("function", "foo")]));

    assert!(report.all_ok(), "{report:?}");
    let text = project.read("m.py");
    assert_eq!(text, "def bar():\n    return 2\n");
    assert!(TreeSitterValidator.validate(&text).is_ok());
    assert_eq!(report.records[0].message, "removed 1 of 1 target(s)");
}

#[test]
fn test_dirty_json_removal() {
    let project = TempProject::new();
    project.write("m.py", "class X:\n    pass\n\n\nclass Y:\n    pass\n");
    let body = "{'module_path': 'm.py', 'targets': [{'type':'class','name':'X',},], // remove X\n}";

    let report = project.apply(&json_block(body));

    assert!(report.all_ok(), "{report:?}");
    assert_eq!(project.read("m.py"), "class Y:\n    pass\n");
}

#[test]
fn test_auto_create_missing_module() {
    let project = TempProject::new();

    let report = project.apply(&python_block("new/n.py", "class N:\n    value = 1\n"));

    assert!(report.all_ok(), "{report:?}");
    assert!(project.path("new").is_dir());
    let text = project.read("new/n.py");
    assert!(text.contains("class N:"), "{text}");
    assert!(text.contains("value = 1"), "{text}");
    assert!(text.starts_with("# new/n.py\n"), "{text}");
    assert!(TreeSitterValidator.validate(&text).is_ok());
    assert!(!project.exists("new/n.py.bak"));
    let diff = report.records[0].unified_diff.as_deref().unwrap();
    assert!(diff.contains("@@ -0,0 +1,"), "{diff}");
}

#[test]
fn test_missing_module_without_auto_create() {
    let project = TempProject::new();
    let (controller, _) = project.controller(project.config().with_create_missing_modules(false));

    let report = controller.run_text(&python_block("absent.py", "x = 1\n"));

    assert_eq!(report.records[0].error_kind, Some(ErrorKind::Io));
    assert!(!project.exists("absent.py"));
}

#[test]
fn test_removal_never_creates_modules() {
    let project = TempProject::new();

    let report = project.apply(&removal_block("absent.py", &[("class", "X")]));

    assert_eq!(report.records[0].error_kind, Some(ErrorKind::Io));
    assert!(!project.exists("absent.py"));
}

#[test]
fn test_broken_block_fails_alone() {
    let project = TempProject::new();
    project.write("m.py", "def f():\n    return 1\n");
    project.write("other.py", "x = 1\n");
    let input = format!(
        "{}\nand then\n\n{}",
        python_block("m.py", "def f():\nreturn 2\n"),
        python_block("other.py", "y = 2\n"),
    );

    let report = project.apply(&input);

    assert_eq!(report.records.len(), 2);
    assert!(!report.records[0].ok);
    assert_eq!(report.records[0].error_kind, Some(ErrorKind::Parse));
    assert_eq!(project.read("m.py"), "def f():\n    return 1\n");
    assert!(!project.exists("m.py.bak"));
    assert!(report.records[1].ok);
    assert_eq!(project.read("other.py"), "x = 1\ny = 2\n");
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_rejected_by_external_validator() {
    let project = TempProject::new();
    project.write("m.py", "x = 1\n");
    let config = project.config().with_validator_command(vec!["false".into()]);
    let (controller, _) = project.controller(config);

    let report = controller.run_text(&python_block("m.py", "y = 2\n"));

    assert_eq!(report.records[0].error_kind, Some(ErrorKind::Validation));
    assert_eq!(project.read("m.py"), "x = 1\n");
}

#[test]
fn test_statements_compile_rejects_fail_validation() {
    let project = TempProject::new();
    project.write("m.py", "x = 1\n");

    for body in ["print \"legacy\"\n", "return x\n", "break\n"] {
        let report = project.apply(&python_block("m.py", body));
        assert_eq!(report.records[0].error_kind, Some(ErrorKind::Validation), "{body}");
        assert_eq!(project.read("m.py"), "x = 1\n");
    }
}

#[test]
fn test_unknown_class_is_integration_error() {
    let project = TempProject::new();
    project.write("m.py", "class A:\n    pass\n");
    let body = format!("class B:\n{}", method_region("    def f(self):\n        pass\n"));

    let report = project.apply(&python_block("m.py", &body));

    assert_eq!(report.records[0].error_kind, Some(ErrorKind::Integration));
    assert_eq!(project.read("m.py"), "class A:\n    pass\n");
}

#[test]
fn test_redefinition_leaves_one_node() {
    let project = TempProject::new();
    project.write(
        "m.py",
        "import os\n\nLIMIT = 1\n\n\ndef helper():\n    return os.sep\n\n\nclass A:\n    pass\n",
    );

    let report = project.apply(&python_block(
        "m.py",
        "import sys\n\nLIMIT = 2\n\n\ndef helper():\n    return sys.platform\n",
    ));

    assert!(report.all_ok(), "{report:?}");
    assert_eq!(
        project.read("m.py"),
        "import os\nimport sys\n\nLIMIT = 2\n\n\ndef helper():\n    return sys.platform\n\n\nclass A:\n    pass\n"
    );
}

#[test]
fn test_header_comments_survive() {
    let project = TempProject::new();
    let header = "#!/usr/bin/env python\n# Copyright (c) Example\n# SPDX-License-Identifier: MIT\n";
    project.write("tool.py", &format!("{header}\nimport os\n"));

    let report = project.apply(&python_block("tool.py", "def main():\n    return os.getcwd()\n"));

    assert!(report.all_ok(), "{report:?}");
    let text = project.read("tool.py");
    assert!(text.starts_with(header), "{text}");
    assert_eq!(
        text,
        format!("{header}\nimport os\n\n\ndef main():\n    return os.getcwd()\n")
    );
}

#[test]
fn test_formatter_runs_when_enabled() {
    let project = TempProject::new();
    project.write("m.py", "x = 1   \n");
    let (controller, _) = project.controller(project.config().with_formatting(true));

    let report = controller.run_text(&python_block("m.py", "y = 2\n"));

    assert!(report.all_ok(), "{report:?}");
    assert_eq!(project.read("m.py"), "x = 1\ny = 2\n");
}

#[test]
fn test_formatter_failure_is_a_warning() {
    let project = TempProject::new();
    project.write("m.py", "x = 1\n");
    let config = project
        .config()
        .with_formatting(true)
        .with_formatter_command(vec!["graft-no-such-formatter-xyz".into()]);
    let (controller, sink) = project.controller(config);

    let report = controller.run_text(&python_block("m.py", "y = 2\n"));

    assert!(report.all_ok(), "{report:?}");
    assert_eq!(project.read("m.py"), "x = 1\ny = 2\n");
    let warnings = sink.messages(graft_engine::EventLevel::Warn);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("keeping unformatted text"));
}

#[test]
fn test_repeated_statements_all_survive() {
    let project = TempProject::new();
    project.write("m.py", "setup()\nX = 1\nsetup()\n");

    let report = project.apply(&python_block("m.py", "setup()\nY = 2\n"));

    assert!(report.all_ok(), "{report:?}");
    assert_eq!(project.read("m.py"), "setup()\nX = 1\nsetup()\nY = 2\n");
}

#[test]
fn test_repeated_separator_comments_survive() {
    let project = TempProject::new();
    let original = "A = 1\n\n# ----\n\nB = 2\n\n# ----\n\nC = 3\n";
    project.write("m.py", original);

    let report = project.apply(&python_block("m.py", "D = 4\n\n# ----\n\nE = 5\n"));

    assert!(report.all_ok(), "{report:?}");
    let text = project.read("m.py");
    assert!(text.starts_with(original), "{text}");
    assert_eq!(text.matches("# ----").count(), 2, "{text}");
    assert!(text.contains("D = 4") && text.contains("E = 5"), "{text}");

    let again = project.apply(&python_block("m.py", "D = 4\n\n# ----\n\nE = 5\n"));
    assert!(again.all_ok(), "{again:?}");
    assert_eq!(project.read("m.py"), text);
}

#[test]
fn test_comment_on_first_incoming_statement_kept() {
    let project = TempProject::new();
    project.write("m.py", "x = 1\n");

    let body = "# Builds the greeting\ndef greet():\n    return 'hi'\n";
    let report = project.apply(&python_block("m.py", body));

    assert!(report.all_ok(), "{report:?}");
    let text = project.read("m.py");
    assert!(text.contains("\n# Builds the greeting\ndef greet():\n"), "{text}");
    let module = Module::parse(&text).unwrap();
    let greet = module.find_function("greet").unwrap();
    assert!(greet.text().starts_with("# Builds the greeting\n"));
}

#[test]
fn test_detached_incoming_header_dropped() {
    let project = TempProject::new();
    project.write("m.py", "x = 1\n");

    let body = "# generated helpers\n\n# Doubles a number\ndef double(n):\n    return n * 2\n";
    let report = project.apply(&python_block("m.py", body));

    assert!(report.all_ok(), "{report:?}");
    let text = project.read("m.py");
    assert!(!text.contains("generated helpers"), "{text}");
    assert!(text.contains("# Doubles a number\ndef double(n):"), "{text}");
}
