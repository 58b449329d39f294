//! Workflow validation tests.
//!
//! Malformed workflows are declared the way users write them and must be
//! rejected with the right code before any run starts.

use relay_core::{is_valid_dag, validate_dag, Dag, Error, ValidationCode, WorkflowDeclaration};

use crate::fixtures::{from_toml, init_tracing, test_task, workflow};

/// Render `(id, depends_on)` pairs as a TOML workflow with placeholder
/// execution parameters. Dependencies are space separated.
fn toml_workflow(tasks: &[(&str, &str)]) -> String {
    let mut doc = String::from("name = \"validation\"\n");
    for (id, deps) in tasks {
        let deps: Vec<String> = deps
            .split_whitespace()
            .map(|d| format!("\"{}\"", d))
            .collect();
        doc.push_str(&format!(
            "\n[[tasks]]\nid = \"{id}\"\nname = \"Task {id}\"\nprompt = \"Do {id}\"\nmodel = \"gpt-4o-mini\"\nprovider = \"openai\"\ndepends_on = [{}]\n",
            deps.join(", "),
            id = id
        ));
    }
    doc
}

fn declared(tasks: &[(&str, &str)]) -> WorkflowDeclaration {
    from_toml(&toml_workflow(tasks))
}

#[test]
fn test_valid_workflow_has_no_errors() {
    init_tracing();
    let wf = declared(&[
        ("fetch", ""),
        ("parse", "fetch"),
        ("index", "fetch"),
        ("report", "parse index"),
    ]);
    assert!(validate_dag(&wf).is_empty());
    assert!(is_valid_dag(&wf));
}

#[test]
fn test_all_tasks_dependent_reports_no_roots_only() {
    let wf = declared(&[("a", "c"), ("b", "a"), ("c", "b")]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ValidationCode::NoRoots);
    assert!(errors[0].message.contains("no root tasks"));
    assert!(!is_valid_dag(&wf));
}

/// A root exists, so the isolated loop is reported as a cycle rather than as
/// unreachable tasks.
#[test]
fn test_isolated_cycle_beside_chain_reports_cycle() {
    let wf = declared(&[
        ("start", ""),
        ("next", "start"),
        ("c1", "c2"),
        ("c2", "c1"),
    ]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ValidationCode::CycleDetected);
    assert_eq!(
        errors[0].cycle.as_deref(),
        Some(&["c1".to_string(), "c2".to_string(), "c1".to_string()][..])
    );
    assert_eq!(errors[0].message, "Cycle detected: c1 → c2 → c1");
    assert_eq!(
        errors[0].to_string(),
        "[CYCLE_DETECTED] Cycle detected: c1 → c2 → c1"
    );
}

#[test]
fn test_cycle_below_root_is_reported_once() {
    let wf = declared(&[("root", ""), ("x", "root z"), ("y", "x"), ("z", "y")]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ValidationCode::CycleDetected);
    assert_eq!(
        errors[0].cycle.clone().unwrap(),
        vec!["x", "y", "z", "x"]
    );
}

#[test]
fn test_disjoint_cycles_are_each_reported() {
    let wf = declared(&[
        ("root", ""),
        ("a1", "a2"),
        ("a2", "a1"),
        ("b1", "b2"),
        ("b2", "b1"),
    ]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.code == ValidationCode::CycleDetected));
}

/// The second loop runs through a task whose other branch already closed a
/// loop.
#[test]
fn test_cycle_off_an_earlier_branch_is_reported() {
    let wf = declared(&[
        ("r", ""),
        ("x", "r y"),
        ("a", "x b"),
        ("b", "a"),
        ("y", "x"),
    ]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].message, "Cycle detected: a → b → a");
    assert_eq!(errors[1].message, "Cycle detected: x → y → x");
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let wf = declared(&[("root", ""), ("loop", "root loop")]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].cycle.clone().unwrap(), vec!["loop", "loop"]);
}

#[test]
fn test_duplicate_ids_report_build_error() {
    let wf = declared(&[("a", ""), ("a", ""), ("b", "a")]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ValidationCode::BuildError);
    assert_eq!(errors[0].message, "Duplicate task IDs: a");

    assert_eq!(
        Dag::build(&wf).unwrap_err(),
        Error::DuplicateTaskIds(vec!["a".to_string()])
    );
}

#[test]
fn test_unknown_dependency_reports_build_error() {
    let wf = declared(&[("a", ""), ("b", "a ghost")]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ValidationCode::BuildError);
    assert_eq!(errors[0].message, "Task b depends on non-existent task: ghost");
}

#[test]
fn test_unknown_dependencies_listed_one_per_line() {
    let wf = declared(&[("a", "ghost"), ("b", "a phantom")]);
    let errors = validate_dag(&wf);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ValidationCode::BuildError);
    assert_eq!(
        errors[0].message.lines().collect::<Vec<_>>(),
        vec![
            "Task a depends on non-existent task: ghost",
            "Task b depends on non-existent task: phantom",
        ]
    );
}

#[test]
fn test_duplicate_dependency_entry_is_tolerated() {
    let wf = workflow(vec![test_task("a", &[]), test_task("b", &["a", "a"])]);
    assert!(is_valid_dag(&wf));

    let dag = Dag::build(&wf).unwrap();
    assert_eq!(dag.execution_phases().unwrap(), vec![vec!["a"], vec!["b"]]);
}

#[test]
fn test_validation_errors_serialize_for_clients() {
    let wf = declared(&[("root", ""), ("x", "y"), ("y", "x")]);
    let errors = validate_dag(&wf);

    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "code": "CYCLE_DETECTED",
            "message": "Cycle detected: x → y → x",
            "cycle": ["x", "y", "x"]
        }])
    );
}

#[test]
fn test_json_declaration_accepts_single_dependency_string() {
    let wf: WorkflowDeclaration = serde_json::from_str(
        r#"{
            "name": "json",
            "tasks": [
                {"id": "a", "name": "A", "prompt": "p", "model": "m", "provider": "openai"},
                {"id": "b", "name": "B", "prompt": "p", "model": "m", "provider": "anthropic",
                 "depends_on": "a", "requires_approval": true}
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(wf.tasks[1].depends_on, vec!["a"]);
    assert!(is_valid_dag(&wf));

    let dag = Dag::build(&wf).unwrap();
    assert!(dag.requires_approval("b"));
    assert_eq!(dag.downstream("a"), ["b".to_string()]);
}

#[test]
fn test_dot_export_lists_tasks() {
    let dag = Dag::build(&declared(&[("fetch", ""), ("report", "fetch")])).unwrap();
    let dot = dag.to_dot();

    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("fetch"));
    assert!(dot.contains("report"));
    assert!(dot.contains("->"));
}
