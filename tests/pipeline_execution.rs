// tests/pipeline_execution.rs

mod common;

use std::error::Error;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Value, json};
use tempfile::tempdir;

use checkflow::checkpoint::{CheckpointCache, hashes_key};
use checkflow::errors::CheckflowError;
use checkflow::expire;
use checkflow::fs::mock::MockFileSystem;
use checkflow::{
    ExecuteOptions, Expiry, HashSource, Pipeline, SchedulingError, Task, TaskRunState, Upstream,
    UpstreamFailure,
};
use checkflow_test_utils::builders::{
    RunCounter, constant_task, failing_task, readme_tasks,
};
use common::{build_pipeline, init_tracing, memory_pipeline};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn readme_pipeline_runs_then_second_instance_reuses_checkpoints() -> TestResult {
    init_tracing();
    let dir = tempdir()?;

    let expected = json!(["Some", "values", "more", "values"]);

    {
        let (zero, one, zero_runs, one_runs) = readme_tasks();
        let mut first = build_pipeline(dir.path(), "readme", vec![zero, one])?;
        let summary = first.execute(&ExecuteOptions::default())?;

        assert_eq!(summary.executed, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(first.get_task("One")?.result(), Some(&expected));
        assert_eq!((zero_runs.count(), one_runs.count()), (1, 1));
    }

    let (zero, one, zero_runs2, one_runs2) = readme_tasks();
    let mut second = build_pipeline(dir.path(), "readme", vec![zero, one])?;
    let summary = second.execute(&ExecuteOptions::default())?;

    assert_eq!(summary.skipped, 2);
    assert_eq!(second.get_task("Zero")?.state(), TaskRunState::SkippedCached);
    assert_eq!(second.get_task("One")?.state(), TaskRunState::SkippedCached);
    assert!(second.get_task("One")?.is_skipped());
    assert!(!second.get_task("One")?.is_executed());
    assert_eq!(second.get_task("One")?.result(), Some(&expected));
    assert_eq!((zero_runs2.count(), one_runs2.count()), (0, 0));
    Ok(())
}

#[test]
fn run_reads_upstream_result_and_calls_auxiliary_operation() -> TestResult {
    init_tracing();
    let (zero, one, _, _) = readme_tasks();
    let mut pipeline = memory_pipeline("aux", vec![zero, one])?;
    pipeline.execute(&ExecuteOptions::default())?;

    let one = pipeline.get_task("One")?;
    let ops: Vec<&str> = one.timings().iter().map(|t| t.operation.as_str()).collect();
    assert_eq!(ops, vec!["preflight", "run"]);

    let data: Vec<String> = one.result_as()?;
    assert_eq!(data, vec!["Some", "values", "more", "values"]);
    Ok(())
}

#[test]
fn force_evicts_results_and_reruns_everything() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let (zero, one, zero_runs, one_runs) = readme_tasks();
    let mut pipeline = build_pipeline(dir.path(), "force", vec![zero, one])?;

    pipeline.execute(&ExecuteOptions::default())?;
    let cached = pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(cached.skipped, 2);

    let forced = pipeline.execute(&ExecuteOptions::new().force(true))?;
    assert_eq!(forced.executed, 2);
    assert_eq!(pipeline.get_task("One")?.state(), TaskRunState::Executed);
    assert_eq!((zero_runs.count(), one_runs.count()), (2, 2));
    Ok(())
}

#[test]
fn force_task_bypasses_its_checkpoint_only() -> TestResult {
    init_tracing();
    let (zero, one, zero_runs, one_runs) = readme_tasks();
    let mut pipeline = memory_pipeline("force-one", vec![zero, one])?;

    pipeline.execute(&ExecuteOptions::default())?;
    pipeline.execute(&ExecuteOptions::new().force_tasks(["One"]))?;

    assert_eq!(pipeline.get_task("Zero")?.state(), TaskRunState::SkippedCached);
    assert_eq!(pipeline.get_task("One")?.state(), TaskRunState::Executed);
    assert_eq!((zero_runs.count(), one_runs.count()), (1, 2));
    Ok(())
}

#[test]
fn explicit_skip_never_touches_the_task() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let task = constant_task("A", &[], json!(1), &runs);
    let mut pipeline = memory_pipeline("skip", vec![task])?;

    let summary = pipeline.execute(&ExecuteOptions::new().skip_tasks(["A"]))?;

    assert_eq!(pipeline.get_task("A")?.state(), TaskRunState::SkippedExplicit);
    assert_eq!(pipeline.get_task("A")?.result(), None);
    assert_eq!(summary.skipped, 1);
    assert_eq!(runs.count(), 0);
    assert_eq!(pipeline.get_result("A")?, None);
    Ok(())
}

#[test]
fn force_wins_over_skip() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let task = constant_task("A", &[], json!(1), &runs);
    let mut pipeline = memory_pipeline("skip-force", vec![task])?;

    pipeline.execute(
        &ExecuteOptions::new()
            .skip_tasks(["A"])
            .force_tasks(["A"]),
    )?;

    assert_eq!(pipeline.get_task("A")?.state(), TaskRunState::Executed);
    assert_eq!(runs.count(), 1);
    Ok(())
}

#[test]
fn persistent_ignored_and_forced_sets_merge_with_call_options() -> TestResult {
    init_tracing();
    let a_runs = RunCounter::new();
    let b_runs = RunCounter::new();
    let mut pipeline = memory_pipeline(
        "sets",
        vec![
            constant_task("A", &[], json!("a"), &a_runs),
            constant_task("B", &[], json!("b"), &b_runs),
        ],
    )?;

    pipeline.set_ignored(["A"]);
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_task("A")?.state(), TaskRunState::SkippedExplicit);
    assert_eq!(pipeline.get_task("B")?.state(), TaskRunState::Executed);

    pipeline.set_forced(["A", "B"]);
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_task("A")?.state(), TaskRunState::Executed);
    assert_eq!(pipeline.get_task("B")?.state(), TaskRunState::Executed);

    pipeline.clear_forced();
    pipeline.clear_ignored();
    assert!(pipeline.forced().is_empty());
    assert!(pipeline.ignored().is_empty());

    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_task("A")?.state(), TaskRunState::SkippedCached);
    assert_eq!((a_runs.count(), b_runs.count()), (1, 2));
    Ok(())
}

#[test]
fn upstream_failure_skips_dependents_transitively() -> TestResult {
    init_tracing();
    let a = RunCounter::new();
    let b = RunCounter::new();
    let c = RunCounter::new();
    let d = RunCounter::new();

    let mut pipeline = memory_pipeline(
        "failure",
        vec![
            failing_task("A", &[], &a),
            constant_task("B", &["A"], json!("b"), &b),
            constant_task("C", &["B"], json!("c"), &c),
            constant_task("D", &[], json!("d"), &d),
        ],
    )?;

    let summary = pipeline.execute(&ExecuteOptions::default())?;

    assert_eq!(pipeline.get_task("A")?.state(), TaskRunState::Failed);
    assert_eq!(pipeline.get_task("B")?.state(), TaskRunState::SkippedUpstreamFailed);
    assert_eq!(pipeline.get_task("C")?.state(), TaskRunState::SkippedUpstreamFailed);
    assert_eq!(pipeline.get_task("D")?.state(), TaskRunState::Executed);
    assert_eq!((a.count(), b.count(), c.count(), d.count()), (1, 0, 0, 1));

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.state_of("B"), Some(TaskRunState::SkippedUpstreamFailed));

    let a_error = pipeline.get_task("A")?.error().unwrap_or_default().to_string();
    assert!(a_error.contains("A exploded"), "{a_error}");
    let b_error = pipeline.get_task("B")?.error().unwrap_or_default().to_string();
    assert!(b_error.contains("upstream task 'A' failed"), "{b_error}");

    assert!(pipeline.failures().contains("A"));
    assert!(!pipeline.failures().contains("D"));
    assert!(!pipeline.is_complete());
    Ok(())
}

#[test]
fn skip_policy_runs_despite_failed_upstream() -> TestResult {
    init_tracing();
    let a = RunCounter::new();
    let b = RunCounter::new();
    let lenient = constant_task("B", &["A"], json!("still here"), &b)
        .on_upstream_failure(UpstreamFailure::Skip);

    let mut pipeline = memory_pipeline("lenient", vec![failing_task("A", &[], &a), lenient])?;
    pipeline.execute(&ExecuteOptions::default())?;

    assert_eq!(pipeline.get_task("B")?.state(), TaskRunState::Executed);
    assert_eq!(pipeline.get_task("B")?.result(), Some(&json!("still here")));
    assert_eq!(b.count(), 1);
    Ok(())
}

#[test]
fn failed_task_is_not_checkpointed() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let mut pipeline = memory_pipeline("no-checkpoint", vec![failing_task("A", &[], &runs)])?;

    pipeline.execute(&ExecuteOptions::default())?;
    pipeline.execute(&ExecuteOptions::default())?;

    assert_eq!(runs.count(), 2);
    assert!(pipeline.cache().keys()?.is_empty());
    Ok(())
}

#[test]
fn cycle_is_reported_before_any_task_runs() -> TestResult {
    init_tracing();
    let a = RunCounter::new();
    let b = RunCounter::new();
    let c = RunCounter::new();
    let mut pipeline = memory_pipeline(
        "cycle",
        vec![
            constant_task("Root", &[], json!(0), &c),
            constant_task("A", &["B"], json!(1), &a),
            constant_task("B", &["A"], json!(2), &b),
        ],
    )?;

    let err = pipeline
        .execute(&ExecuteOptions::default())
        .expect_err("cycle must be rejected");

    match err {
        CheckflowError::Scheduling(SchedulingError::Cycle(members)) => {
            assert_eq!(members, vec!["A".to_string(), "B".to_string()]);
        }
        other => panic!("expected cycle error, got {other:?}"),
    }
    assert_eq!((a.count(), b.count(), c.count()), (0, 0, 0));
    Ok(())
}

#[test]
fn unknown_dependency_is_a_scheduling_error() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let mut pipeline = memory_pipeline("ghost", vec![constant_task("A", &["Ghost"], json!(1), &runs)])?;

    let err = pipeline
        .execute(&ExecuteOptions::default())
        .expect_err("unknown dependency must be rejected");

    assert!(matches!(
        err,
        CheckflowError::Scheduling(SchedulingError::UnknownDependency { ref task, ref dependency })
            if task == "A" && dependency == "Ghost"
    ));
    assert_eq!(runs.count(), 0);
    Ok(())
}

#[test]
fn duplicate_names_are_rejected_at_add_time() -> TestResult {
    let runs = RunCounter::new();
    let mut builder = Pipeline::builder("dupes").in_memory();
    builder.add(constant_task("A", &[], json!(1), &runs))?;

    let err = builder
        .add(constant_task("A", &[], json!(2), &runs))
        .expect_err("duplicate must be rejected");

    assert!(matches!(
        err,
        CheckflowError::Scheduling(SchedulingError::DuplicateTask(ref name)) if name == "A"
    ));
    Ok(())
}

#[test]
fn hash_record_suffix_is_reserved_for_task_names() -> TestResult {
    let runs = RunCounter::new();
    let mut builder = Pipeline::builder("reserved").in_memory();
    builder.add(constant_task("A", &[], json!(1), &runs))?;

    let err = builder
        .add(constant_task("A_hashes", &[], json!(2), &runs))
        .expect_err("reserved suffix must be rejected");
    assert!(matches!(
        err,
        CheckflowError::Scheduling(SchedulingError::ReservedTaskName(ref name)) if name == "A_hashes"
    ));

    builder.add(constant_task("hashes", &[], json!(3), &runs))?;
    let mut pipeline = builder.build()?;
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_result("A")?, Some(json!(1)));
    assert!(pipeline.cache().stored_hashes("A")?.is_some());
    Ok(())
}

#[test]
fn validation_reports_every_task_without_run() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let mut pipeline = memory_pipeline(
        "validation",
        vec![
            Task::new("First"),
            constant_task("Fine", &[], json!(1), &runs),
            Task::new("Second"),
        ],
    )?;

    let err = pipeline
        .execute(&ExecuteOptions::default())
        .expect_err("validation must fail");

    match err {
        CheckflowError::Validation { missing_run } => {
            assert_eq!(missing_run, vec!["First".to_string(), "Second".to_string()]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(
        CheckflowError::Validation {
            missing_run: vec!["First".into(), "Second".into()]
        }
        .to_string()
        .contains("First, Second")
    );
    assert_eq!(runs.count(), 0);
    Ok(())
}

#[test]
fn changed_input_invalidates_checkpoint() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("data/input.csv", "a,b\n1,2\n");

    let runs = RunCounter::new();
    let task = constant_task("Load", &[], json!("loaded"), &runs).inputs(["data/input.csv"]);

    let mut builder = Pipeline::builder("inputs")
        .in_memory()
        .filesystem(Arc::new(fs.clone()));
    builder.add(task)?;
    let mut pipeline = builder.build()?;

    pipeline.execute(&ExecuteOptions::default())?;
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_task("Load")?.state(), TaskRunState::SkippedCached);

    fs.add_file("data/input.csv", "a,b\n1,3\n");
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_task("Load")?.state(), TaskRunState::Executed);
    assert_eq!(runs.count(), 2);

    // An input that disappears hashes to the error sentinel, which also
    // invalidates.
    fs.remove_file("data/input.csv");
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(runs.count(), 3);
    Ok(())
}

#[test]
fn glob_inputs_track_new_files() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("raw/2024.csv", "x");

    let runs = RunCounter::new();
    let task = constant_task("Ingest", &[], json!(null), &runs)
        .expire(expire::never())
        .inputs([checkflow::HashSource::glob("raw", "*.csv")]);

    let mut builder = Pipeline::builder("globs")
        .in_memory()
        .filesystem(Arc::new(fs.clone()));
    builder.add(task)?;
    let mut pipeline = builder.build()?;

    pipeline.execute(&ExecuteOptions::default())?;
    fs.add_file("raw/notes.txt", "ignored");
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(runs.count(), 1);

    fs.add_file("raw/2025.csv", "y");
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(runs.count(), 2);
    Ok(())
}

#[test]
fn changed_script_version_invalidates_checkpoint() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let runs = RunCounter::new();

    let v1 = constant_task("T", &[], json!(1), &runs).script_version("v1");
    let mut first = build_pipeline(dir.path(), "script", vec![v1])?;
    first.execute(&ExecuteOptions::default())?;

    let v1_again = constant_task("T", &[], json!(1), &runs).script_version("v1");
    let mut same = build_pipeline(dir.path(), "script", vec![v1_again])?;
    same.execute(&ExecuteOptions::default())?;
    assert_eq!(same.get_task("T")?.state(), TaskRunState::SkippedCached);

    let v2 = constant_task("T", &[], json!(2), &runs).script_version("v2");
    let mut changed = build_pipeline(dir.path(), "script", vec![v2])?;
    changed.execute(&ExecuteOptions::default())?;
    assert_eq!(changed.get_task("T")?.state(), TaskRunState::Executed);
    assert_eq!(changed.get_result("T")?, Some(json!(2)));
    assert_eq!(runs.count(), 2);
    Ok(())
}

#[test]
fn inline_script_source_invalidates_checkpoint() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let runs = RunCounter::new();
    let task = |body: &str| {
        constant_task("T", &[], json!(body), &runs).script(HashSource::bytes(body))
    };

    let mut first = build_pipeline(dir.path(), "inline", vec![task("print(1)")])?;
    first.execute(&ExecuteOptions::default())?;

    let mut same = build_pipeline(dir.path(), "inline", vec![task("print(1)")])?;
    same.execute(&ExecuteOptions::default())?;
    assert_eq!(same.get_task("T")?.state(), TaskRunState::SkippedCached);

    let mut changed = build_pipeline(dir.path(), "inline", vec![task("print(2)")])?;
    changed.execute(&ExecuteOptions::default())?;
    assert_eq!(changed.get_task("T")?.state(), TaskRunState::Executed);
    assert_eq!(changed.get_result("T")?, Some(json!("print(2)")));
    assert_eq!(runs.count(), 2);
    Ok(())
}

#[test]
fn operations_can_be_called_outside_run() -> TestResult {
    init_tracing();
    let (zero, one, _, _) = readme_tasks();
    let mut pipeline = memory_pipeline("calls", vec![zero, one])?;

    let one = pipeline.get_task_mut("One")?;
    assert_eq!(one.operation_names().collect::<Vec<_>>(), vec!["preflight"]);
    assert_eq!(one.call("preflight", &Upstream::empty())?, json!("OK"));
    assert!(one.call("postflight", &Upstream::empty()).is_err());

    let ops: Vec<&str> = one.timings().iter().map(|t| t.operation.as_str()).collect();
    assert_eq!(ops, vec!["preflight"]);
    assert!(pipeline.get_task_mut("Missing").is_err());
    Ok(())
}

#[test]
fn deleting_through_the_cache_forces_a_rerun() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let mut pipeline = memory_pipeline(
        "manual",
        vec![constant_task("A", &[], json!(1), &runs).expire(expire::never())],
    )?;

    pipeline.execute(&ExecuteOptions::default())?;
    assert!(pipeline.cache_mut().delete("A")?);
    assert!(!pipeline.cache_mut().delete("A")?);

    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_task("A")?.state(), TaskRunState::Executed);
    assert_eq!(runs.count(), 2);
    Ok(())
}

#[test]
fn on_complete_checkpoints_are_deleted_after_each_run() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let task = constant_task("Temp", &[], json!([1, 2, 3]), &runs).expire(Expiry::OnComplete);
    let mut pipeline = memory_pipeline("on-complete", vec![task])?;

    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_task("Temp")?.result(), Some(&json!([1, 2, 3])));
    assert_eq!(pipeline.get_result("Temp")?, None);
    assert_eq!(pipeline.cache().get(&hashes_key("Temp"))?, None);

    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(runs.count(), 2);
    Ok(())
}

#[test]
fn on_complete_registry_is_per_pipeline() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let runs = RunCounter::new();

    let mut keep = build_pipeline(
        dir.path(),
        "keeper",
        vec![constant_task("Shared", &[], json!(1), &runs).expire(expire::never())],
    )?;
    let mut temp = build_pipeline(
        dir.path(),
        "temporary",
        vec![constant_task("Shared", &[], json!(2), &runs).expire(Expiry::OnComplete)],
    )?;

    keep.execute(&ExecuteOptions::default())?;
    temp.execute(&ExecuteOptions::default())?;

    assert_eq!(keep.get_result("Shared")?, Some(json!(1)));
    assert_eq!(temp.get_result("Shared")?, None);
    assert!(temp.deferred().on_complete().contains(&"Shared".to_string()));
    assert!(keep.deferred().on_complete().is_empty());
    Ok(())
}

#[test]
fn after_session_checkpoints_outlive_the_pipeline() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let runs = RunCounter::new();
    let store_dir = dir.path().join("session");

    {
        let mut pipeline = build_pipeline(
            dir.path(),
            "session",
            vec![
                constant_task("Default", &[], json!("later"), &runs),
                constant_task("Kept", &[], json!("kept"), &runs).expire(expire::never()),
            ],
        )?;
        pipeline.execute(&ExecuteOptions::default())?;
        assert_eq!(pipeline.deferred().after_session(), vec!["Default"]);
    }

    let cache = CheckpointCache::open(&store_dir)?;
    assert_eq!(cache.get("Default")?, Some(json!("later")));
    assert_eq!(cache.get("Kept")?, Some(json!("kept")));

    let pending = checkflow::pipeline::pending_deletions();
    let names = pending
        .iter()
        .find(|(d, _)| d == &store_dir)
        .map(|(_, names)| names.clone());
    assert_eq!(names, Some(vec!["Default".to_string()]));
    Ok(())
}

#[test]
fn after_session_results_are_reused_between_runs() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let mut pipeline = memory_pipeline("end", vec![constant_task("A", &[], json!(1), &runs)])?;

    pipeline.execute(&ExecuteOptions::default())?;
    pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!(pipeline.get_task("A")?.state(), TaskRunState::SkippedCached);
    assert_eq!(pipeline.get_result("A")?, Some(json!(1)));
    assert_eq!(runs.count(), 1);
    assert_eq!(pipeline.deferred().after_session(), vec!["A"]);
    Ok(())
}

#[test]
fn null_results_are_kept_unless_configured_otherwise() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let nothing = || constant_task("Nothing", &[], Value::Null, &runs).expire(expire::never());

    let mut keeping = memory_pipeline("nulls-kept", vec![nothing()])?;
    keeping.execute(&ExecuteOptions::default())?;
    keeping.execute(&ExecuteOptions::default())?;
    assert_eq!(keeping.get_task("Nothing")?.state(), TaskRunState::SkippedCached);
    assert_eq!(keeping.get_result("Nothing")?, Some(Value::Null));

    let mut builder = Pipeline::builder("nulls-expired")
        .in_memory()
        .expire_null_results(true);
    builder.add(nothing())?;
    let mut expiring = builder.build()?;
    expiring.execute(&ExecuteOptions::default())?;
    assert_eq!(expiring.get_result("Nothing")?, None);

    assert_eq!(runs.count(), 2);
    Ok(())
}

#[test]
fn past_expiry_means_the_result_is_never_reused() -> TestResult {
    init_tracing();
    let runs = RunCounter::new();
    let past = NaiveDate::from_ymd_opt(2000, 1, 1).ok_or("bad date")?;
    let task = constant_task("Stale", &[], json!(1), &runs).expire(expire::at_date(past));
    let mut pipeline = memory_pipeline("stale", vec![task])?;

    pipeline.execute(&ExecuteOptions::default())?;
    pipeline.execute(&ExecuteOptions::default())?;

    assert_eq!(pipeline.get_task("Stale")?.state(), TaskRunState::Executed);
    assert_eq!(runs.count(), 2);
    Ok(())
}

#[test]
fn dependent_can_read_checkpoint_of_explicitly_skipped_upstream() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let (zero, one, zero_runs, one_runs) = readme_tasks();
    let mut pipeline = build_pipeline(dir.path(), "upstream-view", vec![zero, one])?;

    pipeline.execute(&ExecuteOptions::default())?;
    pipeline.execute(
        &ExecuteOptions::new()
            .skip_tasks(["Zero"])
            .force_tasks(["One"]),
    )?;

    assert_eq!(pipeline.get_task("Zero")?.state(), TaskRunState::SkippedExplicit);
    assert_eq!(pipeline.get_task("One")?.state(), TaskRunState::Executed);
    assert_eq!(
        pipeline.get_task("One")?.result(),
        Some(&json!(["Some", "values", "more", "values"]))
    );
    assert_eq!((zero_runs.count(), one_runs.count()), (1, 2));
    Ok(())
}

#[test]
fn inspection_accessors_describe_the_pipeline() -> TestResult {
    init_tracing();
    let (zero, one, _, _) = readme_tasks();
    let mut builder = Pipeline::builder("readme").in_memory();
    let one_handle = builder.add(one)?;
    let zero_handle = builder.add(zero)?;
    let mut pipeline = builder.build()?;

    assert_eq!(pipeline.to_string(), "<Pipeline: readme (2 tasks)>");
    assert_eq!(pipeline.ntasks(), 2);
    assert_eq!(pipeline.name(), "readme");
    assert!(!pipeline.is_complete());

    let order: Vec<&str> = pipeline.tasks()?.into_iter().map(|t| t.name()).collect();
    assert_eq!(order, vec!["Zero", "One"]);

    let deps: Vec<&str> = pipeline
        .dependencies_of("One")?
        .into_iter()
        .map(|t| t.name())
        .collect();
    assert_eq!(deps, vec!["Zero"]);

    assert_eq!(pipeline.task(&one_handle).map(|t| t.name()), Some("One"));
    assert_eq!(zero_handle.name(), "Zero");
    assert!(matches!(
        pipeline.get_task("Missing"),
        Err(CheckflowError::TaskNotFound(ref name)) if name == "Missing"
    ));

    let summary = pipeline.execute(&ExecuteOptions::default())?;
    assert!(pipeline.is_complete());
    assert_eq!(pipeline.last_summary(), Some(&summary));
    assert!(summary.to_string().starts_with("2 executed, 0 skipped, 0 failed in 0:"));
    Ok(())
}

#[test]
fn empty_pipeline_is_complete_and_executes() -> TestResult {
    init_tracing();
    let mut pipeline = memory_pipeline("empty", vec![])?;
    assert!(pipeline.is_complete());

    let summary = pipeline.execute(&ExecuteOptions::default())?;
    assert_eq!((summary.executed, summary.skipped, summary.failed), (0, 0, 0));
    Ok(())
}
