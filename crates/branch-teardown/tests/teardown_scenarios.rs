//! End-to-end deletion scenarios against the in-memory job registry.

use std::collections::HashMap;
use std::sync::Arc;

use branch_teardown::fakes::MemoryJobRegistry;
use branch_teardown::{
    BranchJob, DeletedItem, GlobalConfig, ItemListener, JobProperty, ListenerOutcome,
    ParameterValue, ProjectRef, ScmLocator, TargetSource, TearDownListener, DEFAULT_TEAR_DOWN_JOB,
    FORM_FIELD,
};

const PIPELINE_JOB: &str = "my-custom-pipeline-executor";
const GLOBAL_JOB: &str = "my-custom-global-executor";
const REPO: &str = "/repo";

struct Harness {
    registry: Arc<MemoryJobRegistry>,
    config: Arc<GlobalConfig>,
    listener: TearDownListener,
}

impl Harness {
    fn new(jobs: &[&str]) -> Self {
        let registry = Arc::new(MemoryJobRegistry::new());
        for job in jobs {
            registry.create_job(job);
        }
        let config = Arc::new(GlobalConfig::new());
        let listener = TearDownListener::new(config.clone(), registry.clone());
        Self {
            registry,
            config,
            listener,
        }
    }

    /// Submit the administrative form the way the configuration page does.
    fn set_config_settings(&self, job: &str) {
        let mut form = HashMap::new();
        form.insert(FORM_FIELD.to_string(), job.to_string());
        self.config.apply_form(&form);
    }

    fn next(&self, job: &str) -> Option<u64> {
        self.registry.next_build_number(job)
    }

    /// The tear-down job got exactly build #1 with the feature branch's parameters.
    fn verify_parameters(&self, job: &str) {
        let build = self.registry.last_build(job).expect("tear-down build");
        assert_eq!(build.number, 1);
        assert_eq!(
            build.parameters,
            vec![
                ParameterValue {
                    name: "git_url",
                    value: REPO.to_string()
                },
                ParameterValue {
                    name: "branch_name",
                    value: "feature".to_string()
                },
            ]
        );
    }
}

fn basic_job() -> BranchJob {
    BranchJob::new(ProjectRef::new("p"), "feature")
        .with_scm(ScmLocator::new(REPO, "feature"))
        .with_pipeline_script("node { checkout scm }")
}

fn custom_job() -> BranchJob {
    basic_job().with_property(JobProperty::BranchTearDownExecutor {
        job_name: PIPELINE_JOB.to_string(),
    })
}

#[tokio::test]
async fn default_job_configured_and_triggered() {
    let h = Harness::new(&[DEFAULT_TEAR_DOWN_JOB]);

    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(1));
    let outcome = h.listener.on_deleted(&DeletedItem::Branch(basic_job())).await;
    assert!(outcome.is_scheduled());
    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(2));
    h.verify_parameters(DEFAULT_TEAR_DOWN_JOB);
}

#[tokio::test]
async fn user_defined_job_triggered() {
    let h = Harness::new(&[DEFAULT_TEAR_DOWN_JOB, GLOBAL_JOB]);
    h.set_config_settings(GLOBAL_JOB);

    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(1));
    assert_eq!(h.next(GLOBAL_JOB), Some(1));
    h.listener.on_deleted(&DeletedItem::Branch(basic_job())).await;
    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(1));
    assert_eq!(h.next(GLOBAL_JOB), Some(2));
    h.verify_parameters(GLOBAL_JOB);
}

#[tokio::test]
async fn pipeline_defined_job_triggered() {
    let h = Harness::new(&[DEFAULT_TEAR_DOWN_JOB, PIPELINE_JOB]);

    h.listener.on_deleted(&DeletedItem::Branch(custom_job())).await;
    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(1));
    assert_eq!(h.next(PIPELINE_JOB), Some(2));
    h.verify_parameters(PIPELINE_JOB);
}

#[tokio::test]
async fn pipeline_defined_job_takes_precedence_over_global_settings() {
    let h = Harness::new(&[DEFAULT_TEAR_DOWN_JOB, GLOBAL_JOB, PIPELINE_JOB]);
    h.set_config_settings(GLOBAL_JOB);

    let outcome = h.listener.on_deleted(&DeletedItem::Branch(custom_job())).await;
    match &outcome {
        ListenerOutcome::Scheduled { target, .. } => {
            assert_eq!(target.job_name, PIPELINE_JOB);
            assert_eq!(target.source, TargetSource::Pipeline);
        }
        other => panic!("expected Scheduled, got {other:?}"),
    }
    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(1));
    assert_eq!(h.next(GLOBAL_JOB), Some(1));
    assert_eq!(h.next(PIPELINE_JOB), Some(2));
    h.verify_parameters(PIPELINE_JOB);
}

#[tokio::test]
async fn declaration_in_pipeline_script_is_honoured() {
    let h = Harness::new(&[DEFAULT_TEAR_DOWN_JOB, PIPELINE_JOB]);
    let job = basic_job().with_pipeline_script(format!(
        "properties([branchTearDownExecutor('{PIPELINE_JOB}')])\nnode {{ checkout scm }}"
    ));

    h.listener.on_deleted(&DeletedItem::Branch(job)).await;
    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(1));
    assert_eq!(h.next(PIPELINE_JOB), Some(2));
}

#[tokio::test]
async fn nonexistent_tear_down_job_leaves_other_counters_alone() {
    let h = Harness::new(&[DEFAULT_TEAR_DOWN_JOB, "unrelated"]);
    h.set_config_settings("does-not-exist");

    let outcome = h.listener.on_deleted(&DeletedItem::Branch(basic_job())).await;
    assert!(matches!(outcome, ListenerOutcome::NotFound { .. }));
    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(1));
    assert_eq!(h.next("unrelated"), Some(1));
    assert_eq!(h.registry.total_builds(), 0);
}

#[tokio::test]
async fn job_names_match_case_sensitively() {
    let h = Harness::new(&["Job-Tear-Down-Executor"]);

    let outcome = h.listener.on_deleted(&DeletedItem::Branch(basic_job())).await;
    assert!(matches!(outcome, ListenerOutcome::NotFound { .. }));
    assert_eq!(h.next("Job-Tear-Down-Executor"), Some(1));
}

#[tokio::test]
async fn concurrent_deletions_each_schedule_once() {
    let h = Harness::new(&[DEFAULT_TEAR_DOWN_JOB]);
    let items: Vec<DeletedItem> = ["feature", "bugfix", "release"]
        .iter()
        .map(|branch| {
            DeletedItem::Branch(
                BranchJob::new(ProjectRef::new("p"), *branch)
                    .with_scm(ScmLocator::new(REPO, format!("refs/heads/{branch}"))),
            )
        })
        .collect();

    let outcomes =
        futures::future::join_all(items.iter().map(|item| h.listener.on_deleted(item))).await;

    assert!(outcomes.iter().all(ListenerOutcome::is_scheduled));
    assert_eq!(h.next(DEFAULT_TEAR_DOWN_JOB), Some(4));

    let mut branches: Vec<String> = h
        .registry
        .builds(DEFAULT_TEAR_DOWN_JOB)
        .into_iter()
        .map(|b| {
            assert_eq!(b.parameters[0].name, "git_url");
            assert_eq!(b.parameters[1].name, "branch_name");
            b.parameters[1].value.clone()
        })
        .collect();
    branches.sort();
    assert_eq!(branches, vec!["bugfix", "feature", "release"]);
    assert_eq!(h.listener.metrics().builds_scheduled(), 3);
}
