//! Choosing which tear-down job to trigger.

use serde::Serialize;

/// Job triggered when neither the pipeline nor the global configuration names one.
pub const DEFAULT_TEAR_DOWN_JOB: &str = "job-tear-down-executor";

/// Which precedence level produced a resolved job name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// `branchTearDownExecutor(...)` declared by the deleted branch's pipeline.
    Pipeline,
    /// Global configuration.
    Global,
    /// [`DEFAULT_TEAR_DOWN_JOB`].
    Default,
}

impl TargetSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSource::Pipeline => "pipeline",
            TargetSource::Global => "global",
            TargetSource::Default => "default",
        }
    }
}

/// The job chosen for one deletion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub job_name: String,
    pub source: TargetSource,
}

/// Resolve the tear-down job: pipeline override, then global, then default.
///
/// Empty strings count as absent. Always yields a name; whether that job
/// exists is for the dispatcher to find out.
pub fn resolve(per_pipeline_override: Option<&str>, global: Option<&str>) -> ResolvedTarget {
    [
        (per_pipeline_override, TargetSource::Pipeline),
        (global, TargetSource::Global),
    ]
    .into_iter()
    .find_map(|(name, source)| {
        name.filter(|n| !n.is_empty()).map(|n| ResolvedTarget {
            job_name: n.to_string(),
            source,
        })
    })
    .unwrap_or_else(|| ResolvedTarget {
        job_name: DEFAULT_TEAR_DOWN_JOB.to_string(),
        source: TargetSource::Default,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_when_nothing_configured() {
        let target = resolve(None, None);
        assert_eq!(target.job_name, DEFAULT_TEAR_DOWN_JOB);
        assert_eq!(target.source, TargetSource::Default);
    }

    #[test]
    fn test_global_when_no_override() {
        let target = resolve(None, Some("my-custom-global-executor"));
        assert_eq!(target.job_name, "my-custom-global-executor");
        assert_eq!(target.source, TargetSource::Global);
    }

    #[test]
    fn test_override_beats_global() {
        let target = resolve(
            Some("my-custom-pipeline-executor"),
            Some("my-custom-global-executor"),
        );
        assert_eq!(target.job_name, "my-custom-pipeline-executor");
        assert_eq!(target.source, TargetSource::Pipeline);
    }

    #[test]
    fn test_override_without_global() {
        let target = resolve(Some("my-custom-pipeline-executor"), None);
        assert_eq!(target.source, TargetSource::Pipeline);
    }

    #[test]
    fn test_empty_values_fall_through() {
        assert_eq!(resolve(Some(""), Some("g")).source, TargetSource::Global);
        assert_eq!(resolve(Some(""), Some("")).source, TargetSource::Default);
        assert_eq!(resolve(None, Some("")).job_name, DEFAULT_TEAR_DOWN_JOB);
    }

    #[test]
    fn test_names_are_not_normalized() {
        let target = resolve(Some(" Cleanup "), None);
        assert_eq!(target.job_name, " Cleanup ");
    }
}
