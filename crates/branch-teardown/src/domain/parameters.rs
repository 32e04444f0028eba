//! Parameters handed to a triggered tear-down build.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Name of the repository URL parameter.
pub const GIT_URL_PARAM: &str = "git_url";

/// Name of the branch name parameter.
pub const BRANCH_NAME_PARAM: &str = "branch_name";

/// A single named string parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterValue {
    pub name: &'static str,
    pub value: String,
}

/// The two parameters every tear-down build receives.
///
/// Order is fixed: `git_url` first, `branch_name` second. Downstream jobs may
/// read them positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TearDownParameters {
    git_url: String,
    branch_name: String,
}

impl TearDownParameters {
    pub fn new(git_url: impl Into<String>, branch_name: impl Into<String>) -> Self {
        Self {
            git_url: git_url.into(),
            branch_name: branch_name.into(),
        }
    }

    pub fn git_url(&self) -> &str {
        &self.git_url
    }

    pub fn branch_name(&self) -> &str {
        &self.branch_name
    }

    /// Parameters as `(name, value)` pairs in their fixed order.
    pub fn as_pairs(&self) -> [(&'static str, &str); 2] {
        [
            (GIT_URL_PARAM, self.git_url.as_str()),
            (BRANCH_NAME_PARAM, self.branch_name.as_str()),
        ]
    }

    /// Parameters as an ordered list of owned values.
    pub fn to_values(&self) -> Vec<ParameterValue> {
        self.as_pairs()
            .into_iter()
            .map(|(name, value)| ParameterValue {
                name,
                value: value.to_string(),
            })
            .collect()
    }
}

// Serialized as a list so the order survives any JSON consumer.
impl Serialize for TearDownParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        for (name, value) in self.as_pairs() {
            seq.serialize_element(&ParameterValue {
                name,
                value: value.to_string(),
            })?;
        }
        seq.end()
    }
}
