//! Domain types shared by every stage of deletion handling.

pub mod error;
pub mod job;
pub mod parameters;

pub use error::{Result, TearDownError};
pub use job::{BranchJob, DeletedItem, JobProperty, ProjectRef, ScmLocator};
pub use parameters::{ParameterValue, TearDownParameters, BRANCH_NAME_PARAM, GIT_URL_PARAM};
