use serde::{Deserialize, Serialize};

/// Cloud account/region pair hosting datasets or consuming shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub environment_uri: String,
    pub label: String,
    pub aws_account_id: String,
    pub region: String,
}

/// A team invited into an environment, with the IAM role its members assume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentGroup {
    pub group_uri: String,
    pub environment_uri: String,
    pub environment_iam_role_arn: String,
    pub environment_iam_role_name: String,
}
