//! Integration registration requests as exchanged with the web API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrationError {
    #[error("missing integration name")]
    MissingName,
    #[error("missing subKind")]
    MissingSubKind,
    #[error("missing awsoidc.roleArn field")]
    MissingRoleArn,
}

/// Fields specific to the `aws-oidc` sub kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsOidcSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role_arn: String,
}

fn check_aws_oidc(spec: &mut Option<AwsOidcSpec>) -> Result<(), IntegrationError> {
    match spec {
        Some(s) => {
            s.role_arn = s.role_arn.trim().to_string();
            if s.role_arn.is_empty() {
                return Err(IntegrationError::MissingRoleArn);
            }
            Ok(())
        }
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_kind: String,
    #[serde(default, rename = "awsoidc", skip_serializing_if = "Option::is_none")]
    pub aws_oidc: Option<AwsOidcSpec>,
}

impl Integration {
    /// Trims surrounding whitespace, then requires a name, a sub kind and,
    /// when an `awsoidc` block is present, its role ARN.
    pub fn check_and_set_defaults(&mut self) -> Result<(), IntegrationError> {
        self.name = self.name.trim().to_string();
        self.sub_kind = self.sub_kind.trim().to_string();
        if self.name.is_empty() {
            return Err(IntegrationError::MissingName);
        }
        if self.sub_kind.is_empty() {
            return Err(IntegrationError::MissingSubKind);
        }
        check_aws_oidc(&mut self.aws_oidc)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateIntegrationRequest {
    #[serde(default, rename = "awsoidc", skip_serializing_if = "Option::is_none")]
    pub aws_oidc: Option<AwsOidcSpec>,
}

impl UpdateIntegrationRequest {
    pub fn check_and_set_defaults(&mut self) -> Result<(), IntegrationError> { check_aws_oidc(&mut self.aws_oidc) }
}
