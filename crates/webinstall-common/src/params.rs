use serde::{Deserialize, Serialize};

use crate::step::InstallStep;

/// Parameters carried by a step request.
///
/// Field names follow the installer form. Each step reads only the fields it
/// needs: `configure` uses the project, URL and database fields,
/// `create-admin` uses the account fields, the rest use none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_pw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl StepParams {
    /// Value of an optional field, empty when absent.
    pub fn field(value: &Option<String>) -> &str {
        value.as_deref().unwrap_or("")
    }

    /// The subset of fields `step` reads. Clients send only these, so the
    /// admin password never travels with the configure request.
    pub fn for_step(&self, step: InstallStep) -> StepParams {
        match step {
            InstallStep::Configure => StepParams {
                key: self.key.clone(),
                url: self.url.clone(),
                db_name: self.db_name.clone(),
                db_user: self.db_user.clone(),
                db_pw: self.db_pw.clone(),
                db_host: self.db_host.clone(),
                ..Default::default()
            },
            InstallStep::CreateAdmin => StepParams {
                username: self.username.clone(),
                password: self.password.clone(),
                email: self.email.clone(),
                ..Default::default()
            },
            InstallStep::Migrate | InstallStep::InstallPackage | InstallStep::Finish => {
                StepParams::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_body_deserializes() {
        let params: StepParams =
            serde_json::from_str(r#"{"username": "admin", "email": "a@b.c"}"#).unwrap();
        assert_eq!(params.username.as_deref(), Some("admin"));
        assert_eq!(StepParams::field(&params.password), "");
    }

    #[test]
    fn test_empty_params_serialize_to_empty_object() {
        let json = serde_json::to_string(&StepParams::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_for_step_selects_relevant_fields() {
        let params = StepParams {
            key: Some("abc123".into()),
            db_pw: Some("p".into()),
            username: Some("admin".into()),
            password: Some("secret".into()),
            ..Default::default()
        };

        let configure = params.for_step(InstallStep::Configure);
        assert_eq!(configure.key.as_deref(), Some("abc123"));
        assert_eq!(configure.db_pw.as_deref(), Some("p"));
        assert!(configure.password.is_none());

        let admin = params.for_step(InstallStep::CreateAdmin);
        assert_eq!(admin.password.as_deref(), Some("secret"));
        assert!(admin.key.is_none());

        assert_eq!(params.for_step(InstallStep::Finish), StepParams::default());
    }
}
