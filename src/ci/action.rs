//! GitHub issue automation for CI workflows which review submissions.
//!
//! Submissions are GitHub issues whose body carries YAML data. An [`Action`]
//! reads the issue, reports progress and errors as comments and labels, and
//! closes the issue when the review is done.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ci::error::ActionError;

/// Issues API of the repository which collects submissions
pub const ISSUES_API_URL: &str = "https://api.github.com/repos/biosimulators/Biosimulators/issues";

/// Label added to issues whose action failed unexpectedly
pub const ACTION_ERROR_LABEL: &str = "Action error";

/// Comment posted when an action fails unexpectedly
pub const DEFAULT_ERROR_MESSAGE: &str =
    "Sorry. We encountered an unexpected error. Our team will review the error.";

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Settings of an action, read from the environment of the workflow run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionConfig {
    /// Owner and name of the repository which triggered the action
    pub repo: String,
    pub run_id: String,
    pub user: String,
    pub access_token: String,
}

impl ActionConfig {
    /// Reads `GH_REPO`, `GH_ACTION_RUN_ID`, `GH_ISSUES_USER` and
    /// `GH_ISSUES_ACCESS_TOKEN`
    pub fn from_env() -> Result<Self, ActionError> {
        Self::from_lookup(|name| std::env::var(name))
    }

    /// Reads the settings through `lookup`, which maps variable names to values
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Result<String, std::env::VarError>,
    ) -> Result<Self, ActionError> {
        let var = |name: &str| {
            lookup(name).map_err(|source| ActionError::MissingVariable {
                name: name.to_string(),
                source,
            })
        };

        Ok(ActionConfig {
            repo: var("GH_REPO")?,
            run_id: var("GH_ACTION_RUN_ID")?,
            user: var("GH_ISSUES_USER")?,
            access_token: var("GH_ISSUES_ACCESS_TOKEN")?,
        })
    }
}

/// Number of the issue which triggered the action, from `GH_ISSUE_NUMBER`
pub fn issue_number_from_env() -> Result<u64, ActionError> {
    let value = std::env::var("GH_ISSUE_NUMBER").map_err(|source| ActionError::MissingVariable {
        name: "GH_ISSUE_NUMBER".to_string(),
        source,
    })?;
    value.trim().parse().map_err(|_| ActionError::InvalidVariable {
        name: "GH_ISSUE_NUMBER".to_string(),
        value,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub name: String,
}

/// The fields of a GitHub issue used by actions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// A continuous integration action working on submission issues
#[derive(Debug, Clone)]
pub struct Action {
    client: Client,
    config: ActionConfig,
    issues_url: String,
}

impl Action {
    pub fn new(config: ActionConfig) -> Self {
        Action {
            client: Client::new(),
            config,
            issues_url: ISSUES_API_URL.to_string(),
        }
    }

    /// Configures the action from the environment
    pub fn from_env() -> Result<Self, ActionError> {
        Ok(Self::new(ActionConfig::from_env()?))
    }

    /// Sends requests to another issues API, e.g. a fork or a mock server
    pub fn with_issues_url(mut self, url: impl Into<String>) -> Self {
        self.issues_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// Page of the workflow run which executes the action
    pub fn run_url(&self) -> String {
        format!(
            "https://github.com/{}/actions/runs/{}",
            self.config.repo, self.config.run_id
        )
    }

    fn issue_url(&self, issue_number: u64) -> String {
        format!("{}/{}", self.issues_url, issue_number)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.config.user, Some(&self.config.access_token))
    }

    pub fn get_issue(&self, issue_number: u64) -> Result<Issue, ActionError> {
        let response = self
            .authorized(self.client.get(self.issue_url(issue_number)))
            .send()?;
        Ok(check_status(response)?.json()?)
    }

    pub fn get_labels(&self, issue_number: u64) -> Result<Vec<String>, ActionError> {
        let response = self
            .authorized(self.client.get(format!("{}/labels", self.issue_url(issue_number))))
            .send()?;
        let labels: Vec<Label> = check_status(response)?.json()?;
        Ok(labels.into_iter().map(|label| label.name).collect())
    }

    pub fn add_labels(&self, issue_number: u64, labels: &[&str]) -> Result<(), ActionError> {
        let response = self
            .authorized(self.client.post(format!("{}/labels", self.issue_url(issue_number))))
            .json(&json!({ "labels": labels }))
            .send()?;
        check_status(response)?;
        Ok(())
    }

    pub fn remove_label(&self, issue_number: u64, label: &str) -> Result<(), ActionError> {
        let response = self
            .authorized(
                self.client
                    .delete(format!("{}/labels/{}", self.issue_url(issue_number), label)),
            )
            .send()?;
        check_status(response)?;
        Ok(())
    }

    pub fn add_comment(&self, issue_number: u64, comment: &str) -> Result<(), ActionError> {
        let response = self
            .authorized(self.client.post(format!("{}/comments", self.issue_url(issue_number))))
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .json(&json!({ "body": comment }))
            .send()?;
        check_status(response)?;
        log::debug!("Commented on issue {}", issue_number);
        Ok(())
    }

    /// Posts an error as a diff-formatted comment.
    ///
    /// Returns [`ActionError::Caught`] once the comment is posted, so the
    /// caller can stop the action without reporting the error twice.
    pub fn add_error_comment(&self, issue_number: u64, comment: &str) -> ActionError {
        match self.add_comment(issue_number, &error_comment(comment)) {
            Ok(()) => ActionError::Caught(comment.to_string()),
            Err(err) => err,
        }
    }

    pub fn close_issue(&self, issue_number: u64) -> Result<(), ActionError> {
        let response = self
            .authorized(self.client.patch(self.issue_url(issue_number)))
            .json(&json!({ "state": "closed" }))
            .send()?;
        check_status(response)?;
        log::info!("Closed issue {}", issue_number);
        Ok(())
    }

    /// Runs `action`, reporting unexpected errors on the issue.
    ///
    /// Errors which were already reported ([`ActionError::Caught`]) pass
    /// through. Any other error is reported with `error_message` as an
    /// error comment and the [`ACTION_ERROR_LABEL`] label, then returned.
    pub fn catch_errors<T, E>(
        &self,
        issue_number: u64,
        error_message: &str,
        action: impl FnOnce(&Action) -> Result<T, E>,
    ) -> Result<T, ActionError>
    where
        E: Into<ActionError>,
    {
        let err = match action(self) {
            Ok(value) => return Ok(value),
            Err(err) => err.into(),
        };
        if err.is_caught() {
            return Err(err);
        }

        log::error!("Action failed on issue {}: {}", issue_number, err);
        let reported = self
            .add_comment(issue_number, &error_comment(error_message))
            .and_then(|_| self.add_labels(issue_number, &[ACTION_ERROR_LABEL]));

        match reported {
            Ok(()) => Err(err),
            Err(report) => Err(ActionError::Unreported {
                error: Box::new(err),
                report: Box::new(report),
            }),
        }
    }
}

/// Reads the YAML data of an issue.
///
/// The data is either YAML front matter delimited by `---` lines or the
/// first fenced `yaml` code block; otherwise the whole body is parsed.
pub fn issue_data<T: DeserializeOwned>(issue: &Issue) -> Result<T, ActionError> {
    let body = issue.body.as_deref().unwrap_or_default().replace('\r', "");
    Ok(serde_yml::from_str(yaml_block(&body))?)
}

fn yaml_block(body: &str) -> &str {
    if let Some(rest) = body.strip_prefix("---\n") {
        if let Some(end) = rest.find("\n---") {
            return &rest[..end];
        }
    }

    for fence in ["```yaml\n", "```yml\n"] {
        if let Some(start) = body.find(fence) {
            let rest = &body[start + fence.len()..];
            if let Some(end) = rest.find("```") {
                return &rest[..end];
            }
        }
    }

    body
}

/// Formats a message as the removed lines of a diff, which GitHub renders red
pub fn error_comment(message: &str) -> String {
    format!(
        "```diff\n- {}\n```\n",
        message.trim_end().replace('\n', "\n- ")
    )
}

fn check_status(response: Response) -> Result<Response, ActionError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ActionError::Status {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use wiremock::matchers::{basic_auth, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config() -> ActionConfig {
        ActionConfig {
            repo: "biosimulators/Biosimulators".to_string(),
            run_id: "42".to_string(),
            user: "bot".to_string(),
            access_token: "secret".to_string(),
        }
    }

    fn action(server: &str) -> Action {
        Action::new(config()).with_issues_url(format!("{server}/issues"))
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("GH_REPO", "biosimulators/Biosimulators"),
            ("GH_ACTION_RUN_ID", "42"),
            ("GH_ISSUES_USER", "bot"),
            ("GH_ISSUES_ACCESS_TOKEN", "secret"),
        ]
        .into_iter()
        .collect();

        let lookup = |name: &str| {
            vars.get(name)
                .map(|value| value.to_string())
                .ok_or(std::env::VarError::NotPresent)
        };
        assert_eq!(ActionConfig::from_lookup(lookup).unwrap(), config());

        let missing = ActionConfig::from_lookup(|_| Err(std::env::VarError::NotPresent));
        match missing {
            Err(ActionError::MissingVariable { name, .. }) => assert_eq!(name, "GH_REPO"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_run_url() {
        assert_eq!(
            Action::new(config()).run_url(),
            "https://github.com/biosimulators/Biosimulators/actions/runs/42"
        );
    }

    #[test]
    fn test_error_comment() {
        assert_eq!(
            error_comment("first line\nsecond line\n"),
            "```diff\n- first line\n- second line\n```\n"
        );
    }

    #[test]
    fn test_issue_data() {
        let issue = Issue {
            number: 1,
            title: "Submit tellurium".to_string(),
            body: Some("---\r\nid: tellurium\r\nversion: 2.1.6\r\n---\r\nThanks!".to_string()),
            state: "open".to_string(),
            labels: vec![],
        };
        let data: Value = issue_data(&issue).unwrap();
        assert_eq!(data["id"], "tellurium");
        assert_eq!(data["version"], "2.1.6");

        let fenced = Issue {
            body: Some("Submission\n```yaml\nid: copasi\n```\n".to_string()),
            ..issue
        };
        let data: Value = issue_data(&fenced).unwrap();
        assert_eq!(data["id"], "copasi");
    }

    #[tokio::test]
    async fn test_get_issue_and_labels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues/7"))
            .and(basic_auth("bot", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "number": 7,
                "title": "Submit tellurium",
                "body": "id: tellurium",
                "state": "open",
                "labels": [{"name": "Validated"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/issues/7/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Validated"},
                {"name": "Approved"},
            ])))
            .mount(&server)
            .await;

        let uri = server.uri();
        let (issue, labels) = tokio::task::spawn_blocking(move || {
            let action = action(&uri);
            (action.get_issue(7).unwrap(), action.get_labels(7).unwrap())
        })
        .await
        .unwrap();

        assert_eq!(issue.number, 7);
        assert_eq!(issue.labels, vec![Label { name: "Validated".to_string() }]);
        assert_eq!(labels, vec!["Validated", "Approved"]);
    }

    #[tokio::test]
    async fn test_label_comment_and_close() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issues/7/labels"))
            .and(body_json(json!({"labels": ["Validated"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/issues/7/labels/Pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/issues/7/comments"))
            .and(header("accept", GITHUB_MEDIA_TYPE))
            .and(body_json(json!({"body": "Looks good"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/issues/7"))
            .and(body_json(json!({"state": "closed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        tokio::task::spawn_blocking(move || {
            let action = action(&uri);
            action.add_labels(7, &["Validated"]).unwrap();
            action.remove_label(7, "Pending").unwrap();
            action.add_comment(7, "Looks good").unwrap();
            action.close_issue(7).unwrap();
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_failed_requests_carry_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = tokio::task::spawn_blocking(move || action(&uri).get_issue(7))
            .await
            .unwrap();

        match result {
            Err(ActionError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Not Found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_error_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issues/7/comments"))
            .and(body_json(json!({"body": "```diff\n- Invalid version\n```\n"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let err = tokio::task::spawn_blocking(move || action(&uri).add_error_comment(7, "Invalid version"))
            .await
            .unwrap();

        assert!(err.is_caught());
        assert_eq!(err.to_string(), "Invalid version");
    }

    #[tokio::test]
    async fn test_catch_errors_reports_unexpected_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issues/7/comments"))
            .and(body_json(json!({"body": error_comment(DEFAULT_ERROR_MESSAGE)})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/issues/7/labels"))
            .and(body_json(json!({"labels": [ACTION_ERROR_LABEL]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let result: Result<(), ActionError> = tokio::task::spawn_blocking(move || {
            action(&uri).catch_errors(7, DEFAULT_ERROR_MESSAGE, |_| {
                Err(ActionError::InvalidVariable {
                    name: "GH_ISSUE_NUMBER".to_string(),
                    value: "x".to_string(),
                })
            })
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(ActionError::InvalidVariable { .. })));
    }

    #[tokio::test]
    async fn test_catch_errors_returns_reporting_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issues/7/comments"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/issues/7/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let uri = server.uri();
        let result: Result<(), ActionError> = tokio::task::spawn_blocking(move || {
            action(&uri).catch_errors(7, DEFAULT_ERROR_MESSAGE, |_| {
                Err(ActionError::InvalidVariable {
                    name: "GH_ISSUE_NUMBER".to_string(),
                    value: "x".to_string(),
                })
            })
        })
        .await
        .unwrap();

        match result {
            Err(ActionError::Unreported { error, report }) => {
                assert!(matches!(*error, ActionError::InvalidVariable { .. }));
                assert!(matches!(*report, ActionError::Status { status: 403, ref body } if body == "forbidden"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_catch_errors_passes_caught_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let uri = server.uri();
        let result: Result<u32, ActionError> = tokio::task::spawn_blocking(move || {
            let action = action(&uri);
            let ok = action.catch_errors(7, DEFAULT_ERROR_MESSAGE, |_| Ok::<_, ActionError>(3));
            assert_eq!(ok.unwrap(), 3);
            action.catch_errors(7, DEFAULT_ERROR_MESSAGE, |_| {
                Err(ActionError::Caught("already reported".to_string()))
            })
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(ActionError::Caught(message)) if message == "already reported"));
    }
}
