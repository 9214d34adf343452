// GitHub API endpoint functions.
// Typed listings for pull requests, issues, and workflow runs of one repository.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;

use super::client::GitHubClient;
use super::pagination::{PER_PAGE, Paged};
use super::types::{Issue, PullRequest, WorkflowRun};

impl GitHubClient {
    /// Open pull requests of a repository.
    pub async fn open_pull_requests(&self, owner: &str, repo: &str) -> Result<Paged<PullRequest>> {
        let url = self.url(&format!(
            "/repos/{}/{}/pulls?state=open&per_page={}",
            owner, repo, PER_PAGE
        ));
        self.get_all_pages(&url).await.into_result()?.decode()
    }

    /// Open issues of a repository, excluding pull requests.
    pub async fn open_issues(&self, owner: &str, repo: &str) -> Result<Paged<Issue>> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues?state=open&per_page={}",
            owner, repo, PER_PAGE
        ));
        let issues: Paged<Issue> = self.get_all_pages(&url).await.into_result()?.decode()?;
        Ok(issues.retain(|issue| !issue.is_pull_request()))
    }

    /// Recent workflow runs of a repository, newest first as GitHub returns them.
    pub async fn workflow_runs(&self, owner: &str, repo: &str) -> Result<Paged<WorkflowRun>> {
        let url = self.url(&format!(
            "/repos/{}/{}/actions/runs?per_page={}",
            owner, repo, PER_PAGE
        ));
        self.get_all_pages(&url).await.into_result()?.decode()
    }

    /// Pull requests merged at or after `since`.
    pub async fn merged_pull_requests_since(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Paged<PullRequest>> {
        let url = self.url(&format!(
            "/repos/{}/{}/pulls?state=closed&sort=updated&direction=desc&since={}&per_page={}",
            owner,
            repo,
            since.to_rfc3339_opts(SecondsFormat::Secs, true),
            PER_PAGE
        ));
        let closed: Paged<PullRequest> = self.get_all_pages(&url).await.into_result()?.decode()?;
        Ok(closed.retain(|pr| pr.merged_at.is_some_and(|merged| merged >= since)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use serde_json::{Value, json};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::error::DashError;
    use crate::token::MemoryTokenStore;

    fn issue_json(number: u64, pull_request: bool) -> Value {
        let mut issue = json!({
            "id": number,
            "number": number,
            "title": format!("Issue {}", number),
            "state": "open",
            "user": { "login": "octocat", "id": 1 },
            "html_url": format!("https://github.com/o/r/issues/{}", number),
            "created_at": "2024-03-01T00:00:00Z",
            "updated_at": "2024-03-01T00:00:00Z"
        });
        if pull_request {
            issue["pull_request"] = json!({ "url": "https://api.github.com/repos/o/r/pulls/1" });
        }
        issue
    }

    fn pull_json(number: u64, merged_at: Option<&str>) -> Value {
        json!({
            "id": number,
            "number": number,
            "title": format!("PR {}", number),
            "state": "closed",
            "user": { "login": "hubot", "id": 2 },
            "html_url": format!("https://github.com/o/r/pull/{}", number),
            "created_at": "2024-03-01T00:00:00Z",
            "updated_at": "2024-03-09T00:00:00Z",
            "merged_at": merged_at
        })
    }

    fn anonymous_client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(server.uri(), Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_open_issues_drop_pull_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/issues"))
            .and(query_param("state", "open"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                issue_json(1, false),
                issue_json(2, true),
                issue_json(3, false)
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let issues = anonymous_client(&server).open_issues("o", "r").await.unwrap();
        let numbers: Vec<u64> = issues.items.iter().map(|i| i.number).collect();

        assert_eq!(numbers, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_workflow_runs_unwrap_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/actions/runs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "workflow_runs": [{
                    "id": 77,
                    "name": "Daily CI",
                    "run_number": 12,
                    "status": "completed",
                    "conclusion": "success",
                    "created_at": "2024-03-01T00:00:00Z",
                    "updated_at": "2024-03-01T00:20:00Z",
                    "html_url": "https://github.com/o/r/actions/runs/77"
                }]
            })))
            .mount(&server)
            .await;

        let runs = anonymous_client(&server).workflow_runs("o", "r").await.unwrap();
        assert_eq!(runs.items.len(), 1);
        assert_eq!(runs.items[0].id, 77);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = anonymous_client(&server)
            .open_pull_requests("o", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, DashError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_merged_since_filters_unmerged_and_old() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls"))
            .and(query_param("state", "closed"))
            .and(query_param("since", "2024-03-05T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                pull_json(1, Some("2024-03-08T12:00:00Z")),
                pull_json(2, None),
                pull_json(3, Some("2024-03-01T12:00:00Z"))
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let since = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let merged = anonymous_client(&server)
            .merged_pull_requests_since("o", "r", since)
            .await
            .unwrap();

        let numbers: Vec<u64> = merged.items.iter().map(|pr| pr.number).collect();
        assert_eq!(numbers, vec![1]);
    }
}
