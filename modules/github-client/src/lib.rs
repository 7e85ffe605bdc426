pub mod error;
pub mod types;

pub use error::{GithubError, Result};
pub use types::{Issue, IssueComment};

use std::time::Duration;

use types::{GraphQlRequest, GraphQlResponse, IssuesVariables};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PAGE_SIZE: u32 = 100;

const ISSUES_QUERY: &str = r#"
query ($owner: String!, $repo: String!, $after: String, $num: Int = 100) {
  repository(owner: $owner, name: $repo) {
    issues(first: $num, after: $after, orderBy: {field: CREATED_AT, direction: DESC}) {
      pageInfo {
        endCursor
        hasNextPage
      }
      edges {
        cursor
        node {
          number
          title
          body
          comments(first: 100) {
            edges {
              node {
                body
              }
            }
          }
        }
      }
    }
  }
}
"#;

pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    owner: String,
    repo: String,
}

impl GithubClient {
    pub fn new(token: &str, owner: &str, repo: &str) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, token, owner, repo)
    }

    pub fn with_api_url(api_url: &str, token: &str, owner: &str, repo: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("notary-pipeline")
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Page through every issue in the repository, newest first.
    pub async fn fetch_all_issues(&self) -> Result<Vec<Issue>> {
        tracing::info!(owner = %self.owner, repo = %self.repo, "Fetching repository issues");

        let mut issues = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let (page, next) = self.fetch_page(after.as_deref()).await?;
            tracing::debug!(count = page.len(), after = ?after, "Fetched issue page");
            issues.extend(page);

            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        tracing::info!(count = issues.len(), "Fetched all issues");
        Ok(issues)
    }

    /// Fetch one page. Returns the issues and the cursor for the next page, if any.
    async fn fetch_page(&self, after: Option<&str>) -> Result<(Vec<Issue>, Option<String>)> {
        let request = GraphQlRequest {
            query: ISSUES_QUERY,
            variables: IssuesVariables {
                owner: &self.owner,
                repo: &self.repo,
                num: PAGE_SIZE,
                after,
            },
        };

        let url = format!("{}/graphql", self.api_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let gql: GraphQlResponse = serde_json::from_str(&body)?;

        if !gql.errors.is_empty() {
            let messages: Vec<_> = gql.errors.into_iter().map(|e| e.message).collect();
            return Err(GithubError::GraphQl(messages.join("; ")));
        }

        let connection = gql
            .data
            .and_then(|d| d.repository)
            .map(|r| r.issues)
            .ok_or_else(|| GithubError::GraphQl("repository not found".to_string()))?;

        let last_cursor = connection.edges.last().and_then(|e| e.cursor.clone());
        let has_next = connection
            .page_info
            .as_ref()
            .map(|p| p.has_next_page)
            .unwrap_or(false);
        let next = if has_next {
            connection
                .page_info
                .and_then(|p| p.end_cursor)
                .or(last_cursor)
        } else {
            None
        };

        let issues = connection.edges.into_iter().map(|e| Issue::from(e.node)).collect();
        Ok((issues, next))
    }
}
