//! Trait seams for the two network collaborators.
//!
//! AddressLookup: one address representation in, the other out.
//! IssueSource: every governance issue with its comments.
//!
//! Stage code only sees these traits, so tests run against in-memory mocks.

use async_trait::async_trait;

use github_client::{GithubClient, Issue};
use glif_client::{GlifClient, RpcMethod};

#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn lookup(&self, method: RpcMethod, address: &str) -> glif_client::Result<String>;
}

#[async_trait]
impl AddressLookup for GlifClient {
    async fn lookup(&self, method: RpcMethod, address: &str) -> glif_client::Result<String> {
        self.call(method, address).await
    }
}

#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn fetch_all_issues(&self) -> github_client::Result<Vec<Issue>>;
}

#[async_trait]
impl IssueSource for GithubClient {
    async fn fetch_all_issues(&self) -> github_client::Result<Vec<Issue>> {
        GithubClient::fetch_all_issues(self).await
    }
}
