use serde::{Deserialize, Serialize};

/// A repository issue with the bodies of its comments, flattened out of the
/// GraphQL connection shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub comments: Vec<IssueComment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub body: String,
}

// --- GraphQL wire types ---

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GraphQlRequest<'a> {
    pub query: &'static str,
    pub variables: IssuesVariables<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct IssuesVariables<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub num: u32,
    pub after: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphQlResponse {
    pub data: Option<IssuesData>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphQlErrorBody {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IssuesData {
    pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Repository {
    pub issues: Connection<IssueNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<T> {
    pub page_info: Option<PageInfo>,
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Edge<T> {
    pub cursor: Option<String>,
    pub node: T,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IssueNode {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub body: Option<String>,
    pub comments: Option<Connection<CommentNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommentNode {
    pub body: Option<String>,
}

impl From<IssueNode> for Issue {
    fn from(node: IssueNode) -> Self {
        let comments = node
            .comments
            .map(|c| {
                c.edges
                    .into_iter()
                    .map(|e| IssueComment {
                        body: e.node.body.unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Issue {
            number: node.number,
            title: node.title,
            body: node.body.unwrap_or_default(),
            comments,
        }
    }
}
