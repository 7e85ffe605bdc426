use serde::{Deserialize, Serialize};

/// The two resolutions the pipeline needs between address representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    /// `f0...` ID address to its public-key address.
    ResolveIdToKey,
    /// Public-key address to its `f0...` ID address.
    ResolveKeyToId,
}

impl RpcMethod {
    /// Lotus JSON-RPC method name.
    pub fn rpc_name(&self) -> &'static str {
        match self {
            RpcMethod::ResolveIdToKey => "Filecoin.StateAccountKey",
            RpcMethod::ResolveKeyToId => "Filecoin.StateLookupID",
        }
    }
}

impl std::fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcMethod::ResolveIdToKey => write!(f, "ResolveIdToKey"),
            RpcMethod::ResolveKeyToId => write!(f, "ResolveKeyToId"),
        }
    }
}

/// JSON-RPC 2.0 request. The second param is the tipset key; `null` means chain head.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub id: u64,
    pub params: (&'a str, Option<()>),
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: RpcMethod, address: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.rpc_name(),
            id: 1,
            params: (address, None),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    pub result: Option<String>,
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
