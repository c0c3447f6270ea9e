//! `NodeApi`: the trait the excluded HTTP/WS layer calls into (§6), plus the
//! jsonrpsee server wiring that exposes it — mechanical glue over the trait,
//! not a protocol design decision, so it stays in scope even though routing
//! and transport framing otherwise don't.

use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use serde::{Deserialize, Serialize};

use flowchain_core::chain::{Block, UnsignedTransaction};
use flowchain_core::primitives::{ChainIndex, Hash, U256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub alph: U256,
    pub locked_alph: U256,
    pub tokens: Vec<(Hash, U256)>,
    pub locked_tokens: Vec<(Hash, U256)>,
    pub utxo_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub address: String,
    pub amount: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasOpts {
    pub gas_amount: u64,
    pub gas_price: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TxResult {
    Accepted { tx_id: Hash },
    InvalidTx { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TxStatus {
    MemPooled,
    Confirmed { block_hash: Hash, tx_index: u32, chain_confirmations: u64, from_confirmations: u64, to_confirmations: u64 },
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfCliqueInfo {
    pub group_num: u32,
    pub broker_id: u32,
    pub broker_num: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_index: ChainIndex,
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MisbehaviorEntry {
    pub peer_id: String,
    pub action: String,
    pub count: u32,
}

/// The node-facing RPC surface (§6): everything the excluded HTTP/WS/JSON-RPC
/// transport layer calls into. Generates the server trait (`NodeApiServer`,
/// implemented by the node) via `jsonrpsee`'s `#[rpc]` macro.
#[rpc(server, namespace = "flowchain")]
pub trait NodeApi {
    #[method(name = "getBlock")]
    async fn get_block(&self, hash: Hash) -> RpcResult<Option<Block>>;

    #[method(name = "getBalance")]
    async fn get_balance(&self, address: String) -> RpcResult<Balance>;

    #[method(name = "buildTransferTx")]
    async fn build_transfer_tx(
        &self,
        from_pub_key: String,
        destinations: Vec<Destination>,
        gas_opts: GasOpts,
    ) -> RpcResult<UnsignedTransaction>;

    #[method(name = "submitTx")]
    async fn submit_tx(&self, unsigned: UnsignedTransaction, signatures: Vec<String>) -> RpcResult<TxResult>;

    #[method(name = "getTxStatus")]
    async fn get_tx_status(&self, tx_id: Hash, from: u32, to: u32) -> RpcResult<TxStatus>;

    #[method(name = "getSelfClique")]
    async fn get_self_clique(&self) -> RpcResult<SelfCliqueInfo>;

    #[method(name = "getChainInfo")]
    async fn get_chain_info(&self, from: u32, to: u32) -> RpcResult<ChainInfo>;

    #[method(name = "getMisbehaviors")]
    async fn get_misbehaviors(&self) -> RpcResult<Vec<MisbehaviorEntry>>;

    /// Newly-applied-block subscription (§6).
    #[subscription(name = "subscribeBlocks", unsubscribe = "unsubscribeBlocks", item = Block)]
    async fn subscribe_blocks(&self) -> jsonrpsee::core::SubscriptionResult;
}

/// Starts a jsonrpsee server binding `addr`, serving `api` under the
/// `NodeApi` surface. Transport framing (HTTP upgrade, WS handshake) is
/// handled entirely by `jsonrpsee`; nothing here re-implements it.
pub async fn serve(addr: std::net::SocketAddr, api: impl NodeApiServer) -> anyhow::Result<ServerHandle> {
    let server = Server::builder().build(addr).await?;
    let local_addr = server.local_addr()?;
    let handle = server.start(api.into_rpc());
    tracing::debug!(addr = %local_addr, "jsonrpsee server started");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_status_variants_round_trip_through_json() {
        let status = TxStatus::Confirmed {
            block_hash: Hash::ZERO,
            tx_index: 0,
            chain_confirmations: 1,
            from_confirmations: 1,
            to_confirmations: 1,
        };
        let json = serde_json::to_string(&status).expect("serialize");
        let back: TxStatus = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(back, TxStatus::Confirmed { .. }));
    }
}
