//! Actor-task realization of the node (§5.1): one `tokio` task owning the
//! `BlockFlow`/mempool/world-state, driven by a bounded `mpsc` mailbox and
//! the "ask" pattern (`oneshot` replies embedded in each request). The
//! `flowchain-rpc` server is a thin front end translating external calls
//! into messages sent to this task — it never touches the state directly.

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::types::ErrorObjectOwned;
use tokio::sync::{mpsc, oneshot};

use flowchain_core::chain::{Block, BlockHeader, Transaction};
use flowchain_core::config::ChainConfig;
use flowchain_core::misbehavior::MisbehaviorRecord;
use flowchain_core::pow;
use flowchain_core::primitives::{ChainIndex, Hash, U256};
use flowchain_core::validation;
use flowchain_core::worldstate::WorldState;
use flowchain_core::{blockflow::BlockFlow, blockflow::Mempool};

use flowchain_rpc::{
    Balance, ChainInfo, Destination, GasOpts, MisbehaviorEntry, NodeApiServer, SelfCliqueInfo, TxResult, TxStatus,
};

/// Exit codes the node binary returns (§6 "Exit codes (node binary)").
#[derive(Debug, Clone, Copy)]
#[repr(i32)]
pub enum ExitCode {
    Normal = 0,
    Configuration = 1,
    StorageInit = 2,
    StateDivergence = 3,
}

/// Requests the `BlockAcceptorActor`'s mailbox accepts. Every variant carries
/// its own `oneshot::Sender` reply channel (the "ask" pattern) so the
/// front-end task never blocks waiting on a shared lock.
pub enum AcceptorMessage {
    GetBlock { hash: Hash, reply: oneshot::Sender<Option<Block>> },
    GetBalance { address: flowchain_core::primitives::Address, reply: oneshot::Sender<Balance> },
    SubmitTx { tx: Transaction, reply: oneshot::Sender<TxResult> },
    GetTxStatus { tx_id: Hash, from: u32, to: u32, reply: oneshot::Sender<TxStatus> },
    GetChainInfo { from: u32, to: u32, reply: oneshot::Sender<ChainInfo> },
    GetSelfClique { reply: oneshot::Sender<SelfCliqueInfo> },
    GetMisbehaviors { reply: oneshot::Sender<Vec<MisbehaviorEntry>> },
}

/// Mailbox capacity for the block acceptor (§5.1 backpressure: sends beyond
/// capacity are dropped by the bounded channel, not queued unbounded).
const ACCEPTOR_MAILBOX_CAPACITY: usize = 256;

fn genesis_for(idx: ChainIndex, difficulty: u32) -> Block {
    let header = BlockHeader {
        block_deps: vec![],
        dep_state_hash: Hash::ZERO,
        txs_hash: Block::compute_txs_hash(&[]),
        timestamp: 0,
        target: pow::target_from_zero_bits(difficulty),
        nonce: [idx.from as u8, idx.to as u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        version: 0,
    };
    Block { header, transactions: vec![] }
}

/// Owns `BlockFlow`, the mempool and the world state; the only task that
/// mutates any of them (§5 "Shared resources").
struct BlockAcceptorActor {
    flow: BlockFlow,
    world: WorldState,
    mempool: Mempool,
    misbehaviors: Vec<MisbehaviorRecord>,
    config: ChainConfig,
}

impl BlockAcceptorActor {
    fn new(config: ChainConfig) -> Self {
        let difficulty = config.consensus.num_zeros_at_least_in_hash;
        let flow = BlockFlow::new(config.broker.group_num, config.consensus.block_confirm_num, move |idx| {
            genesis_for(idx, difficulty)
        });
        BlockAcceptorActor {
            flow,
            world: WorldState::new(),
            mempool: Mempool::new(config.consensus.block_target_time_ms * 64),
            misbehaviors: Vec::new(),
            config,
        }
    }

    fn handle(&mut self, message: AcceptorMessage) {
        match message {
            AcceptorMessage::GetBlock { hash, reply } => {
                let _ = reply.send(self.flow.find_block(&hash).cloned());
            }
            AcceptorMessage::GetBalance { address, reply } => {
                let mut alph = U256::zero();
                let mut utxo_count = 0u64;
                for (_, out) in self.world.outputs_owned_by(&address) {
                    alph = alph.saturating_add(out.amount());
                    utxo_count += 1;
                }
                let _ = reply.send(Balance {
                    alph,
                    locked_alph: U256::zero(),
                    tokens: Vec::new(),
                    locked_tokens: Vec::new(),
                    utxo_count,
                });
            }
            AcceptorMessage::SubmitTx { tx, reply } => {
                let result = match validation::validate_transaction(&tx, &self.world) {
                    Ok(()) if self.mempool.conflicts(&tx) => {
                        TxResult::InvalidTx { reason: "conflicts with a pooled transaction".into() }
                    }
                    Ok(()) => {
                        let tx_id = tx.hash();
                        self.mempool.insert(tx, 0);
                        TxResult::Accepted { tx_id }
                    }
                    Err(e) => TxResult::InvalidTx { reason: e.to_string() },
                };
                let _ = reply.send(result);
            }
            AcceptorMessage::GetTxStatus { tx_id, from, to, reply } => {
                let _ = (from, to);
                // Confirmed-tx lookup needs a txId -> (block, index) column
                // family that this shell doesn't maintain; mempool presence
                // is the only status this actor can answer today.
                let status = if self.mempool.contains(&tx_id) { TxStatus::MemPooled } else { TxStatus::NotFound };
                let _ = reply.send(status);
            }
            AcceptorMessage::GetChainInfo { from, to, reply } => {
                let idx = ChainIndex::new(from, to);
                let height = self.flow.chain_height(idx);
                let _ = reply.send(ChainInfo { chain_index: idx, height });
            }
            AcceptorMessage::GetSelfClique { reply } => {
                let _ = reply.send(SelfCliqueInfo {
                    group_num: self.config.broker.group_num,
                    broker_id: self.config.broker.broker_id,
                    broker_num: self.config.broker.broker_num,
                });
            }
            AcceptorMessage::GetMisbehaviors { reply } => {
                let entries = self
                    .misbehaviors
                    .iter()
                    .map(|r| MisbehaviorEntry { peer_id: r.peer_id.clone(), action: format!("{:?}", r.action), count: r.count })
                    .collect();
                let _ = reply.send(entries);
            }
        }
    }
}

/// Spawns the `BlockAcceptorActor` as a `tokio` task and returns the bounded
/// sender used to talk to it.
fn spawn_acceptor(config: ChainConfig) -> mpsc::Sender<AcceptorMessage> {
    let (tx, mut rx) = mpsc::channel(ACCEPTOR_MAILBOX_CAPACITY);
    let mut actor = BlockAcceptorActor::new(config);
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            actor.handle(message);
        }
    });
    tx
}

fn internal_error(msg: impl std::fmt::Display) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
}

/// The `RpcActor` (§5.1): a thin front end translating `NodeApi` calls into
/// `AcceptorMessage` asks. Holds no state of its own beyond the mailbox
/// handle.
#[derive(Clone)]
struct NodeApiImpl {
    acceptor: mpsc::Sender<AcceptorMessage>,
}

impl NodeApiImpl {
    async fn ask<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> AcceptorMessage) -> RpcResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.acceptor.send(build(reply_tx)).await.map_err(internal_error)?;
        reply_rx.await.map_err(internal_error)
    }
}

#[async_trait]
impl NodeApiServer for NodeApiImpl {
    async fn get_block(&self, hash: Hash) -> RpcResult<Option<Block>> {
        self.ask(|reply| AcceptorMessage::GetBlock { hash, reply }).await
    }

    async fn get_balance(&self, address: String) -> RpcResult<Balance> {
        let address = flowchain_core::primitives::Address::decode(&address).map_err(internal_error)?;
        self.ask(|reply| AcceptorMessage::GetBalance { address, reply }).await
    }

    async fn build_transfer_tx(
        &self,
        from_pub_key: String,
        destinations: Vec<Destination>,
        gas_opts: GasOpts,
    ) -> RpcResult<flowchain_core::chain::UnsignedTransaction> {
        let _ = (from_pub_key, destinations, gas_opts);
        Err(internal_error("buildTransferTx requires a UTXO listing query not wired in this node shell"))
    }

    async fn submit_tx(
        &self,
        unsigned: flowchain_core::chain::UnsignedTransaction,
        signatures: Vec<String>,
    ) -> RpcResult<TxResult> {
        if signatures.len() != unsigned.inputs.len() {
            return Ok(TxResult::InvalidTx { reason: "signature count does not match input count".into() });
        }
        let input_signatures = signatures
            .iter()
            .map(|s| hex::decode(s).ok().and_then(|b| <[u8; 64]>::try_from(b).ok()).map(flowchain_core::primitives::Signature))
            .collect::<Option<Vec<_>>>();
        let Some(input_signatures) = input_signatures else {
            return Ok(TxResult::InvalidTx { reason: "malformed signature encoding".into() });
        };
        let tx = Transaction {
            unsigned,
            script_execution_ok: true,
            contract_inputs: vec![],
            generated_outputs: vec![],
            input_signatures,
            script_signatures: vec![],
        };
        self.ask(|reply| AcceptorMessage::SubmitTx { tx, reply }).await
    }

    async fn get_tx_status(&self, tx_id: Hash, from: u32, to: u32) -> RpcResult<TxStatus> {
        self.ask(|reply| AcceptorMessage::GetTxStatus { tx_id, from, to, reply }).await
    }

    async fn get_self_clique(&self) -> RpcResult<SelfCliqueInfo> {
        self.ask(|reply| AcceptorMessage::GetSelfClique { reply }).await
    }

    async fn get_chain_info(&self, from: u32, to: u32) -> RpcResult<ChainInfo> {
        self.ask(|reply| AcceptorMessage::GetChainInfo { from, to, reply }).await
    }

    async fn get_misbehaviors(&self) -> RpcResult<Vec<MisbehaviorEntry>> {
        self.ask(|reply| AcceptorMessage::GetMisbehaviors { reply }).await
    }

    async fn subscribe_blocks(
        &self,
        pending: jsonrpsee::server::PendingSubscriptionSink,
    ) -> jsonrpsee::core::SubscriptionResult {
        // No block-applied event bus is wired in this shell (the storage/
        // acceptor split that would publish one is the `StorageActor`'s
        // job, out of scope for this binary); accept and hold the
        // subscription open with no notifications rather than reject it.
        let _sink = pending.accept().await?;
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Runs the node until `ctrl_c`: spawns the `BlockAcceptorActor`, wires the
/// `flowchain-rpc` server to it, and blocks until shutdown.
pub async fn run(config: ChainConfig) -> Result<ExitCode, anyhow::Error> {
    let bind_addr: std::net::SocketAddr = config
        .network
        .bind_address
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid network.bind_address: {e}"))?;

    let acceptor = spawn_acceptor(config.clone());
    let api = NodeApiImpl { acceptor };

    let _handle = flowchain_rpc::serve(bind_addr, api).await?;
    tracing::info!(addr = %bind_addr, "flowchain node listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(ExitCode::Normal)
}
