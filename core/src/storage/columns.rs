//! Column family catalogue (§4.1.1, §6 Persisted state layout).

use strum::{AsRefStr, Display, EnumIter};

/// One RocksDB column family per logical table. `AsRefStr`/`Display` give the
/// on-disk CF name; `EnumIter` lets the storage actor create every CF on
/// open without hand-maintaining a second list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Column {
    /// `{hash} => {block}`
    Blocks,
    /// `{hash} => {header}`
    Headers,
    /// `{chainIndex} => {tips-set}`
    Tips,
    /// `{trie-node-hash} => {node-bytes}`
    WorldState,
    /// `{logStatesId} => {LogStates}`
    LogStates,
    /// `{txHash} => {tx}`
    Mempool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_column_has_a_stable_name() {
        let names: Vec<String> = Column::iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["blocks", "headers", "tips", "world_state", "log_states", "mempool"]);
    }
}
