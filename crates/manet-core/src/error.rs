use manet_common::PeerTableError;
use manet_link::LinkError;
use manet_wire::WireError;
use thiserror::Error;

/// Failures surfaced by the routing core (spec §7). Every variant is a local-return: nothing
/// inside the core panics on attacker-controlled input, and a failure here never leaves the
/// information base in a half-updated state.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("frame layer: {0}")]
    Link(#[from] LinkError),

    #[error("wire codec: {0}")]
    Wire(#[from] WireError),

    #[error("peer table: {0}")]
    PeerTable(#[from] PeerTableError),

    #[error("domain id {0} is not configured on this node")]
    UnknownDomain(u8),

    #[error("entry slot for an existing peer-id was unexpectedly occupied")]
    SlotOccupied,
}
