//! Node-wide tunables (spec §4.5, §3, §4.8). Not file-parsed configuration — the core only ever
//! sees these as constructor arguments, the way `octavius_route::RouteTable` takes no config file
//! but is parameterized directly.

/// Upper bound on live peer-ids (spec §3 "Bound N (e.g. 128)").
pub const DEFAULT_MAX_PEER: usize = 128;

/// Upper bound on simultaneously configured domains (spec §4.9 "e.g. 4").
pub const DEFAULT_MAX_DOMAINS: usize = 4;

/// Duplicate-set sliding-window width in seqnos (spec §4.8, `W ∈ {8,16,32,64}`).
pub const DEFAULT_DUPLICATE_WINDOW: u32 = 32;

/// Consecutive `TOO_OLD` verdicts before a duplicate-set entry is reset (spec §4.8).
pub const MAX_TOO_OLD: u32 = 8;

/// Hop limit stamped on an originated TC (spec §4.5 step 4, "increment hop_count; if hop_count
/// >= hop_limit, do not forward").
pub const DEFAULT_HOP_LIMIT: u8 = 8;

/// Largest packet the frame layer will reassemble, `16 * DEFAULT_MAX_FRAME` (spec §4.3
/// "PACKET_MAX = 16*F").
pub const DEFAULT_PACKET_MAX: usize = 16 * manet_link::DEFAULT_MAX_FRAME;

/// Per-frame payload budget once the 6-byte segmenter header is subtracted from the link MTU.
pub const DEFAULT_FRAME_PAYLOAD_MAX: usize = manet_link::DEFAULT_MAX_FRAME - manet_link::HEADER_LEN;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeConfig {
    pub max_peer: usize,
    pub max_domains: usize,
    /// Index into `0..max_domains` of the domain used for message flooding (spec §4.9).
    pub flooding_domain: u8,
    pub hello_interval: u64,
    pub tc_interval: u64,
    pub routing_interval: u64,
    pub default_willingness: u8,
    pub duplicate_window: u32,
    pub addr_len: u8,
    pub hop_limit: u8,
    pub packet_max: usize,
    pub frame_payload_max: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            max_peer: DEFAULT_MAX_PEER,
            max_domains: DEFAULT_MAX_DOMAINS,
            flooding_domain: 0,
            hello_interval: 2,
            tc_interval: 5,
            routing_interval: 5,
            default_willingness: 3,
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
            addr_len: 6,
            hop_limit: DEFAULT_HOP_LIMIT,
            packet_max: DEFAULT_PACKET_MAX,
            frame_payload_max: DEFAULT_FRAME_PAYLOAD_MAX,
        }
    }
}
