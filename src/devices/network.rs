//! Network card windows.
//!
//! Inbound traffic is written ring-buffer style into 0x6000-0x607F as
//! (sender id, data) pairs, advancing two words per packet and wrapping
//! after 128 words.
//!
//! Outbound traffic is staged by the guest in 0x6080-0x60FF as
//! (receiver id, data) pairs. Writing the data word (odd address) sends
//! the pair at once: the card captures the packet from the words it has
//! observed and marks the pair to be zeroed on the next drain.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// First inbound word.
pub const INBOUND_START: u16 = 0x6000;
/// First outbound word.
pub const OUTBOUND_START: u16 = 0x6080;
/// Words in each window.
pub const WINDOW_WORDS: u16 = 128;
/// Last outbound word.
pub const OUTBOUND_END: u16 = OUTBOUND_START + WINDOW_WORDS - 1;
/// Packets held for the host before the oldest are dropped.
pub const OUTBOX_LIMIT: usize = 256;

/// One word of traffic with the hub id of the other party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet {
    /// Sender for inbound packets, receiver for outbound ones.
    pub peer: u16,
    /// Payload.
    pub data: u16,
}

/// Network card state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCard {
    hub_id: u16,
    inbound_index: u16,
    /// Last value seen at each outbound word.
    outbound: Vec<u16>,
    /// Packets sent by the guest, oldest first.
    outbox: VecDeque<Packet>,
    /// Data-word addresses of sent pairs still holding their words.
    unzeroed: BTreeSet<u16>,
}

impl NetworkCard {
    /// Create a card that identifies itself as `hub_id` on the network.
    pub fn new(hub_id: u16) -> Self {
        Self {
            hub_id,
            inbound_index: 0,
            outbound: vec![0; usize::from(WINDOW_WORDS)],
            outbox: VecDeque::new(),
            unzeroed: BTreeSet::new(),
        }
    }

    /// This machine's hub id.
    pub fn hub_id(&self) -> u16 {
        self.hub_id
    }

    /// Whether `address` is in the outbound window.
    pub fn is_outbound(address: u16) -> bool {
        (OUTBOUND_START..=OUTBOUND_END).contains(&address)
    }

    /// Record a memory write; a data word in the outbound window sends its pair.
    pub fn on_write(&mut self, address: u16, value: u16) {
        if !Self::is_outbound(address) {
            return;
        }
        let offset = usize::from(address - OUTBOUND_START);
        self.outbound[offset] = value;
        if address % 2 == 0 {
            // The guest is staging this pair again; leave it alone
            self.unzeroed.remove(&(address + 1));
            return;
        }

        let peer = self.outbound[offset - 1];
        if peer == 0 {
            // A cleared pair is not a send
            if value != 0 {
                tracing::warn!(
                    address = format_args!("{address:#06x}"),
                    data = value,
                    "outbound pair has no receiver, dropped"
                );
            }
            return;
        }

        if self.outbox.len() == OUTBOX_LIMIT {
            if let Some(lost) = self.outbox.pop_front() {
                tracing::warn!(to = lost.peer, data = lost.data, "outbox full, oldest packet dropped");
            }
        }
        self.outbox.push_back(Packet { peer, data: value });
        self.unzeroed.insert(address);
        tracing::debug!(to = peer, data = value, "packet sent");
    }

    /// Claim the next inbound pair, returning the address of its sender word.
    pub fn advance_inbound(&mut self) -> u16 {
        let slot = INBOUND_START + self.inbound_index;
        self.inbound_index = (self.inbound_index + 2) % WINDOW_WORDS;
        slot
    }

    /// Packets sent since the last call, oldest first.
    pub fn take_outbox(&mut self) -> Vec<Packet> {
        self.outbox.drain(..).collect()
    }

    /// Packets waiting for the host.
    pub fn outbox_len(&self) -> usize {
        self.outbox.len()
    }

    /// Data-word addresses of sent pairs that still need zeroing.
    pub fn take_unzeroed(&mut self) -> BTreeSet<u16> {
        std::mem::take(&mut self.unzeroed)
    }

    /// Put back pairs a drain could not zero.
    pub fn requeue_unzeroed(&mut self, addresses: impl IntoIterator<Item = u16>) {
        self.unzeroed.extend(addresses);
    }

    /// Forget traffic and restart the inbound ring.
    pub fn reset(&mut self) {
        self.inbound_index = 0;
        self.outbound.fill(0);
        self.outbox.clear();
        self.unzeroed.clear();
    }
}

impl Default for NetworkCard {
    fn default() -> Self {
        Self::new(0)
    }
}
