//! Per-channel codec state

use std::fmt;

use crate::protocol::{
    Framer, Message, MessageInfo, MessageLookup, ParseState, ParseStats, Parser, Result, TxInfo,
};

use super::ByteSink;

/// Boxed sink stored as a channel's default destination.
pub type DefaultSink = Box<dyn ByteSink + Send>;

/// Everything one channel owns: a parser, a sequence counter and an optional
/// default sink.
///
/// Receive and transmit halves are disjoint. [`split`](Self::split) hands them
/// out separately so a reader and a writer can each hold one.
#[derive(Default)]
pub struct ChannelState {
    parser: Parser,
    framer: Framer,
    default_sink: Option<DefaultSink>,
}

impl ChannelState {
    /// Fresh channel: parser idle, sequence 0, no default sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received byte
    pub fn feed<L: MessageLookup + ?Sized>(&mut self, lookup: &L, byte: u8) -> Option<Message> {
        self.parser.feed(lookup, byte)
    }

    /// Frame and send a message through `sink`
    pub fn send<S: ByteSink + ?Sized>(
        &mut self,
        info: &MessageInfo,
        payload: &[u8],
        sysid: u8,
        compid: u8,
        sink: &mut S,
    ) -> Result<TxInfo> {
        self.framer.send(info, payload, sysid, compid, sink)
    }

    /// Frame and send a message through the channel's default sink
    pub fn send_default(
        &mut self,
        info: &MessageInfo,
        payload: &[u8],
        sysid: u8,
        compid: u8,
    ) -> Option<Result<TxInfo>> {
        let sink = self.default_sink.as_mut()?;
        Some(self.framer.send(info, payload, sysid, compid, sink))
    }

    /// Install (or replace) the default sink, returning the previous one
    pub fn set_default_sink(&mut self, sink: DefaultSink) -> Option<DefaultSink> {
        self.default_sink.replace(sink)
    }

    /// Remove the default sink
    pub fn take_default_sink(&mut self) -> Option<DefaultSink> {
        self.default_sink.take()
    }

    /// Whether a default sink is installed
    #[must_use]
    pub fn has_default_sink(&self) -> bool {
        self.default_sink.is_some()
    }

    /// Current parser state
    #[must_use]
    pub fn parse_state(&self) -> ParseState {
        self.parser.state()
    }

    /// Receive counters
    #[must_use]
    pub fn stats(&self) -> &ParseStats {
        self.parser.stats()
    }

    /// Sequence number of the next outgoing frame
    #[must_use]
    pub fn next_seq(&self) -> u8 {
        self.framer.next_seq()
    }

    /// Borrow the receive and transmit halves independently
    pub fn split(&mut self) -> (&mut Parser, &mut Framer) {
        (&mut self.parser, &mut self.framer)
    }

    /// Drop any partial inbound frame
    pub fn reset_parser(&mut self) {
        self.parser.reset();
    }
}

impl fmt::Debug for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelState")
            .field("parser", &self.parser)
            .field("framer", &self.framer)
            .field("default_sink", &self.default_sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::channel::FnSink;
    use crate::protocol::MessageTable;

    #[test]
    fn test_send_then_feed_on_peer() {
        let info = MessageInfo::new(0, 50, 6);
        let table = MessageTable::from_entries([info]).unwrap();
        let mut tx = ChannelState::new();
        let mut rx = ChannelState::new();

        let mut wire = Vec::new();
        tx.send(&info, &[1, 2, 3, 4, 5, 6], 1, 1, &mut wire).unwrap();
        let messages: Vec<Message> = wire.iter().filter_map(|&b| rx.feed(&table, b)).collect();

        assert_eq!(messages.len(), 1);
        assert_eq!(tx.next_seq(), 1);
        assert_eq!(rx.next_seq(), 0);
        assert_eq!(rx.stats().messages_received, 1);
    }

    #[test]
    fn test_default_sink() {
        let info = MessageInfo::new(0, 50, 6);
        let captured = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&captured);

        let mut state = ChannelState::new();
        assert!(state.send_default(&info, &[1], 1, 1).is_none());

        state.set_default_sink(Box::new(FnSink::new(move |chunk: &[u8]| {
            shared.lock().expect("capture lock").extend_from_slice(chunk);
            Ok(())
        })));
        assert!(state.has_default_sink());
        let tx = state.send_default(&info, &[1], 1, 1).unwrap().unwrap();

        assert_eq!(tx.trimmed_len, 1);
        assert_eq!(captured.lock().unwrap().len(), 13);
    }

    #[test]
    fn test_split_halves() {
        let info = MessageInfo::new(0, 50, 6);
        let table = MessageTable::from_entries([info]).unwrap();
        let mut state = ChannelState::new();
        let (parser, framer) = state.split();

        let mut wire = Vec::new();
        framer.send(&info, &[4], 1, 1, &mut wire).unwrap();
        assert_eq!(parser.feed_all(&table, &wire).len(), 1);
    }
}
