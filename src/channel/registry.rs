//! Fixed-size table of independent channels

use tracing::{debug, instrument};

use crate::protocol::{
    Error, Message, MessageLookup, MessageTable, ParseState, ParseStats, Result, TxInfo,
};

use super::{ByteSink, ChannelState, DefaultSink};

/// Registry configuration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegistryConfig {
    /// Number of channel slots; ids `0..max_channels` are valid.
    pub max_channels: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_channels: 4 }
    }
}

/// Owns the per-channel parser and framer state for every link.
///
/// Slots are created lazily on first use. Channels never share state: bytes
/// fed to channel 0 cannot affect what channel 1 parses, and each channel
/// keeps its own outgoing sequence counter.
///
/// The registry is not internally synchronized. Callers that drive channels
/// from several threads wrap it in a lock or give each thread its own
/// [`ChannelState`].
#[derive(Debug)]
pub struct ChannelRegistry<L = MessageTable> {
    config: RegistryConfig,
    lookup: L,
    channels: Vec<Option<ChannelState>>,
}

impl<L: MessageLookup> ChannelRegistry<L> {
    /// Registry with the default configuration
    pub fn new(lookup: L) -> Self {
        Self::with_config(RegistryConfig::default(), lookup)
    }

    /// Registry with an explicit configuration
    pub fn with_config(config: RegistryConfig, lookup: L) -> Self {
        let mut channels = Vec::with_capacity(config.max_channels);
        channels.resize_with(config.max_channels, || None);
        Self {
            config,
            lookup,
            channels,
        }
    }

    /// Metadata source shared by every channel
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Configured number of channel slots
    #[must_use]
    pub fn max_channels(&self) -> usize {
        self.config.max_channels
    }

    /// State for `channel`, creating it on first access.
    pub fn get_or_init(&mut self, channel: usize) -> Result<&mut ChannelState> {
        let (_, slot) = self.slot_mut(channel)?;
        Ok(slot.get_or_insert_with(|| {
            debug!(channel, "channel initialized");
            ChannelState::new()
        }))
    }

    fn existing(&self, channel: usize) -> Result<Option<&ChannelState>> {
        self.channels
            .get(channel)
            .map(Option::as_ref)
            .ok_or(Error::UnknownChannel {
                channel,
                max: self.config.max_channels,
            })
    }

    fn slot_mut(&mut self, channel: usize) -> Result<(&L, &mut Option<ChannelState>)> {
        let Self {
            config,
            lookup,
            channels,
        } = self;
        let max = config.max_channels;
        let slot = channels
            .get_mut(channel)
            .ok_or(Error::UnknownChannel { channel, max })?;
        Ok((lookup, slot))
    }

    /// Feed one received byte to `channel`.
    ///
    /// Returns `Ok(Some(_))` exactly when the byte completed a valid frame.
    #[instrument(level = "trace", skip(self))]
    pub fn feed_channel(&mut self, channel: usize, byte: u8) -> Result<Option<Message>> {
        let (lookup, slot) = self.slot_mut(channel)?;
        let state = slot.get_or_insert_with(ChannelState::new);
        Ok(state.feed(lookup, byte))
    }

    /// Feed a received buffer to `channel`, collecting every completed message
    #[instrument(level = "trace", skip(self, bytes), fields(len = bytes.len()))]
    pub fn feed_channel_buf(&mut self, channel: usize, bytes: &[u8]) -> Result<Vec<Message>> {
        let (lookup, slot) = self.slot_mut(channel)?;
        let state = slot.get_or_insert_with(ChannelState::new);
        let (parser, _) = state.split();
        Ok(parser.feed_all(lookup, bytes))
    }

    /// Frame and send message `msgid` on `channel` through `sink`.
    #[instrument(level = "trace", skip(self, payload, sink), fields(len = payload.len()))]
    pub fn send_channel<S: ByteSink + ?Sized>(
        &mut self,
        channel: usize,
        msgid: u32,
        payload: &[u8],
        sysid: u8,
        compid: u8,
        sink: &mut S,
    ) -> Result<TxInfo> {
        let info = self
            .lookup
            .lookup(msgid)
            .ok_or(Error::UnknownMessage { msgid })?;
        self.get_or_init(channel)?
            .send(&info, payload, sysid, compid, sink)
    }

    /// Frame and send message `msgid` on `channel` through its default sink.
    #[instrument(level = "trace", skip(self, payload), fields(len = payload.len()))]
    pub fn send_channel_default(
        &mut self,
        channel: usize,
        msgid: u32,
        payload: &[u8],
        sysid: u8,
        compid: u8,
    ) -> Result<TxInfo> {
        let info = self
            .lookup
            .lookup(msgid)
            .ok_or(Error::UnknownMessage { msgid })?;
        self.get_or_init(channel)?
            .send_default(&info, payload, sysid, compid)
            .unwrap_or(Err(Error::NoDefaultSink { channel }))
    }

    /// Install the default sink for `channel`, returning the previous one
    pub fn set_default_sink(
        &mut self,
        channel: usize,
        sink: DefaultSink,
    ) -> Result<Option<DefaultSink>> {
        Ok(self.get_or_init(channel)?.set_default_sink(sink))
    }

    /// Parser state of `channel`; [`ParseState::Uninit`] until first use
    pub fn parse_state(&self, channel: usize) -> Result<ParseState> {
        Ok(self
            .existing(channel)?
            .map_or(ParseState::Uninit, ChannelState::parse_state))
    }

    /// Receive counters of `channel`; all zero until first use
    pub fn stats(&self, channel: usize) -> Result<ParseStats> {
        Ok(self
            .existing(channel)?
            .map(|state| *state.stats())
            .unwrap_or_default())
    }

    /// Sequence number the next frame sent on `channel` will carry
    pub fn next_seq(&self, channel: usize) -> Result<u8> {
        Ok(self.existing(channel)?.map_or(0, ChannelState::next_seq))
    }

    /// Drop `channel` entirely: parser, sequence counter and default sink
    pub fn reset(&mut self, channel: usize) -> Result<()> {
        let (_, slot) = self.slot_mut(channel)?;
        if slot.take().is_some() {
            debug!(channel, "channel reset");
        }
        Ok(())
    }
}

impl Default for ChannelRegistry<MessageTable> {
    fn default() -> Self {
        Self::new(MessageTable::new())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::channel::FnSink;
    use crate::protocol::MessageInfo;

    const HEARTBEAT: MessageInfo = MessageInfo::new(0, 50, 9);

    fn registry() -> ChannelRegistry {
        ChannelRegistry::new(MessageTable::from_entries([HEARTBEAT]).unwrap())
    }

    #[test]
    fn test_default_config() {
        let registry = registry();
        assert_eq!(registry.max_channels(), 4);
        assert_eq!(registry.parse_state(3).unwrap(), ParseState::Uninit);
        assert!(matches!(
            registry.parse_state(4),
            Err(Error::UnknownChannel { channel: 4, max: 4 })
        ));
    }

    #[test]
    fn test_send_and_receive_across_channels() {
        let mut registry = registry();
        let mut wire = Vec::new();
        let tx = registry
            .send_channel(0, 0, &[1, 2, 3], 1, 1, &mut wire)
            .unwrap();
        assert_eq!(tx.seq, 0);
        assert_eq!(registry.next_seq(0).unwrap(), 1);
        assert_eq!(registry.next_seq(1).unwrap(), 0);

        let messages = registry.feed_channel_buf(1, &wire).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload().as_ref(), &[1, 2, 3]);
        assert_eq!(registry.parse_state(1).unwrap(), ParseState::Idle);
        assert_eq!(registry.stats(1).unwrap().messages_received, 1);
        assert_eq!(registry.stats(0).unwrap().messages_received, 0);
    }

    #[test]
    fn test_partial_frame_does_not_leak_between_channels() {
        let mut registry = registry();
        let mut wire = Vec::new();
        registry.send_channel(0, 0, &[7], 1, 1, &mut wire).unwrap();

        let (head, tail) = wire.split_at(5);
        assert!(registry.feed_channel_buf(0, head).unwrap().is_empty());
        assert!(registry.feed_channel_buf(1, tail).unwrap().is_empty());
        assert_ne!(registry.parse_state(0).unwrap(), ParseState::Idle);

        let done = registry.feed_channel_buf(0, tail).unwrap();
        assert_eq!(done.len(), 1);
    }

    #[test]
    fn test_unknown_message_and_channel() {
        let mut registry = registry();
        let mut wire = Vec::new();
        assert!(matches!(
            registry.send_channel(0, 77, &[1], 1, 1, &mut wire),
            Err(Error::UnknownMessage { msgid: 77 })
        ));
        assert!(matches!(
            registry.send_channel(9, 0, &[1], 1, 1, &mut wire),
            Err(Error::UnknownChannel { channel: 9, .. })
        ));
        assert!(registry.feed_channel(9, 0xFD).is_err());
        assert!(registry.feed_channel_buf(4, &[0xFD]).is_err());
        assert!(matches!(
            registry.reset(4),
            Err(Error::UnknownChannel { channel: 4, max: 4 })
        ));
        assert!(wire.is_empty());
    }

    #[test]
    fn test_default_sink_routing() {
        let mut registry = registry();
        assert!(matches!(
            registry.send_channel_default(2, 0, &[1], 1, 1),
            Err(Error::NoDefaultSink { channel: 2 })
        ));

        registry
            .set_default_sink(2, Box::new(FnSink::new(|_: &[u8]| Ok(()))))
            .unwrap();
        let tx = registry.send_channel_default(2, 0, &[1], 1, 1).unwrap();
        assert_eq!(tx.seq, 0);
    }

    #[test]
    fn test_sink_error_surfaces() {
        let mut registry = registry();
        let mut sink = FnSink::new(|_: &[u8]| Err(io::Error::other("down")));
        let err = registry
            .send_channel(0, 0, &[1], 1, 1, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
        assert_eq!(registry.next_seq(0).unwrap(), 1);
    }

    #[test]
    fn test_reset_channel() {
        let mut registry = registry();
        let mut wire = Vec::new();
        registry.send_channel(1, 0, &[1], 1, 1, &mut wire).unwrap();
        registry.feed_channel(1, 0xFD).unwrap();

        registry.reset(1).unwrap();
        assert_eq!(registry.parse_state(1).unwrap(), ParseState::Uninit);
        assert_eq!(registry.next_seq(1).unwrap(), 0);
    }

    #[test]
    fn test_custom_channel_count() {
        let config = RegistryConfig { max_channels: 16 };
        let mut registry = ChannelRegistry::with_config(config, &[HEARTBEAT][..]);
        assert!(registry.get_or_init(15).is_ok());
        assert!(registry.get_or_init(16).is_err());
    }
}
