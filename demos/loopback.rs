//! Loopback example: two channels exchanging frames over a noisy buffer

use mavframe::protocol::{FieldDef, crc_extra};
use mavframe::{ChannelRegistry, MessageInfo, MessageTable, ParseState};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("mavframe loopback");
    println!("=================\n");

    let system_time = crc_extra(
        "SYSTEM_TIME",
        &[
            FieldDef::scalar("uint64_t", "time_unix_usec"),
            FieldDef::scalar("uint32_t", "time_boot_ms"),
        ],
    );
    let table = MessageTable::from_entries([
        MessageInfo::new(0, 50, 9),
        MessageInfo::new(2, system_time, 12),
    ])?;
    let mut registry = ChannelRegistry::new(table);

    // Channel 0 transmits into a plain buffer standing in for a serial port.
    let mut wire = vec![0x00, 0x42, 0xFD, 0x17];
    let heartbeat = [0, 0, 0, 0, 2, 3, 81, 4, 3];
    let tx = registry.send_channel(0, 0, &heartbeat, 1, 1, &mut wire)?;
    println!("sent HEARTBEAT seq={} crc={:#06x} len={}", tx.seq, tx.checksum, tx.trimmed_len);

    let mut time = [0u8; 12];
    time[..8].copy_from_slice(&1_700_000_000_000_000u64.to_le_bytes());
    let tx = registry.send_channel(0, 2, &time, 1, 1, &mut wire)?;
    println!("sent SYSTEM_TIME seq={} crc={:#06x} len={}", tx.seq, tx.checksum, tx.trimmed_len);

    // Channel 1 receives byte by byte, noise included.
    for &byte in &wire {
        if let Some(msg) = registry.feed_channel(1, byte)? {
            let info = registry.lookup().require(msg.msgid())?;
            println!(
                "received msgid={} seq={} sys={} comp={} payload={:02x?}",
                msg.msgid(),
                msg.seq(),
                msg.sysid(),
                msg.compid(),
                msg.padded_payload(usize::from(info.max_len)).as_ref()
            );
        }
    }

    let stats = registry.stats(1)?;
    println!("\n{stats:?}");
    assert_eq!(registry.parse_state(1)?, ParseState::Idle);
    println!("totals: {:?}", mavframe::metrics_snapshot());

    Ok(())
}
