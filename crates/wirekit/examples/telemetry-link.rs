//! Telemetry frames over a lossy byte link.
//!
//! Frames are `sync | size | version | id | payload | crc16`. The demo writes
//! a few messages, damages the wire the way a noisy UART would and reads
//! everything back. Set `WIREKIT_LOG=debug` to watch the layers reject input.

use std::io::Cursor;

use wirekit::checksum::Crc;
use wirekit::field::{
    Bitfield, BitmaskValue, Bundle, EnumValue, FloatValue, IntValue, Optional, StringField,
    WireEnum,
};
use wirekit::frame::{FieldsMessage, FrameReader, FrameWriter, MsgRegistry, PayloadLayer};
use wirekit::{FrameError, Layer, LayerExt, Message, Protocol};

const SYNC: u16 = 0xA55A;
const PROTOCOL_VERSION: u64 = 2;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Health {
    Nominal,
    Degraded,
    Failed,
}

impl WireEnum for Health {
    type Repr = u8;

    fn to_repr(self) -> u8 {
        self as u8
    }

    fn from_repr(repr: u8) -> Option<Self> {
        match repr {
            0 => Some(Health::Nominal),
            1 => Some(Health::Degraded),
            2 => Some(Health::Failed),
            _ => None,
        }
    }
}

/// channel:4 | health:2 | alarms:2
type Status = Bitfield<(IntValue<u8>, EnumValue<Health>, BitmaskValue<u8>)>;

type Sample = FieldsMessage<Bundle<(IntValue<u32>, Status, FloatValue<f32>, Optional<StringField>)>>;

type Heartbeat = FieldsMessage<IntValue<u16>>;

fn sample_with(timestamp: u32, channel: u8, health: Health, reading: f32, note: &str) -> Sample {
    let status = Bitfield::new((
        IntValue::new(channel).fixed_bit_length(4),
        EnumValue::new(health).configure(|raw| raw.fixed_bit_length(2)),
        BitmaskValue::new(0).configure(|raw| raw.fixed_bit_length(2)),
    ));
    let note = StringField::new()
        .configure(|raw| raw.count_prefix(IntValue::new(0).fixed_length(1)))
        .with_value(note);
    FieldsMessage::new(
        0x10,
        "Sample",
        Bundle::new((
            IntValue::new(timestamp),
            status,
            FloatValue::new(reading),
            Optional::tentative(note),
        )),
    )
}

fn sample() -> Box<dyn Message> {
    Box::new(sample_with(0, 0, Health::Nominal, 0.0, ""))
}

fn heartbeat_with(uptime: u16) -> Heartbeat {
    FieldsMessage::new(0x01, "Heartbeat", IntValue::new(uptime))
}

fn heartbeat() -> Box<dyn Message> {
    Box::new(heartbeat_with(0))
}

fn protocol() -> Result<Protocol<impl Layer>, FrameError> {
    let mut registry = MsgRegistry::new();
    registry.register(sample)?;
    registry.register(heartbeat)?;

    Ok(Protocol::new(
        PayloadLayer::new()
            .with_id(IntValue::<u8>::new(0), registry)
            .with_transport_value("version", IntValue::<u8>::new(PROTOCOL_VERSION as u8))
            .with_size(IntValue::<u16>::new(0))
            .with_checksum(IntValue::<u16>::new(0), Crc::ccitt())
            .with_sync(IntValue::<u16>::new(SYNC)),
    ))
}

fn describe(msg: &dyn Message) {
    let version = msg.transport_value("version").unwrap_or_default();
    if let Some(sample) = msg.downcast_ref::<Sample>() {
        let (timestamp, status, reading, note) = sample.fields().members();
        let (channel, health, alarms) = status.members();
        println!(
            "v{version} sample t={} ch={} health={:?} alarms={:#04b} value={:.2} note={:?}",
            timestamp.get(),
            channel.get(),
            health.get(),
            alarms.bits(),
            reading.get(),
            note.get().map(|s| s.get()),
        );
    } else if let Some(beat) = msg.downcast_ref::<Heartbeat>() {
        println!("v{version} heartbeat uptime={}s", beat.fields().get());
    }
}

fn main() -> Result<(), FrameError> {
    wirekit::logging::init_from_env();

    let mut writer = FrameWriter::new(Vec::new(), protocol()?);
    writer.send(&heartbeat_with(30))?;
    let damaged_at = writer.get_ref().len();
    writer.send(&sample_with(1_000, 3, Health::Nominal, 21.5, "intake"))?;
    writer.send(&sample_with(1_010, 3, Health::Degraded, 78.25, ""))?;
    let mut tagged = sample_with(1_020, 7, Health::Failed, -4.0, "exhaust sensor");
    tagged.fields_mut().members_mut().1.members_mut().2.set_bits(0b10);
    writer.send(&tagged)?;
    writer.send(&heartbeat_with(31))?;

    let mut wire = vec![0x00, 0xA5, 0x13, 0x5A];
    wire.extend(writer.into_inner());
    // flip a payload bit in the first sample
    wire[4 + damaged_at + 8] ^= 0x04;
    println!("{} bytes on the wire", wire.len());

    let mut reader = FrameReader::new(Cursor::new(wire), protocol()?);
    loop {
        match reader.read_message() {
            Ok(msg) => describe(msg.as_ref()),
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
