//! Commands carried as a tagged union.
//!
//! Each command starts with its own tag byte, so decoding simply tries the
//! alternatives in order. Frames are written twice, once into a fixed slice
//! and once through a forward-only sink that needs an update pass, to show
//! both produce the same bytes.

use wirekit::checksum::BasicSum;
use wirekit::field::{
    variant_alternatives, Bundle, CodecError, IntValue, StringField, Variant,
};
use wirekit::frame::{FieldsMessage, ForwardOnly, MsgRegistry, PayloadLayer, SliceWriter};
use wirekit::{FrameError, Layer, LayerExt, Message, Protocol, WriteStatus};

fn tag(value: u8) -> IntValue<u8> {
    IntValue::new(value)
        .valid_range(value..=value)
        .fail_on_invalid(CodecError::ProtocolError)
}

fn name() -> StringField {
    StringField::new().configure(|raw| raw.count_prefix(IntValue::new(0).fixed_length(1)))
}

variant_alternatives! {
    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Move(Bundle<(IntValue<u8>, IntValue<i16>, IntValue<i16>)>) =
            Bundle::new((tag(1), IntValue::new(0), IntValue::new(0))),
        Rename(Bundle<(IntValue<u8>, StringField)>) = Bundle::new((tag(2), name())),
        Halt(IntValue<u8>) = tag(3),
    }
}

type CommandMsg = FieldsMessage<Variant<Command>>;

fn command_with(cmd: Command) -> CommandMsg {
    FieldsMessage::new(0x40, "Command", Variant::with(cmd))
}

fn command() -> Box<dyn Message> {
    Box::new(FieldsMessage::new(0x40, "Command", Variant::<Command>::new()))
}

fn protocol() -> Result<Protocol<impl Layer>, FrameError> {
    let mut registry = MsgRegistry::new();
    registry.register(command)?;
    Ok(Protocol::new(
        PayloadLayer::new()
            .with_id(IntValue::<u8>::new(0), registry)
            .with_size(IntValue::<u16>::new(0).var_length(1, 2))
            .with_checksum_prefix(IntValue::<u8>::new(0), BasicSum::new(1))
            .with_sync(IntValue::<u8>::new(0x7E)),
    ))
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn move_by(dx: i16, dy: i16) -> Command {
    Command::Move(Bundle::new((tag(1), IntValue::new(dx), IntValue::new(dy))))
}

fn rename(to: &str) -> Command {
    let mut name = name();
    name.set(to);
    Command::Rename(Bundle::new((tag(2), name)))
}

fn describe(cmd: Option<&Command>) -> String {
    match cmd {
        Some(Command::Move(fields)) => {
            let (_, dx, dy) = fields.members();
            format!("move by ({}, {})", dx.get(), dy.get())
        }
        Some(Command::Rename(fields)) => format!("rename to {:?}", fields.members().1.get()),
        Some(Command::Halt(_)) => "halt".to_string(),
        None => "nothing".to_string(),
    }
}

fn main() -> Result<(), FrameError> {
    let protocol = protocol()?;
    let commands = [move_by(-120, 45), rename("rover-2"), Command::Halt(tag(3))];

    let mut stream = Vec::new();
    for cmd in commands {
        let msg = command_with(cmd);

        let mut storage = [0u8; 64];
        let mut slice = SliceWriter::new(&mut storage);
        let status = protocol.write(&msg, &mut slice)?;
        assert_eq!(status, WriteStatus::Complete);

        let mut sink = ForwardOnly::new(Vec::new());
        let status = protocol.write(&msg, &mut sink)?;
        let mut patched = sink.into_inner();
        if status == WriteStatus::UpdateRequired {
            protocol.update(&mut patched)?;
        }
        assert_eq!(slice.written(), patched.as_slice());

        println!("{:<24} {}", describe(msg.fields().current()), hex(&patched));
        stream.extend(patched);
    }

    let mut buf = &stream[..];
    while !buf.is_empty() {
        let msg = protocol.read(&mut buf)?;
        if let Some(cmd) = msg.downcast_ref::<CommandMsg>() {
            let alt = cmd.fields().current_index().unwrap_or_default();
            println!("decoded #{alt}: {}", describe(cmd.fields().current()));
        }
    }
    Ok(())
}
