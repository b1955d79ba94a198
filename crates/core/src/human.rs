use bytesize::ByteSize;

pub fn human_bytes(b: impl Into<u64>) -> String {
    ByteSize::b(b.into()).to_string_as(true)
}
