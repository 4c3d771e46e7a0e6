use std::io::{Read, Write};

/// Every XDR item is padded to a multiple of this many bytes.
pub const ALIGNMENT: usize = 4;

fn padding_len(src_len: usize) -> usize {
    (ALIGNMENT - (src_len % ALIGNMENT)) % ALIGNMENT
}

pub fn read_padding(src_len: usize, src: &mut impl Read) -> std::io::Result<()> {
    let mut padding = [0_u8; ALIGNMENT];
    src.read_exact(&mut padding[..padding_len(src_len)])
}

pub fn write_padding(src_len: usize, dest: &mut impl Write) -> std::io::Result<()> {
    dest.write_all(&[0_u8; ALIGNMENT][..padding_len(src_len)])
}

pub fn invalid_data(m: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, m.to_owned())
}
