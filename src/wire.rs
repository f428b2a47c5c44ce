//! RDP wire format: a fixed 1032-byte packet laid out as
//! `[seq: u32 BE][data: 1024 bytes][flag: u32 BE]`.

pub const DATA_LEN: usize = 1024;
pub const PACKET_LEN: usize = 4 + DATA_LEN + 4;

/// Protocol flag carried in every packet. `Start` is part of the wire format
/// but never produced by the state machines in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Start,
    Data,
    Ack,
    Error,
}

impl Flag {
    fn to_u32(self) -> u32 {
        match self {
            Flag::Start => 1,
            Flag::Data => 2,
            Flag::Ack => 3,
            Flag::Error => 4,
        }
    }

    fn from_u32(v: u32) -> Option<Flag> {
        match v {
            1 => Some(Flag::Start),
            2 => Some(Flag::Data),
            3 => Some(Flag::Ack),
            4 => Some(Flag::Error),
            _ => None,
        }
    }
}

/// A single RDP packet. `data` is always the full 1024-byte field; callers
/// that want a NUL-terminated interpretation use [`Packet::data_str_len`].
#[derive(Clone)]
pub struct Packet {
    pub seq: u32,
    pub data: [u8; DATA_LEN],
    pub flag: Flag,
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("seq", &self.seq)
            .field("flag", &self.flag)
            .field("data_len", &self.data_str_len())
            .finish()
    }
}

impl Packet {
    pub fn new(seq: u32, flag: Flag, payload: &[u8]) -> Packet {
        assert!(payload.len() <= DATA_LEN, "payload exceeds packet capacity");

        let mut data = [0u8; DATA_LEN];
        data[..payload.len()].copy_from_slice(payload);

        Packet { seq, data, flag }
    }

    pub fn ack(seq: u32) -> Packet {
        Packet::new(seq, Flag::Ack, b" ")
    }

    pub fn error(seq: u32) -> Packet {
        Packet::new(seq, Flag::Error, b" ")
    }

    pub fn data(seq: u32, payload: &[u8]) -> Packet {
        Packet::new(seq, Flag::Data, payload)
    }

    /// Length of the data field up to its first NUL byte, or the full field
    /// if none is present. Matches the source's `strlen(data)` convention.
    pub fn data_str_len(&self) -> usize {
        self.data
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(DATA_LEN)
    }

    pub fn data_str(&self) -> &[u8] {
        &self.data[..self.data_str_len()]
    }

    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut buf = [0u8; PACKET_LEN];
        buf[0..4].copy_from_slice(&self.seq.to_be_bytes());
        buf[4..4 + DATA_LEN].copy_from_slice(&self.data);
        buf[4 + DATA_LEN..].copy_from_slice(&self.flag.to_u32().to_be_bytes());
        buf
    }

    /// Infallible: any 1032-byte buffer decodes to a packet. An out-of-range
    /// flag value decodes to `Flag::Error` so that the surrounding state
    /// machine (the only sanity check this protocol performs) rejects it the
    /// same way it rejects a genuine peer-sent error.
    pub fn decode(buf: &[u8; PACKET_LEN]) -> Packet {
        let seq = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        let mut data = [0u8; DATA_LEN];
        data.copy_from_slice(&buf[4..4 + DATA_LEN]);
        let flag_raw = u32::from_be_bytes(buf[4 + DATA_LEN..].try_into().unwrap());
        let flag = Flag::from_u32(flag_raw).unwrap_or(Flag::Error);

        Packet { seq, data, flag }
    }
}
