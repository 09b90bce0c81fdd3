//! Fixed-width binary record codec.

use std::cmp::Ordering;
use std::fmt;

/// Size of a single encoded record in bytes.
pub const RECORD_SIZE: usize = 8;
/// Size of the opaque payload prefix.
pub const PAYLOAD_SIZE: usize = 4;

/// A single 8-byte record: 4 bytes of opaque payload followed by a big-endian `f32` key.
///
/// Records are totally ordered by key using IEEE-754 `totalOrder`, so NaN keys are accepted
/// and sorted deterministically (negative NaNs first, positive NaNs last). Equal keys are
/// ordered by payload bytes, which makes sorted output a function of the input multiset only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Record {
    payload: [u8; PAYLOAD_SIZE],
    key: f32,
}

impl Record {
    pub fn new(payload: [u8; PAYLOAD_SIZE], key: f32) -> Self {
        Record { payload, key }
    }

    /// Creates a record whose payload is the big-endian encoding of `id`.
    pub fn with_id(id: i32, key: f32) -> Self {
        Record::new(id.to_be_bytes(), key)
    }

    /// Decodes a record from its on-disk representation.
    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Self {
        let [p0, p1, p2, p3, k0, k1, k2, k3] = *bytes;
        Record {
            payload: [p0, p1, p2, p3],
            key: f32::from_be_bytes([k0, k1, k2, k3]),
        }
    }

    /// Decodes a record from the first [`RECORD_SIZE`] bytes of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes` is shorter than [`RECORD_SIZE`].
    pub fn decode_slice(bytes: &[u8]) -> Self {
        let mut raw = [0u8; RECORD_SIZE];
        raw.copy_from_slice(&bytes[..RECORD_SIZE]);
        Record::decode(&raw)
    }

    /// Encodes the record into its on-disk representation.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut raw = [0u8; RECORD_SIZE];
        self.encode_into(&mut raw);
        raw
    }

    /// Encodes the record into the first [`RECORD_SIZE`] bytes of `out`.
    pub fn encode_into(&self, out: &mut [u8]) {
        out[..PAYLOAD_SIZE].copy_from_slice(&self.payload);
        out[PAYLOAD_SIZE..RECORD_SIZE].copy_from_slice(&self.key.to_be_bytes());
    }

    pub fn payload(&self) -> [u8; PAYLOAD_SIZE] {
        self.payload
    }

    /// Payload interpreted as a big-endian integer. Used for display only.
    pub fn id(&self) -> i32 {
        i32::from_be_bytes(self.payload)
    }

    pub fn key(&self) -> f32 {
        self.key
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.payload.cmp(&other.payload))
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Record {}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id(), self.key)
    }
}
