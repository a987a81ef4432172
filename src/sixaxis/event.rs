use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of one kernel input record on the wire: two 32-bit timeval fields,
/// a 16-bit class, a 16-bit code and a 32-bit value, little-endian.
pub const RECORD_SIZE: usize = 16;

/// Coarse category of a record, taken from the `class` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Heartbeat marker, shows up constantly and never carries a code or value.
    Sync,
    /// Button edge/level; value is 0 or 1.
    Digital,
    /// Analog axis sample; value is a signed magnitude.
    Stick,
    /// Analog duplicate of a digital button. Intentionally unhandled so the
    /// same physical press is not accounted twice.
    AnalogAlias,
    /// Anything the device emits that we have no table for.
    Unknown(u16),
}

impl From<u16> for EventClass {
    fn from(class: u16) -> Self {
        match class {
            0 => EventClass::Sync,
            1 => EventClass::Digital,
            3 => EventClass::Stick,
            4 => EventClass::AnalogAlias,
            other => EventClass::Unknown(other),
        }
    }
}

/// One raw input record as emitted by the kernel input subsystem.
///
/// The layout matches `struct input_event` with 32-bit time fields. The
/// decoder performs no semantic validation: any bit pattern in `class`,
/// `code` or `value` is a legal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEventRecord {
    pub seconds: i32,
    pub microseconds: i32,
    pub class: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEventRecord {
    /// Decodes one record from a full-size chunk. Infallible: the binary
    /// contract is purely positional.
    pub fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        Self {
            seconds: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            microseconds: i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            class: u16::from_le_bytes([buf[8], buf[9]]),
            code: u16::from_le_bytes([buf[10], buf[11]]),
            value: i32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        }
    }

    pub fn event_class(&self) -> EventClass {
        EventClass::from(self.class)
    }

    /// Kernel timestamp of the record as local wall-clock time, for logging.
    pub fn timestamp(&self) -> Option<DateTime<Local>> {
        Local
            .timestamp_opt(self.seconds as i64, (self.microseconds as u32).wrapping_mul(1000))
            .single()
    }
}

impl fmt::Display for RawEventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={:04}, code={:04}, value={:08}",
            self.class, self.code, self.value
        )
    }
}

/// Reads exactly one record from the stream.
///
/// A short read (stream closed mid-record) or a closed stream surfaces as an
/// `io::Error`; no partial record is ever produced.
pub async fn read_record<R>(reader: &mut R) -> io::Result<RawEventRecord>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; RECORD_SIZE];
    reader.read_exact(&mut buf).await?;
    Ok(RawEventRecord::from_bytes(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(seconds: i32, microseconds: i32, class: u16, code: u16, value: i32) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&seconds.to_le_bytes());
        buf[4..8].copy_from_slice(&microseconds.to_le_bytes());
        buf[8..10].copy_from_slice(&class.to_le_bytes());
        buf[10..12].copy_from_slice(&code.to_le_bytes());
        buf[12..16].copy_from_slice(&value.to_le_bytes());
        buf
    }

    #[test]
    fn decodes_little_endian_fields() {
        let buf = encode(1_700_000_000, 250_000, 1, 291, -100);
        let record = RawEventRecord::from_bytes(&buf);
        assert_eq!(record.seconds, 1_700_000_000);
        assert_eq!(record.microseconds, 250_000);
        assert_eq!(record.class, 1);
        assert_eq!(record.code, 291);
        assert_eq!(record.value, -100);
    }

    #[test]
    fn classifies_known_and_unknown_classes() {
        assert_eq!(EventClass::from(0), EventClass::Sync);
        assert_eq!(EventClass::from(1), EventClass::Digital);
        assert_eq!(EventClass::from(3), EventClass::Stick);
        assert_eq!(EventClass::from(4), EventClass::AnalogAlias);
        assert_eq!(EventClass::from(99), EventClass::Unknown(99));
    }

    #[tokio::test]
    async fn reads_consecutive_records_in_order() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&encode(1, 0, 1, 291, 1));
        bytes.extend_from_slice(&encode(2, 0, 3, 1, -100));
        bytes.extend_from_slice(&encode(3, 0, 0, 0, 0));

        let mut reader = std::io::Cursor::new(bytes);
        let first = read_record(&mut reader).await.unwrap();
        let second = read_record(&mut reader).await.unwrap();
        let third = read_record(&mut reader).await.unwrap();

        assert_eq!((first.class, first.code, first.value), (1, 291, 1));
        assert_eq!((second.class, second.code, second.value), (3, 1, -100));
        assert_eq!(third.event_class(), EventClass::Sync);
    }

    #[tokio::test]
    async fn truncated_chunk_fails_without_partial_record() {
        let bytes = vec![0u8; RECORD_SIZE - 6];
        let mut reader = std::io::Cursor::new(bytes);
        let err = read_record(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn closed_stream_fails() {
        let mut reader = std::io::Cursor::new(Vec::<u8>::new());
        assert!(read_record(&mut reader).await.is_err());
    }
}
