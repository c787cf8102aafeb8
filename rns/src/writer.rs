/// Fixed-capacity output buffer sized by the transport limit. Writes past
/// the end are clipped but still advance the cursor, so the caller can
/// detect truncation after the fact and `bytes` returns the prefix that
/// fit. `set_position` exists for backpatching length fields.
pub struct Writer {
    buffer: Vec<u8>,
    cursor: usize,
}

impl Writer {
    pub fn new(capacity: usize) -> Writer {
        Writer {
            buffer: vec![0; capacity],
            cursor: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn set_position(&mut self, position: usize) {
        self.cursor = position;
    }

    pub fn write(&mut self, bytes: &[u8]) {
        let capacity = self.buffer.len();
        if self.cursor < capacity {
            let writable = bytes.len().min(capacity - self.cursor);
            self.buffer[self.cursor..self.cursor + writable].copy_from_slice(&bytes[..writable]);
        }
        self.cursor += bytes.len();
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write(&value.to_be_bytes());
    }

    pub fn truncated(&self) -> bool {
        self.cursor > self.buffer.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.cursor.min(self.buffer.len())]
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        let length = self.cursor.min(self.buffer.len());
        self.buffer.truncate(length);
        self.buffer
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_write_within_capacity() {
        let mut writer = Writer::new(4);
        writer.write_u16(0x0102);
        writer.write_u16(0x0304);
        assert!(!writer.truncated());
        assert_eq!(writer.into_bytes(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_write_past_capacity() {
        let mut writer = Writer::new(3);
        writer.write(&[1, 2]);
        writer.write(&[3, 4, 5]);
        assert!(writer.truncated());
        assert_eq!(writer.position(), 5);
        assert_eq!(writer.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_backpatch() {
        let mut writer = Writer::new(6);
        writer.write_u16(0);
        writer.write(&[7, 7, 7]);
        let end = writer.position();
        writer.set_position(0);
        writer.write_u16(3);
        writer.set_position(end);
        assert_eq!(writer.bytes(), &[0, 3, 7, 7, 7]);
    }
}
