/// CRC16/Modbus: reflected polynomial 0xA001, initial value 0xFFFF.
///
/// On the wire the result goes low byte first, i.e. `crc.to_le_bytes()`.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    let poly: u16 = 0xA001;

    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ poly;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// CRC bytes in wire order: `[crc_lo, crc_hi]`.
pub fn crc16_bytes(data: &[u8]) -> [u8; 2] {
    crc16_modbus(data).to_le_bytes()
}

/// Checks that the trailing two bytes of `frame` are the CRC of everything before them.
pub fn verify_crc(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let data_len = frame.len() - 2;
    let received = u16::from_le_bytes([frame[data_len], frame[data_len + 1]]);
    received == crc16_modbus(&frame[..data_len])
}
