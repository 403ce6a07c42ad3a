//! Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, LSB first).

/// Computes the CRC of `data`.
///
/// Running it over a buffer that ends with its own CRC byte yields 0.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for byte in data {
        let mut byte = *byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

/// Returns true if the last byte of `data` is the CRC of the bytes before it.
pub fn check_crc8(data: &[u8]) -> bool {
    !data.is_empty() && crc8(data) == 0
}
