/// Decodes an ISO-8859-1 field. Latin-1 bytes map one to one onto the first
/// 256 Unicode code points.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
