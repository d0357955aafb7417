//! Wire framing for RMCP, ASF and the two IPMI packet generations.

pub mod asf;
pub mod message;
pub mod rakp;
pub mod rmcp;
pub mod v1_5;
pub mod v2_0;

/// Two's-complement checksum: the byte that makes the covered region sum
/// to zero modulo 256.
pub fn checksum<I>(bytes: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    let sum = bytes.into_iter().fold(0u8, |acc, b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum)
}
