//! Partition routing for sent messages.
//!
//! Keyed messages use the murmur2 placement of the Kafka Java producer, so a
//! key sent from the viewer lands on the same partition as the application's.

const SEED: u32 = 0x9747_b28c;
const M: u32 = 0x5bd1_e995;
const R: u32 = 24;

/// 32-bit murmur2 as used by Kafka's default partitioner.
pub fn murmur2(data: &[u8]) -> i32 {
    let mut h = SEED ^ data.len() as u32;

    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();
    for chunk in chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h as i32
}

/// Partition index for a key among `num_partitions`.
pub fn partition_for_key(key: &[u8], num_partitions: usize) -> usize {
    let positive = (murmur2(key) & 0x7fff_ffff) as usize;
    positive % num_partitions.max(1)
}

/// Picks the partition for a message.
///
/// Keyed messages hash onto the partition list; keyless ones go to the first
/// partition so repeated sends land in one place.
pub fn choose_partition(key: Option<&str>, partitions: &[i32]) -> Option<i32> {
    let first = *partitions.first()?;
    match key.filter(|k| !k.is_empty()) {
        Some(key) => partitions
            .get(partition_for_key(key.as_bytes(), partitions.len()))
            .copied(),
        None => Some(first),
    }
}
