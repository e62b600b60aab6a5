use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nearsight::format::{decode, IndexHeader, CHECKSUM_SIZE, MAGIC};

#[test]
fn malformed_bytes_do_not_panic_decode() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..2_000 {
        let len = rng.gen_range(0..4096usize);
        let mut data = vec![0u8; len];
        rng.fill(data.as_mut_slice());

        // Half the inputs get a valid magic so decoding reaches the size checks
        if len >= MAGIC.len() && rng.gen_bool(0.5) {
            data[..MAGIC.len()].copy_from_slice(&MAGIC);
        }
        let _ = decode(&data);
    }
}

#[test]
fn huge_declared_sizes_are_rejected_without_allocating() {
    for (dims, count) in [(u32::MAX, u64::MAX), (768, u64::MAX / 4), (1, u64::MAX)] {
        let mut bytes = IndexHeader::new(dims, count).to_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; CHECKSUM_SIZE]);
        assert!(decode(&bytes).is_err());
    }
}
