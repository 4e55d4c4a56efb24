#![no_main]

use libfuzzer_sys::fuzz_target;

use enflate::huffman::HuffmanEncoder;

fuzz_target!(|data: &[u8]| {
    // Arbitrary frequency vectors must always yield a complete-or-empty,
    // length-limited, Kraft-satisfying code.
    if data.is_empty() || data.len() > 286 {
        return;
    }
    let freq: Vec<i32> = data.iter().map(|&b| i32::from(b)).collect();

    // A 7-bit limit is only feasible for small alphabets; the encoder uses
    // it for the 19-symbol codegen alphabet.
    let limits: &[i32] = if freq.len() <= 19 { &[7, 15] } else { &[15] };
    for &max_bits in limits {
        let mut enc = HuffmanEncoder::new(freq.len());
        enc.generate(&freq, max_bits);

        let mut kraft = 0u64;
        for (i, c) in enc.codes().iter().enumerate() {
            assert_eq!(freq[i] == 0, c.len == 0);
            assert!(i32::from(c.len) <= max_bits);
            if c.len > 0 {
                kraft += 1 << (16 - c.len);
            }
        }
        assert!(kraft <= 1 << 16);
    }
});
