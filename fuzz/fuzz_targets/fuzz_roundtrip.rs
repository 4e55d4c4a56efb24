#![no_main]

use std::io::Read;

use libfuzzer_sys::fuzz_target;

use enflate::{BlockWriter, MatchFinder};

fuzz_target!(|data: &[u8]| {
    // Encode arbitrary bytes through every entry point and require that an
    // independent decoder reproduces them exactly.
    let mut finder = MatchFinder::new();
    let mut writer = BlockWriter::new(Vec::new());
    let chunks: Vec<&[u8]> =
        if data.is_empty() { vec![&[]] } else { data.chunks(65535).collect() };

    for (i, &chunk) in chunks.iter().enumerate() {
        let eof = i + 1 == chunks.len();
        let mut tokens = Vec::new();
        finder.encode(&mut tokens, chunk);
        // Alternate between the entry points so all three are covered.
        match i % 3 {
            0 => writer.write_block(&tokens, eof, Some(chunk)).unwrap(),
            1 => writer.write_block_dynamic(&tokens, eof, Some(chunk)).unwrap(),
            _ => writer.write_block_huff(eof, chunk).unwrap(),
        }
    }
    writer.flush().unwrap();
    let encoded = writer.into_inner();

    let mut decoder = flate2::read::DeflateDecoder::new(encoded.as_slice());
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).expect("encoder produced an invalid stream");
    assert_eq!(decoded, data);
});
