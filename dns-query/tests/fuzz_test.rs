//! Randomised decode tests: arbitrary and mutated input must never panic.

use dns_query::{build_query, DnsMessage, RecordType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn random_bytes_never_panic() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..5_000 {
        let len = rng.random_range(0..96);
        let data: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        let _ = DnsMessage::decode(&data);
    }
}

#[test]
fn single_byte_mutations_never_panic() {
    let mut rng = StdRng::seed_from_u64(42);
    let base = build_query("mail.example.org", RecordType::MX)
        .encode()
        .unwrap();
    for _ in 0..2_000 {
        let mut data = base.clone();
        let at = rng.random_range(0..data.len());
        data[at] = rng.random();
        if let Ok(msg) = DnsMessage::decode(&data) {
            // Whatever decodes must re-encode without error.
            let _ = msg.encode();
        }
    }
}

#[test]
fn random_names_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let labels: Vec<String> = (0..rng.random_range(1..5))
            .map(|_| {
                (0..rng.random_range(1..20))
                    .map(|_| rng.random_range(b'a'..=b'z') as char)
                    .collect()
            })
            .collect();
        let name = labels.join(".");
        let query = DnsMessage::new_query(rng.random(), &name, RecordType::A);
        let decoded = DnsMessage::decode(&query.encode().unwrap()).unwrap();
        assert_eq!(decoded.questions[0].name, format!("{name}."));
    }
}
