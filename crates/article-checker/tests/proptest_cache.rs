//! Property-based tests for cache keys, the tabular codec and scoring.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use article_checker::keys;
use article_checker::models::{ScoreTier, SentPaperRecord};
use article_checker::sources::match_keywords;
use article_checker::store::{index_records, tabular};

/// Generate sent records whose text fields exercise CSV quoting.
fn arb_sent_record() -> impl Strategy<Value = SentPaperRecord> {
    (
        "[A-Za-z0-9:./]{1,30}",                                    // paper_id
        proptest::option::of("10\\.[0-9]{4,5}/[A-Za-z0-9.]{1,12}"), // doi
        "[A-Za-z0-9 ,\"\n\r']{0,60}",                             // title
        "[A-Za-z :,\"]{0,20}",                                     // source
        0i64..4_000_000_000,                                       // seconds
        0u32..1_000_000,                                           // micros
        "[A-Za-z_+\\-,]{0,30}",                                    // citation label
    )
        .prop_map(|(paper_id, doi, title, source, secs, micros, citation_label)| SentPaperRecord {
            paper_id,
            doi,
            title,
            source_symbol: source.clone(),
            source,
            sent_at: at(secs, micros),
            citation_label,
        })
}

fn at(secs: i64, micros: u32) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, micros * 1_000).single().unwrap()
}

proptest! {
    /// Author keys ignore letter case and surrounding whitespace.
    #[test]
    fn author_key_normalizes_case_and_padding(
        name in "[A-Za-z][A-Za-z .'\\-]{0,30}",
        left in " {0,3}",
        right in "[ \t]{0,3}",
    ) {
        let padded = format!("{left}{}{right}", name.to_uppercase());
        prop_assert_eq!(keys::author_key(&padded), keys::author_key(&name));
    }

    /// Every key is 32 lowercase hex characters.
    #[test]
    fn keys_are_fixed_width_hex(text in ".*") {
        for key in [keys::paper_key(&text), keys::author_key(&text)] {
            prop_assert_eq!(key.len(), 32);
            prop_assert!(key.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }

    /// Encoding and decoding preserves every sent record, whatever its text.
    #[test]
    fn sent_records_survive_tabular_codec(records in proptest::collection::vec(arb_sent_record(), 0..8)) {
        let indexed = index_records(records);
        let decoded = tabular::decode_records::<SentPaperRecord>(&tabular::encode(&indexed)).unwrap();
        prop_assert_eq!(decoded, indexed);
    }

    /// A higher h-index never lands in a lower tier.
    #[test]
    fn tiers_are_monotonic(a in 0u32..500, b in 0u32..500) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(ScoreTier::from_h_index(low) <= ScoreTier::from_h_index(high));
    }

    /// An empty filter accepts any text without matches.
    #[test]
    fn empty_keyword_filter_accepts_everything(text in ".*") {
        prop_assert_eq!(match_keywords(&text, &[], &[]), Some(Vec::new()));
    }

    /// An exclude keyword present in the text always rejects.
    #[test]
    fn exclude_keyword_always_rejects(prefix in "[a-z ]{0,20}", keyword in "[a-z]{1,10}", suffix in "[a-z ]{0,20}") {
        let text = format!("{prefix}{}{suffix}", keyword.to_uppercase());
        prop_assert_eq!(match_keywords(&text, &[keyword.clone()], &[keyword]), None);
    }
}
