use super::*;

crate::define_id! {
    pub struct TestId;
}

#[test]
fn short_truncates_to_n_chars() {
    let id = TestId::new("abcdefgh");
    assert_eq!(id.short(4), "abcd");
}

#[test]
fn short_is_noop_when_already_shorter() {
    let id = TestId::new("ab");
    assert_eq!(id.short(4), "ab");
}

#[test]
fn sequential_id_gen_increments() {
    let gen = SequentialIdGen::new("job");
    assert_eq!(gen.next(), "job-1");
    assert_eq!(gen.next(), "job-2");
}

#[test]
fn uuid_id_gen_produces_unique_ids() {
    let gen = UuidIdGen;
    assert_ne!(gen.next(), gen.next());
}
