use super::*;

#[test]
fn parses_fenced_json_block() {
    let text = "Here's the result:\n```json\n{\"total_failed\": 2, \"ok\": true}\n```\nthanks";
    let out = NodeOutput::parse_llm_response(text);
    match out {
        NodeOutput::Structured(map) => {
            assert_eq!(map.get("total_failed").and_then(|v| v.as_i64()), Some(2));
            assert_eq!(map.get("ok").and_then(|v| v.as_bool()), Some(true));
            assert!(map.contains_key("_raw"));
        }
        NodeOutput::Raw(_) => panic!("expected structured output"),
    }
}

#[test]
fn parses_key_value_pairs_when_no_json_fence() {
    let text = "summary: done\ncount: 3\n";
    let out = NodeOutput::parse_llm_response(text);
    match out {
        NodeOutput::Structured(map) => {
            assert_eq!(map.get("summary").and_then(|v| v.as_str()), Some("done"));
            assert_eq!(map.get("count").and_then(|v| v.as_i64()), Some(3));
        }
        NodeOutput::Raw(_) => panic!("expected structured output"),
    }
}

#[test]
fn falls_back_to_raw_for_prose() {
    let text = "Just some plain prose without structure.";
    let out = NodeOutput::parse_llm_response(text);
    assert!(matches!(out, NodeOutput::Raw(_)));
}

#[test]
fn hyphenated_keys_are_dual_indexed() {
    let mut map = serde_json::Map::new();
    map.insert(
        "rerun-tests".to_string(),
        serde_json::json!({"summary": {"total_failed": 2}}),
    );
    let out = NodeOutput::Structured(map);
    let ctx = out.eval_context_value();
    assert!(ctx.get("rerun-tests").is_some());
    assert!(ctx.get("rerun_tests").is_some());
    assert_eq!(
        ctx.pointer("/rerun_tests/summary/total_failed"),
        ctx.pointer("/rerun-tests/summary/total_failed")
    );
}
