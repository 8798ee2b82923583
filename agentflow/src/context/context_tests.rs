//! Tests for the context module.

#[cfg(test)]
mod tests {
    use crate::context::{keys, Context, ContextDelta, RunIdentity, StageContext};
    use crate::events::{CollectingEventSink, NoOpEventSink};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_input_text_is_owned_by_input() {
        let ctx = Context::from_input_text("Paris is sunny today.");
        assert_eq!(ctx.get_str(keys::INPUT_TEXT), Some("Paris is sunny today."));
        assert_eq!(ctx.owner_of(keys::INPUT_TEXT), Some(keys::INPUT_OWNER));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_owner_may_overwrite_own_key() {
        let mut ctx = Context::new();
        ctx.write("search", keys::SEARCH_RESULT, json!("first")).unwrap();
        ctx.write("search", keys::SEARCH_RESULT, json!("second")).unwrap();

        assert_eq!(ctx.get(keys::SEARCH_RESULT), Some(&json!("second")));
    }

    #[test]
    fn test_foreign_write_is_rejected() {
        let mut ctx = Context::from_input_text("hello");
        let err = ctx.write("city", keys::INPUT_TEXT, json!("bye")).unwrap_err();

        assert_eq!(err.key, keys::INPUT_TEXT);
        assert_eq!(err.owner, keys::INPUT_OWNER);
        assert_eq!(err.writer, "city");
        assert_eq!(ctx.get_str(keys::INPUT_TEXT), Some("hello"));
    }

    #[test]
    fn test_merge_is_all_or_nothing() {
        let mut ctx = Context::from_input_text("hello");
        let delta = ContextDelta::new()
            .with(keys::CITY, json!("Paris"))
            .with(keys::INPUT_TEXT, json!("overwritten"));

        assert!(ctx.merge("city", delta).is_err());
        assert!(!ctx.contains_key(keys::CITY));
        assert_eq!(ctx.get_str(keys::INPUT_TEXT), Some("hello"));
    }

    #[test]
    fn test_merge_returns_sorted_written_keys() {
        let mut ctx = Context::new();
        let delta = ContextDelta::new()
            .with(keys::WEATHER, json!("Sunny"))
            .with(keys::CITY, json!("Paris"));

        let written = ctx.merge("lookup", delta).unwrap();
        assert_eq!(written, vec!["city".to_string(), "weather".to_string()]);
    }

    #[test]
    fn test_seed_after_stage_write_conflicts() {
        let mut ctx = Context::new();
        ctx.write("pdf", keys::PDF_PATH, json!("/tmp/a.pdf")).unwrap();
        assert!(ctx.seed(keys::PDF_PATH, json!("/tmp/b.pdf")).is_err());
    }

    #[test]
    fn test_changes_since() {
        let base = Context::from_input_text("hello");
        let mut working = base.clone();
        working.write("search", keys::SEARCH_RESULT, json!({"results": []})).unwrap();

        let delta = working.changes_since(&base);
        assert_eq!(delta.keys().collect::<Vec<_>>(), vec![keys::SEARCH_RESULT]);
    }

    #[test]
    fn test_json_is_sorted_and_fingerprint_stable() {
        let mut a = Context::from_input_text("x");
        a.write("w", keys::WEATHER, json!("Sunny")).unwrap();
        a.write("c", keys::CITY, json!("Paris")).unwrap();

        let mut b = Context::from_input_text("x");
        b.write("c", keys::CITY, json!("Paris")).unwrap();
        b.write("w", keys::WEATHER, json!("Sunny")).unwrap();

        assert_eq!(
            a.to_json().to_string(),
            r#"{"city":"Paris","input_text":"x","weather":"Sunny"}"#
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_context_serialization_keeps_owners() {
        let mut ctx = Context::from_input_text("x");
        ctx.write("c", keys::CITY, json!("Paris")).unwrap();

        let json = serde_json::to_string(&ctx).unwrap();
        let restored: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ctx);
        assert_eq!(restored.owner_of(keys::CITY), Some("c"));
    }

    #[test]
    fn test_stage_context_require_str() {
        let ctx = Context::from_input_text("hello");
        let run = RunIdentity::new();
        let sink = NoOpEventSink;
        let stage_ctx = StageContext::new(&ctx, "weather", &run, &sink);

        assert_eq!(stage_ctx.require_str(keys::INPUT_TEXT).unwrap(), "hello");
        let err = stage_ctx.require_str(keys::CITY).unwrap_err();
        assert!(err.to_string().contains("city"));
    }

    #[test]
    fn test_stage_context_child_path_and_iteration() {
        let ctx = Context::new();
        let working = Context::from_input_text("w");
        let run = RunIdentity::new();
        let sink = NoOpEventSink;
        let parent = StageContext::new(&ctx, "ResearchLoop", &run, &sink).with_iteration(2);

        let child = parent.child(&working, "SearchAgent");
        assert_eq!(child.stage_path(), "ResearchLoop/SearchAgent");
        assert_eq!(child.iteration(), Some(2));
        assert_eq!(child.get_str(keys::INPUT_TEXT), Some("w"));
    }

    #[test]
    fn test_stage_context_emit_enriches_payload() {
        let ctx = Context::new();
        let run = RunIdentity::new().with_session_id("s-1");
        let sink = CollectingEventSink::new();
        let stage_ctx = StageContext::new(&ctx, "city", &run, &sink);

        stage_ctx.emit("stage.custom", Some(json!({"k": 1})));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let payload = events[0].1.clone().unwrap();
        assert_eq!(payload["stage"], json!("city"));
        assert_eq!(payload["session_id"], json!("s-1"));
        assert_eq!(payload["k"], json!(1));
    }
}
