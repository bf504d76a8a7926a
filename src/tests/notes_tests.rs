#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::{json, Map};

    use crate::config::Note;
    use crate::service::notes::active_notes_at;
    use crate::service::{ApiKeys, ExplorerSettings};
    use crate::tests::fixtures::{build_explorer, now, seeded_store, StubTransport};

    fn note(link: &str, active_till: Option<i64>) -> Note {
        Note {
            link: link.to_string(),
            active_till,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_expired_notes_are_skipped() {
        let notes = vec![
            note("https://a.example/x y", Some(2_000)),
            note("b", Some(1_000)),
            note("c", None),
        ];

        let active = active_notes_at(&notes, 1_000);
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].note.link, "https%3A%2F%2Fa.example%2Fx+y");
        assert_eq!(active[1].note.link, "c");
        assert!(active.iter().all(|n| n.has_next), "hasNext counts every configured note");
    }

    #[test]
    fn test_single_note_has_no_next() {
        let active = active_notes_at(&[note("only", None)], 0);
        assert_eq!(active.len(), 1);
        assert!(!active[0].has_next);

        let value = serde_json::to_value(&active[0]).unwrap();
        assert_eq!(value, json!({"link": "only", "hasNext": false}));
    }

    #[test]
    fn test_api_key_defaults() {
        let keys = ApiKeys::new(HashMap::from([
            ("full".to_string(), json!({"limit": 100, "nothing": null})),
            ("plain".to_string(), json!(true)),
        ]));

        assert!(keys.check("full"));
        assert!(keys.check("plain"));
        assert!(!keys.check("other"));

        assert_eq!(keys.defaults("full", None), Some(json!({"limit": 100, "nothing": null})));
        assert_eq!(keys.defaults("full", Some("limit")), Some(json!(100)));
        assert_eq!(keys.defaults("full", Some("nothing")), None);
        assert_eq!(keys.defaults("full", Some("missing")), None);
        assert_eq!(keys.defaults("plain", None), None, "Non-object defaults carry no options");
        assert_eq!(keys.defaults("other", None), None);
    }

    #[tokio::test]
    async fn test_explorer_serves_configured_notes_and_keys() {
        let settings = ExplorerSettings {
            notes: vec![note("live", None), note("gone", Some(now() - 60))],
            api_keys: HashMap::from([("freekey".to_string(), json!({"limit": 10}))]),
            ..ExplorerSettings::default()
        };
        let (explorer, _) = build_explorer(seeded_store().await, StubTransport::new(), None, settings).await;

        let notes = explorer.get_active_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note.link, "live");
        assert!(notes[0].has_next);

        assert!(explorer.check_api_key("freekey"));
        assert_eq!(explorer.get_api_key_defaults("freekey", Some("limit")), Some(json!(10)));
    }
}
