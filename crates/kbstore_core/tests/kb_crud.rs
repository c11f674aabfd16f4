use kbstore_core::{
    FsKnowledgeBaseRepository, KnowledgeBasePatch, KnowledgeBaseService, Prompts, Schema,
};
use std::thread::sleep;
use std::time::Duration;

fn setup() -> (tempfile::TempDir, KnowledgeBaseService<FsKnowledgeBaseRepository>) {
    let dir = tempfile::tempdir().unwrap();
    let service = KnowledgeBaseService::new(FsKnowledgeBaseRepository::new(dir.path()));
    (dir, service)
}

fn custom_schema() -> Schema {
    Schema {
        nodes: vec!["film".to_string(), "actor".to_string()],
        relations: vec!["acted_in".to_string()],
        attributes: vec!["year".to_string()],
    }
}

fn custom_prompts() -> Prompts {
    Prompts {
        construction: "Extract triples from {text}".to_string(),
        decomposition: "Split {question}".to_string(),
        retrieval: "Answer with {context}".to_string(),
    }
}

#[test]
fn create_with_defaults_and_get_roundtrip() {
    let (_dir, service) = setup();

    let created = service
        .create_knowledge_base("Movies", "imdb_sample", None, None)
        .unwrap();
    assert_eq!(created.id.len(), 8);
    assert_eq!(created.name.as_deref(), Some("Movies"));
    assert_eq!(created.dataset_name.as_deref(), Some("imdb_sample"));
    assert_eq!(created.schema, Schema::default());
    assert_eq!(&created.schema.nodes[..2], ["person", "location"]);
    assert_eq!(created.prompts, Prompts::default());
    assert!(created.created_at.is_some());
    assert_eq!(created.created_at, created.updated_at);

    let loaded = service.get_knowledge_base(&created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn create_with_custom_schema_and_prompts() {
    let (_dir, service) = setup();

    let created = service
        .create_knowledge_base(
            "Films",
            "tmdb",
            Some(custom_schema()),
            Some(custom_prompts()),
        )
        .unwrap();

    let loaded = service.get_knowledge_base(&created.id).unwrap().unwrap();
    assert_eq!(loaded.schema, custom_schema());
    assert_eq!(loaded.prompts, custom_prompts());
}

#[test]
fn get_unknown_id_returns_none() {
    let (_dir, service) = setup();
    assert!(service.get_knowledge_base("deadbeef").unwrap().is_none());
}

#[test]
fn update_name_only_keeps_other_fields() {
    let (_dir, service) = setup();
    let created = service
        .create_knowledge_base("Movies", "imdb_sample", Some(custom_schema()), None)
        .unwrap();

    sleep(Duration::from_millis(5));
    let updated = service
        .update_knowledge_base(&created.id, &KnowledgeBasePatch::rename("Films"))
        .unwrap()
        .unwrap();

    assert_eq!(updated.name.as_deref(), Some("Films"));
    assert_eq!(updated.dataset_name.as_deref(), Some("imdb_sample"));
    assert_eq!(updated.schema, custom_schema());
    assert_eq!(updated.prompts, Prompts::default());
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > updated.created_at);

    let loaded = service.get_knowledge_base(&created.id).unwrap().unwrap();
    assert_eq!(loaded, updated);
}

#[test]
fn update_replaces_schema_and_prompts_wholesale() {
    let (_dir, service) = setup();
    let created = service
        .create_knowledge_base("Movies", "imdb_sample", None, Some(custom_prompts()))
        .unwrap();

    let partial_prompts = Prompts {
        retrieval: "only retrieval".to_string(),
        ..Prompts::default()
    };
    let patch = KnowledgeBasePatch {
        dataset_name: Some("imdb_full".to_string()),
        schema: Some(custom_schema()),
        prompts: Some(partial_prompts.clone()),
        ..KnowledgeBasePatch::default()
    };
    let updated = service
        .update_knowledge_base(&created.id, &patch)
        .unwrap()
        .unwrap();

    assert_eq!(updated.name.as_deref(), Some("Movies"));
    assert_eq!(updated.dataset_name.as_deref(), Some("imdb_full"));
    assert_eq!(updated.schema, custom_schema());
    assert_eq!(updated.prompts, partial_prompts);
}

#[test]
fn repeated_updates_never_move_created_at() {
    let (_dir, service) = setup();
    let created = service
        .create_knowledge_base("Movies", "imdb_sample", None, None)
        .unwrap();

    let mut previous_updated_at = created.updated_at;
    for name in ["A", "B", "C"] {
        let updated = service
            .update_knowledge_base(&created.id, &KnowledgeBasePatch::rename(name))
            .unwrap()
            .unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.created_at <= updated.updated_at);
        assert!(updated.updated_at >= previous_updated_at);
        previous_updated_at = updated.updated_at;
    }
}

#[test]
fn update_unknown_id_returns_none() {
    let (dir, service) = setup();
    let result = service
        .update_knowledge_base("deadbeef", &KnowledgeBasePatch::rename("x"))
        .unwrap();
    assert!(result.is_none());
    assert!(!dir.path().join("deadbeef").exists());
}

#[test]
fn list_reflects_creates_updates_in_order() {
    let (_dir, service) = setup();
    let first = service
        .create_knowledge_base("Movies", "imdb", None, None)
        .unwrap();
    let second = service
        .create_knowledge_base("Books", "goodreads", None, None)
        .unwrap();
    service
        .update_knowledge_base(&second.id, &KnowledgeBasePatch::rename("Novels"))
        .unwrap();

    let listed = service.list_knowledge_bases().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[0].name, "Movies");
    assert_eq!(listed[1].id, second.id);
    assert_eq!(listed[1].name, "Novels");
    assert_eq!(listed[1].dataset_name, "goodreads");
}

#[test]
fn delete_removes_record_everywhere() {
    let (dir, service) = setup();
    let kept = service
        .create_knowledge_base("Movies", "imdb", None, None)
        .unwrap();
    let doomed = service
        .create_knowledge_base("Books", "goodreads", None, None)
        .unwrap();

    assert!(service.delete_knowledge_base(&doomed.id).unwrap());

    assert!(!dir.path().join(&doomed.id).exists());
    assert!(service.get_knowledge_base(&doomed.id).unwrap().is_none());
    assert!(service.schema_path_for(&doomed.id).is_none());
    let ids: Vec<_> = service
        .list_knowledge_bases()
        .unwrap()
        .into_iter()
        .map(|summary| summary.id)
        .collect();
    assert_eq!(ids, vec![kept.id]);

    assert!(!service.delete_knowledge_base(&doomed.id).unwrap());
}

#[test]
fn accessors_return_documents_of_existing_records() {
    let (dir, service) = setup();
    let created = service
        .create_knowledge_base("Movies", "imdb", Some(custom_schema()), Some(custom_prompts()))
        .unwrap();

    let path = service.schema_path_for(&created.id).unwrap();
    assert_eq!(path, dir.path().join(&created.id).join("schema.json"));
    assert_eq!(service.schema_for(&created.id).unwrap(), Some(custom_schema()));
    assert_eq!(service.prompts_for(&created.id).unwrap(), Some(custom_prompts()));
    assert_eq!(
        service.schema_document_for(&created.id).unwrap(),
        Some(serde_json::to_value(custom_schema()).unwrap())
    );

    assert!(service.schema_path_for("deadbeef").is_none());
    assert!(service.schema_document_for("deadbeef").unwrap().is_none());
    assert!(service.schema_for("deadbeef").unwrap().is_none());
    assert!(service.prompts_for("deadbeef").unwrap().is_none());
}

#[test]
fn persisted_files_use_documented_json_shape() {
    let (dir, service) = setup();
    let created = service
        .create_knowledge_base("Фильмы", "imdb", None, None)
        .unwrap();
    let kb_dir = dir.path().join(&created.id);

    let meta_text = std::fs::read_to_string(kb_dir.join("meta.json")).unwrap();
    assert!(meta_text.contains("\"name\": \"Фильмы\""));
    let meta: serde_json::Value = serde_json::from_str(&meta_text).unwrap();
    assert_eq!(meta["id"], created.id.as_str());
    assert!(meta["created_at"].as_str().unwrap().ends_with('Z'));

    let schema: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(kb_dir.join("schema.json")).unwrap())
            .unwrap();
    assert!(schema["Nodes"].is_array());
    assert!(schema["Relations"].is_array());
    assert!(schema["Attributes"].is_array());

    let prompts: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(kb_dir.join("prompts.json")).unwrap())
            .unwrap();
    assert_eq!(prompts["construction"], "");
    assert_eq!(prompts["decomposition"], "");
    assert_eq!(prompts["retrieval"], "");

    let index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("index.json")).unwrap())
            .unwrap();
    assert_eq!(index[0]["id"], created.id.as_str());
    assert_eq!(index[0]["dataset_name"], "imdb");
}
