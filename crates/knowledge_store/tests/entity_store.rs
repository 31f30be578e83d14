use knowledge_store::{
    Entity, EntityStoreApi, Id, KnowledgeResult, KnowledgeStore, SaveReport, Value,
    VerticalPropertyDict,
};
use tempfile::{tempdir, tempdir_in};

async fn open_store(dir: &tempfile::TempDir) -> KnowledgeResult<KnowledgeStore> {
    KnowledgeStore::connect_sqlite(&dir.path().join("knowledge.sqlite")).await
}

#[tokio::test]
async fn save_and_load_roundtrip() -> KnowledgeResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_store(&dir).await?;

    let mut apple = Entity::new("apple");
    apple.set_item("foo", "bar")?;
    apple.set_item("weight", 150)?;
    apple.set_item("acidity", 3.5)?;
    apple.set_item("ripe", true)?;
    apple.set_item("origin", Value::Null)?;
    let report = store.save_entity(&apple).await?;
    assert_eq!(
        report,
        SaveReport {
            inserted: 5,
            updated: 0,
            deleted: 0
        }
    );

    let loaded = store.load_entity(apple.id).await?.expect("entity");
    assert_eq!(loaded.name, "apple");
    assert_eq!(loaded.get_item("foo")?, Value::from("bar"));
    assert_eq!(loaded.get_attr("foo")?, Value::from("bar"));
    assert_eq!(loaded.get_item("weight")?, Value::Int(150));
    assert_eq!(loaded.get_item("acidity")?, Value::Float(3.5));
    assert_eq!(loaded.get_item("ripe")?, Value::Bool(true));
    assert_eq!(loaded.get_item("origin")?, Value::Null);
    assert_eq!(loaded.get("baz"), None);
    assert_eq!(
        loaded.keys(),
        vec!["acidity", "foo", "origin", "ripe", "weight"]
    );
    for key in loaded.keys() {
        assert_eq!(
            loaded.facts.row(&key).map(|row| row.id()),
            apple.facts.row(&key).map(|row| row.id())
        );
    }
    Ok(())
}

#[tokio::test]
async fn missing_entity_loads_as_none() -> KnowledgeResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_store(&dir).await?;
    assert!(store.load_entity(Id::new()).await?.is_none());
    assert!(store.find_entity_by_name("pear").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn resave_updates_rows_in_place() -> KnowledgeResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_store(&dir).await?;

    let mut apple = Entity::new("apple");
    apple.set_item("weight", 150)?;
    apple.set_item("color", "red")?;
    store.save_entity(&apple).await?;
    let weight_id = apple.facts.row("weight").map(|row| row.id());

    let mut loaded = store.load_entity(apple.id).await?.expect("entity");
    loaded.set_item("weight", "heavy")?;
    loaded.name = "granny smith".to_string();
    let report = store.save_entity(&loaded).await?;
    assert_eq!(
        report,
        SaveReport {
            inserted: 0,
            updated: 2,
            deleted: 0
        }
    );

    let reloaded = store.load_entity(apple.id).await?.expect("entity");
    assert_eq!(reloaded.name, "granny smith");
    assert_eq!(reloaded.get_item("weight")?, Value::from("heavy"));
    let row = reloaded.facts.row("weight").expect("weight row");
    assert_eq!(Some(row.id()), weight_id);
    assert_eq!(row.discriminator(), Some("varchar"));
    assert_eq!(row.columns().int_value, None);
    assert_eq!(row.columns().char_value.as_deref(), Some("heavy"));
    Ok(())
}

#[tokio::test]
async fn deleted_facts_are_removed_and_keys_can_return() -> KnowledgeResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_store(&dir).await?;

    let mut apple = Entity::new("apple");
    apple.set_item("foo", "bar")?;
    apple.set_item("keep", 1)?;
    store.save_entity(&apple).await?;

    let removed = apple.delete_item("foo")?;
    assert_eq!(removed.value(), Value::from("bar"));
    apple.set_item("foo", 42)?;
    let report = store.save_entity(&apple).await?;
    assert_eq!(
        report,
        SaveReport {
            inserted: 1,
            updated: 1,
            deleted: 1
        }
    );

    apple.delete_attr("keep")?;
    let report = store.save_entity(&apple).await?;
    assert_eq!(report.deleted, 1);

    let loaded = store.load_entity(apple.id).await?.expect("entity");
    assert_eq!(loaded.keys(), vec!["foo"]);
    assert_eq!(loaded.get_item("foo")?, Value::Int(42));
    Ok(())
}

#[tokio::test]
async fn delete_entity_removes_facts() -> KnowledgeResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_store(&dir).await?;

    let mut apple = Entity::new("apple");
    apple.set_item("foo", "bar")?;
    store.save_entity(&apple).await?;

    assert!(store.delete_entity(apple.id).await?);
    assert!(store.load_entity(apple.id).await?.is_none());
    assert!(!store.delete_entity(apple.id).await?);
    assert!(store.list_entities().await?.is_empty());

    // Saving again recreates the entity and its facts.
    let report = store.save_entity(&apple).await?;
    assert_eq!(report.inserted, 1);
    Ok(())
}

#[tokio::test]
async fn list_and_find_by_name() -> KnowledgeResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_store(&dir).await?;

    let mut pear = Entity::new("pear");
    pear.set_item("color", "green")?;
    pear.set_item("weight", 180)?;
    let apple = Entity::new("apple");
    store.save_entity(&pear).await?;
    store.save_entity(&apple).await?;

    let summaries = store.list_entities().await?;
    assert_eq!(summaries, vec![apple.summary(), pear.summary()]);
    assert_eq!(summaries[1].fact_count, 2);
    assert_eq!(summaries[0].fact_count, 0);

    let found = store.find_entity_by_name("pear").await?.expect("pear");
    assert_eq!(found.id, pear.id);
    assert_eq!(found.get_item("color")?, Value::from("green"));
    Ok(())
}

#[tokio::test]
async fn relative_sqlite_path_opens_the_named_file() -> KnowledgeResult<()> {
    let dir = tempdir_in(".").expect("tempdir");
    let cwd = std::env::current_dir().expect("cwd");
    let relative = dir
        .path()
        .strip_prefix(&cwd)
        .unwrap_or(dir.path())
        .join("knowledge.sqlite");
    let store = KnowledgeStore::connect_sqlite(&relative).await?;
    let apple = Entity::new("apple");
    store.save_entity(&apple).await?;
    assert!(cwd.join(&relative).exists());
    Ok(())
}

#[tokio::test]
async fn duplicated_entity_saves_alongside_original() -> KnowledgeResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_store(&dir).await?;

    let mut apple = Entity::new("apple");
    apple.set_item("color", "red")?;
    store.save_entity(&apple).await?;

    let copy = apple.duplicate("apple 2")?;
    let report = store.save_entity(&copy).await?;
    assert_eq!(report.inserted, 1);

    let loaded = store.load_entity(apple.id).await?.expect("apple");
    let loaded_copy = store.load_entity(copy.id).await?.expect("copy");
    assert_eq!(loaded.get_item("color")?, Value::from("red"));
    assert_eq!(loaded_copy.get_item("color")?, Value::from("red"));
    assert_eq!(store.list_entities().await?.len(), 2);
    Ok(())
}
