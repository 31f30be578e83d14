use std::path::Path;

use knowledge_store::{
    DatabaseConfig, Entity, EntityStoreApi, FactFilter, Id, KnowledgeConfig, KnowledgeResult,
    KnowledgeStore, Value, VerticalPropertyDict,
};
use tempfile::tempdir;

#[derive(Clone, Debug, PartialEq)]
struct ParitySnapshot {
    items: Vec<(String, Value)>,
    equal_hits: Vec<bool>,
    not_equal_hits: Vec<bool>,
}

fn remote_config(database: DatabaseConfig) -> KnowledgeConfig {
    KnowledgeConfig {
        database,
        pool: None,
    }
}

async fn run_parity_test(config: KnowledgeConfig, base: &Path) -> KnowledgeResult<ParitySnapshot> {
    let store = KnowledgeStore::connect(&config, base).await?;
    let mut apple = Entity::new("apple");
    apple.set_item("count", 1)?;
    apple.set_item("label", "1")?;
    apple.set_item("ripe", true)?;
    apple.set_item("origin", Value::Null)?;
    store.save_entity(&apple).await?;
    apple.set_item("count", 2)?;
    store.save_entity(&apple).await?;

    let loaded = store.load_entity(apple.id).await?.expect("entity");
    let probes = [
        FactFilter::equal("count", 2),
        FactFilter::equal("count", "2"),
        FactFilter::equal("label", 1),
        FactFilter::equal("origin", "x"),
    ];
    let mut equal_hits = Vec::new();
    let mut not_equal_hits = Vec::new();
    for probe in probes {
        let hits = store.find_entities_by_fact(probe.clone()).await?;
        equal_hits.push(contains(&hits, apple.id));
        let inverse = FactFilter::not_equal(probe.key, probe.value);
        let hits = store.find_entities_by_fact(inverse).await?;
        not_equal_hits.push(contains(&hits, apple.id));
    }
    store.delete_entity(apple.id).await?;
    Ok(ParitySnapshot {
        items: loaded.items(),
        equal_hits,
        not_equal_hits,
    })
}

fn contains(hits: &[Id], id: Id) -> bool {
    hits.contains(&id)
}

async fn baseline() -> KnowledgeResult<ParitySnapshot> {
    let dir = tempdir().expect("tempdir");
    let config = KnowledgeConfig::default_sqlite(
        dir.path().join("baseline.sqlite").to_string_lossy(),
    );
    run_parity_test(config, dir.path()).await
}

#[tokio::test]
async fn sqlite_baseline_matches_expectations() -> KnowledgeResult<()> {
    let snapshot = baseline().await?;
    assert_eq!(snapshot.equal_hits, vec![true, true, true, false]);
    assert_eq!(snapshot.not_equal_hits, vec![false, false, false, false]);
    assert_eq!(snapshot.items.len(), 4);
    Ok(())
}

#[tokio::test]
async fn cross_db_parity_postgres() -> KnowledgeResult<()> {
    let url = match std::env::var("KNOWLEDGE_PG_URL") {
        Ok(url) => url,
        Err(_) => return Ok(()),
    };
    let expected = baseline().await?;
    let dir = tempdir().expect("tempdir");
    let postgres = run_parity_test(
        remote_config(DatabaseConfig::Postgres { url }),
        dir.path(),
    )
    .await?;
    assert_eq!(expected, postgres);
    Ok(())
}

#[tokio::test]
async fn cross_db_parity_mysql() -> KnowledgeResult<()> {
    let url = match std::env::var("KNOWLEDGE_MYSQL_URL") {
        Ok(url) => url,
        Err(_) => return Ok(()),
    };
    let expected = baseline().await?;
    let dir = tempdir().expect("tempdir");
    let mysql = run_parity_test(remote_config(DatabaseConfig::Mysql { url }), dir.path()).await?;
    assert_eq!(expected, mysql);
    Ok(())
}
