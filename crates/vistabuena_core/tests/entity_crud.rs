use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use vistabuena_core::{
    Entity, EntityId, InventoryPatch, InventoryRepository, KvStore, NewInventoryItem, NewResource,
    NewUser, RepoError, Resource, ResourcePatch, ResourceRepository, ResourceType, SqliteStore,
    User, UserPatch, UserRepository, UserRole, ValidationError,
};

fn memory_store() -> Arc<dyn KvStore> {
    Arc::new(SqliteStore::open_in_memory().unwrap())
}

fn pool() -> NewResource {
    NewResource {
        name: "Pool".to_string(),
        kind: ResourceType::Pool,
        capacity: 20,
        description: "Rooftop pool".to_string(),
        available: true,
        image: "https://example.com/pool.jpg".to_string(),
    }
}

fn resident(name: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: format!("{}@vistabuena.test", name.to_lowercase()),
        role: UserRole::Resident,
        apartment: "4B".to_string(),
    }
}

#[tokio::test]
async fn create_then_get_all_contains_record_once() {
    let repo = ResourceRepository::new(memory_store());

    let created = repo.create(pool()).await.unwrap();
    assert!(!created.id.is_nil());

    let all = repo.get_all().await.unwrap();
    assert_eq!(all, vec![created.clone()]);
    assert_eq!(created.name, "Pool");
    assert_eq!(created.kind, ResourceType::Pool);
    assert_eq!(created.capacity, 20);
}

#[tokio::test]
async fn get_all_on_empty_namespace_is_empty() {
    let repo = UserRepository::new(memory_store());

    assert!(repo.get_all().await.unwrap().is_empty());
    assert_eq!(repo.version().await.unwrap(), 0);
}

#[tokio::test]
async fn generated_ids_are_pairwise_distinct() {
    let repo = UserRepository::new(memory_store());

    let mut ids = HashSet::new();
    for index in 0..25 {
        let user = repo.create(resident(&format!("Resident{index}"))).await.unwrap();
        ids.insert(user.id);
    }

    assert_eq!(ids.len(), 25);
    assert_eq!(repo.get_all().await.unwrap().len(), 25);
}

#[tokio::test]
async fn get_all_preserves_insertion_order() {
    let repo = UserRepository::new(memory_store());

    let first = repo.create(resident("Ana")).await.unwrap();
    let second = repo.create(resident("Bruno")).await.unwrap();
    let third = repo.create(resident("Carla")).await.unwrap();

    let ids: Vec<EntityId> = repo
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|user| user.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);
}

#[tokio::test]
async fn partial_update_changes_only_patched_field() {
    let repo = ResourceRepository::new(memory_store());
    let created = repo.create(pool()).await.unwrap();

    repo.update(
        created.id,
        ResourcePatch {
            available: Some(false),
            ..ResourcePatch::default()
        },
    )
    .await
    .unwrap();

    let loaded = repo.find(created.id).await.unwrap().unwrap();
    assert_eq!(
        loaded,
        Resource {
            available: false,
            ..created
        }
    );
}

#[tokio::test]
async fn update_keeps_other_records_and_position() {
    let repo = UserRepository::new(memory_store());
    let ana = repo.create(resident("Ana")).await.unwrap();
    let bruno = repo.create(resident("Bruno")).await.unwrap();

    repo.update(
        ana.id,
        UserPatch {
            role: Some(UserRole::Admin),
            ..UserPatch::default()
        },
    )
    .await
    .unwrap();

    let all = repo.get_all().await.unwrap();
    assert_eq!(all[0], User { role: UserRole::Admin, ..ana });
    assert_eq!(all[1], bruno);
}

#[tokio::test]
async fn update_missing_id_returns_not_found() {
    let repo = UserRepository::new(memory_store());
    repo.create(resident("Ana")).await.unwrap();
    let before = repo.get_all().await.unwrap();

    let missing = EntityId::new_v4();
    let err = repo.update(missing, UserPatch::default()).await.unwrap_err();

    assert!(matches!(err, RepoError::NotFound { kind: "user", id } if id == missing));
    assert_eq!(repo.get_all().await.unwrap(), before);
}

#[tokio::test]
async fn delete_removes_only_target() {
    let repo = UserRepository::new(memory_store());
    let ana = repo.create(resident("Ana")).await.unwrap();
    let bruno = repo.create(resident("Bruno")).await.unwrap();

    repo.delete(ana.id).await.unwrap();

    assert_eq!(repo.get_all().await.unwrap(), vec![bruno]);
    assert_eq!(repo.find(ana.id).await.unwrap(), None);
}

#[tokio::test]
async fn delete_missing_id_returns_not_found_and_keeps_collection() {
    let repo = UserRepository::new(memory_store());
    repo.create(resident("Ana")).await.unwrap();
    let before = repo.get_all().await.unwrap();
    let version_before = repo.version().await.unwrap();

    let missing = EntityId::new_v4();
    let err = repo.delete(missing).await.unwrap_err();

    assert!(matches!(err, RepoError::NotFound { id, .. } if id == missing));
    assert_eq!(repo.get_all().await.unwrap(), before);
    assert_eq!(repo.version().await.unwrap(), version_before);
}

#[tokio::test]
async fn validation_failure_blocks_create_and_update() {
    let repo = UserRepository::new(memory_store());

    let mut invalid = resident("Ana");
    invalid.email = "not-an-email".to_string();
    let err = repo.create(invalid).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidEmail(_))
    ));
    assert!(repo.get_all().await.unwrap().is_empty());

    let ana = repo.create(resident("Ana")).await.unwrap();
    let err = repo
        .update(
            ana.id,
            UserPatch {
                name: Some("   ".to_string()),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::BlankField("name"))
    ));
    assert_eq!(repo.find(ana.id).await.unwrap(), Some(ana));
}

#[tokio::test]
async fn inventory_category_is_required() {
    let repo = InventoryRepository::new(memory_store());

    let err = repo
        .create(NewInventoryItem {
            name: "Chlorine".to_string(),
            category: "  ".to_string(),
            quantity: 12,
            unit: "kg".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::BlankField("category"))
    ));
    assert!(repo.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn resource_image_must_be_a_uri() {
    let repo = ResourceRepository::new(memory_store());

    let mut draft = pool();
    draft.image = "pool.jpg".to_string();
    let err = repo.create(draft).await.unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidImageUri(_))
    ));
}

#[tokio::test]
async fn inventory_last_updated_is_stamped_on_every_mutation() {
    let repo = InventoryRepository::new(memory_store());

    let before_create = Utc::now();
    let created = repo
        .create(NewInventoryItem {
            name: "Chlorine".to_string(),
            category: "Pool".to_string(),
            quantity: 12,
            unit: "kg".to_string(),
        })
        .await
        .unwrap();
    assert!(created.last_updated >= before_create);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    repo.update(
        created.id,
        InventoryPatch {
            quantity: Some(0),
            ..InventoryPatch::default()
        },
    )
    .await
    .unwrap();

    let loaded = repo.find(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.quantity, 0);
    assert_eq!(loaded.name, "Chlorine");
    assert!(loaded.last_updated > created.last_updated);
}

#[tokio::test]
async fn undecodable_bytes_are_reported_as_corruption() {
    let store = memory_store();
    store
        .write(User::NAMESPACE, b"{not json".to_vec())
        .await
        .unwrap();
    let repo = UserRepository::new(Arc::clone(&store));

    let err = repo.get_all().await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::StorageCorruption { ref namespace, .. } if namespace == "vista_buena_users"
    ));

    let err = repo.create(resident("Ana")).await.unwrap_err();
    assert!(matches!(err, RepoError::StorageCorruption { .. }));
}

#[tokio::test]
async fn invalid_or_duplicated_records_are_reported_as_corruption() {
    let store = memory_store();
    let repo = ResourceRepository::new(Arc::clone(&store));
    let negative_capacity = serde_json::json!([{
        "id": "11111111-2222-4333-8444-555555555555",
        "name": "Gym",
        "type": "gym",
        "capacity": -1,
        "description": "",
        "available": true,
        "image": "https://example.com/gym.jpg"
    }]);
    store
        .write(Resource::NAMESPACE, serde_json::to_vec(&negative_capacity).unwrap())
        .await
        .unwrap();
    assert!(matches!(
        repo.get_all().await.unwrap_err(),
        RepoError::StorageCorruption { .. }
    ));

    let created = {
        repo.reset().await.unwrap();
        repo.create(pool()).await.unwrap()
    };
    let duplicated = serde_json::to_vec(&vec![created.clone(), created]).unwrap();
    store.write(Resource::NAMESPACE, duplicated).await.unwrap();

    let err = repo.get_all().await.unwrap_err();
    match err {
        RepoError::StorageCorruption { message, .. } => assert!(message.contains("duplicate")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn reset_recovers_a_corrupted_namespace() {
    let store = memory_store();
    store
        .write(User::NAMESPACE, b"garbage".to_vec())
        .await
        .unwrap();
    let repo = UserRepository::new(Arc::clone(&store));

    repo.reset().await.unwrap();

    assert!(repo.get_all().await.unwrap().is_empty());
    repo.create(resident("Ana")).await.unwrap();
    assert_eq!(repo.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn persisted_layout_is_a_camel_case_json_array() {
    let store = memory_store();
    let repo = InventoryRepository::new(Arc::clone(&store));
    let created = repo
        .create(NewInventoryItem {
            name: "Towels".to_string(),
            category: "Linen".to_string(),
            quantity: 40,
            unit: "pcs".to_string(),
        })
        .await
        .unwrap();

    let stored = store.read("vista_buena_inventory").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&stored.bytes).unwrap();

    let items = json.as_array().expect("collection is stored as an array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], created.id.to_string());
    assert_eq!(items[0]["quantity"], 40);
    assert!(items[0]["lastUpdated"].is_string());
}

#[tokio::test]
async fn repositories_on_custom_namespaces_are_isolated() {
    let store = memory_store();
    let tower_a = UserRepository::with_namespace(Arc::clone(&store), "tower_a_users");
    let tower_b = UserRepository::with_namespace(Arc::clone(&store), "tower_b_users");

    tower_a.create(resident("Ana")).await.unwrap();

    assert_eq!(tower_a.namespace(), "tower_a_users");
    assert_eq!(tower_a.get_all().await.unwrap().len(), 1);
    assert!(tower_b.get_all().await.unwrap().is_empty());
}
