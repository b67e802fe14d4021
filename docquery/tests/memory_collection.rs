use bson::{Bson, doc};
use serde::{Deserialize, Serialize};

use docquery::{memory::InMemoryStore, prelude::*};

async fn people() -> Collection<InMemoryStore> {
    let people = docquery::connect("crm.people", InMemoryStore::builder())
        .await
        .unwrap()
        .collection;

    people
        .insert(1, doc! { "name": "Alice", "age": 31, "tags": ["admin", "ops"], "address": { "city": "Paris" } })
        .await
        .unwrap();
    people
        .insert(2, doc! { "name": "Bob", "age": 25, "tags": ["ops"], "address": { "city": "Lyon" } })
        .await
        .unwrap();
    people
        .insert(3, doc! { "name": "Carol", "age": 42, "tags": [] })
        .await
        .unwrap();

    people
}

fn names(documents: &[bson::Document]) -> Vec<&str> {
    documents
        .iter()
        .map(|document| document.get_str("name").unwrap())
        .collect()
}

#[tokio::test]
async fn connect_creates_missing_collection() {
    let opened = docquery::connect("crm.people", InMemoryStore::builder()).await.unwrap();

    assert!(opened.created);
    assert_eq!(opened.collection.to_string(), "DB 'crm.people'");
    assert_eq!(opened.collection.count(()).await.unwrap(), 0);
}

#[tokio::test]
async fn connect_rejects_malformed_names() {
    for name in ["people", ".people", "crm.", ""] {
        let result = docquery::connect(name, InMemoryStore::builder()).await;
        assert!(matches!(result, Err(DocumentStoreError::Configuration(_))), "{name:?}");
    }
}

#[tokio::test]
async fn open_collection_reports_creation_once() {
    let store = DocumentStore::new(InMemoryStore::new());

    assert!(store.open_collection("crm.people").await.unwrap().created);
    assert!(!store.open_collection("crm.people").await.unwrap().created);
    assert_eq!(store.list_collections("crm").await.unwrap(), vec!["people".to_string()]);

    store.drop_collection("crm.people").await.unwrap();
    assert!(store.list_collections("crm").await.unwrap().is_empty());
}

#[tokio::test]
async fn collections_share_the_store_backend() {
    let store = DocumentStore::new(InMemoryStore::new());
    let writer = store.open_collection("crm.people").await.unwrap().collection;
    let reader = store.collection("crm.people").unwrap();

    writer.insert("ada", doc! { "name": "Ada" }).await.unwrap();

    assert!(reader.contains("ada").await.unwrap());
    assert!(store.collection("crm.other").unwrap().find(()).await.unwrap().is_empty());
}

#[tokio::test]
async fn insert_and_get() {
    let people = people().await;

    let alice = people.get(1).await.unwrap().unwrap();
    assert_eq!(alice.get("_id"), Some(&Bson::Int64(1)));
    assert_eq!(alice.get_str("name").unwrap(), "Alice");

    assert!(people.contains(2).await.unwrap());
    assert!(!people.contains(99).await.unwrap());
    assert!(people.get("1").await.unwrap().is_none());
}

#[tokio::test]
async fn insert_accepts_matching_identifier() {
    let people = people().await;

    people.insert(4, doc! { "_id": 4, "name": "Dan" }).await.unwrap();
    assert_eq!(people.get(4).await.unwrap().unwrap().get_str("name").unwrap(), "Dan");
}

#[tokio::test]
async fn insert_rejects_conflicting_identifier() {
    let people = people().await;

    let result = people.insert(4, doc! { "_id": 5, "name": "Dan" }).await;
    assert!(matches!(result, Err(DocumentStoreError::ImmutableIdentifier { .. })));
    assert!(!people.contains(4).await.unwrap());
    assert!(!people.contains(5).await.unwrap());
}

#[tokio::test]
async fn insert_rejects_duplicates() {
    let people = people().await;

    let result = people.insert(1, doc! { "name": "Again" }).await;
    assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(..))));
    assert_eq!(people.get(1).await.unwrap().unwrap().get_str("name").unwrap(), "Alice");
}

#[tokio::test]
async fn insert_document_generates_identifier() {
    let people = people().await;

    let id = people.insert_document(doc! { "name": "Eve" }).await.unwrap();
    assert!(matches!(id, DocumentId::ObjectId(_)));
    assert_eq!(people.get(id).await.unwrap().unwrap().get_str("name").unwrap(), "Eve");

    let id = people.insert_document(doc! { "_id": "frank", "name": "Frank" }).await.unwrap();
    assert_eq!(id, DocumentId::from("frank"));
}

#[tokio::test]
async fn update_merges_fields() {
    let people = people().await;

    assert_eq!(people.update(1, doc! { "age": 32, "address.zip": "75001" }).await.unwrap(), 1);

    let alice = people.get(1).await.unwrap().unwrap();
    assert_eq!(alice.get_str("name").unwrap(), "Alice");
    assert_eq!(alice.get_i32("age").unwrap(), 32);
    assert_eq!(
        alice.get_document("address").unwrap(),
        &doc! { "city": "Paris", "zip": "75001" }
    );

    assert_eq!(people.update(99, doc! { "age": 1 }).await.unwrap(), 0);
    assert!(!people.contains(99).await.unwrap());
}

#[tokio::test]
async fn update_rejects_identifier_change() {
    let people = people().await;

    let result = people.update(1, doc! { "_id": 2, "age": 1 }).await;
    assert!(matches!(result, Err(DocumentStoreError::ImmutableIdentifier { .. })));
    assert_eq!(people.get(1).await.unwrap().unwrap().get_i32("age").unwrap(), 31);
}

#[tokio::test]
async fn update_document_needs_identifier() {
    let people = people().await;

    assert_eq!(people.update_document(doc! { "_id": 2, "age": 26 }).await.unwrap(), 1);
    assert_eq!(people.get(2).await.unwrap().unwrap().get_i32("age").unwrap(), 26);

    let result = people.update_document(doc! { "age": 26 }).await;
    assert!(matches!(result, Err(DocumentStoreError::InvalidDocument(_))));
}

#[tokio::test]
async fn replace_drops_missing_fields() {
    let people = people().await;

    assert_eq!(people.replace(1, doc! { "name": "Alicia" }).await.unwrap(), 1);
    assert_eq!(
        people.get(1).await.unwrap().unwrap(),
        doc! { "_id": 1_i64, "name": "Alicia" }
    );

    assert_eq!(people.replace(99, doc! { "name": "Nobody" }).await.unwrap(), 0);

    let result = people.replace_document(doc! { "_id": 2, "name": "Robert" }).await;
    assert_eq!(result.unwrap(), 1);
}

#[tokio::test]
async fn delete_reports_count() {
    let people = people().await;

    assert_eq!(people.delete(2).await.unwrap(), 1);
    assert_eq!(people.delete(2).await.unwrap(), 0);
    assert_eq!(people.count(()).await.unwrap(), 2);
}

#[tokio::test]
async fn find_with_text_predicates() {
    let people = people().await;

    assert_eq!(names(&people.find("name == 'Alice'").await.unwrap()), ["Alice"]);
    assert_eq!(names(&people.find("name != 'Alice'").await.unwrap()), ["Bob", "Carol"]);
    assert_eq!(names(&people.find("age > 30").await.unwrap()), ["Alice", "Carol"]);
    assert_eq!(names(&people.find("age <= 31").await.unwrap()), ["Alice", "Bob"]);
    assert_eq!(names(&people.find("name in ['Bob', 'Zed']").await.unwrap()), ["Bob"]);
    assert_eq!(names(&people.find("name not in ['Bob']").await.unwrap()), ["Alice", "Carol"]);
    assert_eq!(names(&people.find("name re: ^[AC]").await.unwrap()), ["Alice", "Carol"]);
    assert_eq!(names(&people.find("tags contains 'ops'").await.unwrap()), ["Alice", "Bob"]);
    assert_eq!(names(&people.find("address.city == 'Lyon'").await.unwrap()), ["Bob"]);
    assert_eq!(names(&people.find("address.city == null").await.unwrap()), ["Carol"]);
}

#[tokio::test]
async fn find_with_structured_predicates() {
    let people = people().await;

    let found = people
        .find(Filter::gt("age", 20).and(Filter::eq("name", "Bob").not()))
        .await
        .unwrap();
    assert_eq!(names(&found), ["Alice", "Carol"]);

    let found = people
        .find(Filter::or([Filter::eq("name", "Bob"), Filter::contains("tags", "admin")]))
        .await
        .unwrap();
    assert_eq!(names(&found), ["Alice", "Bob"]);

    assert!(people.find(Expr::Or(vec![])).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_inputs_match_everything() {
    let people = people().await;

    assert_eq!(people.find(()).await.unwrap().len(), 3);
    assert_eq!(people.find("").await.unwrap().len(), 3);
    assert_eq!(people.find(None::<&str>).await.unwrap().len(), 3);
    assert_eq!(people.find(Filter::all()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn find_with_options() {
    let people = people().await;

    let found = people
        .find_with(
            (),
            FindOptions::new()
                .sort("age", SortDirection::Desc)
                .offset(1)
                .limit(1)
                .projection(["name"]),
        )
        .await
        .unwrap();

    assert_eq!(found, vec![doc! { "_id": 1_i64, "name": "Alice" }]);
}

#[tokio::test]
async fn sort_by_key() {
    let people = people().await;

    assert_eq!(names(&people.sort("age", false).await.unwrap()), ["Bob", "Alice", "Carol"]);
    assert_eq!(names(&people.sort("name", true).await.unwrap()), ["Carol", "Bob", "Alice"]);
}

#[tokio::test]
async fn count_matches() {
    let people = people().await;

    assert_eq!(people.count(()).await.unwrap(), 3);
    assert_eq!(people.count("age >= 31").await.unwrap(), 2);
    assert_eq!(people.count(Filter::eq("name", "Nobody")).await.unwrap(), 0);
}

#[tokio::test]
async fn malformed_text_is_rejected() {
    let people = people().await;

    assert!(matches!(
        people.find("age > ").await,
        Err(DocumentStoreError::MalformedQuery(_))
    ));
    assert!(matches!(
        people.find(" == 3").await,
        Err(DocumentStoreError::MalformedQuery(_))
    ));
    assert!(matches!(
        people.find("age == [1,").await,
        Err(DocumentStoreError::LiteralParse { .. })
    ));
    assert!(matches!(
        people.find("name == __import__('os')").await,
        Err(DocumentStoreError::LiteralParse { .. })
    ));
}

#[tokio::test]
async fn native_text_is_not_understood_in_memory() {
    let people = people().await;

    assert!(matches!(
        people.find("age=3").await,
        Err(DocumentStoreError::Backend(_))
    ));
}

#[tokio::test]
async fn entity_handles() {
    let people = people().await;
    let alice = people.entity(1);

    assert_eq!(alice.to_string(), "crm.people[1]");
    assert_eq!(alice.field("name").await.unwrap(), Some(Bson::String("Alice".into())));
    assert_eq!(alice.field("missing").await.unwrap(), None);

    assert_eq!(alice.update(doc! { "age": 40 }).await.unwrap(), 1);
    assert_eq!(alice.field("age").await.unwrap(), Some(Bson::Int32(40)));

    assert_eq!(alice.replace(doc! { "nickname": "Al" }).await.unwrap(), 1);
    assert_eq!(alice.field("name").await.unwrap(), None);

    assert_eq!(alice.delete().await.unwrap(), 1);
    assert!(alice.get().await.unwrap().is_none());

    let ghost = people.entity("ghost");
    assert_eq!(ghost.to_string(), "crm.people[ghost]");
    assert_eq!(ghost.update(doc! { "age": 1 }).await.unwrap(), 0);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    age: i32,
}

impl Document for Person {
    fn id(&self) -> DocumentId {
        DocumentId::from(self.id.as_str())
    }
}

#[tokio::test]
async fn typed_documents() {
    let people = docquery::connect("crm.people", InMemoryStore::builder())
        .await
        .unwrap()
        .collection;

    let ada = Person { id: "ada".into(), name: "Ada".into(), age: 36 };
    let alan = Person { id: "alan".into(), name: "Alan".into(), age: 41 };

    assert_eq!(people.insert_typed(&ada).await.unwrap(), DocumentId::from("ada"));
    people.insert_typed(&alan).await.unwrap();

    assert_eq!(people.get_typed::<Person>("ada").await.unwrap(), Some(ada.clone()));

    let older: Vec<Person> = people
        .find_typed("age > 40", FindOptions::new())
        .await
        .unwrap();
    assert_eq!(older, vec![alan]);

    people.close().await.unwrap();
}
