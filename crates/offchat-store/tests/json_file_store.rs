use chrono::{Duration, Utc};
use offchat_store::{ChatStore, JsonFileStore, StoreError};
use offchat_types::ChatRecord;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn open_store() -> (TempDir, JsonFileStore) {
    let temp = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp.path().join("data")).await.unwrap();
    (temp, store)
}

fn record(conv: &str, owner: &str, user: &str, minutes_ago: i64) -> ChatRecord {
    ChatRecord {
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        user_message: user.to_string(),
        assistant_response: format!("answer to {user}"),
        conversation_id: conv.to_string(),
        owner: owner.to_string(),
    }
}

#[tokio::test]
async fn test_register_then_login() {
    let (_temp, store) = open_store().await;

    store.register_user("alice", "abc123").await.unwrap();

    assert!(store.login_user("alice", "abc123").await.unwrap());
    assert!(!store.login_user("alice", "wrong1").await.unwrap());
    assert!(!store.login_user("bob", "abc123").await.unwrap());
}

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let (_temp, store) = open_store().await;
    store.register_user("alice", "abc123").await.unwrap();

    let err = store.register_user("alice", "other9").await.unwrap_err();
    assert!(matches!(err, StoreError::UserExists(name) if name == "alice"));
    assert!(store.login_user("alice", "abc123").await.unwrap());
}

#[tokio::test]
async fn test_password_is_not_stored_in_plaintext() {
    let (temp, store) = open_store().await;
    store.register_user("alice", "abc123").await.unwrap();

    let users = std::fs::read_to_string(temp.path().join("data/users.json")).unwrap();
    assert!(users.contains("alice"));
    assert!(!users.contains("abc123"));
}

#[tokio::test]
async fn test_accounts_survive_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let store = JsonFileStore::open(temp.path()).await.unwrap();
        store.register_user("alice", "abc123").await.unwrap();
        store.save_message(record("c1", "alice", "hello", 1)).await.unwrap();
    }

    let store = JsonFileStore::open(temp.path()).await.unwrap();
    assert!(store.login_user("alice", "abc123").await.unwrap());
    assert_eq!(store.messages("c1", "alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_conversation_list_is_scoped_and_sorted() {
    let (_temp, store) = open_store().await;
    store.save_message(record("older", "alice", "first question", 30)).await.unwrap();
    store.save_message(record("newer", "alice", "other topic", 10)).await.unwrap();
    store.save_message(record("older", "alice", "follow-up", 20)).await.unwrap();
    store.save_message(record("bobs", "bob", "not yours", 0)).await.unwrap();

    let list = store.conversation_list("alice").await.unwrap();

    let ids: Vec<&str> = list.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["newer", "older"]);
    assert_eq!(list[1].title, "first question");
    assert!(store.conversation_list("carol").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_messages_require_matching_owner() {
    let (_temp, store) = open_store().await;
    store.save_message(record("c1", "alice", "b", 1)).await.unwrap();
    store.save_message(record("c1", "alice", "a", 2)).await.unwrap();
    store.save_message(record("c1", "mallory", "injected", 0)).await.unwrap();

    let messages = store.messages("c1", "alice").await.unwrap();
    let texts: Vec<&str> = messages.iter().map(|m| m.user_message.as_str()).collect();
    assert_eq!(texts, vec!["a", "b"]);

    assert!(store.messages("c1", "bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_all_only_touches_owner() {
    let (_temp, store) = open_store().await;
    store.save_message(record("a1", "alice", "x", 2)).await.unwrap();
    store.save_message(record("a2", "alice", "y", 1)).await.unwrap();
    store.save_message(record("b1", "bob", "z", 0)).await.unwrap();

    store.delete_all_conversations("alice").await.unwrap();

    assert!(store.conversation_list("alice").await.unwrap().is_empty());
    assert_eq!(store.conversation_list("bob").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_all_on_empty_store() {
    let (_temp, store) = open_store().await;
    store.delete_all_conversations("alice").await.unwrap();
    assert!(store.conversation_list("alice").await.unwrap().is_empty());
}
