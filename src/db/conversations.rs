use std::collections::HashSet;

use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::db::models::{Conversation, ConversationType, Member};
use crate::error::{is_foreign_key_violation, is_unique_violation, AppError};

/// Canonical key of an unordered participant pair.
///
/// The lexicographically smaller id comes first and is length-prefixed, so `(a, b)` and
/// `(b, a)` share a key while no two distinct pairs can. The self pair `(a, a)`
/// goes through the same formula and therefore never equals a two-party key.
pub fn p2p_key(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}{}", lo.len(), lo, hi)
}

pub struct ConversationRepository;

impl ConversationRepository {
    pub async fn get_by_id(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<Option<Conversation>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, type, created_by, created_at FROM conversations WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(conversation)
    }

    pub async fn list_members(
        pool: &Pool<Sqlite>,
        conversation_id: &str,
    ) -> Result<Vec<Member>, AppError> {
        let members = sqlx::query_as::<_, Member>(
            r#"
SELECT conversation_id, user_id, joined_at
FROM conversation_members
WHERE conversation_id = ?
ORDER BY joined_at ASC, user_id ASC
            "#
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Looks up the P2P conversation for the unordered pair `{a, b}`.
    /// `a == b` finds the self conversation.
    pub async fn find_p2p(
        pool: &Pool<Sqlite>,
        a: &str,
        b: &str,
    ) -> Result<Option<Conversation>, AppError> {
        Self::find_by_key(pool, &p2p_key(a, b)).await
    }

    async fn find_by_key(
        pool: &Pool<Sqlite>,
        key: &str,
    ) -> Result<Option<Conversation>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
SELECT id, type, created_by, created_at
FROM conversations
WHERE type = 'p2p' AND p2p_key = ?
            "#
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        Ok(conversation)
    }

    /// Returns the P2P conversation between `requester_id` and `target_id`,
    /// creating it if needed. The flag is `true` only when this call created it.
    pub async fn create_or_get_p2p(
        pool: &Pool<Sqlite>,
        requester_id: &str,
        target_id: &str,
    ) -> Result<(Conversation, bool), AppError> {
        if requester_id.is_empty() || target_id.is_empty() {
            return Err(AppError::Validation("user_id is required for p2p conversations".to_string()));
        }

        let key = p2p_key(requester_id, target_id);
        if let Some(existing) = Self::find_by_key(pool, &key).await? {
            return Ok((existing, false));
        }

        let members: Vec<&str> = if requester_id == target_id {
            vec![requester_id]
        } else {
            vec![requester_id, target_id]
        };

        match Self::insert(pool, ConversationType::P2p, requester_id, Some(key.as_str()), &members).await {
            Ok(conversation) => {
                tracing::info!(
                    conversation_id = %conversation.id,
                    members = members.len(),
                    "Created p2p conversation"
                );
                Ok((conversation, true))
            }
            Err(AppError::Conflict(_)) => {
                // Lost the race to a concurrent creator of the same pair.
                tracing::debug!(key = %key, "p2p insert conflicted, re-reading");
                Self::find_by_key(pool, &key)
                    .await?
                    .map(|existing| (existing, false))
                    .ok_or_else(|| {
                        AppError::Internal(format!("p2p conflict for {} but no row visible", key))
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// Creates a new group containing the requester and every non-empty id in
    /// `member_ids`, deduplicated. Identical member sets still get a new group.
    pub async fn create_group(
        pool: &Pool<Sqlite>,
        requester_id: &str,
        member_ids: &[String],
    ) -> Result<Conversation, AppError> {
        if requester_id.is_empty() {
            return Err(AppError::Validation("requester is required".to_string()));
        }

        let members = group_members(requester_id, member_ids);
        let conversation =
            Self::insert(pool, ConversationType::Group, requester_id, None, &members).await?;

        tracing::info!(
            conversation_id = %conversation.id,
            members = members.len(),
            "Created group conversation"
        );
        Ok(conversation)
    }

    /// Writes the conversation row and every membership row in one transaction.
    /// Any early return drops `tx`, which rolls the whole attempt back.
    async fn insert(
        pool: &Pool<Sqlite>,
        kind: ConversationType,
        created_by: &str,
        p2p_key: Option<&str>,
        members: &[&str],
    ) -> Result<Conversation, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        let mut tx = pool.begin().await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
INSERT INTO conversations (id, type, created_by, created_at, p2p_key)
VALUES (?, ?, ?, ?, ?)
RETURNING id, type, created_by, created_at
            "#,
        )
        .bind(&id)
        .bind(kind)
        .bind(created_by)
        .bind(now)
        .bind(p2p_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_error)?;

        for member in members {
            sqlx::query(
                r#"
INSERT INTO conversation_members (conversation_id, user_id, joined_at)
VALUES (?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(*member)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;
        }

        tx.commit().await?;

        Ok(conversation)
    }
}

/// Requester first, then the requested ids in order, skipping empties and repeats.
fn group_members<'a>(requester_id: &'a str, member_ids: &'a [String]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    std::iter::once(requester_id)
        .chain(member_ids.iter().map(String::as_str))
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(*id))
        .collect()
}

fn write_error(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict("Conversation already exists".to_string())
    } else if is_foreign_key_violation(&err) {
        AppError::Validation("unknown user".to_string())
    } else {
        AppError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_pool, test_user};

    async fn count(pool: &Pool<Sqlite>, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await.unwrap()
    }

    #[test]
    fn test_p2p_key_is_order_independent() {
        assert_eq!(p2p_key("a", "b"), p2p_key("b", "a"));
        assert_ne!(p2p_key("a", "a"), p2p_key("a", "b"));
        // naive concatenation would make these collide
        assert_ne!(p2p_key("ab", "c"), p2p_key("a", "bc"));
        assert_ne!(p2p_key("aa", "aa"), p2p_key("a", "aaa"));
    }

    #[test]
    fn test_group_members_dedup() {
        let ids = vec![
            "A".to_string(),
            "B".to_string(),
            "B".to_string(),
            String::new(),
            "C".to_string(),
        ];
        assert_eq!(group_members("A", &ids), vec!["A", "B", "C"]);
        assert_eq!(group_members("A", &[]), vec!["A"]);
    }

    #[tokio::test]
    async fn test_p2p_is_idempotent_in_both_directions() {
        let pool = test_pool().await;
        let alice = test_user(&pool, "alice").await;
        let bob = test_user(&pool, "bob").await;

        let (first, created) =
            ConversationRepository::create_or_get_p2p(&pool, &alice.id, &bob.id).await.unwrap();
        assert!(created);
        assert_eq!(first.kind, ConversationType::P2p);
        assert_eq!(first.created_by, alice.id);

        let (again, created) =
            ConversationRepository::create_or_get_p2p(&pool, &alice.id, &bob.id).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);

        let (reverse, created) =
            ConversationRepository::create_or_get_p2p(&pool, &bob.id, &alice.id).await.unwrap();
        assert!(!created);
        assert_eq!(reverse.id, first.id);

        assert_eq!(count(&pool, "SELECT COUNT(*) FROM conversations").await, 1);
        let members = ConversationRepository::list_members(&pool, &first.id).await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_p2p_from_opposite_directions() {
        let pool = test_pool().await;
        let alice = test_user(&pool, "alice").await;
        let bob = test_user(&pool, "bob").await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = pool.clone();
            let (from, to) = if i % 2 == 0 {
                (alice.id.clone(), bob.id.clone())
            } else {
                (bob.id.clone(), alice.id.clone())
            };
            handles.push(tokio::spawn(async move {
                ConversationRepository::create_or_get_p2p(&pool, &from, &to).await
            }));
        }

        let mut ids = HashSet::new();
        let mut created = 0;
        for handle in handles {
            let (conversation, was_created) = handle.await.unwrap().unwrap();
            ids.insert(conversation.id);
            if was_created {
                created += 1;
            }
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(created, 1);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM conversations").await, 1);
    }

    #[tokio::test]
    async fn test_conflicting_insert_falls_back_to_existing() {
        let pool = test_pool().await;
        let alice = test_user(&pool, "alice").await;
        let bob = test_user(&pool, "bob").await;

        let key = p2p_key(&alice.id, &bob.id);
        let members = [alice.id.as_str(), bob.id.as_str()];
        let existing = ConversationRepository::insert(
            &pool,
            ConversationType::P2p,
            &bob.id,
            Some(key.as_str()),
            &members,
        )
        .await
        .unwrap();

        let err = ConversationRepository::insert(
            &pool,
            ConversationType::P2p,
            &alice.id,
            Some(key.as_str()),
            &members,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM conversations").await, 1);

        let (found, created) =
            ConversationRepository::create_or_get_p2p(&pool, &alice.id, &bob.id).await.unwrap();
        assert!(!created);
        assert_eq!(found.id, existing.id);
    }

    #[tokio::test]
    async fn test_self_p2p_is_distinct() {
        let pool = test_pool().await;
        let alice = test_user(&pool, "alice").await;
        let bob = test_user(&pool, "bob").await;

        let (pair, _) =
            ConversationRepository::create_or_get_p2p(&pool, &alice.id, &bob.id).await.unwrap();
        let (own, created) =
            ConversationRepository::create_or_get_p2p(&pool, &alice.id, &alice.id).await.unwrap();
        assert!(created);
        assert_ne!(own.id, pair.id);

        let members = ConversationRepository::list_members(&pool, &own.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, alice.id);

        let (again, created) =
            ConversationRepository::create_or_get_p2p(&pool, &alice.id, &alice.id).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, own.id);

        let found = ConversationRepository::find_p2p(&pool, &alice.id, &alice.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, own.id);
    }

    #[tokio::test]
    async fn test_p2p_with_unknown_user_leaves_nothing() {
        let pool = test_pool().await;
        let alice = test_user(&pool, "alice").await;

        let err = ConversationRepository::create_or_get_p2p(&pool, &alice.id, "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM conversations").await, 0);
    }

    #[tokio::test]
    async fn test_group_dedups_members() {
        let pool = test_pool().await;
        let a = test_user(&pool, "a").await;
        let b = test_user(&pool, "b").await;
        let c = test_user(&pool, "c").await;

        let requested = vec![a.id.clone(), b.id.clone(), b.id.clone(), String::new(), c.id.clone()];
        let group = ConversationRepository::create_group(&pool, &a.id, &requested).await.unwrap();
        assert_eq!(group.kind, ConversationType::Group);

        let mut members: Vec<String> = ConversationRepository::list_members(&pool, &group.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        members.sort();
        let mut expected = vec![a.id, b.id, c.id];
        expected.sort();
        assert_eq!(members, expected);
    }

    #[tokio::test]
    async fn test_groups_are_never_deduplicated() {
        let pool = test_pool().await;
        let a = test_user(&pool, "a").await;
        let b = test_user(&pool, "b").await;

        let ids = vec![b.id.clone()];
        let first = ConversationRepository::create_group(&pool, &a.id, &ids).await.unwrap();
        let second = ConversationRepository::create_group(&pool, &a.id, &ids).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM conversations").await, 2);
    }

    #[tokio::test]
    async fn test_failed_group_insert_rolls_back() {
        let pool = test_pool().await;
        let a = test_user(&pool, "a").await;
        let b = test_user(&pool, "b").await;

        // the third membership insert violates the users foreign key
        let ids = vec![b.id.clone(), "ghost".to_string()];
        let err = ConversationRepository::create_group(&pool, &a.id, &ids).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(count(&pool, "SELECT COUNT(*) FROM conversations").await, 0);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM conversation_members").await, 0);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let pool = test_pool().await;
        let a = test_user(&pool, "a").await;

        let group = ConversationRepository::create_group(&pool, &a.id, &[]).await.unwrap();
        let found = ConversationRepository::get_by_id(&pool, &group.id).await.unwrap().unwrap();
        assert_eq!(found.created_by, a.id);
        assert!(ConversationRepository::get_by_id(&pool, "missing").await.unwrap().is_none());
    }
}
