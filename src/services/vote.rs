use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    core::{enums::VoteState, error::AppError},
    entity::votes,
    stores::{with_deadline, StoreError, VoteStore},
    utils::ids::parse_id,
};

/// 一次切换之后的结果：新的状态 + 重新统计出的票数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub state: VoteState,
    pub votes: u64,
}

/// 投票切换：同一用户对同一议题“投 / 取消”交替进行。
///
/// 采用先查后写（check-then-act）+ 乐观插入：
/// 同一用户的两个并发请求可能都查到“未投票”并同时插入，
/// 第二次插入会撞上 (issue_id, user_id) 唯一索引，这里把冲突解释为“已投票”，
/// 两个请求都得到一致的 Voted 结果，而不是一个 500。
///
/// 票数每次都重新 COUNT，不维护冗余计数器。
#[derive(Clone)]
pub struct VoteToggle {
    store: Arc<dyn VoteStore>,
    deadline: Duration,
}

impl VoteToggle {
    pub fn new(store: Arc<dyn VoteStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// 切换 `user_id` 对 `issue_id` 的投票。
    ///
    /// # 错误
    /// - `BadRequest`：ID 格式不合法（不访问存储）。
    /// - `NotFound`：议题不存在。
    /// - `ServiceUnavailable`：存储不可达或超时，投票状态未改变，调用方可重试。核心自身不重试。
    ///
    /// 插入或删除成功之后不会再返回错误：重新统计失败时票数退回保底值（已投为 1，未投为 0）。
    pub async fn toggle(&self, issue_id: &str, user_id: &str) -> Result<ToggleOutcome, AppError> {
        let issue_id = parse_id(issue_id, "issue")?;
        let user_id = parse_id(user_id, "user")?;

        if !self.call(self.store.issue_exists(issue_id)).await? {
            return Err(AppError::NotFound("Issue not found".to_string()));
        }

        let state = match self.call(self.store.find_vote(issue_id, user_id)).await? {
            Some(_) => {
                let removed = self.call(self.store.delete_vote(issue_id, user_id)).await?;
                if removed == 0 {
                    // 并发的另一次取消已经删掉了，结果一样
                    tracing::debug!("Vote on {} by {} already removed", issue_id, user_id);
                }
                VoteState::Unvoted
            }
            None => {
                let vote = votes::Model {
                    id: Uuid::new_v4(),
                    issue_id,
                    user_id,
                    created_at: Utc::now().fixed_offset(),
                };
                match with_deadline(self.deadline, self.store.insert_vote(vote)).await {
                    Ok(()) => VoteState::Voted,
                    Err(StoreError::Conflict(detail)) => {
                        tracing::info!("🔁 Duplicate vote on {} by {} absorbed ({})", issue_id, user_id, detail);
                        VoteState::Voted
                    }
                    Err(e) => return Err(transient(e)),
                }
            }
        };

        // 写入已生效，之后不再返回错误：计数失败只记日志，票数取保底值
        let votes = match self.call(self.store.count_votes(issue_id)).await {
            Ok(votes) => votes,
            Err(e) => {
                tracing::warn!("⚠️ Vote count for {} unavailable after toggle: {}", issue_id, e);
                u64::from(state.is_voted())
            }
        };
        tracing::debug!("🗳️ {} -> {} on {} ({} votes)", user_id, state, issue_id, votes);

        Ok(ToggleOutcome { state, votes })
    }

    /// 议题当前的票数。
    pub async fn count(&self, issue_id: Uuid) -> Result<u64, AppError> {
        self.call(self.store.count_votes(issue_id)).await
    }

    pub async fn has_voted(&self, issue_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.call(self.store.find_vote(issue_id, user_id)).await?.is_some())
    }

    /// 议题删除后的级联清理，尽力而为：失败只记日志。
    /// 残留的孤儿投票对应的议题已不存在，不会再被任何查询统计到。
    pub async fn purge_issue(&self, issue_id: Uuid) {
        match with_deadline(self.deadline, self.store.delete_votes_for_issue(issue_id)).await {
            Ok(removed) => tracing::debug!("🗑️ Removed {} votes of deleted issue {}", removed, issue_id),
            Err(e) => tracing::warn!("⚠️ Failed to remove votes of deleted issue {}: {}", issue_id, e),
        }
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        with_deadline(self.deadline, fut).await.map_err(transient)
    }
}

fn transient(err: StoreError) -> AppError {
    AppError::ServiceUnavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryVoteStore;
    use std::sync::atomic::Ordering;

    fn toggle_for(store: &Arc<MemoryVoteStore>) -> VoteToggle {
        VoteToggle::new(store.clone(), Duration::from_millis(200))
    }

    fn seeded() -> (Arc<MemoryVoteStore>, Uuid) {
        let store = Arc::new(MemoryVoteStore::default());
        let issue = Uuid::new_v4();
        store.add_issue(issue);
        (store, issue)
    }

    #[tokio::test]
    async fn vote_then_unvote() {
        let (store, issue) = seeded();
        let toggle = toggle_for(&store);
        let user = Uuid::new_v4().to_string();

        let first = toggle.toggle(&issue.to_string(), &user).await.unwrap();
        assert_eq!(first, ToggleOutcome { state: VoteState::Voted, votes: 1 });

        let second = toggle.toggle(&issue.to_string(), &user).await.unwrap();
        assert_eq!(second, ToggleOutcome { state: VoteState::Unvoted, votes: 0 });
    }

    #[tokio::test]
    async fn parity_of_toggles_decides_the_state() {
        let (store, issue) = seeded();
        let toggle = toggle_for(&store);
        let user = Uuid::new_v4();

        for n in 1..=7 {
            let outcome = toggle.toggle(&issue.to_string(), &user.to_string()).await.unwrap();
            let expect_voted = n % 2 == 1;
            assert_eq!(outcome.state.is_voted(), expect_voted, "after {n} toggles");
            assert_eq!(outcome.votes, u64::from(expect_voted));
            assert_eq!(store.rows_for(issue, user), usize::from(expect_voted));
        }
    }

    #[tokio::test]
    async fn count_tracks_distinct_voters() {
        let (store, issue) = seeded();
        let toggle = toggle_for(&store);
        let users: Vec<String> = (0..3).map(|_| Uuid::new_v4().to_string()).collect();

        for user in &users {
            toggle.toggle(&issue.to_string(), user).await.unwrap();
        }
        assert_eq!(toggle.count(issue).await.unwrap(), 3);

        let outcome = toggle.toggle(&issue.to_string(), &users[1]).await.unwrap();
        assert_eq!(outcome.votes, 2);
        assert!(toggle.has_voted(issue, users[0].parse().unwrap()).await.unwrap());
        assert!(!toggle.has_voted(issue, users[1].parse().unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn missing_issue_is_not_found() {
        let store = Arc::new(MemoryVoteStore::default());
        let toggle = toggle_for(&store);

        let err = toggle
            .toggle(&Uuid::new_v4().to_string(), &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_ids_are_rejected_before_store_access() {
        let (store, issue) = seeded();
        store.down.store(true, Ordering::SeqCst);
        let toggle = toggle_for(&store);

        let err = toggle.toggle("not-a-uuid", &Uuid::new_v4().to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid issue ID"));

        let err = toggle.toggle(&issue.to_string(), "42").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Invalid user ID"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_duplicate_votes_store_a_single_row() {
        let store = Arc::new(MemoryVoteStore::with_find_barrier(2));
        let issue = Uuid::new_v4();
        store.add_issue(issue);
        let toggle = toggle_for(&store);
        let user = Uuid::new_v4();
        let (issue_str, user_str) = (issue.to_string(), user.to_string());

        // 两个请求都会在查询之后等待对方，因此都看到“未投票”并尝试插入
        let (a, b) = tokio::join!(
            toggle.toggle(&issue_str, &user_str),
            toggle.toggle(&issue_str, &user_str)
        );

        let expected = ToggleOutcome { state: VoteState::Voted, votes: 1 };
        assert_eq!(a.unwrap(), expected);
        assert_eq!(b.unwrap(), expected);
        assert_eq!(store.rows_for(issue, user), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_unvotes_are_idempotent() {
        let store = Arc::new(MemoryVoteStore::with_find_barrier(2));
        let issue = Uuid::new_v4();
        store.add_issue(issue);
        let user = Uuid::new_v4();
        store
            .insert_vote(votes::Model {
                id: Uuid::new_v4(),
                issue_id: issue,
                user_id: user,
                created_at: Utc::now().fixed_offset(),
            })
            .await
            .unwrap();
        let toggle = toggle_for(&store);
        let (issue_str, user_str) = (issue.to_string(), user.to_string());

        let (a, b) = tokio::join!(
            toggle.toggle(&issue_str, &user_str),
            toggle.toggle(&issue_str, &user_str)
        );

        let expected = ToggleOutcome { state: VoteState::Unvoted, votes: 0 };
        assert_eq!(a.unwrap(), expected);
        assert_eq!(b.unwrap(), expected);
    }

    #[tokio::test]
    async fn unreachable_store_is_transient() {
        let (store, issue) = seeded();
        let toggle = toggle_for(&store);
        let user = Uuid::new_v4();
        store.down.store(true, Ordering::SeqCst);

        let err = toggle.toggle(&issue.to_string(), &user.to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));

        store.down.store(false, Ordering::SeqCst);
        assert_eq!(store.rows_for(issue, user), 0);
    }

    #[tokio::test]
    async fn failed_recount_keeps_the_committed_vote() {
        let (store, issue) = seeded();
        let toggle = toggle_for(&store);
        let user = Uuid::new_v4();
        store.count_down.store(true, Ordering::SeqCst);

        let outcome = toggle.toggle(&issue.to_string(), &user.to_string()).await.unwrap();
        assert_eq!(outcome, ToggleOutcome { state: VoteState::Voted, votes: 1 });
        assert_eq!(store.rows_for(issue, user), 1);

        store.count_down.store(false, Ordering::SeqCst);
        assert_eq!(toggle.count(issue).await.unwrap(), 1);
        assert!(toggle.has_voted(issue, user).await.unwrap());
    }

    #[tokio::test]
    async fn failed_recount_after_unvote_reports_zero() {
        let (store, issue) = seeded();
        let toggle = toggle_for(&store);
        let user = Uuid::new_v4();
        toggle.toggle(&issue.to_string(), &user.to_string()).await.unwrap();
        store.count_down.store(true, Ordering::SeqCst);

        let outcome = toggle.toggle(&issue.to_string(), &user.to_string()).await.unwrap();
        assert_eq!(outcome, ToggleOutcome { state: VoteState::Unvoted, votes: 0 });
        assert_eq!(store.rows_for(issue, user), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out_as_transient() {
        let (store, issue) = seeded();
        store.stall.store(true, Ordering::SeqCst);
        let toggle = toggle_for(&store);

        let err = toggle
            .toggle(&issue.to_string(), &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn deleted_issue_leaves_no_countable_votes() {
        let (store, issue) = seeded();
        let toggle = toggle_for(&store);
        for _ in 0..3 {
            toggle.toggle(&issue.to_string(), &Uuid::new_v4().to_string()).await.unwrap();
        }

        store.remove_issue(issue);
        toggle.purge_issue(issue).await;

        assert_eq!(toggle.count(issue).await.unwrap(), 0);
        let err = toggle
            .toggle(&issue.to_string(), &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_cascade_is_not_fatal() {
        let (store, issue) = seeded();
        let toggle = toggle_for(&store);
        toggle.toggle(&issue.to_string(), &Uuid::new_v4().to_string()).await.unwrap();

        store.down.store(true, Ordering::SeqCst);
        toggle.purge_issue(issue).await;

        store.down.store(false, Ordering::SeqCst);
        assert_eq!(toggle.count(issue).await.unwrap(), 1);
    }
}
