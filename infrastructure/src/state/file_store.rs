//! State directory adapter for the queue, council and session repositories

use super::io::{append_line, atomic_write, blocking, json_bytes, jsonl_line, read_json, remove_if_exists};
use async_trait::async_trait;
use autopilot_application::{
    ActiveTask, CouncilRepository, QueueRepository, SessionRepository, StoreError,
};
use autopilot_domain::{
    ConvergenceEntry, CouncilRound, CouncilState, DeadLetterEntry, SessionStatus, Task, TaskQueue,
};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Paths of every file kept under the state directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session(&self) -> PathBuf {
        self.root.join("session.json")
    }

    pub fn events(&self) -> PathBuf {
        self.root.join("events.jsonl")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn pause_file(&self) -> PathBuf {
        self.root.join("PAUSE")
    }

    pub fn stop_file(&self) -> PathBuf {
        self.root.join("STOP")
    }

    pub fn runner_pid(&self) -> PathBuf {
        self.root.join("runner.pid")
    }

    fn queue_dir(&self) -> PathBuf {
        self.root.join("queue")
    }

    pub fn pending(&self) -> PathBuf {
        self.queue_dir().join("pending.json")
    }

    pub fn tasks(&self) -> PathBuf {
        self.queue_dir().join("tasks.json")
    }

    pub fn current_task(&self) -> PathBuf {
        self.queue_dir().join("current-task.json")
    }

    pub fn dead_letter(&self) -> PathBuf {
        self.queue_dir().join("dead-letter.jsonl")
    }

    fn council_dir(&self) -> PathBuf {
        self.root.join("council")
    }

    pub fn council_state(&self) -> PathBuf {
        self.council_dir().join("state.json")
    }

    pub fn votes_dir(&self) -> PathBuf {
        self.council_dir().join("votes")
    }

    pub fn round(&self, round: u32) -> PathBuf {
        self.votes_dir().join(format!("round-{:04}.json", round))
    }

    pub fn convergence(&self) -> PathBuf {
        self.council_dir().join("convergence.log")
    }

    pub fn report(&self) -> PathBuf {
        self.council_dir().join("report.md")
    }
}

/// Run state persisted as JSON files under one directory.
///
/// Snapshots are replaced atomically; logs are append-only.
pub struct FileStateStore {
    layout: StateLayout,
}

impl FileStateStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: StateLayout::new(state_dir),
        }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Load a finalized council round, if it was written.
    pub fn load_round(&self, round: u32) -> Result<Option<CouncilRound>, StoreError> {
        read_json(&self.layout.round(round))
    }

    pub fn load_council_state(&self) -> Result<Option<CouncilState>, StoreError> {
        read_json(&self.layout.council_state())
    }

    pub fn load_queue(&self) -> Result<Option<TaskQueue>, StoreError> {
        read_json(&self.layout.tasks())
    }
}

impl FileStateStore {
    async fn write_snapshot(&self, path: PathBuf, data: Vec<u8>) -> Result<(), StoreError> {
        blocking(move || atomic_write(&path, &data)).await
    }

    async fn append_record(&self, path: PathBuf, line: Vec<u8>) -> Result<(), StoreError> {
        blocking(move || append_line(&path, &line)).await
    }
}

#[async_trait]
impl QueueRepository for FileStateStore {
    async fn save_queue(&self, queue: &TaskQueue) -> Result<(), StoreError> {
        let pending: Vec<&Task> = queue.queued();
        let pending = json_bytes(&pending)?;
        let tasks = json_bytes(queue)?;
        let (pending_path, tasks_path) = (self.layout.pending(), self.layout.tasks());
        blocking(move || {
            atomic_write(&pending_path, &pending)?;
            atomic_write(&tasks_path, &tasks)
        })
        .await
    }

    async fn save_active(&self, active: &[ActiveTask]) -> Result<(), StoreError> {
        self.write_snapshot(self.layout.current_task(), json_bytes(active)?)
            .await
    }

    async fn append_dead_letter(&self, entry: &DeadLetterEntry) -> Result<(), StoreError> {
        self.append_record(self.layout.dead_letter(), jsonl_line(entry)?)
            .await
    }

    async fn load_dead_letters(&self) -> Result<Vec<DeadLetterEntry>, StoreError> {
        let path = self.layout.dead_letter();
        blocking(move || read_dead_letters(&path)).await
    }
}

fn read_dead_letters(path: &Path) -> Result<Vec<DeadLetterEntry>, StoreError> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path.display(), e)),
    };

    let mut entries = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| StoreError::io(path.display(), e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(
                "Skipping corrupt dead-letter record at {}:{}: {}",
                path.display(),
                number + 1,
                e
            ),
        }
    }
    Ok(entries)
}

#[async_trait]
impl CouncilRepository for FileStateStore {
    async fn save_state(&self, state: &CouncilState) -> Result<(), StoreError> {
        self.write_snapshot(self.layout.council_state(), json_bytes(state)?)
            .await
    }

    async fn save_round(&self, round: &CouncilRound) -> Result<(), StoreError> {
        let path = self.layout.round(round.round());
        let data = json_bytes(round)?;
        blocking(move || {
            if path.exists() {
                warn!("Council round file {} already exists; replacing", path.display());
            }
            atomic_write(&path, &data)
        })
        .await
    }

    async fn append_convergence(&self, entry: &ConvergenceEntry) -> Result<(), StoreError> {
        self.append_record(self.layout.convergence(), jsonl_line(entry)?)
            .await
    }

    async fn write_report(&self, report: &str) -> Result<(), StoreError> {
        self.write_snapshot(self.layout.report(), report.as_bytes().to_vec())
            .await
    }
}

#[async_trait]
impl SessionRepository for FileStateStore {
    async fn save_status(&self, status: &SessionStatus) -> Result<(), StoreError> {
        self.write_snapshot(self.layout.session(), json_bytes(status)?)
            .await
    }

    async fn load_status(&self) -> Result<Option<SessionStatus>, StoreError> {
        let path = self.layout.session();
        blocking(move || read_json(&path)).await
    }

    async fn clear_run_state(&self) -> Result<(), StoreError> {
        let paths = [
            self.layout.pending(),
            self.layout.tasks(),
            self.layout.current_task(),
            self.layout.council_state(),
            self.layout.votes_dir(),
            self.layout.convergence(),
        ];
        blocking(move || paths.iter().try_for_each(|path| remove_if_exists(path))).await?;
        debug!("Cleared run state under {}", self.layout.root().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_application::ActiveTask;
    use autopilot_domain::{
        AgentId, CouncilRule, Provider, Session, SessionId, SessionState, TaskId, Vote,
    };
    use chrono::Utc;
    use std::time::Duration;

    fn store() -> (tempfile::TempDir, FileStateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join(".autopilot"));
        (dir, store)
    }

    fn queue() -> TaskQueue {
        let now = Utc::now();
        let mut queue = TaskQueue::new();
        queue.enqueue(Task::new("write docs").with_id("t1"), now).unwrap();
        queue
            .enqueue(Task::new("fix bug").with_id("t2").with_priority(5), now)
            .unwrap();
        queue.enqueue(Task::new("add tests").with_id("t3"), now).unwrap();
        queue
    }

    #[tokio::test]
    async fn test_save_queue_writes_pending_in_dispatch_order() {
        let (_dir, store) = store();
        let mut queue = queue();
        queue.pick(Utc::now(), Duration::from_secs(60)).unwrap();
        store.save_queue(&queue).await.unwrap();

        let pending: Vec<Task> = read_json(&store.layout().pending()).unwrap().unwrap();
        let ids: Vec<&str> = pending.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);

        let snapshot = store.load_queue().unwrap().unwrap();
        assert_eq!(snapshot, queue);
    }

    #[tokio::test]
    async fn test_save_active_replaces_records() {
        let (_dir, store) = store();
        let record = ActiveTask {
            task_id: TaskId::new("t1"),
            agent_id: AgentId::new("agent-1"),
            description: "write docs".into(),
            started_at: Utc::now(),
        };
        store.save_active(&[record.clone()]).await.unwrap();
        store.save_active(&[]).await.unwrap();

        let active: Vec<ActiveTask> = read_json(&store.layout().current_task()).unwrap().unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_dead_letters_append_and_skip_corrupt_lines() {
        let (_dir, store) = store();
        assert!(store.load_dead_letters().await.unwrap().is_empty());

        let session = SessionId::new("s1");
        let first = DeadLetterEntry::new(session.clone(), Task::new("a").with_id("t1"), Utc::now());
        let second = DeadLetterEntry::new(session, Task::new("b").with_id("t2"), Utc::now());
        store.append_dead_letter(&first).await.unwrap();

        let path = store.layout().dead_letter();
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{ truncated\n");
        std::fs::write(&path, content).unwrap();
        store.append_dead_letter(&second).await.unwrap();

        let entries = store.load_dead_letters().await.unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[tokio::test]
    async fn test_council_round_and_state_files() {
        let (_dir, store) = store();
        let votes = vec![
            Vote::complete("claude-1", "done"),
            Vote::complete("claude-2", "done"),
            Vote::continue_work("claude-3", "docs missing"),
        ];
        let round = CouncilRound::new(
            SessionId::new("s1"),
            7,
            35,
            votes,
            CouncilRule::TwoThirds,
            true,
            Utc::now(),
        );
        store.save_round(&round).await.unwrap();
        let mut state = CouncilState::default();
        state.record(&round);
        store.save_state(&state).await.unwrap();
        store.write_report("# Council report\n").await.unwrap();

        assert!(store.layout().round(7).ends_with("votes/round-0007.json"));
        assert_eq!(store.load_round(7).unwrap().unwrap(), round);
        assert_eq!(store.load_council_state().unwrap().unwrap().round, 7);
        assert_eq!(
            std::fs::read_to_string(store.layout().report()).unwrap(),
            "# Council report\n"
        );
    }

    #[tokio::test]
    async fn test_convergence_log_is_jsonl() {
        let (_dir, store) = store();
        for iteration in 1..=3 {
            let entry = ConvergenceEntry {
                iteration,
                hash: "abc".into(),
                recorded_at: Utc::now(),
            };
            store.append_convergence(&entry).await.unwrap();
        }
        let content = std::fs::read_to_string(store.layout().convergence()).unwrap();
        assert_eq!(content.lines().count(), 3);
        let last: ConvergenceEntry =
            serde_json::from_str(content.lines().last().unwrap()).unwrap();
        assert_eq!(last.iteration, 3);
    }

    #[tokio::test]
    async fn test_session_status_roundtrip_and_corruption() {
        let (_dir, store) = store();
        assert!(store.load_status().await.unwrap().is_none());

        let mut session = Session::new(SessionId::new("s1"), Utc::now());
        session.initialize(2, Utc::now()).unwrap();
        let status = SessionStatus::new(session, Provider::Codex);
        store.save_status(&status).await.unwrap();
        let loaded = store.load_status().await.unwrap().unwrap();
        assert_eq!(loaded.state(), SessionState::Initializing);
        assert_eq!(loaded, status);

        std::fs::write(store.layout().session(), "garbage").unwrap();
        assert!(matches!(
            store.load_status().await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_clear_run_state_keeps_logs() {
        let (_dir, store) = store();
        store.save_queue(&queue()).await.unwrap();
        store.save_active(&[]).await.unwrap();
        store.save_state(&CouncilState::default()).await.unwrap();
        let round = CouncilRound::new(
            SessionId::new("s1"),
            1,
            5,
            vec![Vote::continue_work("m", "no")],
            CouncilRule::TwoThirds,
            false,
            Utc::now(),
        );
        store.save_round(&round).await.unwrap();
        store.write_report("report").await.unwrap();
        let entry = DeadLetterEntry::new(SessionId::new("s1"), Task::new("a"), Utc::now());
        store.append_dead_letter(&entry).await.unwrap();

        store.clear_run_state().await.unwrap();
        // Clearing twice is fine
        store.clear_run_state().await.unwrap();

        let layout = store.layout();
        assert!(!layout.tasks().exists());
        assert!(!layout.pending().exists());
        assert!(!layout.council_state().exists());
        assert!(!layout.votes_dir().exists());
        assert!(layout.dead_letter().exists());
        assert!(layout.report().exists());
    }
}
