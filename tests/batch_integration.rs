//! End-to-end batch processing over mock collaborators with a real
//! (in-memory) ledger and a real training CSV.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use mailtriage::classifier::{CategoryClassifier, ScoreModel};
use mailtriage::config::{ClassifierConfig, SenderIdentity};
use mailtriage::error::{ClassifierError, GenerationError, MailboxError};
use mailtriage::ledger::{Ledger, LibSqlLedger};
use mailtriage::llm::TextGenerator;
use mailtriage::mailbox::Mailbox;
use mailtriage::pipeline::{BatchRunner, DecisionPipeline, Message, MessageRef, PipelineSettings};
use mailtriage::training::TrainingLog;

// ── Mock collaborators ──────────────────────────────────────────────

/// Urgent iff the text mentions an outage.
struct OutageScorer;

#[async_trait]
impl ScoreModel for OutageScorer {
    async fn score(&self, text: &str, _labels: &[&str]) -> Result<Vec<f32>, ClassifierError> {
        if text.contains("down") {
            Ok(vec![0.97, 0.03])
        } else {
            Ok(vec![0.05, 0.95])
        }
    }
}

struct FriendlyGenerator;

#[async_trait]
impl TextGenerator for FriendlyGenerator {
    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, GenerationError> {
        assert!(prompt.contains("professional assistant"));
        Ok("Thanks for flagging this — I'm looking into it now.".into())
    }

    async fn list_available_models(&self) -> Vec<String> {
        vec!["mock-model".into()]
    }
}

/// Two unread messages, re-listed on every call (clearing the unread
/// flag is not reflected back, mimicking a slow mailbox view).
struct StaticMailbox {
    drafts: Mutex<Vec<(String, String, String)>>,
    cleared: Mutex<Vec<String>>,
    draft_calls: AtomicUsize,
}

impl StaticMailbox {
    fn new() -> Self {
        Self {
            drafts: Mutex::new(Vec::new()),
            cleared: Mutex::new(Vec::new()),
            draft_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Mailbox for StaticMailbox {
    async fn list_unread(&self) -> Result<Vec<MessageRef>, MailboxError> {
        Ok(vec![
            MessageRef {
                id: "m-outage".into(),
                thread_id: "t-1".into(),
            },
            MessageRef {
                id: "m-news".into(),
                thread_id: "t-2".into(),
            },
        ])
    }

    async fn get(&self, id: &str) -> Result<Message, MailboxError> {
        match id {
            "m-outage" => Ok(Message {
                id: id.into(),
                thread_id: "t-1".into(),
                subject: "Server down".into(),
                body: "The API server is down and customers are blocked.".into(),
                sender: "ops@example.com".into(),
            }),
            "m-news" => Ok(Message {
                id: id.into(),
                thread_id: "t-2".into(),
                subject: "Weekly digest".into(),
                body: "Here is what happened this week.".into(),
                sender: "digest@example.com".into(),
            }),
            other => Err(MailboxError::Decode {
                id: other.into(),
                reason: "unknown id".into(),
            }),
        }
    }

    async fn create_draft(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, MailboxError> {
        self.draft_calls.fetch_add(1, Ordering::SeqCst);
        self.drafts
            .lock()
            .unwrap()
            .push((to.into(), subject.into(), body.into()));
        Ok("draft-1".into())
    }

    async fn clear_unread(&self, id: &str) -> Result<(), MailboxError> {
        self.cleared.lock().unwrap().push(id.into());
        Ok(())
    }
}

// ── Wiring ──────────────────────────────────────────────────────────

async fn build_runner(dir: &tempfile::TempDir) -> (BatchRunner, Arc<LibSqlLedger>) {
    let classifier = CategoryClassifier::with_model(
        ClassifierConfig {
            model: "test".into(),
            api_key: None,
            max_text_length: 512,
        },
        Arc::new(OutageScorer),
    );
    let ledger = Arc::new(LibSqlLedger::open_memory().await.unwrap());
    let training = TrainingLog::new(dir.path().join("training.csv"));

    let settings = PipelineSettings {
        identity: SenderIdentity {
            name: "Dana Reyes".into(),
            position: "CTO".into(),
            contact: "+1 555 0100".into(),
            company: "Initech".into(),
        },
        ..PipelineSettings::default()
    };

    let pipeline = DecisionPipeline::new(
        classifier,
        Arc::new(FriendlyGenerator),
        Arc::clone(&ledger) as Arc<dyn Ledger>,
        training,
        settings,
    );
    (BatchRunner::new(pipeline), ledger)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn one_batch_drafts_urgent_and_reads_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, ledger) = build_runner(&dir).await;
    let mailbox = StaticMailbox::new();

    let processed = runner.run_once(&mailbox).await;
    assert_eq!(processed, 2);

    let drafts = mailbox.drafts.lock().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].0, "ops@example.com");
    assert_eq!(drafts[0].1, "Re: Server down");
    assert!(drafts[0].2.contains("looking into it"));

    assert_eq!(*mailbox.cleared.lock().unwrap(), vec!["m-news"]);
    assert!(ledger.has_draft("m-outage").await.unwrap());
    assert!(!ledger.has_draft("m-news").await.unwrap());
}

#[tokio::test]
async fn second_batch_never_drafts_twice() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _ledger) = build_runner(&dir).await;
    let mailbox = StaticMailbox::new();

    runner.run_once(&mailbox).await;
    runner.run_once(&mailbox).await;

    // Still exactly one draft; the quiet message is re-cleared because
    // the mailbox keeps listing it as unread.
    assert_eq!(mailbox.draft_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mailbox.cleared.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn training_log_captures_every_classification() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _ledger) = build_runner(&dir).await;
    let mailbox = StaticMailbox::new();

    runner.run_once(&mailbox).await;

    let mut reader = csv::Reader::from_path(dir.path().join("training.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers, vec!["subject", "body", "category"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "Server down");
    assert_eq!(&rows[0][2], "urgent response");
    assert_eq!(&rows[1][0], "Weekly digest");
    assert_eq!(&rows[1][2], "not important");
}
