//! End-to-end flows wiring the gate engine and anchor service to the
//! deterministic adapters.

use std::sync::Arc;

use serde_json::json;
use tradegate_adapters::{
    FailingLedgerClient, MockLedgerClient, ScriptedAnalyst, UnavailableAnalyst,
};
use tradegate_core::{
    AnchorService, AnchorStatus, AuditAction, AuditSink, ChainStatus, Deal, EngineError, GateEngine,
    GateEngineConfig, GateStatus, Incoterm, InMemorySubjectStore, Instrument, JurisdictionProfile,
    LedgerRegistry, MemoryAuditSink, ReferenceData, SanctionsTier, Severity, Subject, SubjectBody,
    CommodityProfile,
};

fn reference() -> ReferenceData {
    ReferenceData::new()
        .with_jurisdiction(
            JurisdictionProfile::new("KP", SanctionsTier::Critical)
                .with_required_documents(&["end-user certificate"]),
        )
        .with_jurisdiction(JurisdictionProfile::new("CH", SanctionsTier::Low))
        .with_jurisdiction(JurisdictionProfile::new("DE", SanctionsTier::Low))
        .with_commodity(CommodityProfile::new(
            "copper-cathode",
            "Copper cathode",
            "metals",
            "7403.11",
        ))
}

fn engine_with(
    audit: Arc<MemoryAuditSink>,
    analyst: Option<Arc<dyn tradegate_core::DocumentAnalyst>>,
) -> GateEngine {
    let store = Arc::new(InMemorySubjectStore::new());
    let mut engine = GateEngine::new(
        store,
        audit,
        Arc::new(reference()),
        GateEngineConfig::default(),
    );
    if let Some(analyst) = analyst {
        engine = engine.with_analyst(analyst);
    }
    engine
}

fn clean_deal(id: &str) -> Subject {
    Subject::new(SubjectBody::Deal(Deal {
        commodity_id: "copper-cathode".to_string(),
        quantity_mt: 500.0,
        value_minor: 800_000,
        currency: "USD".to_string(),
        origin_country: "CH".to_string(),
        destination_country: "DE".to_string(),
        incoterm: Incoterm::Fob,
    }))
    .with_id(id)
}

#[tokio::test]
async fn deal_screened_approved_and_anchored() {
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = engine_with(audit.clone(), None);

    engine.submit(clean_deal("deal-100")).await.unwrap();
    let report = engine.evaluate("deal-100").await.unwrap();
    assert_eq!(report.status, GateStatus::UnderReview);
    assert!(report.clear);

    engine
        .approve("deal-100", "ops-reviewer", "all documents on file")
        .await
        .unwrap();

    // Anchor the cleared deal's state on both networks.
    let mut registry = LedgerRegistry::new();
    registry.register(Arc::new(MockLedgerClient::new("northledger")));
    registry.register(Arc::new(MockLedgerClient::new("southledger")));
    let anchors = AnchorService::new(registry, audit.clone());

    let anchor = anchors
        .anchor(
            "deal",
            "deal-100",
            &json!({"deal_id": "deal-100", "status": "cleared"}),
            &["northledger".to_string(), "southledger".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(anchor.status, AnchorStatus::Submitted);

    let refreshed = anchors.refresh(&anchor.anchor_id).await.unwrap();
    assert_eq!(refreshed.status, AnchorStatus::Confirmed);

    // The trail tells the whole story, and the chain verifies.
    let trail = audit.trail("deal-100").await.unwrap();
    assert!(trail
        .iter()
        .any(|e| e.action == AuditAction::EvaluationRecorded));
    assert!(trail
        .iter()
        .any(|e| e.action == AuditAction::SubjectApproved));
    assert_eq!(
        trail
            .iter()
            .filter(|e| e.action == AuditAction::AnchorSubmitted)
            .count(),
        2
    );
    assert!(audit.verify());
}

#[tokio::test]
async fn mixed_chain_outcomes_stay_independent() {
    let audit = Arc::new(MemoryAuditSink::new());
    let mut registry = LedgerRegistry::new();
    registry.register(Arc::new(MockLedgerClient::new("northledger")));
    registry.register(Arc::new(FailingLedgerClient::new(
        "southledger",
        "consensus stall",
    )));
    let anchors = AnchorService::new(registry, audit);

    let anchor = anchors
        .anchor(
            "contract",
            "ctr-7",
            &json!({"rev": 3}),
            &["northledger".to_string(), "southledger".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(anchor.submissions["northledger"].status, ChainStatus::Submitted);
    assert_eq!(anchor.submissions["southledger"].status, ChainStatus::Failed);

    let refreshed = anchors.refresh(&anchor.anchor_id).await.unwrap();
    assert_eq!(
        refreshed.submissions["northledger"].status,
        ChainStatus::Confirmed
    );
    assert_eq!(
        refreshed.submissions["southledger"].status,
        ChainStatus::Failed
    );
    assert_eq!(refreshed.status, AnchorStatus::Submitted);
}

#[tokio::test]
async fn dry_run_anchor_stays_pending() {
    let audit = Arc::new(MemoryAuditSink::new());
    let mut registry = LedgerRegistry::new();
    registry.register(Arc::new(
        MockLedgerClient::new("northledger").without_credentials(),
    ));
    let anchors = AnchorService::new(registry, audit);

    let anchor = anchors
        .anchor(
            "proposal",
            "prop-9",
            &json!({"terms": "net-15"}),
            &["northledger".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(anchor.status, AnchorStatus::Pending);
}

#[tokio::test]
async fn instrument_with_scripted_analyst_gets_advisory_notes() {
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = engine_with(
        audit,
        Some(Arc::new(ScriptedAnalyst::single(
            "document names an intermediary bank not on the instrument",
        ))),
    );

    let subject = Subject::new(SubjectBody::Instrument(Instrument {
        instrument_type: "letter_of_credit".to_string(),
        amount_minor: Some(5_000_000),
        currency: Some("USD".to_string()),
        bic: Some("DEUTDEFF".to_string()),
        beneficiary: None,
        expiry_date: None,
        raw_text: Some("IRREVOCABLE DOCUMENTARY CREDIT ...".to_string()),
        expected: None,
    }))
    .with_id("lc-55");
    engine.submit(subject).await.unwrap();

    let report = engine.evaluate("lc-55").await.unwrap();
    assert_eq!(report.status, GateStatus::UnderReview);
    let note = report
        .findings
        .iter()
        .find(|f| f.flag.message.contains("intermediary bank"))
        .unwrap();
    assert_eq!(note.flag.severity, Severity::Medium);
    assert!(!note.flag.blocks_execution);
}

#[tokio::test]
async fn unavailable_analyst_never_blocks_verification() {
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = engine_with(audit, Some(Arc::new(UnavailableAnalyst)));

    let subject = Subject::new(SubjectBody::Instrument(Instrument {
        instrument_type: "bank_guarantee".to_string(),
        amount_minor: Some(2_500_000),
        currency: Some("EUR".to_string()),
        bic: Some("BNPAFRPP".to_string()),
        beneficiary: None,
        expiry_date: None,
        raw_text: Some("GUARANTEE TEXT ...".to_string()),
        expected: None,
    }))
    .with_id("bg-3");
    engine.submit(subject).await.unwrap();

    let report = engine.evaluate("bg-3").await.unwrap();
    assert_eq!(report.status, GateStatus::UnderReview);
    assert!(report
        .findings
        .iter()
        .any(|f| f.flag.message.contains("document analysis unavailable")));
}

#[tokio::test]
async fn racing_reviewers_one_wins_one_gets_precondition() {
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = Arc::new(engine_with(audit, None));

    engine.submit(clean_deal("deal-200")).await.unwrap();
    engine.evaluate("deal-200").await.unwrap();

    let first = engine.approve("deal-200", "reviewer-a", "ok").await;
    let second = engine
        .reject("deal-200", "reviewer-b", "changed my mind")
        .await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(EngineError::Precondition(_))));
}
