//! Integration specifications for loan case intake and officer review.
//!
//! Scenarios drive the public HTTP router against a model trained on the bundled history.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use loan_risk::scoring::{
        EncodingStrictness, ModelRegistry, RiskEngine, TrainingParams, TrainingSet,
    };
    use loan_risk::workflows::loans::{
        loan_router, LoanApplication, LoanApplicationService, LoanId, LoanRepository,
        LoanStatus, RepositoryError,
    };

    const HISTORY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/loan_history.csv");

    #[derive(Default, Clone)]
    pub(super) struct MemoryRepository {
        records: Arc<Mutex<HashMap<LoanId, LoanApplication>>>,
    }

    impl LoanRepository for MemoryRepository {
        fn insert(&self, loan: LoanApplication) -> Result<LoanApplication, RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            if guard.contains_key(&loan.loan_id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(loan.loan_id.clone(), loan.clone());
            Ok(loan)
        }

        fn update_if(
            &self,
            expected: LoanStatus,
            loan: LoanApplication,
        ) -> Result<(), RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            match guard.get(&loan.loan_id) {
                None => Err(RepositoryError::NotFound),
                Some(stored) if stored.status != expected => {
                    Err(RepositoryError::StatusChanged {
                        current: stored.status,
                    })
                }
                Some(_) => {
                    guard.insert(loan.loan_id.clone(), loan);
                    Ok(())
                }
            }
        }

        fn fetch(&self, id: &LoanId) -> Result<Option<LoanApplication>, RepositoryError> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            Ok(guard.get(id).cloned())
        }

        fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            Ok(guard.values().cloned().collect())
        }

        fn pending(&self, _limit: usize) -> Result<Vec<LoanApplication>, RepositoryError> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            Ok(guard
                .values()
                .filter(|loan| loan.status == LoanStatus::Pending)
                .cloned()
                .collect())
        }
    }

    pub(super) fn router() -> axum::Router {
        let mut params = TrainingParams::default();
        params.boosting.n_estimators = 40;
        let history = TrainingSet::from_path(HISTORY).expect("bundled history loads");
        let registry = ModelRegistry::bootstrap(&history, &params).expect("bootstrap trains");
        let engine = Arc::new(RiskEngine::new(
            Arc::new(registry),
            EncodingStrictness::Strict,
        ));
        let service = LoanApplicationService::new(Arc::new(MemoryRepository::default()), engine);
        loan_router(Arc::new(service))
    }

    pub(super) async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

fn applicant(name: &str, credit_score: u32) -> Value {
    json!({
        "name": name,
        "age": 41,
        "income": 88000,
        "loanAmount": 12000,
        "creditScore": credit_score,
        "monthsEmployed": 130,
        "numCreditLines": 2,
        "interestRate": 7.25,
        "loanTerm": 36,
        "dtiRatio": 0.22,
        "education": "Bachelor",
        "employmentType": "Employed",
        "maritalStatus": "Married",
        "hasMortgage": "Yes",
        "hasDependents": "Yes",
        "loanPurpose": "HomeImprovement",
        "hasCoSigner": "No"
    })
}

fn send(method: &str, uri: &str, payload: Option<&Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match payload {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(payload).expect("serializes")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

#[tokio::test]
async fn officer_reviews_submitted_loans() {
    let router = router();

    let first = router
        .clone()
        .oneshot(send("POST", "/api/v1/loans", Some(&applicant("Ada", 760))))
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = read_json(first).await;
    assert_eq!(first["loanId"], json!("LOAN-000001"));
    assert_eq!(first["status"], json!("Pending"));
    assert_eq!(first["assessment"]["modelVersion"], json!(1));
    assert_eq!(first["assessment"]["recommendation"], json!("Approve"));

    let second = router
        .clone()
        .oneshot(send("POST", "/api/v1/loans", Some(&applicant("Grace", 640))))
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::CREATED);

    let pending = router
        .clone()
        .oneshot(send("GET", "/api/v1/loans/pending", None))
        .await
        .expect("route executes");
    let pending = read_json(pending).await;
    let ids: Vec<&str> = pending
        .as_array()
        .expect("array payload")
        .iter()
        .filter_map(|row| row["loanId"].as_str())
        .collect();
    assert_eq!(ids, vec!["LOAN-000002", "LOAN-000001"]);

    let approved = router
        .clone()
        .oneshot(send(
            "PUT",
            "/api/v1/loans/LOAN-000001/status",
            Some(&json!({ "status": "Approved" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(approved.status(), StatusCode::OK);

    let pending = router
        .clone()
        .oneshot(send("GET", "/api/v1/loans/pending", None))
        .await
        .expect("route executes");
    assert_eq!(
        read_json(pending).await.as_array().map(Vec::len),
        Some(1)
    );

    let fetched = router
        .oneshot(send("GET", "/api/v1/loans/LOAN-000001", None))
        .await
        .expect("route executes");
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = read_json(fetched).await;
    assert_eq!(fetched["status"], json!("Approved"));
    assert_eq!(fetched["applicant"]["loanTermMonths"], json!(36.0));
}

#[tokio::test]
async fn invalid_intake_is_rejected_without_a_case() {
    let router = router();
    let mut payload = applicant("Ada", 760);
    payload["dtiRatio"] = json!(1.5);

    let response = router
        .clone()
        .oneshot(send("POST", "/api/v1/loans", Some(&payload)))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(response).await["field"], json!("debtToIncomeRatio"));

    let listed = router
        .oneshot(send("GET", "/api/v1/loans", None))
        .await
        .expect("route executes");
    assert_eq!(read_json(listed).await, json!([]));
}

#[tokio::test]
async fn stateless_assessment_reports_rating_beside_verdict() {
    let router = router();

    let response = router
        .oneshot(send("POST", "/api/v1/risk/assess", Some(&applicant("Ada", 760))))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    let probability = payload["defaultProbability"].as_f64().expect("probability");
    let rating = payload["rating"]["rating"].as_u64().expect("rating");
    assert_eq!(rating, (probability * 100.0).floor() as u64);
    assert!(payload["riskScore"].as_f64().expect("score") < 30.0);
}
