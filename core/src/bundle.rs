//! One-stop client and bundled claim submission.
//!
//! # Design
//! A `ClaimBundle` is a claim plus everything filed against it: invoices,
//! credit notes and attachments, with attachments nested under the
//! document they belong to. `submit_bundle` creates the claim first because
//! every child needs its id, then the invoices and credit notes in order.
//! Once every owning id is known, all attachments are uploaded concurrently.
//! A failing child is logged and recorded but never stops its siblings, and
//! nothing already created is rolled back.
//!
//! Concurrent work runs on a fixed number of scoped worker threads that pull
//! the next index from a shared counter; results keep input order.

use std::{
    num::NonZeroUsize,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::attachment::Attachment;
use crate::auth::Authentication;
use crate::claim::Claim;
use crate::credit_note::CreditNote;
use crate::error::ApiError;
use crate::invoice::Invoice;
use crate::remittance::Remittance;
use crate::types::{
    AttachmentType, ClaimAttachment, CreateClaim, InvoiceAttachment, SubmitCreditNote,
    SubmitInvoice,
};
use crate::visit::Visit;

const FALLBACK_WORKERS: usize = 4;

/// An attachment inside a bundle; the owning document's id is filled in
/// during submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundledAttachment {
    pub path_to_attachment: PathBuf,
    pub attachment_type: Option<AttachmentType>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundledInvoice {
    #[serde(flatten)]
    pub invoice: SubmitInvoice,
    #[serde(default)]
    pub invoice_attachments: Vec<BundledAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundledCreditNote {
    #[serde(flatten)]
    pub credit_note: SubmitCreditNote,
    #[serde(default)]
    pub crn_attachments: Vec<BundledAttachment>,
}

/// A claim with its invoices, credit notes and attachments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimBundle {
    #[serde(flatten)]
    pub claim: CreateClaim,
    #[serde(default)]
    pub invoices: Vec<BundledInvoice>,
    #[serde(default)]
    pub credit_notes: Vec<BundledCreditNote>,
    #[serde(default)]
    pub claim_attachments: Vec<BundledAttachment>,
}

/// What happened to one bundle whose claim was created.
#[derive(Debug)]
pub struct BundleOutcome {
    pub claim_id: String,
    pub claim: Value,
    /// Responses for every child that was accepted, in submission order.
    pub submitted: Vec<Value>,
    pub failures: Vec<ApiError>,
}

impl BundleOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record a created document and return its id for dependent uploads.
    fn record_created(&mut self, result: Result<Value, ApiError>) -> Option<String> {
        match self.record(result).map(response_id)? {
            Ok(id) => Some(id),
            Err(err) => {
                error!(claim_id = %self.claim_id, error = %err, "created document has no id");
                self.failures.push(err);
                None
            }
        }
    }

    fn record(&mut self, result: Result<Value, ApiError>) -> Option<&Value> {
        match result {
            Ok(response) => {
                self.submitted.push(response);
                self.submitted.last()
            }
            Err(err) => {
                error!(claim_id = %self.claim_id, error = %err, "bundle item failed");
                self.failures.push(err);
                None
            }
        }
    }
}

/// Worker count used when the caller has no preference.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_WORKERS)
}

/// Every resource behind one set of credentials.
#[derive(Debug, Clone)]
pub struct HealthCloud {
    auth: Authentication,
    upload_workers: usize,
}

impl HealthCloud {
    pub fn new(auth_token: &str) -> Self {
        Self::from_auth(Authentication::new(auth_token))
    }

    pub fn from_auth(auth: Authentication) -> Self {
        Self {
            auth,
            upload_workers: default_workers(),
        }
    }

    /// Cap on concurrent attachment uploads within one bundle.
    pub fn with_upload_workers(mut self, workers: usize) -> Self {
        self.upload_workers = workers.max(1);
        self
    }

    pub fn auth(&self) -> &Authentication {
        &self.auth
    }

    pub fn claims(&self) -> Claim {
        Claim::from_auth(self.auth.clone())
    }

    pub fn invoices(&self) -> Invoice {
        Invoice::from_auth(self.auth.clone())
    }

    pub fn credit_notes(&self) -> CreditNote {
        CreditNote::from_auth(self.auth.clone())
    }

    pub fn attachments(&self) -> Attachment {
        Attachment::from_auth(self.auth.clone())
    }

    pub fn visits(&self) -> Visit {
        Visit::from_auth(self.auth.clone())
    }

    pub fn remittances(&self) -> Remittance {
        Remittance::from_auth(self.auth.clone())
    }

    /// Create the claim, then file every child document against it.
    ///
    /// Fails only when the claim itself cannot be created.
    pub fn submit_bundle(&self, bundle: &ClaimBundle) -> Result<BundleOutcome, ApiError> {
        let claim = self.claims().create_claim(&bundle.claim)?;
        let claim_id = response_id(&claim)?;
        info!(%claim_id, "claim created");

        let mut outcome = BundleOutcome {
            claim_id: claim_id.clone(),
            claim,
            submitted: Vec::new(),
            failures: Vec::new(),
        };

        let mut uploads: Vec<Upload> = bundle
            .claim_attachments
            .iter()
            .map(|item| {
                Upload::Claim(ClaimAttachment {
                    claim: claim_id.clone(),
                    path_to_attachment: item.path_to_attachment.clone(),
                    attachment_type: item.attachment_type,
                    description: item.description.clone(),
                })
            })
            .collect();

        let invoices = self.invoices();
        for item in &bundle.invoices {
            let invoice = SubmitInvoice {
                claim: claim_id.clone(),
                ..item.invoice.clone()
            };
            if let Some(invoice_id) = outcome.record_created(invoices.submit_invoices(&invoice)) {
                uploads.extend(
                    item.invoice_attachments
                        .iter()
                        .map(|attachment| Upload::Invoice(invoice_attachment(&invoice_id, attachment))),
                );
            }
        }

        let credit_notes = self.credit_notes();
        for item in &bundle.credit_notes {
            let note = SubmitCreditNote {
                claim: claim_id.clone(),
                ..item.credit_note.clone()
            };
            if let Some(note_id) = outcome.record_created(credit_notes.submit_credit_note(&note)) {
                uploads.extend(
                    item.crn_attachments
                        .iter()
                        .map(|attachment| Upload::Invoice(invoice_attachment(&note_id, attachment))),
                );
            }
        }

        let attachments = self.attachments();
        let uploaded = fan_out(&uploads, self.upload_workers, |upload| {
            upload.submit(&attachments)
        });
        for result in uploaded {
            outcome.record(result);
        }

        Ok(outcome)
    }

    /// Submit many bundles over at most `workers` threads. Results come back
    /// in the same order as `bundles`.
    pub fn submit_bundles(
        &self,
        bundles: &[ClaimBundle],
        workers: usize,
    ) -> Vec<Result<BundleOutcome, ApiError>> {
        info!(bundles = bundles.len(), workers, "submitting claim bundles");
        fan_out(bundles, workers, |bundle| self.submit_bundle(bundle))
    }
}

/// An attachment whose owning document already exists.
enum Upload {
    Claim(ClaimAttachment),
    Invoice(InvoiceAttachment),
}

impl Upload {
    fn submit(&self, attachments: &Attachment) -> Result<Value, ApiError> {
        match self {
            Upload::Claim(input) => attachments.submit_claim_attachment(input),
            Upload::Invoice(input) => attachments.submit_invoice_attachment(input),
        }
    }
}

/// Run `task` over `items` on at most `workers` scoped threads. Results come
/// back in the order of `items`.
fn fan_out<T, R, F>(items: &[T], workers: usize, task: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    let next = AtomicUsize::new(0);
    let next = &next;
    let task = &task;

    let mut results: Vec<(usize, R)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(move |_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(item) = items.get(index) else {
                            break done;
                        };
                        done.push((index, task(item)));
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

fn invoice_attachment(invoice_id: &str, item: &BundledAttachment) -> InvoiceAttachment {
    InvoiceAttachment {
        invoice: invoice_id.to_string(),
        path_to_attachment: item.path_to_attachment.clone(),
        description: item.description.clone(),
    }
}

/// Extract the `id` of a created resource; the API uses both string and
/// numeric ids.
fn response_id(response: &Value) -> Result<String, ApiError> {
    match response.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(ApiError::Deserialization(format!(
            "response has no id: {response}"
        ))),
    }
}
