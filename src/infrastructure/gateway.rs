use crate::domain::ports::{GatewayAck, PaymentGateway, PaymentIntent, TransferStatus};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Scriptable stand-in for the payment provider, used by tests and the CLI
/// replay. Initializations hand out sequential references; transfer statuses
/// are whatever the test scripted, defaulting to inconclusive.
#[derive(Default)]
pub struct FakeGateway {
    counter: AtomicU64,
    fail_initializations: AtomicBool,
    transfers: Arc<RwLock<HashMap<String, TransferStatus>>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_initializations(&self, fail: bool) {
        self.fail_initializations.store(fail, Ordering::SeqCst);
    }

    pub async fn set_transfer_status(&self, reference: &str, status: TransferStatus) {
        self.transfers
            .write()
            .await
            .insert(reference.to_string(), status);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize_payment(&self, intent: &PaymentIntent) -> Result<GatewayAck> {
        if self.fail_initializations.load(Ordering::SeqCst) {
            return Err(EngineError::Gateway("initialization refused".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayAck {
            gateway: "fakepay".into(),
            gateway_reference: format!("PAY-{n:06}-{}", intent.reference),
        })
    }

    async fn transfer_status(&self, reference: &str) -> Result<TransferStatus> {
        let transfers = self.transfers.read().await;
        Ok(transfers
            .get(reference)
            .copied()
            .unwrap_or(TransferStatus::Inconclusive))
    }
}
