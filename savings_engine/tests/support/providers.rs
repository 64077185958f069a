//! Scripted provider fakes. Each call consumes the next scripted outcome; when the script runs dry the
//! fake keeps answering with its fallback so tests only script the interesting part.
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
    Mutex,
};

use csg_common::Kobo;
use savings_engine::traits::{
    BankRail,
    CardCharger,
    ChargeOutcome,
    ChargeRequest,
    ChargeStatus,
    ProviderError,
    ResolvedAccount,
    TransferAck,
    TransferInstruction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeScript {
    Success,
    Declined,
    Unreachable,
}

#[derive(Clone, Default)]
pub struct ScriptedCharger {
    script: Arc<Mutex<Vec<ChargeScript>>>,
    pub calls: Arc<Mutex<Vec<ChargeRequest>>>,
    counter: Arc<AtomicU64>,
}

impl ScriptedCharger {
    pub fn always_succeed() -> Self {
        Self::default()
    }

    pub fn with_script(script: Vec<ChargeScript>) -> Self {
        Self { script: Arc::new(Mutex::new(script)), ..Self::default() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_outcome(&self) -> ChargeScript {
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            ChargeScript::Success
        } else {
            script.remove(0)
        }
    }
}

impl CardCharger for ScriptedCharger {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        self.calls.lock().unwrap().push(request);
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        match self.next_outcome() {
            ChargeScript::Success => Ok(ChargeOutcome {
                status: ChargeStatus::Success,
                reference: format!("charge-{n:04}"),
                message: None,
            }),
            ChargeScript::Declined => Ok(ChargeOutcome {
                status: ChargeStatus::Declined,
                reference: format!("charge-{n:04}"),
                message: Some("Insufficient funds on card".to_string()),
            }),
            ChargeScript::Unreachable => Err(ProviderError::RequestFailed("connection refused".to_string())),
        }
    }
}

#[derive(Clone)]
pub struct ScriptedRail {
    pub accept: bool,
    pub reachable: bool,
    pub resolves: bool,
    pub fee: Kobo,
    pub transfer_calls: Arc<Mutex<Vec<TransferInstruction>>>,
    pub verify_calls: Arc<Mutex<Vec<String>>>,
}

impl Default for ScriptedRail {
    fn default() -> Self {
        Self {
            accept: true,
            reachable: true,
            resolves: true,
            fee: Kobo::from(0),
            transfer_calls: Arc::new(Mutex::new(Vec::new())),
            verify_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ScriptedRail {
    pub fn accepting_with_fee(fee: Kobo) -> Self {
        Self { fee, ..Self::default() }
    }

    pub fn rejecting() -> Self {
        Self { accept: false, ..Self::default() }
    }

    pub fn unreachable() -> Self {
        Self { reachable: false, ..Self::default() }
    }

    pub fn transfer_call_count(&self) -> usize {
        self.transfer_calls.lock().unwrap().len()
    }
}

impl BankRail for ScriptedRail {
    async fn verify_account(&self, account_number: &str, bank_code: &str) -> Result<ResolvedAccount, ProviderError> {
        self.verify_calls.lock().unwrap().push(account_number.to_string());
        if self.resolves {
            Ok(ResolvedAccount {
                account_number: account_number.to_string(),
                account_name: "ADAEZE OKONKWO".to_string(),
                bank_code: bank_code.to_string(),
            })
        } else {
            Err(ProviderError::BadResponse("account could not be resolved".to_string()))
        }
    }

    async fn initiate_transfer(&self, instruction: TransferInstruction) -> Result<TransferAck, ProviderError> {
        let reference = instruction.reference.as_str().to_string();
        self.transfer_calls.lock().unwrap().push(instruction);
        if !self.reachable {
            return Err(ProviderError::RequestFailed("connection reset by peer".to_string()));
        }
        if self.accept {
            Ok(TransferAck { accepted: true, reference, fee: self.fee, message: None })
        } else {
            Ok(TransferAck {
                accepted: false,
                reference,
                fee: Kobo::from(0),
                message: Some("Beneficiary bank unavailable".to_string()),
            })
        }
    }
}
