#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    requests: u32,
    failures: u32,
    tokens_charged: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, success: bool) {
        self.requests += 1;
        if !success {
            self.failures += 1;
        }
    }

    pub(crate) fn add_charge(&mut self, amount: u32) {
        self.tokens_charged += u64::from(amount);
    }

    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn tokens_charged(&self) -> u64 {
        self.tokens_charged
    }
}
