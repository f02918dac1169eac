use recmap_cli::pipeline::{MapOutcome, MapRequest};

#[derive(Debug)]
pub struct MapResult {
    pub request: MapRequest,
    pub outcome: MapOutcome,
}

impl MapResult {
    pub fn has_errors(&self) -> bool {
        self.outcome.summary.halted.is_some()
    }
}
