#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynthesisStage {
    #[default]
    Prologue,
    States,
    Finished,
}

/// Progress message sent by the processor after each unit of work
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub state_index: usize,
    pub n_states: usize,
    pub stage: SynthesisStage,
}

impl WorkerStatus {
    pub fn new(state_index: usize, n_states: usize, stage: SynthesisStage) -> Self {
        let progress = match stage {
            SynthesisStage::Prologue => 0.0,
            SynthesisStage::Finished => 1.0,
            SynthesisStage::States if n_states == 0 => 1.0,
            SynthesisStage::States => state_index as f32 / n_states as f32,
        };
        Self {
            progress,
            state_index,
            n_states,
            stage,
        }
    }
}
