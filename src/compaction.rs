use std::sync::Arc;

use log::info;

use crate::version::FileMetaData;

/// One unit of compaction work: the files picked at `level` and the
/// overlapping files one level down.
#[derive(Debug, Clone)]
pub struct Compaction {
    pub level: usize,
    /// `inputs[0]` lives at `level`, `inputs[1]` at `level + 1`.
    pub inputs: [Vec<Arc<FileMetaData>>; 2],
}

impl Compaction {
    pub fn new(level: usize) -> Self {
        Compaction {
            level,
            inputs: [Vec::new(), Vec::new()],
        }
    }

    /// Is this a trivial compaction that can be implemented by just
    /// moving a single input file to the next level (no merging or splitting)?
    pub fn is_trivial_move(&self) -> bool {
        self.inputs[0].len() == 1 && self.inputs[1].is_empty()
    }

    pub fn num_input_files(&self) -> usize {
        self.inputs[0].len() + self.inputs[1].len()
    }

    pub fn log(&self) {
        let numbers = |files: &[Arc<FileMetaData>]| {
            files.iter().map(|f| f.number).collect::<Vec<_>>()
        };
        info!(
            "compacting level {}: {:?} + level {}: {:?}",
            self.level,
            numbers(&self.inputs[0]),
            self.level + 1,
            numbers(&self.inputs[1])
        );
    }
}
