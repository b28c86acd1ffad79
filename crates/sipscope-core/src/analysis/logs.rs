use tracing::{debug, trace};

use crate::classify::Classifier;
use crate::correlate::SessionCorrelator;
use crate::sip::{FieldRecord, MessageBlock, RawLine, Segmenter, observe};
use crate::{ClassifiedRecord, MessageStats, summarize_messages};

use super::AnalysisOptions;

/// Streaming log pipeline: segment, extract, correlate, classify.
pub(crate) struct LogPipeline {
    segmenter: Segmenter,
    correlator: SessionCorrelator,
    classifier: Classifier,
    max_blocks: Option<usize>,
    fields: Vec<FieldRecord>,
    calls: Vec<ClassifiedRecord>,
    truncated: bool,
}

pub(crate) struct LogOutput {
    pub blocks: usize,
    pub messages: MessageStats,
    pub calls: Vec<ClassifiedRecord>,
    pub truncated: bool,
}

impl LogPipeline {
    pub fn new(options: &AnalysisOptions) -> Self {
        Self {
            segmenter: Segmenter::new(),
            correlator: SessionCorrelator::new(options.correlation)
                .with_flush_open_sessions(options.flush_open_sessions),
            classifier: Classifier::default(),
            max_blocks: options.max_blocks,
            fields: Vec::new(),
            calls: Vec::new(),
            truncated: false,
        }
    }

    /// Feed one line. Returns `false` once the block limit is reached.
    pub fn push(&mut self, line: RawLine) -> bool {
        if self.truncated {
            return false;
        }
        if let Some(block) = self.segmenter.push(line) {
            self.accept(block);
        }
        !self.truncated
    }

    pub fn finish(mut self) -> LogOutput {
        if !self.truncated {
            if let Some(block) = self.segmenter.finish() {
                self.accept(block);
            }
        }
        debug!(open = self.correlator.open_sessions(), "end of input");
        let classifier = self.classifier;
        self.calls.extend(
            self.correlator
                .finish()
                .into_iter()
                .map(|record| classifier.classify(record)),
        );
        LogOutput {
            blocks: self.fields.len(),
            messages: summarize_messages(&self.fields),
            calls: self.calls,
            truncated: self.truncated,
        }
    }

    fn accept(&mut self, block: MessageBlock) {
        if self.max_blocks.is_some_and(|max| self.fields.len() >= max) {
            trace!(limit = self.fields.len(), "block limit reached");
            self.truncated = true;
            return;
        }
        let observation = observe(&block);
        if let Some(record) = self.correlator.push(&observation) {
            self.calls.push(self.classifier.classify(record));
        }
        self.fields.push(observation.fields);
    }
}
