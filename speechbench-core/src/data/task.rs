//! Task and split keywords

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::bucket::BucketPolicy;
use crate::error::BenchError;

/// Kind of data a dataset loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Features and token transcriptions
    Asr,
    /// Token transcriptions only
    Text,
    /// Features only
    Spec,
    /// Features and a target spectrogram
    Duo,
    /// Features and frame-level phone labels
    Phone,
    /// Features and an utterance-level sentiment class
    Sentiment,
    /// Features and an utterance-level speaker class
    Speaker,
}

impl Task {
    pub const ALL: [Task; 7] = [
        Task::Asr,
        Task::Text,
        Task::Spec,
        Task::Duo,
        Task::Phone,
        Task::Sentiment,
        Task::Speaker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Asr => "asr",
            Task::Text => "text",
            Task::Spec => "spec",
            Task::Duo => "duo",
            Task::Phone => "phone",
            Task::Sentiment => "sentiment",
            Task::Speaker => "speaker",
        }
    }

    /// Frame threshold above which a full bucket is halved
    pub fn default_half_batch_time(&self) -> usize {
        match self {
            Task::Phone | Task::Speaker => BucketPolicy::LONG_CONTEXT_HALF_BATCHSIZE_TIME,
            _ => BucketPolicy::HALF_BATCHSIZE_TIME,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BenchError::UnsupportedTask { task: s.to_string() })
    }
}

/// Which part of the data is iterated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Dev,
    Test,
    /// Training samples, label sequences only
    Text,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev => "dev",
            Split::Test => "test",
            Split::Text => "text",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "dev" => Ok(Split::Dev),
            "test" => Ok(Split::Test),
            "text" => Ok(Split::Text),
            _ => Err(BenchError::UnsupportedSplit { split: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_keywords() {
        for task in Task::ALL {
            assert_eq!(task.as_str().parse::<Task>().unwrap(), task);
        }
        let err = "wer".parse::<Task>().unwrap_err();
        assert!(matches!(err, BenchError::UnsupportedTask { .. }));
    }

    #[test]
    fn test_split_keywords() {
        assert_eq!("dev".parse::<Split>().unwrap(), Split::Dev);
        assert!(matches!(
            "valid".parse::<Split>(),
            Err(BenchError::UnsupportedSplit { .. })
        ));
    }

    #[test]
    fn test_long_context_tasks() {
        assert_eq!(Task::Phone.default_half_batch_time(), 1000);
        assert_eq!(Task::Speaker.default_half_batch_time(), 1000);
        assert_eq!(Task::Asr.default_half_batch_time(), 400);
    }

    #[test]
    fn test_serde_lowercase() {
        let task: Task = serde_json::from_str("\"sentiment\"").unwrap();
        assert_eq!(task, Task::Sentiment);
    }
}
