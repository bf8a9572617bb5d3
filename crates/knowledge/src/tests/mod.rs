//! Cross-module tests: ingestion through graded answers.

mod pipeline;
