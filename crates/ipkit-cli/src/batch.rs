//! Parallel batch analysis using Rayon
//!
//! Each input line is either an IPv4 address (classified and rendered) or a
//! CIDR block (described). Lines are processed on a dedicated thread pool and
//! every line keeps its own result, so one bad input never hides the rest.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use ipkit_cidr::{SubnetBlock, SubnetDescriptor};
use ipkit_classify::Analysis;
use ipkit_core::Ipv4Address;

/// Outcome of one batch line
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchOutcome {
    Address(Analysis),
    Subnet(SubnetDescriptor),
    Error { message: String },
}

/// Batch processing result
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub input: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// Batch processor with parallel execution
pub struct BatchProcessor {
    thread_pool: rayon::ThreadPool,
}

impl BatchProcessor {
    /// Create a new batch processor
    ///
    /// # Arguments
    ///
    /// * `num_threads` - Number of threads (default: CPU cores)
    pub fn new(num_threads: Option<usize>) -> Result<Self> {
        let num_threads = num_threads.unwrap_or_else(num_cpus::get).max(1);

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;

        Ok(Self { thread_pool })
    }

    /// Process inputs in parallel, keeping input order
    pub fn process(&self, inputs: Vec<String>) -> Vec<BatchResult> {
        let total = inputs.len();
        let processed = AtomicUsize::new(0);

        self.thread_pool.install(|| {
            inputs
                .into_par_iter()
                .map(|input| {
                    let outcome = analyze_line(&input);

                    let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 1000 == 0 || count == total {
                        debug!("Processed {}/{} inputs", count, total);
                    }

                    BatchResult { input, outcome }
                })
                .collect()
        })
    }

    /// Get thread pool info
    pub fn thread_count(&self) -> usize {
        self.thread_pool.current_num_threads()
    }
}

fn analyze_line(input: &str) -> BatchOutcome {
    let result = if input.contains('/') {
        SubnetBlock::parse(input)
            .map(|block| BatchOutcome::Subnet(block.descriptor()))
            .map_err(|e| e.to_string())
    } else {
        Ipv4Address::parse(input)
            .map(|addr| BatchOutcome::Address(ipkit_classify::analyze(addr)))
            .map_err(|e| e.to_string())
    };

    result.unwrap_or_else(|message| BatchOutcome::Error { message })
}

/// Read non-empty, non-comment lines from a file, or stdin for `None`/`-`
pub fn read_inputs(path: Option<&str>) -> Result<Vec<String>> {
    match path {
        None | Some("-") => collect_lines(io::stdin().lock()),
        Some(path) => {
            let file = File::open(path).with_context(|| format!("cannot open {}", path))?;
            collect_lines(BufReader::new(file))
        }
    }
}

fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut inputs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        inputs.push(trimmed.to_string());
    }
    Ok(inputs)
}
