//! Background track analysis
//!
//! Tempo and key estimation run once per load on a worker thread, off the
//! playback path. The estimator is pluggable through [`Analyzer`]; results
//! are collected with the non-blocking [`AnalysisWorker::try_recv`].

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::types::Sample;

/// Tempo and key of a recording; either may be unknown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackAnalysis {
    pub bpm: Option<f64>,
    pub key: Option<String>,
}

/// Estimates tempo and key from mono PCM
pub trait Analyzer: Send + 'static {
    fn analyze(&self, mono: &[Sample], sample_rate: u32) -> anyhow::Result<TrackAnalysis>;

    fn name(&self) -> &'static str;
}

/// Analyzer that reports nothing, for builds without an estimator
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalyzer;

impl Analyzer for NullAnalyzer {
    fn analyze(&self, _mono: &[Sample], _sample_rate: u32) -> anyhow::Result<TrackAnalysis> {
        Ok(TrackAnalysis::default())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

struct AnalysisRequest {
    load_id: u64,
    mono: Vec<Sample>,
    sample_rate: u32,
}

/// Outcome of one analysis request
#[derive(Debug)]
pub struct AnalysisResult {
    /// Identifies the load this result belongs to
    pub load_id: u64,
    pub result: Result<TrackAnalysis, String>,
}

/// Handle to the analysis thread
///
/// Dropping the handle closes the request channel; the thread exits after
/// the request it is working on.
pub struct AnalysisWorker {
    tx: Sender<AnalysisRequest>,
    rx: Receiver<AnalysisResult>,
    _handle: JoinHandle<()>,
}

impl AnalysisWorker {
    /// Spawn the worker thread around `analyzer`
    pub fn spawn(analyzer: Box<dyn Analyzer>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = std::sync::mpsc::channel::<AnalysisRequest>();
        let (result_tx, result_rx) = std::sync::mpsc::channel::<AnalysisResult>();

        let name = analyzer.name();
        let handle = thread::Builder::new()
            .name("padchop-analysis".to_string())
            .spawn(move || analysis_thread(analyzer, request_rx, result_tx))?;

        log::info!("Analysis worker spawned ({})", name);

        Ok(Self {
            tx: request_tx,
            rx: result_rx,
            _handle: handle,
        })
    }

    /// Queue a recording for analysis (non-blocking)
    pub fn submit(&self, load_id: u64, mono: Vec<Sample>, sample_rate: u32) -> Result<(), String> {
        self.tx
            .send(AnalysisRequest {
                load_id,
                mono,
                sample_rate,
            })
            .map_err(|e| format!("Analysis thread disconnected: {}", e))
    }

    /// Take a finished result if there is one
    pub fn try_recv(&self) -> Option<AnalysisResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("Analysis thread disconnected unexpectedly");
                None
            }
        }
    }
}

fn analysis_thread(
    analyzer: Box<dyn Analyzer>,
    rx: Receiver<AnalysisRequest>,
    tx: Sender<AnalysisResult>,
) {
    while let Ok(request) = rx.recv() {
        let start = std::time::Instant::now();
        let result = analyzer
            .analyze(&request.mono, request.sample_rate)
            .map_err(|e| format!("{:#}", e));

        match &result {
            Ok(analysis) => log::info!(
                "Analysis of load {} took {:?}: bpm={:?} key={:?}",
                request.load_id,
                start.elapsed(),
                analysis.bpm,
                analysis.key
            ),
            Err(e) => log::warn!("Analysis of load {} failed: {}", request.load_id, e),
        }

        if tx
            .send(AnalysisResult {
                load_id: request.load_id,
                result,
            })
            .is_err()
        {
            break;
        }
    }

    log::debug!("Analysis thread shutting down");
}
