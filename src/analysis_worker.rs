use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::analysis_fetch::{self, AnalyzeRequest, MSG_BAD_RESPONSE};
use crate::config::ApiConfig;
use crate::result_cache;
use crate::state::{Delta, ProviderCommand};

/// Spawn the background worker. It exits when the command channel closes.
pub fn spawn_analysis_worker(
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    config: ApiConfig,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let _ = tx.send(Delta::Log(format!(
            "[INFO] API endpoint: {}",
            config.analyze_url()
        )));
        if !config.cache_enabled {
            let _ = tx.send(Delta::Log("[INFO] Analysis cache disabled".to_string()));
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::Analyze(req) => run_analysis(&tx, &config, req),
                ProviderCommand::ClearCache => match result_cache::clear_all() {
                    Ok(n) => {
                        let _ = tx.send(Delta::Log(format!(
                            "[INFO] Cleared {n} cached analyses"
                        )));
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!("[WARN] Cache clear failed: {err}")));
                    }
                },
            }
        }
    })
}

fn run_analysis(tx: &Sender<Delta>, config: &ApiConfig, req: AnalyzeRequest) {
    let _ = tx.send(Delta::AnalysisStarted(req.clone()));

    if config.cache_enabled
        && let Some(result) = result_cache::lookup(&req, config.cache_ttl_secs)
    {
        let _ = tx.send(Delta::AnalysisFinished {
            request: req,
            result,
            cached: true,
        });
        return;
    }

    match analysis_fetch::fetch_analysis(config, &req) {
        Ok(result) => {
            if config.cache_enabled
                && let Err(err) = result_cache::store(&req, &result, config.cache_ttl_secs)
            {
                let _ = tx.send(Delta::Log(format!("[WARN] Cache write failed: {err:#}")));
            }
            let _ = tx.send(Delta::AnalysisFinished {
                request: req,
                result,
                cached: false,
            });
        }
        Err(err) => {
            // Body parse failures carry serde context; keep that in the console only.
            let msg = if err.chain().any(|e| e.is::<serde_json::Error>()) {
                let _ = tx.send(Delta::Log(format!("[WARN] {err:#}")));
                MSG_BAD_RESPONSE.to_string()
            } else {
                err.to_string()
            };
            let _ = tx.send(Delta::AnalysisFailed {
                request: req,
                message: msg,
            });
        }
    }
}
