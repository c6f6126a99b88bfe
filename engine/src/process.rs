//! One UCI engine child process: spawn, handshake, search, stop, quit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::uci::{parse_uci_message, UciError, UciMessage};
use crate::{EngineError, EngineReply, EngineRequest, SearchLimit, Strength};

pub struct UciProcess {
    path: PathBuf,
    child: Child,
    stdin_tx: mpsc::Sender<String>,
    /// Parsed lines, plus any `bestmove` whose move did not parse.
    messages: mpsc::Receiver<Result<UciMessage, UciError>>,
}

impl UciProcess {
    /// Spawn `path` and wait up to `init_timeout` for `uciok`.
    #[tracing::instrument(level = "debug", skip(init_timeout))]
    pub async fn spawn(path: &Path, init_timeout: Duration) -> Result<Self, EngineError> {
        let mut child = tokio::process::Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Failure(format!("spawn {}: {e}", path.display())))?;

        let mut stdin = child.stdin.take().ok_or(UciError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(UciError::NoStdout)?;

        let (msg_tx, messages) = mpsc::channel::<Result<UciMessage, UciError>>(256);
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::debug!("engine stdout EOF");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);
                        let parsed = match parse_uci_message(trimmed) {
                            Err(e @ UciError::InvalidMove(_)) => {
                                tracing::warn!("Engine sent an unparsable move: {}", trimmed);
                                Err(e)
                            }
                            Err(e) => {
                                tracing::trace!("Ignoring UCI line: {}", e);
                                continue;
                            }
                            ok => ok,
                        };
                        if msg_tx.send(parsed).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Error reading engine stdout: {}", e);
                        break;
                    }
                }
            }
        });

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(async move {
            while let Some(cmd) = stdin_rx.recv().await {
                tracing::trace!("UCI >> {}", cmd);
                let written = async {
                    stdin.write_all(cmd.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                };
                if let Err(e) = written.await {
                    tracing::debug!("Failed to write to engine stdin: {}", e);
                    break;
                }
            }
        });

        let mut process = Self {
            path: path.to_path_buf(),
            child,
            stdin_tx,
            messages,
        };

        process.send("uci").await?;
        let handshake = tokio::time::timeout(init_timeout, async {
            while let Some(msg) = process.messages.recv().await {
                match msg {
                    Ok(UciMessage::Id { name, value }) => {
                        tracing::debug!("engine id {} = {}", name, value)
                    }
                    Ok(UciMessage::UciOk) => return Ok(()),
                    _ => {}
                }
            }
            Err(EngineError::Failure("engine exited before uciok".to_string()))
        })
        .await;

        match handshake {
            Ok(Ok(())) => {
                tracing::info!("Engine {} ready", path.display());
                Ok(process)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EngineError::Timeout),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn send(&self, cmd: impl Into<String>) -> Result<(), EngineError> {
        self.stdin_tx
            .send(cmd.into())
            .await
            .map_err(|_| EngineError::Failure("engine stdin closed".to_string()))
    }

    /// Next parsed line. A `bestmove` with a garbled move comes back as
    /// [`EngineError::InvalidMove`].
    async fn recv(&mut self) -> Result<UciMessage, EngineError> {
        let msg = self
            .messages
            .recv()
            .await
            .ok_or_else(|| EngineError::Failure("engine process exited".to_string()))?;
        Ok(msg?)
    }

    /// Run one search to completion. Not bounded in time; the caller wraps it
    /// in a timeout and falls back to [`UciProcess::stop`].
    pub async fn search(&mut self, request: &EngineRequest) -> Result<EngineReply, EngineError> {
        let options = match &request.strength {
            Some(strength) => strength.uci_options(),
            None => Strength::full_strength_options(),
        };
        for option in options {
            self.send(option).await?;
        }
        self.send("ucinewgame").await?;
        self.send("isready").await?;
        loop {
            match self.recv().await {
                Ok(UciMessage::ReadyOk) => break,
                // Leftovers from a previous stopped search.
                Ok(other) => tracing::trace!("Discarding {:?} before readyok", other),
                Err(EngineError::InvalidMove(mv)) => {
                    tracing::trace!("Discarding bestmove {} before readyok", mv)
                }
                Err(e) => return Err(e),
            }
        }

        self.send(format!("position fen {}", request.fen)).await?;
        self.send(match request.limit {
            SearchLimit::Depth(depth) => format!("go depth {depth}"),
            SearchLimit::MoveTime(ms) => format!("go movetime {ms}"),
        })
        .await?;

        let mut principal_variation = Vec::new();
        let mut score = None;
        let mut depth = None;
        loop {
            match self.recv().await? {
                UciMessage::Info(info) => {
                    if !info.pv.is_empty() {
                        principal_variation = info.pv;
                    }
                    if info.score.is_some() {
                        score = info.score;
                    }
                    depth = info.depth.or(depth);
                }
                UciMessage::BestMove { mv: Some(mv), .. } => {
                    tracing::debug!(depth = ?depth, "bestmove {}", mv);
                    return Ok(EngineReply {
                        best_move_uci: mv,
                        principal_variation_uci: principal_variation,
                        score,
                    });
                }
                UciMessage::BestMove { mv: None, .. } => return Err(EngineError::NoLegalMove),
                _ => {}
            }
        }
    }

    /// Ask a running search to stop and wait up to `grace` for its `bestmove`.
    /// Returns false when the engine stayed silent.
    pub async fn stop(&mut self, grace: Duration) -> bool {
        if self.send("stop").await.is_err() {
            return false;
        }
        let drained = tokio::time::timeout(grace, async {
            loop {
                match self.recv().await {
                    Ok(UciMessage::BestMove { .. }) | Err(EngineError::InvalidMove(_)) => {
                        return true
                    }
                    Ok(_) => {}
                    Err(_) => return false,
                }
            }
        })
        .await;
        matches!(drained, Ok(true))
    }

    /// Send `quit` and give the process a moment before killing it.
    pub async fn shutdown(mut self) {
        let _ = self.send("quit").await;
        if tokio::time::timeout(Duration::from_secs(1), self.child.wait())
            .await
            .is_err()
        {
            let _ = self.child.kill().await;
        }
    }

    pub async fn kill(mut self) {
        let _ = self.child.kill().await;
    }
}
