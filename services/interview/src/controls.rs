use interview_core::{Input, SessionEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Sends `StopRecording` for every line read. Returns when the reader runs dry
/// or the session stops listening.
pub async fn forward_lines<R>(reader: R, inputs: mpsc::Sender<Input>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(_)) => {
                if inputs.send(Input::StopRecording).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read stdin: {:?}", e);
                break;
            }
        }
    }
}

pub fn spawn_stdin_stop(inputs: mpsc::Sender<Input>) -> JoinHandle<()> {
    tokio::spawn(forward_lines(
        tokio::io::BufReader::new(tokio::io::stdin()),
        inputs,
    ))
}

pub fn spawn_ctrl_c_abandon(inputs: mpsc::Sender<Input>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {:?}", e);
            return;
        }
        tracing::info!("Received Ctrl-C, abandoning session...");
        if let Err(e) = inputs.send(Input::Abandon).await {
            tracing::warn!("Session already stopped: {:?}", e);
        }
    })
}

/// Logs the remaining session time once a minute and when it runs out.
pub fn spawn_clock_log(mut remaining: watch::Receiver<u32>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while remaining.changed().await.is_ok() {
            let seconds = *remaining.borrow_and_update();
            if seconds == 0 {
                tracing::warn!("Session time is up");
                break;
            }
            if seconds % 60 == 0 {
                tracing::info!("{} minutes left", seconds / 60);
            }
        }
    })
}

pub fn spawn_event_log(mut events: mpsc::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::CaptureStarted { .. } => {
                    tracing::info!("Recording... press Enter when you have finished your answer.");
                }
                SessionEvent::CaptureSkipped { reason, .. } => {
                    tracing::warn!("Microphone unavailable, moving on: {}", reason);
                }
                SessionEvent::Failed(reason) => {
                    tracing::error!("Session failed: {}", reason);
                }
                other => tracing::debug!("Session event: {:?}", other),
            }
        }
    })
}
