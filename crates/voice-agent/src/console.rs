use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;

use crate::session::VoiceSession;

pub const QUIT_COMMAND: &str = "/quit";

/// Feed lines from `input` to `session` as user turns until end of input,
/// `/quit`, Ctrl-C or a read error. Returns without shutting the session
/// down, so the caller always gets to report usage.
///
/// Ctrl-C during a turn interrupts only that turn.
pub async fn run_console<R>(session: &VoiceSession, input: R) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut turns = 0;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("[{}] failed to read input: {}", session.id(), e);
                break;
            }
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == QUIT_COMMAND {
            break;
        }

        let cancel = CancellationToken::new();
        let turn = session.run_turn(text, cancel.clone());
        tokio::pin!(turn);
        turns += 1;

        tokio::select! {
            result = &mut turn => match result {
                Ok(report) => log::debug!("turn finished, filler {:?}", report.filler),
                Err(e) => log::error!("[{}] turn failed: {}", session.id(), e),
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupting current turn");
                cancel.cancel();
                if let Err(e) = turn.await {
                    log::info!("[{}] turn ended: {}", session.id(), e);
                }
            }
        }
    }

    turns
}
