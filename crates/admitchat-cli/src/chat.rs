use admitchat_cli::{ChatSession, RelayClient, StreamCancelHandle, SubmitOutcome};
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::render::{print_hint, print_message, print_prompt, render_event};

const QUIT_COMMANDS: [&str; 3] = ["/quit", "/exit", ":q"];

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Skip,
    Send(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if QUIT_COMMANDS.contains(&line) {
        Input::Quit
    } else if line.is_empty() {
        Input::Skip
    } else {
        Input::Send(line.to_string())
    }
}

/// Read lines from stdin and run one chat turn per line until EOF or `/quit`.
///
/// Ctrl-C cancels a reply in progress and quits at the prompt. Lines typed
/// while a reply is streaming are handed to the session, which rejects them.
pub async fn run(server: &str) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session = ChatSession::new(RelayClient::new(server)).with_events(event_tx);

    for message in session.transcript().messages() {
        print_message(message);
    }
    print_hint("Type /quit, press Ctrl-D or Ctrl-C to leave. Ctrl-C cancels a reply in progress.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    while stdin_open {
        print_prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let text = match parse_input(&line) {
            Input::Quit => break,
            Input::Skip => continue,
            Input::Send(text) => text,
        };

        let (cancel, cancel_rx) = StreamCancelHandle::new();
        let turn = session.clone();
        let mut task =
            tokio::spawn(async move { turn.submit_with_cancel(&text, cancel_rx).await });

        let outcome = loop {
            tokio::select! {
                biased;
                Some(event) = event_rx.recv() => render_event(&event),
                _ = tokio::signal::ctrl_c() => cancel.cancel(),
                joined = &mut task => break joined?,
                line = lines.next_line(), if stdin_open => {
                    stdin_open = submit_during_reply(&session, line?).await;
                }
            }
        };

        // Events sent just before the task finished.
        while let Ok(event) = event_rx.try_recv() {
            render_event(&event);
        }

        if let SubmitOutcome::Failed(reason) = &outcome {
            tracing::warn!(%reason, "Turn ended with fallback reply");
        }
    }

    let transcript = session.transcript();
    tracing::info!(
        messages = transcript.len(),
        user_turns = transcript.user_turns(),
        "Chat session ended"
    );
    Ok(())
}

/// Returns whether stdin is still open.
async fn submit_during_reply(session: &ChatSession, line: Option<String>) -> bool {
    let Some(line) = line else {
        return false;
    };
    if let Input::Send(text) = parse_input(&line) {
        let outcome = session.submit(&text).await;
        tracing::debug!(?outcome, "Input received while a reply was streaming");
    }
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use admitchat_ai::llm::{MockLlmClient, MockScript, MockStep};
    use admitchat_server::{AppState, CompletionRelay, build_router};

    use super::*;

    async fn spawn_slow_relay() -> String {
        // Safety: only this test touches the variable, before any client is built.
        unsafe {
            std::env::set_var("ADMITCHAT_DISABLE_SYSTEM_PROXY", "1");
        }
        let llm = MockLlmClient::from_scripts(
            "mock-model",
            vec![MockScript::Stream(vec![
                MockStep::text("Slow answer").with_delay(300),
            ])],
        );
        let app = build_router(AppState::new(CompletionRelay::new(
            Arc::new(llm),
            "You are a helpful assistant.",
        )));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_lines_typed_during_reply_are_rejected() {
        let url = spawn_slow_relay().await;
        let session = ChatSession::new(RelayClient::new(&url));
        let turn = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("Deadlines?").await })
        };
        for _ in 0..200 {
            if session.state().is_in_flight() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(session.state().is_in_flight());

        assert!(submit_during_reply(&session, Some("Another question".to_string())).await);
        assert!(submit_during_reply(&session, Some("   ".to_string())).await);
        assert_eq!(session.transcript().len(), 3);

        assert!(!submit_during_reply(&session, None).await);

        assert_eq!(turn.await.unwrap(), SubmitOutcome::Completed);
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(session.transcript().user_turns(), 1);
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  /quit "), Input::Quit);
        assert_eq!(parse_input(":q"), Input::Quit);
        assert_eq!(parse_input("   "), Input::Skip);
        assert_eq!(
            parse_input(" When are deadlines? \n"),
            Input::Send("When are deadlines?".to_string())
        );
    }
}
