//! Drives a [`RevealScheduler`] stream into the conversation view

use std::sync::Arc;

use futures::StreamExt;
use kisan_core::conversation::ViewToken;
use kisan_core::events::ChatEvent;
use kisan_core::render::RevealScheduler;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::EventSink;
use crate::state::ChatState;

/// Start revealing the bot message at `message_index` of the mounted view.
///
/// Must be called with the state lock held so no frame of the previous
/// reveal can land after this one takes over the slot.
pub(crate) fn start(
    state: &mut ChatState,
    shared: Arc<Mutex<ChatState>>,
    events: EventSink,
    scheduler: RevealScheduler,
    message_index: usize,
) -> Option<JoinHandle<()>> {
    state.stop_reveal();
    let token = state.view.token()?;
    let payload = state.view.messages().get(message_index)?.content.clone();
    let reveal_id = state.view.begin_reveal(message_index)?;

    let cancel = CancellationToken::new();
    state.reveal_cancel = Some(cancel.clone());

    Some(tokio::spawn(run(
        shared,
        events,
        scheduler,
        RevealJob {
            token,
            reveal_id,
            message_index,
            payload,
            cancel,
        },
    )))
}

struct RevealJob {
    token: ViewToken,
    reveal_id: u64,
    message_index: usize,
    payload: String,
    cancel: CancellationToken,
}

async fn run(
    shared: Arc<Mutex<ChatState>>,
    events: EventSink,
    scheduler: RevealScheduler,
    job: RevealJob,
) {
    let mut frames = scheduler.stream(job.payload, job.cancel.clone());

    while let Some(frame) = frames.next().await {
        let applied = {
            let mut state = shared.lock();
            let live = !job.cancel.is_cancelled()
                && state.view.is_current(&job.token)
                && state.view.advance_reveal(job.reveal_id, &frame.text);
            if live {
                events.emit(ChatEvent::RevealProgress {
                    session_id: job.token.session_id.clone(),
                    message_index: job.message_index,
                    text: frame.text,
                });
            }
            live
        };
        if !applied {
            debug!("Reveal {} stopped at frame {}", job.reveal_id, frame.index);
            return;
        }
    }

    let mut state = shared.lock();
    if job.cancel.is_cancelled() || !state.view.is_current(&job.token) {
        return;
    }
    if state.view.finish_reveal(job.reveal_id) {
        state.reveal_cancel = None;
        events.emit(ChatEvent::RevealFinished {
            session_id: job.token.session_id.clone(),
            message_index: job.message_index,
        });
    }
}
